//! 影像序列掃描
//!
//! 從檔名尾端的數字（例如 `e_png_yx_0.5_000100.png` → 100）取得序號，
//! 並依序號排序資料夾中的影像。

use crate::error::{PipelineError, PipelineResult};
use log::debug;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// 支援的影像副檔名（小寫，不含點）
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

static REGEX_ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)\.[^.]+$").expect("Invalid regex"));

/// 序列中的一個檔案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    pub index: u64,
    pub path: PathBuf,
}

/// 取得檔名最後一個 `_` 與副檔名之間的數字
#[must_use]
pub fn extract_index(file_name: &str) -> Option<u64> {
    REGEX_ORDINAL_SUFFIX
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// 掃描資料夾（不遞迴），回傳依序號排序的影像清單
pub fn scan_sequence_folder(directory: &Path) -> PipelineResult<Vec<SequenceEntry>> {
    let mut entries: Vec<(SequenceEntry, String)> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| has_image_extension(entry.path()))
        .filter_map(|entry| {
            let file_name = entry.file_name().to_str()?.to_string();
            let index = extract_index(&file_name)?;
            Some((
                SequenceEntry {
                    index,
                    path: entry.into_path(),
                },
                file_name,
            ))
        })
        .collect();

    if entries.is_empty() {
        return Err(PipelineError::EmptyResult { attempted: 0 });
    }

    entries.sort_by(|(a, a_name), (b, b_name)| a.index.cmp(&b.index).then_with(|| a_name.cmp(b_name)));

    debug!(
        "{} 中找到 {} 個序列影像",
        directory.display(),
        entries.len()
    );

    Ok(entries.into_iter().map(|(entry, _)| entry).collect())
}

/// 每 n 個取一個，並且一定包含最後一個
#[must_use]
pub fn select_every_nth(entries: &[SequenceEntry], nth: usize) -> Vec<SequenceEntry> {
    let nth = nth.max(1);
    let mut selected: Vec<SequenceEntry> = entries.iter().step_by(nth).cloned().collect();

    if let Some(last) = entries.last()
        && (entries.len() - 1) % nth != 0
    {
        selected.push(last.clone());
    }

    selected
}

/// 列出 z-stack 根目錄下的各層資料夾（依名稱排序）
pub fn list_layer_directories(root: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut layers: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .collect();

    if layers.is_empty() {
        return Err(PipelineError::EmptyResult { attempted: 0 });
    }

    layers.sort();
    Ok(layers)
}
