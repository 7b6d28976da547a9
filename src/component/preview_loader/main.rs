use super::downsample::downsample;
use crate::component::frame_store::{ChannelOrder, Frame, FrameStore};
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{Dimensions, ImageDecoder, SequenceEntry, create_progress_bar, format_bytes};
use log::{info, warn};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// 預覽載入參數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub shrink_factor: u32,
    pub thread_count: usize,
    pub channel_order: ChannelOrder,
    pub show_progress: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            shrink_factor: 1,
            thread_count: 1,
            channel_order: ChannelOrder::Rgb,
            show_progress: false,
        }
    }
}

type Slot = Option<(Dimensions, Frame)>;

/// 平行載入預覽影格
pub struct PreviewLoader {
    decoder: Arc<dyn ImageDecoder>,
    shutdown_signal: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
}

impl PreviewLoader {
    #[must_use]
    pub fn new(decoder: Arc<dyn ImageDecoder>, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            decoder,
            shutdown_signal,
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 目前這次載入已處理的檔案數（僅供顯示進度）
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// 載入 `entries` 的預覽影格
    ///
    /// 檔案清單切成 `thread_count` 段連續區間，每段由一個工作者依序解碼並寫入
    /// 自己負責的槽位。解碼失敗的檔案直接捨棄；全部失敗時回傳 `EmptyResult`，
    /// 收到中斷信號時捨棄所有結果並回傳 `Cancelled`。
    pub fn load(
        &self,
        entries: &[SequenceEntry],
        all_source_paths: Vec<PathBuf>,
        options: LoaderOptions,
    ) -> PipelineResult<FrameStore> {
        let total = entries.len();
        self.completed.store(0, Ordering::Relaxed);
        if total == 0 {
            return Err(PipelineError::EmptyResult { attempted: 0 });
        }

        let start = Instant::now();
        let thread_count = options.thread_count.max(1);
        let shrink_factor = options.shrink_factor.max(1);
        let chunk_size = total.div_ceil(thread_count);

        info!(
            "開始載入 {total} 張預覽影像（縮小倍率 {shrink_factor}，{thread_count} 個執行緒）"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("preview-loader-{i}"))
            .build()?;

        let progress_bar = create_progress_bar(total as u64, options.show_progress);
        progress_bar.set_message("載入預覽中...");

        let mut slots: Vec<Slot> = (0..total).map(|_| None).collect();
        let decoder = self.decoder.as_ref();
        let shutdown_signal = self.shutdown_signal.as_ref();
        let completed = self.completed.as_ref();

        pool.install(|| {
            slots
                .par_chunks_mut(chunk_size)
                .zip(entries.par_chunks(chunk_size))
                .for_each(|(slot_range, entry_range)| {
                    for (slot, entry) in slot_range.iter_mut().zip(entry_range) {
                        if shutdown_signal.load(Ordering::SeqCst) {
                            return;
                        }
                        *slot = decode_entry(decoder, entry, shrink_factor, options.channel_order);
                        completed.fetch_add(1, Ordering::Relaxed);
                        progress_bar.inc(1);
                    }
                });
        });

        if self.shutdown_signal.load(Ordering::SeqCst) {
            progress_bar.abandon_with_message("已取消");
            let completed = self.completed_count();
            warn!("預覽載入已取消（{completed}/{total}），捨棄所有結果");
            return Err(PipelineError::Cancelled { completed, total });
        }
        progress_bar.finish_with_message("完成");

        let Some(image_dims) = slots.iter().flatten().map(|(dims, _)| *dims).next() else {
            warn!("{total} 個檔案全部無法解碼");
            return Err(PipelineError::EmptyResult { attempted: total });
        };

        let frames: Vec<Frame> = slots
            .into_iter()
            .flatten()
            .filter_map(|(dims, frame)| {
                if dims == image_dims {
                    Some(frame)
                } else {
                    warn!(
                        "捨棄尺寸不一致的影像 {}: {}x{}（預期 {}x{}）",
                        frame.source_path.display(),
                        dims.width,
                        dims.height,
                        image_dims.width,
                        image_dims.height
                    );
                    None
                }
            })
            .collect();

        let store = FrameStore::new(
            frames,
            all_source_paths,
            image_dims,
            shrink_factor,
            options.channel_order,
        );

        let original = store.original_dims();
        info!(
            "預覽載入完成: {}/{total} 張，預覽 {}x{}，原始 {}x{}，佔用 {}，耗時 {:.2}s",
            store.len(),
            image_dims.width,
            image_dims.height,
            original.width,
            original.height,
            format_bytes(store.resident_bytes() as u64),
            start.elapsed().as_secs_f64()
        );

        Ok(store)
    }
}

fn decode_entry(
    decoder: &dyn ImageDecoder,
    entry: &SequenceEntry,
    shrink_factor: u32,
    channel_order: ChannelOrder,
) -> Slot {
    let result = decoder
        .decode(&entry.path)
        .and_then(|decoded| downsample(&decoded, shrink_factor, channel_order));

    match result {
        Ok((dims, pixels)) => Some((dims, Frame::new(entry.index, entry.path.clone(), pixels))),
        Err(e) => {
            warn!("略過無法載入的影像 {}: {e}", entry.path.display());
            None
        }
    }
}
