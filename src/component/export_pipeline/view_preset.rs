//! 匯出視圖設定檔
//!
//! 每行一組設定：`輸出檔|縮放|平移X|平移Y|起始影格|結束影格|影格率`。
//! 空行與 `#` 開頭的行會被略過。

use crate::error::{PipelineError, PipelineResult};
use crate::tools::{ViewState, ZoomLimits};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewPreset {
    pub output_path: PathBuf,
    pub zoom_level: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub start_frame: usize,
    pub end_frame: usize,
    pub frame_rate: u32,
}

impl ViewPreset {
    /// 以目前視圖建立涵蓋全部 `frame_count` 張影格的設定
    #[must_use]
    pub fn from_view(output_path: PathBuf, view: &ViewState, frame_count: usize, frame_rate: u32) -> Self {
        Self {
            output_path,
            zoom_level: view.zoom_level,
            pan_x: view.pan_x,
            pan_y: view.pan_y,
            start_frame: 0,
            end_frame: frame_count.saturating_sub(1),
            frame_rate,
        }
    }

    /// 套用到視圖（只改縮放與平移），縮放限制在 `limits` 內
    #[must_use]
    pub fn view(&self, limits: ZoomLimits) -> ViewState {
        ViewState {
            zoom_level: self.zoom_level.clamp(limits.min, limits.max),
            pan_x: self.pan_x,
            pan_y: self.pan_y,
            ..ViewState::default()
        }
    }

    /// 限制在 `0..total` 內的影格範圍；範圍為空時回傳 `None`
    #[must_use]
    pub fn frame_range(&self, total: usize) -> Option<RangeInclusive<usize>> {
        if total == 0 {
            return None;
        }
        let end = self.end_frame.min(total - 1);
        (self.start_frame <= end).then_some(self.start_frame..=end)
    }

    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.output_path.display(),
            self.zoom_level,
            self.pan_x,
            self.pan_y,
            self.start_frame,
            self.end_frame,
            self.frame_rate
        )
    }

    pub fn parse_line(line: &str, line_number: usize) -> PipelineResult<Self> {
        let invalid = |what: &str| {
            PipelineError::InvalidConfig(format!("第 {line_number} 行{what}: {line}"))
        };

        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        let [output, zoom, pan_x, pan_y, start, end, fps] = fields.as_slice() else {
            return Err(invalid("欄位數量錯誤"));
        };
        if output.is_empty() {
            return Err(invalid("缺少輸出檔名"));
        }

        let zoom_level: f64 = zoom.parse().map_err(|_| invalid("縮放值無效"))?;
        if !zoom_level.is_finite() || zoom_level <= 0.0 {
            return Err(invalid("縮放值必須大於 0"));
        }

        let pan_x: f64 = pan_x.parse().map_err(|_| invalid("平移X無效"))?;
        let pan_y: f64 = pan_y.parse().map_err(|_| invalid("平移Y無效"))?;
        if !pan_x.is_finite() || !pan_y.is_finite() {
            return Err(invalid("平移值必須是有限數值"));
        }

        Ok(Self {
            output_path: PathBuf::from(*output),
            zoom_level,
            pan_x,
            pan_y,
            start_frame: start.parse().map_err(|_| invalid("起始影格無效"))?,
            end_frame: end.parse().map_err(|_| invalid("結束影格無效"))?,
            frame_rate: fps.parse().map_err(|_| invalid("影格率無效"))?,
        })
    }

    /// 附加到設定檔尾端
    pub fn append_to_file(&self, path: &Path) -> PipelineResult<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", self.to_line())?;
        Ok(())
    }
}

pub fn load_presets(path: &Path) -> PipelineResult<Vec<ViewPreset>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| ViewPreset::parse_line(line.trim(), i + 1))
        .collect()
}
