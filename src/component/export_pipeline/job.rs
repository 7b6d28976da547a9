use crate::error::{PipelineError, PipelineResult};
use crate::tools::{Dimensions, ViewState};
use std::path::PathBuf;
use std::time::Duration;

/// 一次匯出所需的全部資料
///
/// 建立時就複製好來源清單與視圖狀態，匯出期間不會再讀取目前的預覽狀態。
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub source_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub output_dims: Dimensions,
    pub frame_rate: u32,
    /// 平移量以預覽影像像素為單位
    pub view: ViewState,
    /// 建立預覽時使用的縮小倍率，與 `view` 一起快照
    pub shrink_factor: u32,
    pub worker_count: usize,
    pub queue_capacity: usize,
    /// 預覽對應的原始影像尺寸（預覽尺寸 × 縮小倍率），決定輸出的縮放倍率；
    /// 未設定時以每張影格自己的尺寸計算
    pub original_dims: Option<Dimensions>,
}

impl ExportJob {
    #[must_use]
    pub fn new(
        source_paths: Vec<PathBuf>,
        output_path: PathBuf,
        output_dims: Dimensions,
        frame_rate: u32,
        view: ViewState,
        shrink_factor: u32,
        worker_count: usize,
    ) -> Self {
        let worker_count = worker_count.max(1);
        Self {
            source_paths,
            output_path,
            output_dims,
            frame_rate,
            view,
            shrink_factor: shrink_factor.max(1),
            worker_count,
            queue_capacity: worker_count * 2,
            original_dims: None,
        }
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub const fn with_original_dims(mut self, dims: Dimensions) -> Self {
        self.original_dims = Some(dims);
        self
    }

    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.source_paths.len()
    }

    /// 平移量換算為原始影像像素後的視圖
    #[must_use]
    pub fn render_view(&self) -> ViewState {
        self.view.with_pan_scaled(f64::from(self.shrink_factor.max(1)))
    }

    /// 重排緩衝區加上工作者手上的影像所需的記憶體上限
    #[must_use]
    pub fn estimated_peak_bytes(&self) -> u64 {
        let output = self.output_dims.rgb_len() as u64;
        let source = self.original_dims.map_or(0, |d| d.rgb_len() as u64);
        self.queue_capacity as u64 * output + self.worker_count as u64 * (source + output)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.output_dims.is_empty() {
            return Err(PipelineError::InvalidConfig(format!(
                "輸出解析度無效: {}x{}",
                self.output_dims.width, self.output_dims.height
            )));
        }
        if let Some(original) = self.original_dims
            && original.is_empty()
        {
            return Err(PipelineError::InvalidConfig(format!(
                "原始影像尺寸無效: {}x{}",
                original.width, original.height
            )));
        }
        if self.frame_rate == 0 {
            return Err(PipelineError::InvalidConfig("影格率必須大於 0".to_string()));
        }
        if self.worker_count == 0 || self.queue_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "工作者數與緩衝區容量必須大於 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 匯出結果摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub output_path: PathBuf,
    pub written: usize,
    pub total: usize,
    /// 以黑畫面代替的影格數
    pub decode_failures: usize,
    pub high_water_mark: usize,
    pub leaked_buffers: usize,
    pub elapsed: Duration,
}
