//! 影像管線錯誤類型
//!
//! 單一檔案的解碼失敗只會被記錄並計數；批次層級的失敗（沒有可用影像、
//! 輸出串流無法開啟、使用者取消）則以 `PipelineError` 回報給呼叫端。

use std::io;
use std::path::PathBuf;

/// 管線作業的失敗原因
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("無法解碼影像 {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("沒有任何可用的影像（共嘗試 {attempted} 個檔案）")]
    EmptyResult { attempted: usize },

    #[error("無法開啟輸出串流: {reason}")]
    SinkOpen { reason: String },

    #[error("寫入輸出串流失敗: {0}")]
    SinkWrite(#[source] io::Error),

    #[error("輸出串流結束異常: {reason}")]
    SinkClose { reason: String },

    #[error("操作已取消（已完成 {completed}/{total}）")]
    Cancelled { completed: usize, total: usize },

    #[error("已有其他作業進行中: {operation}")]
    Busy { operation: &'static str },

    #[error("匯出工作者在影格 {index} 異常結束")]
    WorkerPanic { index: usize },

    #[error("無效的設定: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// 給 UI 層判斷用的原因代碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    DecodeFailure,
    EmptyResultFailure,
    SinkOpenFailure,
    SinkFailure,
    CancelledFailure,
    Busy,
    InvalidConfig,
    Internal,
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sink_open(reason: impl Into<String>) -> Self {
        Self::SinkOpen {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn reason_code(&self) -> ReasonCode {
        match self {
            Self::Decode { .. } => ReasonCode::DecodeFailure,
            Self::EmptyResult { .. } => ReasonCode::EmptyResultFailure,
            Self::SinkOpen { .. } => ReasonCode::SinkOpenFailure,
            Self::SinkWrite(_) | Self::SinkClose { .. } => ReasonCode::SinkFailure,
            Self::Cancelled { .. } => ReasonCode::CancelledFailure,
            Self::Busy { .. } => ReasonCode::Busy,
            Self::InvalidConfig(_) => ReasonCode::InvalidConfig,
            Self::WorkerPanic { .. } | Self::ThreadPool(_) | Self::Io(_) => ReasonCode::Internal,
        }
    }

    /// 取消不算真正的錯誤，只是另一種結束狀態
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
