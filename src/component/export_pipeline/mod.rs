//! 高畫質匯出元件
//!
//! 平行解碼原始檔案並套用目前的視圖，依序號寫入輸出串流（預設為 ffmpeg）

mod ffmpeg_command;
mod job;
mod main;
mod progress;
mod renderer;
mod reorder_buffer;
mod sink;
mod view_preset;

pub use ffmpeg_command::FfmpegCommand;
pub use job::{ExportJob, ExportReport};
pub use main::{ExportHandle, ExportPipeline};
pub use progress::{ExportProgress, ExportState, ProgressTracker};
pub use renderer::{black_frame, render_frame};
pub use reorder_buffer::{CANCEL_POLL_INTERVAL, FrameBuffer, ReorderBuffer};
pub use sink::{FfmpegSink, FfmpegSinkFactory, FrameSink, SinkFactory, SinkSpec};
pub use view_preset::{ViewPreset, load_presets};
