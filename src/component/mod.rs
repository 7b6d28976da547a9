//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod export_pipeline;
pub mod frame_store;
pub mod preview_loader;
pub mod viewer_session;

pub use export_pipeline::{ExportHandle, ExportJob, ExportPipeline, ExportReport};
pub use frame_store::{ChannelOrder, Frame, FrameStore, PreviewSet};
pub use preview_loader::{LoaderOptions, PreviewLoader};
pub use viewer_session::{LoadSummary, ViewerSession};
