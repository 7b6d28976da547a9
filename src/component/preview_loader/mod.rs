//! 平行預覽載入元件
//!
//! 將序列切段交給固定大小的執行緒池解碼並縮小，合併後依序號排序

mod downsample;
mod main;

pub use downsample::{FALLBACK_SHRINK_FACTOR, auto_shrink_factor, downsample};
pub use main::{LoaderOptions, PreviewLoader};
