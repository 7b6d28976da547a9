//! 預覽影格儲存
//!
//! 保存縮小後的預覽影格、原始檔案清單與目前影格位置。每次載入都整批替換，
//! 不做增量修補。

mod main;
mod preview_set;
mod types;

pub use main::FrameStore;
pub use preview_set::{Layer, PreviewSet};
pub use types::{ChannelOrder, Frame};
