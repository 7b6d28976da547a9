use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 預覽像素的通道順序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// 一張已解碼的預覽影格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
    pub source_path: PathBuf,
    pub pixels: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub const fn new(index: u64, source_path: PathBuf, pixels: Vec<u8>) -> Self {
        Self {
            index,
            source_path,
            pixels,
        }
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}
