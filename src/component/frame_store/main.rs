use super::types::{ChannelOrder, Frame};
use crate::tools::{Dimensions, PlayDirection};
use std::path::PathBuf;

/// 一次載入的結果：依序號排序的預覽影格與完整的原始檔案清單
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Vec<Frame>,
    all_source_paths: Vec<PathBuf>,
    image_dims: Dimensions,
    original_dims: Dimensions,
    shrink_factor: u32,
    channel_order: ChannelOrder,
    current_frame: usize,
}

impl FrameStore {
    /// 建立影格儲存
    ///
    /// 影格會依序號排序並去除重複序號，像素長度與 `image_dims` 不符的影格會被捨棄。
    #[must_use]
    pub fn new(
        mut frames: Vec<Frame>,
        all_source_paths: Vec<PathBuf>,
        image_dims: Dimensions,
        shrink_factor: u32,
        channel_order: ChannelOrder,
    ) -> Self {
        let expected_len = image_dims.rgb_len();
        frames.retain(|frame| frame.pixels.len() == expected_len);
        frames.sort_by_key(|frame| frame.index);
        frames.dedup_by_key(|frame| frame.index);

        let shrink_factor = shrink_factor.max(1);
        let original_dims = Dimensions::new(
            image_dims.width * shrink_factor,
            image_dims.height * shrink_factor,
        );

        Self {
            frames,
            all_source_paths,
            image_dims,
            original_dims,
            shrink_factor,
            channel_order,
            current_frame: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn all_source_paths(&self) -> &[PathBuf] {
        &self.all_source_paths
    }

    /// 預覽（縮小後）尺寸
    #[must_use]
    pub const fn image_dims(&self) -> Dimensions {
        self.image_dims
    }

    /// 原始尺寸，等於預覽尺寸乘上縮小倍率
    #[must_use]
    pub const fn original_dims(&self) -> Dimensions {
        self.original_dims
    }

    #[must_use]
    pub const fn shrink_factor(&self) -> u32 {
        self.shrink_factor
    }

    #[must_use]
    pub const fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_frame
    }

    #[must_use]
    pub fn current(&self) -> Option<&Frame> {
        self.frames.get(self.current_frame)
    }

    /// 所有預覽像素佔用的位元組數
    #[must_use]
    pub fn resident_bytes(&self) -> usize {
        self.frames.iter().map(Frame::byte_len).sum()
    }

    pub fn set_current(&mut self, position: usize) {
        self.current_frame = position.min(self.frames.len().saturating_sub(1));
    }

    pub fn next_frame(&mut self) {
        self.set_current(self.current_frame + 1);
    }

    pub fn previous_frame(&mut self) {
        self.set_current(self.current_frame.saturating_sub(1));
    }

    pub fn first_frame(&mut self) {
        self.current_frame = 0;
    }

    pub fn last_frame(&mut self) {
        self.set_current(usize::MAX);
    }

    /// 播放時前進一格，到尾端會繞回另一端
    pub fn advance(&mut self, direction: PlayDirection) {
        let len = self.frames.len();
        if len == 0 {
            return;
        }
        self.current_frame = match direction {
            PlayDirection::Forward => (self.current_frame + 1) % len,
            PlayDirection::Backward => (self.current_frame + len - 1) % len,
        };
    }

    /// 釋放所有影格
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
