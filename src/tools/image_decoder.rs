//! 影像解碼服務
//!
//! 管線只依賴 `ImageDecoder` 這個介面：完整解碼為 RGB，或只讀取檔頭取得尺寸。
//! 預設實作使用 `image` crate。

use crate::error::{PipelineError, PipelineResult};
use crate::tools::view_math::Dimensions;
use log::debug;
use std::path::Path;

/// 解碼後的 RGB 影像（每像素 3 位元組，由上而下）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub dimensions: Dimensions,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(dimensions: Dimensions, pixels: Vec<u8>) -> PipelineResult<Self> {
        if pixels.len() != dimensions.rgb_len() {
            return Err(PipelineError::InvalidConfig(format!(
                "像素資料長度 {} 與尺寸 {}x{} 不符",
                pixels.len(),
                dimensions.width,
                dimensions.height
            )));
        }
        Ok(Self { dimensions, pixels })
    }
}

/// 影像解碼介面，必須可在多個執行緒間共用
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> PipelineResult<DecodedImage>;

    /// 只讀取尺寸，不做完整解碼
    fn probe(&self, path: &Path) -> PipelineResult<Dimensions>;
}

/// 使用 `image` crate 的解碼器
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> PipelineResult<DecodedImage> {
        let image = image::open(path).map_err(|e| PipelineError::decode(path, e))?;
        let rgb = image.into_rgb8();
        let dimensions = Dimensions::new(rgb.width(), rgb.height());
        debug!(
            "解碼完成 {}: {}x{}",
            path.display(),
            dimensions.width,
            dimensions.height
        );
        Ok(DecodedImage {
            dimensions,
            pixels: rgb.into_raw(),
        })
    }

    fn probe(&self, path: &Path) -> PipelineResult<Dimensions> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| PipelineError::decode(path, e))?;
        Ok(Dimensions::new(width, height))
    }
}
