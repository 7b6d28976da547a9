use crate::component::frame_store::ChannelOrder;
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{DecodedImage, Dimensions, ImageDecoder};
use log::{debug, warn};
use std::path::Path;

/// 探測失敗時使用的縮小倍率
pub const FALLBACK_SHRINK_FACTOR: u32 = 4;

/// 每隔 `shrink_factor` 個像素取樣一次（不做平均）
///
/// 輸出尺寸為 `(W div S) × (H div S)`；結果為空時視為解碼失敗。
pub fn downsample(
    decoded: &DecodedImage,
    shrink_factor: u32,
    channel_order: ChannelOrder,
) -> PipelineResult<(Dimensions, Vec<u8>)> {
    let step = shrink_factor.max(1) as usize;
    let src_width = decoded.dimensions.width as usize;
    let dims = Dimensions::new(
        decoded.dimensions.width / shrink_factor.max(1),
        decoded.dimensions.height / shrink_factor.max(1),
    );
    if dims.is_empty() {
        return Err(PipelineError::InvalidConfig(format!(
            "縮小倍率 {shrink_factor} 大於影像尺寸 {}x{}",
            decoded.dimensions.width, decoded.dimensions.height
        )));
    }

    let mut pixels = Vec::with_capacity(dims.rgb_len());
    for y in 0..dims.height as usize {
        let row = y * step * src_width;
        for x in 0..dims.width as usize {
            let idx = (row + x * step) * 3;
            let (r, g, b) = (
                decoded.pixels[idx],
                decoded.pixels[idx + 1],
                decoded.pixels[idx + 2],
            );
            match channel_order {
                ChannelOrder::Rgb => pixels.extend_from_slice(&[r, g, b]),
                ChannelOrder::Bgr => pixels.extend_from_slice(&[b, g, r]),
            }
        }
    }

    Ok((dims, pixels))
}

/// 依視窗大小自動決定縮小倍率
///
/// 取兩軸 `原始尺寸 / (2 × 視窗尺寸)` 的較大者（無條件捨去），最小為 1。
pub fn auto_shrink_factor(decoder: &dyn ImageDecoder, probe_path: &Path, window: Dimensions) -> u32 {
    match decoder.probe(probe_path) {
        Ok(dims) if !dims.is_empty() => {
            let ratio_x = dims.width / (window.width.max(1) * 2);
            let ratio_y = dims.height / (window.height.max(1) * 2);
            let factor = ratio_x.max(ratio_y).max(1);
            debug!(
                "自動縮小倍率: {factor}（影像 {}x{}，視窗 {}x{}）",
                dims.width, dims.height, window.width, window.height
            );
            factor
        }
        Ok(_) => {
            warn!("影像尺寸為 0，使用預設縮小倍率 {FALLBACK_SHRINK_FACTOR}");
            FALLBACK_SHRINK_FACTOR
        }
        Err(e) => {
            warn!("無法讀取影像尺寸，使用預設縮小倍率 {FALLBACK_SHRINK_FACTOR}: {e}");
            FALLBACK_SHRINK_FACTOR
        }
    }
}
