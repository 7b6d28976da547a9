use super::reorder_buffer::FrameBuffer;
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{
    Dimensions, ImageDecoder, ViewState, render_params_with_reference, render_view_into,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

/// 全黑影格，用於無法解碼的來源
#[must_use]
pub fn black_frame(output: Dimensions, live: &Arc<AtomicUsize>) -> FrameBuffer {
    FrameBuffer::new(vec![0; output.rgb_len()], live)
}

/// 解碼原始檔案並依視圖繪製成輸出解析度的影格
///
/// `view` 的平移量必須已換算為原始影像像素。縮放倍率依 `original_dims` 計算，
/// 未提供時使用這張影格解碼後的尺寸。
pub fn render_frame(
    decoder: &dyn ImageDecoder,
    path: &Path,
    view: &ViewState,
    original_dims: Option<Dimensions>,
    output: Dimensions,
    live: &Arc<AtomicUsize>,
) -> PipelineResult<FrameBuffer> {
    let decoded = decoder.decode(path)?;
    if decoded.pixels.len() != decoded.dimensions.rgb_len() {
        return Err(PipelineError::decode(
            path,
            format!(
                "像素資料長度 {} 與尺寸 {}x{} 不符",
                decoded.pixels.len(),
                decoded.dimensions.width,
                decoded.dimensions.height
            ),
        ));
    }

    let reference = original_dims.unwrap_or(decoded.dimensions);
    let params = render_params_with_reference(view, output, reference, decoded.dimensions);

    let mut buffer = black_frame(output, live);
    render_view_into(
        buffer.as_mut_slice(),
        output,
        &decoded.pixels,
        decoded.dimensions,
        &params,
    );
    Ok(buffer)
}
