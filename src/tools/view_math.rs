//! 縮放與平移的視圖計算
//!
//! 純函式，不做 I/O。預覽畫面與高畫質匯出共用 `render_params` 和
//! `render_view_into`，兩者對同一組參數會得到逐位元相同的結果。

use serde::{Deserialize, Serialize};

/// 影像或視窗尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGB 緩衝區所需的位元組數
    #[must_use]
    pub const fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// 播放方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayDirection {
    #[default]
    Forward,
    Backward,
}

impl PlayDirection {
    #[must_use]
    pub const fn step(self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// 目前的視圖狀態
///
/// `pan_x`/`pan_y` 以預覽影像像素為單位；1.0 的 `zoom_level` 代表剛好填滿視窗。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub zoom_level: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub is_playing: bool,
    pub play_direction: PlayDirection,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom_level: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            is_playing: false,
            play_direction: PlayDirection::Forward,
        }
    }
}

impl ViewState {
    /// 恢復為不縮放、不平移，播放狀態保留
    pub fn reset(&mut self) {
        self.zoom_level = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// 平移量換算到另一個解析度（例如預覽縮小倍率）
    #[must_use]
    pub fn with_pan_scaled(&self, factor: f64) -> Self {
        Self {
            pan_x: self.pan_x * factor,
            pan_y: self.pan_y * factor,
            ..*self
        }
    }
}

/// 縮放上下限
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 10.0,
        }
    }
}

/// 整數像素矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// 一次繪製所需的全部參數
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub scale: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub visible_width: f64,
    pub visible_height: f64,
    /// 影像中可見的區域（已限制在影像範圍內）
    pub src: PixelRect,
    /// 該區域在輸出畫面中的位置
    pub dst: PixelRect,
}

/// 讓影像剛好放進視窗的倍率；影像尺寸為 0 時回傳 1.0
#[must_use]
pub fn fit_scale(window: Dimensions, image: Dimensions) -> f64 {
    if image.is_empty() {
        return 1.0;
    }
    let scale_x = f64::from(window.width) / f64::from(image.width);
    let scale_y = f64::from(window.height) / f64::from(image.height);
    scale_x.min(scale_y)
}

fn current_scale(view: &ViewState, window: Dimensions, image: Dimensions) -> f64 {
    fit_scale(window, image) * view.zoom_level
}

/// 限制平移量，避免露出影像外的空白區域
pub fn clamp_pan(view: &mut ViewState, window: Dimensions, image: Dimensions) {
    let scale = current_scale(view, window, image);
    let visible_width = f64::from(window.width) / scale;
    let visible_height = f64::from(window.height) / scale;

    let max_pan_x = ((f64::from(image.width) - visible_width) / 2.0).max(0.0);
    let max_pan_y = ((f64::from(image.height) - visible_height) / 2.0).max(0.0);

    view.pan_x = view.pan_x.clamp(-max_pan_x, max_pan_x);
    view.pan_y = view.pan_y.clamp(-max_pan_y, max_pan_y);
}

/// 以 `anchor`（視窗座標）為中心縮放，錨點下的影像位置保持不動
pub fn apply_zoom(
    view: &mut ViewState,
    limits: ZoomLimits,
    window: Dimensions,
    image: Dimensions,
    anchor: (f64, f64),
    factor: f64,
) {
    let (anchor_x, anchor_y) = anchor;
    let half_w = f64::from(window.width) / 2.0;
    let half_h = f64::from(window.height) / 2.0;
    let old_scale = current_scale(view, window, image);

    let image_x = (anchor_x - half_w) / old_scale + f64::from(image.width) / 2.0 + view.pan_x;
    let image_y = (anchor_y - half_h) / old_scale + f64::from(image.height) / 2.0 + view.pan_y;

    view.zoom_level = (view.zoom_level * factor).clamp(limits.min, limits.max);
    let new_scale = current_scale(view, window, image);

    view.pan_x = image_x - f64::from(image.width) / 2.0 - (anchor_x - half_w) / new_scale;
    view.pan_y = image_y - f64::from(image.height) / 2.0 - (anchor_y - half_h) / new_scale;

    clamp_pan(view, window, image);
}

/// 累加視窗像素位移（換算為影像像素）到平移量
///
/// 拖曳時傳入「上一個滑鼠位置 − 目前位置」，影像會跟著滑鼠移動。
pub fn apply_pan(
    view: &mut ViewState,
    window: Dimensions,
    image: Dimensions,
    delta: (f64, f64),
) {
    let scale = current_scale(view, window, image);
    view.pan_x += delta.0 / scale;
    view.pan_y += delta.1 / scale;
    clamp_pan(view, window, image);
}

/// 計算來源與目的矩形
#[must_use]
pub fn render_params(view: &ViewState, window: Dimensions, image: Dimensions) -> RenderParams {
    render_params_with_reference(view, window, image, image)
}

/// 縮放倍率依 `reference` 尺寸計算，中心與邊界依實際的 `image` 尺寸計算
///
/// 匯出時 `reference` 是預覽尺寸 × 縮小倍率，讓原始尺寸不是倍率整數倍的影像
/// 也得到和預覽相同的倍率。
#[must_use]
pub fn render_params_with_reference(
    view: &ViewState,
    window: Dimensions,
    reference: Dimensions,
    image: Dimensions,
) -> RenderParams {
    let scale = current_scale(view, window, reference);
    let visible_width = f64::from(window.width) / scale;
    let visible_height = f64::from(window.height) / scale;
    let center_x = f64::from(image.width) / 2.0 + view.pan_x;
    let center_y = f64::from(image.height) / 2.0 + view.pan_y;

    let origin_x = center_x - visible_width / 2.0;
    let origin_y = center_y - visible_height / 2.0;

    let mut src = PixelRect {
        x: origin_x as i64,
        y: origin_y as i64,
        w: visible_width as i64,
        h: visible_height as i64,
    };
    src.x = src.x.max(0);
    src.y = src.y.max(0);
    src.w = src.w.min(i64::from(image.width) - src.x).max(0);
    src.h = src.h.min(i64::from(image.height) - src.y).max(0);

    let dst = PixelRect {
        x: ((src.x as f64 - origin_x) * scale) as i64,
        y: ((src.y as f64 - origin_y) * scale) as i64,
        w: (src.w as f64 * scale) as i64,
        h: (src.h as f64 * scale) as i64,
    };

    RenderParams {
        scale,
        center_x,
        center_y,
        visible_width,
        visible_height,
        src,
        dst,
    }
}

/// 以最近鄰取樣把 `source` 依 `params` 繪製到 `target`
///
/// `target` 必須是 `output` 大小的 3 通道緩衝區且已清為黑色；目的矩形之外
/// 或對應到影像之外的像素保持黑色。
pub fn render_view_into(
    target: &mut [u8],
    output: Dimensions,
    source: &[u8],
    image: Dimensions,
    params: &RenderParams,
) {
    debug_assert_eq!(target.len(), output.rgb_len());
    debug_assert_eq!(source.len(), image.rgb_len());

    if image.is_empty() || output.is_empty() || params.scale <= 0.0 {
        return;
    }

    let out_w = i64::from(output.width);
    let out_h = i64::from(output.height);
    let img_w = i64::from(image.width);
    let img_h = i64::from(image.height);
    let half_w = f64::from(output.width) / 2.0;
    let half_h = f64::from(output.height) / 2.0;

    let row_start = params.dst.y.max(0);
    let row_end = (params.dst.y + params.dst.h).min(out_h);
    let col_start = params.dst.x.max(0);
    let col_end = (params.dst.x + params.dst.w).min(out_w);

    for out_y in row_start..row_end {
        let src_y = ((out_y as f64 - half_h) / params.scale + params.center_y).floor() as i64;
        if src_y < 0 || src_y >= img_h {
            continue;
        }
        let src_row = (src_y * img_w) as usize * 3;
        let dst_row = (out_y * out_w) as usize * 3;

        for out_x in col_start..col_end {
            let src_x = ((out_x as f64 - half_w) / params.scale + params.center_x).floor() as i64;
            if src_x < 0 || src_x >= img_w {
                continue;
            }
            let src_idx = src_row + src_x as usize * 3;
            let dst_idx = dst_row + out_x as usize * 3;
            target[dst_idx..dst_idx + 3].copy_from_slice(&source[src_idx..src_idx + 3]);
        }
    }
}
