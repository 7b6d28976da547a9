use crate::tools::{Dimensions, ZoomLimits};
use serde::{Deserialize, Serialize};

pub const MAX_RECENT_PATHS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    English,
    #[serde(rename = "zh-TW")]
    TraditionalChinese,
}

impl Language {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::TraditionalChinese => "zh-TW",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::TraditionalChinese => "繁體中文",
        }
    }
}

/// 傳給 ffmpeg 的 x264 編碼參數
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub crf: u8,
    pub preset: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            crf: 18,
            preset: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub window_width: u32,
    pub window_height: u32,
    /// 0 代表依視窗大小自動決定
    pub shrink_factor: u32,
    pub nth_frame: usize,
    /// 0 代表使用全部 CPU
    pub thread_count: usize,
    pub frame_rate: u32,
    pub output_width: Option<u32>,
    pub output_height: Option<u32>,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub encoder: EncoderSettings,
    /// 重排緩衝區容量 = 倍數 × 工作者數
    pub queue_multiplier: usize,
    pub language: Language,
    pub recent_paths: Vec<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            window_width: 1000,
            window_height: 1000,
            shrink_factor: 0,
            nth_frame: 1,
            thread_count: 12,
            frame_rate: 30,
            output_width: None,
            output_height: None,
            min_zoom: 1.0,
            max_zoom: 10.0,
            encoder: EncoderSettings::default(),
            queue_multiplier: 2,
            language: Language::default(),
            recent_paths: Vec::new(),
        }
    }
}

impl UserSettings {
    #[must_use]
    pub const fn window_dims(&self) -> Dimensions {
        Dimensions::new(self.window_width, self.window_height)
    }

    /// 輸出解析度，未設定的軸使用視窗大小
    #[must_use]
    pub fn output_dims(&self) -> Dimensions {
        Dimensions::new(
            self.output_width.unwrap_or(self.window_width),
            self.output_height.unwrap_or(self.window_height),
        )
    }

    #[must_use]
    pub fn zoom_limits(&self) -> ZoomLimits {
        let min = self.min_zoom.max(f64::MIN_POSITIVE);
        ZoomLimits {
            min,
            max: self.max_zoom.max(min),
        }
    }

    /// 實際使用的執行緒數；設定為 0 時使用 `available_cpus`
    #[must_use]
    pub fn effective_threads(&self, available_cpus: usize) -> usize {
        if self.thread_count == 0 {
            available_cpus.max(1)
        } else {
            self.thread_count
        }
    }

    #[must_use]
    pub fn queue_capacity(&self, workers: usize) -> usize {
        (self.queue_multiplier.max(1) * workers.max(1)).max(1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: UserSettings,
}
