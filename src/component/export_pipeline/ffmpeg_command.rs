use crate::config::EncoderSettings;
use crate::tools::Dimensions;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 從標準輸入讀取 rgb24 原始影格並以 libx264 編碼的 ffmpeg 指令
pub struct FfmpegCommand {
    destination_path: PathBuf,
    dimensions: Dimensions,
    frame_rate: u32,
    encoder: EncoderSettings,
}

impl FfmpegCommand {
    #[must_use]
    pub fn new(
        destination_path: &Path,
        dimensions: Dimensions,
        frame_rate: u32,
        encoder: &EncoderSettings,
    ) -> Self {
        Self {
            destination_path: destination_path.to_path_buf(),
            dimensions,
            frame_rate: frame_rate.max(1),
            encoder: encoder.clone(),
        }
    }

    #[must_use]
    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    #[must_use]
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pixel_format",
            "rgb24",
            "-video_size",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        args.push(format!(
            "{}x{}",
            self.dimensions.width, self.dimensions.height
        ));
        args.extend(["-framerate".to_string(), self.frame_rate.to_string()]);
        args.extend(["-i".to_string(), "-".to_string()]);

        // yuv420p 需要偶數寬高
        if self.dimensions.width % 2 != 0 || self.dimensions.height % 2 != 0 {
            args.extend([
                "-vf".to_string(),
                "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string(),
            ]);
        }

        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            self.encoder.preset.clone(),
            "-crf".to_string(),
            self.encoder.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);
        args.push(self.destination_path.display().to_string());
        args
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(self.build_args());
        cmd
    }
}
