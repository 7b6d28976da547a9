//! 輸出串流介面
//!
//! 管線依序寫入固定大小的 rgb24 影格，最後呼叫 `finish`。編碼細節由實作負責。

use super::ffmpeg_command::FfmpegCommand;
use crate::config::EncoderSettings;
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{Dimensions, ensure_parent_directory};
use log::{debug, info, warn};
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Stdio};

/// 開啟輸出串流時指定的固定格式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    pub output_path: PathBuf,
    pub dimensions: Dimensions,
    pub frame_rate: u32,
}

impl SinkSpec {
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.dimensions.rgb_len()
    }
}

pub trait FrameSink: Send {
    /// 寫入一張完整影格（`width × height × 3` 位元組）
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// 關閉串流；`completed` 為 false 時代表工作沒有完整結束
    fn finish(self: Box<Self>, completed: bool) -> PipelineResult<()>;
}

pub trait SinkFactory: Send + Sync {
    fn open(&self, spec: &SinkSpec) -> PipelineResult<Box<dyn FrameSink>>;
}

/// 以 ffmpeg 子程序編碼的輸出
#[derive(Debug, Clone, Default)]
pub struct FfmpegSinkFactory {
    encoder: EncoderSettings,
}

impl FfmpegSinkFactory {
    #[must_use]
    pub const fn new(encoder: EncoderSettings) -> Self {
        Self { encoder }
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn open(&self, spec: &SinkSpec) -> PipelineResult<Box<dyn FrameSink>> {
        if spec.dimensions.is_empty() {
            return Err(PipelineError::sink_open("輸出解析度不可為 0"));
        }
        ensure_parent_directory(&spec.output_path)
            .map_err(|e| PipelineError::sink_open(format!("{e:#}")))?;

        let command = FfmpegCommand::new(
            &spec.output_path,
            spec.dimensions,
            spec.frame_rate,
            &self.encoder,
        );
        let mut child = command
            .build_command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PipelineError::sink_open(format!("無法啟動 ffmpeg: {e}")))?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PipelineError::sink_open("無法取得 ffmpeg 標準輸入"));
        };

        info!(
            "ffmpeg 已啟動: {} ({}x{} @ {} fps)",
            spec.output_path.display(),
            spec.dimensions.width,
            spec.dimensions.height,
            spec.frame_rate
        );

        Ok(Box::new(FfmpegSink {
            child,
            stdin: BufWriter::new(stdin),
            frame_len: spec.frame_len(),
        }))
    }
}

pub struct FfmpegSink {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    frame_len: usize,
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if frame.len() != self.frame_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("影格大小 {} 與預期 {} 不符", frame.len(), self.frame_len),
            ));
        }
        self.stdin.write_all(frame)
    }

    fn finish(self: Box<Self>, completed: bool) -> PipelineResult<()> {
        let Self {
            mut child, stdin, ..
        } = *self;

        // 關閉標準輸入讓 ffmpeg 結束
        let flushed = stdin.into_inner().map(drop).map_err(|e| e.into_error());

        let mut stderr_output = String::new();
        if let Some(mut stderr) = child.stderr.take() {
            let _ = stderr.read_to_string(&mut stderr_output);
        }
        let status = child.wait()?;
        debug!("ffmpeg 結束: {status}");

        if !completed {
            warn!("匯出未完成，保留部分輸出檔案");
            return Ok(());
        }

        flushed.map_err(PipelineError::SinkWrite)?;
        if !status.success() {
            return Err(PipelineError::SinkClose {
                reason: format!("ffmpeg 結束代碼 {status}: {}", stderr_output.trim()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len() {
        let spec = SinkSpec {
            output_path: PathBuf::from("out.mp4"),
            dimensions: Dimensions::new(100, 100),
            frame_rate: 30,
        };
        assert_eq!(spec.frame_len(), 30000);
    }

    #[test]
    fn test_ffmpeg_factory_rejects_empty_dimensions() {
        let spec = SinkSpec {
            output_path: PathBuf::from("out.mp4"),
            dimensions: Dimensions::new(0, 100),
            frame_rate: 30,
        };
        let err = FfmpegSinkFactory::default().open(&spec).err().unwrap();
        assert!(matches!(err, PipelineError::SinkOpen { .. }));
    }
}
