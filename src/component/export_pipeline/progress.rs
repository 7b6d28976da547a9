use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// 匯出工作的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Rendering,
    /// 所有影格已排程，正在等待最後幾張寫出
    Draining,
    Complete,
    Cancelled,
    Failed,
}

impl ExportState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "等待中",
            Self::Rendering => "繪製中",
            Self::Draining => "收尾中",
            Self::Complete => "完成",
            Self::Cancelled => "已取消",
            Self::Failed => "失敗",
        };
        write!(f, "{label}")
    }
}

/// 匯出進度快照，僅供顯示
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportProgress {
    pub state: ExportState,
    pub written: usize,
    pub total: usize,
    pub percent: f64,
    pub frames_per_second: f64,
    pub eta: Option<Duration>,
    pub elapsed: Duration,
}

impl ExportProgress {
    /// 依已寫出數量與經過時間計算百分比、速率與剩餘時間
    #[must_use]
    pub fn compute(state: ExportState, written: usize, total: usize, elapsed: Duration) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            100.0 * written as f64 / total as f64
        };
        let seconds = elapsed.as_secs_f64();
        let frames_per_second = if seconds > 0.0 {
            written as f64 / seconds
        } else {
            0.0
        };
        let eta = (frames_per_second > 0.0).then(|| {
            Duration::from_secs_f64(total.saturating_sub(written) as f64 / frames_per_second)
        });

        Self {
            state,
            written,
            total,
            percent,
            frames_per_second,
            eta,
            elapsed,
        }
    }
}

/// 在寫出執行緒與 UI 之間共用的進度
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ExportProgress>>,
    started: Instant,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ExportProgress {
                total,
                ..ExportProgress::default()
            })),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ExportProgress {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_state(&self, state: ExportState) {
        let mut progress = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        progress.state = state;
        progress.elapsed = self.started.elapsed();
    }

    pub fn record_written(&self, written: usize) -> ExportProgress {
        let mut progress = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *progress =
            ExportProgress::compute(progress.state, written, progress.total, self.started.elapsed());
        progress.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_progress() {
        let progress =
            ExportProgress::compute(ExportState::Rendering, 25, 100, Duration::from_secs(5));
        assert!((progress.percent - 25.0).abs() < 1e-9);
        assert!((progress.frames_per_second - 5.0).abs() < 1e-9);
        assert_eq!(progress.eta, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_compute_progress_degenerate() {
        let progress = ExportProgress::compute(ExportState::Complete, 0, 0, Duration::ZERO);
        assert_eq!(progress.percent, 100.0);
        assert_eq!(progress.frames_per_second, 0.0);
        assert!(progress.eta.is_none());
    }

    #[test]
    fn test_tracker_shared_between_clones() {
        let tracker = ProgressTracker::new(10);
        let observer = tracker.clone();
        tracker.set_state(ExportState::Rendering);
        tracker.record_written(4);

        let snapshot = observer.snapshot();
        assert_eq!(snapshot.state, ExportState::Rendering);
        assert_eq!(snapshot.written, 4);
        assert_eq!(snapshot.total, 10);
        assert!(ExportState::Cancelled.is_terminal());
        assert!(!ExportState::Draining.is_terminal());
    }
}
