use super::job::{ExportJob, ExportReport};
use super::progress::{ExportProgress, ExportState, ProgressTracker};
use super::renderer::{black_frame, render_frame};
use super::reorder_buffer::ReorderBuffer;
use super::sink::{FrameSink, SinkFactory, SinkSpec};
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{ImageDecoder, MemoryMonitor, ViewState, format_bytes};
use log::{debug, error, info, warn};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// 每寫出幾張影格記錄一次進度
const PROGRESS_LOG_INTERVAL: usize = 10;

/// 高畫質匯出管線
///
/// 工作者以原子計數器領取下一個序號，解碼原始檔案並繪製成輸出影格後放進
/// 重排緩衝區；呼叫端執行緒是唯一的寫出者，依序號由小到大寫入輸出串流。
#[derive(Clone)]
pub struct ExportPipeline {
    decoder: Arc<dyn ImageDecoder>,
    sink_factory: Arc<dyn SinkFactory>,
    shutdown_signal: Arc<AtomicBool>,
    live_buffers: Arc<AtomicUsize>,
}

/// 多個工作者共用的唯讀資料與計數器
struct WorkerContext<'a> {
    decoder: &'a dyn ImageDecoder,
    source_paths: &'a [PathBuf],
    view: ViewState,
    job: &'a ExportJob,
    next_to_render: AtomicUsize,
    decode_failures: AtomicUsize,
    live_buffers: Arc<AtomicUsize>,
    buffer: ReorderBuffer,
    shutdown_signal: &'a AtomicBool,
    /// 第一個繪製時異常結束的影格序號
    panicked_frame: OnceLock<usize>,
}

enum WriterOutcome {
    Finished,
    Cancelled,
    SinkFailed(io::Error),
    WorkerPanicked(usize),
}

impl ExportPipeline {
    #[must_use]
    pub fn new(
        decoder: Arc<dyn ImageDecoder>,
        sink_factory: Arc<dyn SinkFactory>,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            decoder,
            sink_factory,
            shutdown_signal,
            live_buffers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 目前尚未釋放的輸出影格數；匯出結束後應為 0
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::SeqCst)
    }

    /// 在目前執行緒執行匯出，直到完成、取消或失敗
    pub fn run(&self, job: &ExportJob) -> PipelineResult<ExportReport> {
        self.run_with_progress(job, &ProgressTracker::new(job.total_frames()))
    }

    /// 在背景執行緒執行匯出
    pub fn spawn(&self, job: ExportJob) -> PipelineResult<ExportHandle> {
        let progress = ProgressTracker::new(job.total_frames());
        let pipeline = self.clone();
        let thread_progress = progress.clone();

        let thread = thread::Builder::new()
            .name("export-writer".to_string())
            .spawn(move || pipeline.run_with_progress(&job, &thread_progress))?;

        Ok(ExportHandle { progress, thread })
    }

    pub fn run_with_progress(
        &self,
        job: &ExportJob,
        progress: &ProgressTracker,
    ) -> PipelineResult<ExportReport> {
        job.validate()?;
        let total = job.total_frames();
        let start = Instant::now();

        self.log_memory_estimate(job);

        let spec = SinkSpec {
            output_path: job.output_path.clone(),
            dimensions: job.output_dims,
            frame_rate: job.frame_rate,
        };
        let mut sink = match self.sink_factory.open(&spec) {
            Ok(sink) => sink,
            Err(e) => {
                error!("無法開啟輸出串流: {e}");
                progress.set_state(ExportState::Failed);
                return Err(e);
            }
        };

        info!(
            "開始匯出 {total} 張影格 → {}（{}x{} @ {} fps，{} 個工作者，緩衝 {}）",
            job.output_path.display(),
            job.output_dims.width,
            job.output_dims.height,
            job.frame_rate,
            job.worker_count,
            job.queue_capacity
        );
        progress.set_state(ExportState::Rendering);

        let context = WorkerContext {
            decoder: self.decoder.as_ref(),
            source_paths: &job.source_paths,
            view: job.render_view(),
            job,
            next_to_render: AtomicUsize::new(0),
            decode_failures: AtomicUsize::new(0),
            live_buffers: Arc::clone(&self.live_buffers),
            buffer: ReorderBuffer::new(job.queue_capacity),
            shutdown_signal: &self.shutdown_signal,
            panicked_frame: OnceLock::new(),
        };

        let outcome = thread::scope(|scope| -> PipelineResult<WriterOutcome> {
            for worker_id in 0..job.worker_count {
                let spawned = thread::Builder::new()
                    .name(format!("export-worker-{worker_id}"))
                    .spawn_scoped(scope, || worker_loop(&context));
                if let Err(e) = spawned {
                    context.buffer.close();
                    return Err(PipelineError::Io(e));
                }
            }

            let outcome = write_loop(&context, sink.as_mut(), progress);
            context.buffer.close();
            Ok(outcome)
        });

        let drained = context.buffer.drain();
        if drained > 0 {
            debug!("釋放 {drained} 張未寫出的影格");
        }

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                progress.set_state(ExportState::Failed);
                close_unfinished(sink);
                return Err(e);
            }
        };

        let written = context.buffer.next_to_write();
        let report = ExportReport {
            output_path: job.output_path.clone(),
            written,
            total,
            decode_failures: context.decode_failures.load(Ordering::SeqCst),
            high_water_mark: context.buffer.high_water_mark(),
            leaked_buffers: context.live_buffers.load(Ordering::SeqCst),
            elapsed: start.elapsed(),
        };

        match outcome {
            WriterOutcome::Finished => {
                if let Err(e) = sink.finish(true) {
                    error!("輸出串流結束失敗: {e}");
                    progress.set_state(ExportState::Failed);
                    return Err(e);
                }
                progress.set_state(ExportState::Complete);
                info!(
                    "匯出完成: {written} 張影格，{} 張解碼失敗，耗時 {:.2}s",
                    report.decode_failures,
                    report.elapsed.as_secs_f64()
                );
                Ok(report)
            }
            WriterOutcome::Cancelled => {
                close_unfinished(sink);
                progress.set_state(ExportState::Cancelled);
                warn!("匯出已取消（{written}/{total}）");
                Err(PipelineError::Cancelled {
                    completed: written,
                    total,
                })
            }
            WriterOutcome::SinkFailed(e) => {
                close_unfinished(sink);
                progress.set_state(ExportState::Failed);
                error!("寫入輸出串流失敗（{written}/{total}）: {e}");
                Err(PipelineError::SinkWrite(e))
            }
            WriterOutcome::WorkerPanicked(index) => {
                close_unfinished(sink);
                progress.set_state(ExportState::Failed);
                error!("匯出中止（{written}/{total}）: 影格 {index} 繪製時異常結束");
                Err(PipelineError::WorkerPanic { index })
            }
        }
    }

    fn log_memory_estimate(&self, job: &ExportJob) {
        let estimate = job.estimated_peak_bytes();
        let mut monitor = MemoryMonitor::new();
        let available = monitor.available_bytes();
        info!(
            "預估匯出記憶體用量 {}（可用 {}）",
            format_bytes(estimate),
            format_bytes(available)
        );
        if !monitor.can_hold(estimate) {
            warn!("預估記憶體用量超過可用記憶體，可減少工作者數或緩衝區容量");
        }
    }
}

fn worker_loop(context: &WorkerContext<'_>) {
    let total = context.source_paths.len();
    loop {
        if context.shutdown_signal.load(Ordering::SeqCst) || context.buffer.is_closed() {
            return;
        }

        let index = context.next_to_render.fetch_add(1, Ordering::SeqCst);
        if index >= total {
            return;
        }

        let path = &context.source_paths[index];
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
            render_frame(
                context.decoder,
                path,
                &context.view,
                context.job.original_dims,
                context.job.output_dims,
                &context.live_buffers,
            )
        }));
        let frame = match rendered {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                warn!("影格 {index} 無法解碼，以黑畫面代替 {}: {e}", path.display());
                context.decode_failures.fetch_add(1, Ordering::SeqCst);
                black_frame(context.job.output_dims, &context.live_buffers)
            }
            Err(payload) => {
                error!(
                    "匯出工作者在影格 {index} 異常結束 {}: {}",
                    path.display(),
                    panic_message(payload.as_ref())
                );
                // 寫出端永遠等不到這個序號，關閉緩衝區讓所有人離開
                let _ = context.panicked_frame.set(index);
                context.buffer.close();
                return;
            }
        };

        if !context.buffer.insert(index, frame, context.shutdown_signal) {
            return;
        }
    }
}

fn write_loop(
    context: &WorkerContext<'_>,
    sink: &mut dyn FrameSink,
    progress: &ProgressTracker,
) -> WriterOutcome {
    let total = context.source_paths.len();
    let mut draining = false;

    for written in 1..=total {
        if !draining && context.next_to_render.load(Ordering::SeqCst) >= total {
            progress.set_state(ExportState::Draining);
            draining = true;
        }

        let Some(frame) = context.buffer.take_next(context.shutdown_signal) else {
            return context
                .panicked_frame
                .get()
                .map_or(WriterOutcome::Cancelled, |&index| {
                    WriterOutcome::WorkerPanicked(index)
                });
        };
        if let Err(e) = sink.write_frame(&frame) {
            return WriterOutcome::SinkFailed(e);
        }
        drop(frame);

        let snapshot = progress.record_written(written);
        if written % PROGRESS_LOG_INTERVAL == 0 || written == total {
            log_progress(&snapshot);
        }
    }

    WriterOutcome::Finished
}

/// 中途結束時關閉輸出串流；關閉失敗只記錄，回傳原本的結果
fn close_unfinished(sink: Box<dyn FrameSink>) {
    if let Err(e) = sink.finish(false) {
        warn!("關閉未完成的輸出串流失敗: {e}");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("未知原因")
}

fn log_progress(progress: &ExportProgress) {
    let eta = progress
        .eta
        .map_or_else(|| "--".to_string(), |eta| format!("{:.0}s", eta.as_secs_f64()));
    info!(
        "匯出進度 {}/{} ({:.1}%)，{:.2} fps，剩餘 {eta}",
        progress.written, progress.total, progress.percent, progress.frames_per_second
    );
}

/// 背景匯出工作
pub struct ExportHandle {
    progress: ProgressTracker,
    thread: JoinHandle<PipelineResult<ExportReport>>,
}

impl ExportHandle {
    #[must_use]
    pub fn progress(&self) -> ExportProgress {
        self.progress.snapshot()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// 等待匯出結束並取得結果
    pub fn join(self) -> PipelineResult<ExportReport> {
        self.thread
            .join()
            .unwrap_or_else(|_| Err(PipelineError::Io(io::Error::other("匯出執行緒異常結束"))))
    }
}
