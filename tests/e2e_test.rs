//! E2E Integration Tests
//!
//! 以合成解碼器與記錄用輸出串流驗證匯出管線的順序、記憶體上限、取消與失敗處理

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use image_sequence_viewer::component::export_pipeline::{
    ExportJob, ExportPipeline, ExportState, FrameSink, SinkFactory, SinkSpec,
};
use image_sequence_viewer::error::{PipelineError, PipelineResult, ReasonCode};
use image_sequence_viewer::tools::{DecodedImage, Dimensions, ImageDecoder, ViewState, extract_index};

const FRAME_DIMS: Dimensions = Dimensions::new(8, 8);

/// 依檔名序號產生純色影像，並加入不規則的解碼延遲
///
/// 檔名以 `bad` 開頭時解碼失敗，以 `panic` 開頭時解碼器直接 panic。
#[derive(Default)]
struct JitterDecoder {
    decoded: AtomicUsize,
}

impl ImageDecoder for JitterDecoder {
    fn decode(&self, path: &Path) -> PipelineResult<DecodedImage> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        let index = extract_index(&name).unwrap();
        self.decoded.fetch_add(1, Ordering::SeqCst);

        thread::sleep(Duration::from_micros((index * 7919 % 5) * 300));
        if name.starts_with("bad") {
            return Err(PipelineError::decode(path, "synthetic failure"));
        }
        if name.starts_with("panic") {
            panic!("decoder crashed on {name}");
        }

        let value = (index % 251 + 1) as u8;
        DecodedImage::new(FRAME_DIMS, vec![value; FRAME_DIMS.rgb_len()])
    }

    fn probe(&self, _path: &Path) -> PipelineResult<Dimensions> {
        Ok(FRAME_DIMS)
    }
}

fn expected_value(index: usize) -> u8 {
    (index % 251 + 1) as u8
}

#[derive(Clone, Default)]
struct SinkBehavior {
    write_delay: Option<Duration>,
    fail_at: Option<usize>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
    fail_open: bool,
    fail_finish: bool,
}

/// 記錄每張影格的第一個位元組與結束狀態
#[derive(Clone, Default)]
struct TestSinkFactory {
    behavior: SinkBehavior,
    written: Arc<Mutex<Vec<u8>>>,
    finished: Arc<Mutex<Vec<bool>>>,
}

struct TestSink {
    behavior: SinkBehavior,
    frame_len: usize,
    written: Arc<Mutex<Vec<u8>>>,
    finished: Arc<Mutex<Vec<bool>>>,
}

impl SinkFactory for TestSinkFactory {
    fn open(&self, spec: &SinkSpec) -> PipelineResult<Box<dyn FrameSink>> {
        if self.behavior.fail_open {
            return Err(PipelineError::sink_open("encoder not available"));
        }
        Ok(Box::new(TestSink {
            behavior: self.behavior.clone(),
            frame_len: spec.frame_len(),
            written: Arc::clone(&self.written),
            finished: Arc::clone(&self.finished),
        }))
    }
}

impl FrameSink for TestSink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        assert_eq!(frame.len(), self.frame_len);
        let count = self.written.lock().unwrap().len();
        if self.behavior.fail_at == Some(count) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        if let Some(delay) = self.behavior.write_delay {
            thread::sleep(delay);
        }
        self.written.lock().unwrap().push(frame[0]);
        if let Some((after, flag)) = &self.behavior.cancel_after
            && count + 1 == *after
        {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, completed: bool) -> PipelineResult<()> {
        self.finished.lock().unwrap().push(completed);
        if self.behavior.fail_finish {
            return Err(PipelineError::SinkClose {
                reason: "encoder exited with status 1".to_string(),
            });
        }
        Ok(())
    }
}

fn source_paths(count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("/synthetic/frame_{i:05}.png")))
        .collect()
}

fn job(paths: Vec<PathBuf>, workers: usize) -> ExportJob {
    ExportJob::new(
        paths,
        PathBuf::from("/synthetic/out.mp4"),
        FRAME_DIMS,
        30,
        ViewState::default(),
        1,
        workers,
    )
}

struct Harness {
    decoder: Arc<JitterDecoder>,
    factory: TestSinkFactory,
    shutdown: Arc<AtomicBool>,
    pipeline: ExportPipeline,
}

fn harness(behavior: SinkBehavior, shutdown: Arc<AtomicBool>) -> Harness {
    let decoder = Arc::new(JitterDecoder::default());
    let factory = TestSinkFactory {
        behavior,
        ..TestSinkFactory::default()
    };
    let pipeline = ExportPipeline::new(
        Arc::clone(&decoder) as Arc<dyn ImageDecoder>,
        Arc::new(factory.clone()),
        Arc::clone(&shutdown),
    );
    Harness {
        decoder,
        factory,
        shutdown,
        pipeline,
    }
}

/// 測試不同工作者數與影格數時，寫出順序一定是 0..N
#[test]
fn test_export_order_for_any_worker_count() {
    for workers in [1, 2, 3, 4, 8] {
        for count in [0, 1, 2, 7, 50] {
            let h = harness(SinkBehavior::default(), Arc::new(AtomicBool::new(false)));
            let job = job(source_paths(count), workers);
            let capacity = job.queue_capacity;

            let report = h.pipeline.run(&job).unwrap();
            assert_eq!(report.written, count);
            assert_eq!(report.total, count);
            assert_eq!(report.leaked_buffers, 0);
            assert!(report.high_water_mark <= capacity);

            let expected: Vec<u8> = (0..count).map(expected_value).collect();
            assert_eq!(
                *h.factory.written.lock().unwrap(),
                expected,
                "workers={workers} count={count}"
            );
            assert_eq!(*h.factory.finished.lock().unwrap(), vec![true]);
            assert_eq!(h.decoder.decoded.load(Ordering::SeqCst), count);
            assert_eq!(h.pipeline.live_buffers(), 0);
        }
    }
}

/// 測試緩慢的輸出串流讓工作者停下來，而不是讓緩衝區無限增長
#[test]
fn test_reorder_buffer_stays_bounded_with_slow_sink() {
    let behavior = SinkBehavior {
        write_delay: Some(Duration::from_millis(5)),
        ..SinkBehavior::default()
    };
    let h = harness(behavior, Arc::new(AtomicBool::new(false)));
    let job = job(source_paths(30), 4).with_queue_capacity(3);

    let report = h.pipeline.run(&job).unwrap();
    assert_eq!(report.written, 30);
    assert_eq!(report.high_water_mark, 3);
    assert_eq!(report.leaked_buffers, 0);

    let expected: Vec<u8> = (0..30).map(expected_value).collect();
    assert_eq!(*h.factory.written.lock().unwrap(), expected);
}

/// 測試匯出途中取消：回傳 Cancelled，所有緩衝區都被釋放
#[test]
fn test_cancel_mid_export_frees_all_buffers() {
    let shutdown = Arc::new(AtomicBool::new(false));
    let behavior = SinkBehavior {
        write_delay: Some(Duration::from_millis(2)),
        cancel_after: Some((10, Arc::clone(&shutdown))),
        ..SinkBehavior::default()
    };
    let h = harness(behavior, shutdown);
    let job = job(source_paths(200), 4);
    let capacity = job.queue_capacity;

    let err = h.pipeline.run(&job).unwrap_err();
    let (completed, total) = match err {
        PipelineError::Cancelled { completed, total } => (completed, total),
        other => panic!("預期為取消，實際為 {other:?}"),
    };
    assert_eq!(total, 200);
    assert!(completed >= 10);
    assert!(completed <= 10 + capacity);
    assert_eq!(h.pipeline.live_buffers(), 0);
    assert_eq!(*h.factory.finished.lock().unwrap(), vec![false]);

    // 已寫出的部分仍然是依序的
    let written = h.factory.written.lock().unwrap().clone();
    let expected: Vec<u8> = (0..written.len()).map(expected_value).collect();
    assert_eq!(written, expected);
    assert!(h.decoder.decoded.load(Ordering::SeqCst) < 200);
}

/// 測試背景匯出的進度狀態
#[test]
fn test_background_export_states() {
    let h = harness(SinkBehavior::default(), Arc::new(AtomicBool::new(false)));
    let handle = h.pipeline.spawn(job(source_paths(20), 3)).unwrap();
    while !handle.is_finished() {
        thread::sleep(Duration::from_millis(5));
    }

    let progress = handle.progress();
    assert_eq!(progress.state, ExportState::Complete);
    assert_eq!(progress.written, 20);
    assert!((progress.percent - 100.0).abs() < 1e-9);

    let report = handle.join().unwrap();
    assert_eq!(report.written, 20);
}

/// 測試背景匯出被取消後停在 Cancelled 狀態
#[test]
fn test_background_export_cancelled_state() {
    let shutdown = Arc::new(AtomicBool::new(false));
    let behavior = SinkBehavior {
        write_delay: Some(Duration::from_millis(2)),
        ..SinkBehavior::default()
    };
    let h = harness(behavior, Arc::clone(&shutdown));
    let handle = h.pipeline.spawn(job(source_paths(500), 2)).unwrap();

    while handle.progress().written < 5 {
        thread::sleep(Duration::from_millis(1));
    }
    h.shutdown.store(true, Ordering::SeqCst);
    while !handle.is_finished() {
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(handle.progress().state, ExportState::Cancelled);
    let err = handle.join().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.reason_code(), ReasonCode::CancelledFailure);
    assert_eq!(h.pipeline.live_buffers(), 0);
}

/// 測試無法開啟輸出串流時，不會解碼任何影格
#[test]
fn test_sink_open_failure_before_rendering() {
    let behavior = SinkBehavior {
        fail_open: true,
        ..SinkBehavior::default()
    };
    let h = harness(behavior, Arc::new(AtomicBool::new(false)));

    let err = h.pipeline.run(&job(source_paths(10), 4)).unwrap_err();
    assert!(matches!(err, PipelineError::SinkOpen { .. }));
    assert_eq!(err.reason_code(), ReasonCode::SinkOpenFailure);
    assert_eq!(h.decoder.decoded.load(Ordering::SeqCst), 0);
    assert!(h.factory.finished.lock().unwrap().is_empty());
}

/// 測試寫入失敗時中止並釋放緩衝區
#[test]
fn test_sink_write_failure_aborts_export() {
    let behavior = SinkBehavior {
        fail_at: Some(5),
        ..SinkBehavior::default()
    };
    let h = harness(behavior, Arc::new(AtomicBool::new(false)));

    let err = h.pipeline.run(&job(source_paths(40), 4)).unwrap_err();
    assert!(matches!(err, PipelineError::SinkWrite(_)));
    assert_eq!(err.reason_code(), ReasonCode::SinkFailure);
    assert_eq!(h.factory.written.lock().unwrap().len(), 5);
    assert_eq!(*h.factory.finished.lock().unwrap(), vec![false]);
    assert_eq!(h.pipeline.live_buffers(), 0);
}

/// 測試無法解碼的來源以黑畫面寫出，其餘影格不受影響
#[test]
fn test_decode_failure_writes_black_frame() {
    let h = harness(SinkBehavior::default(), Arc::new(AtomicBool::new(false)));
    let mut paths = source_paths(6);
    paths[3] = PathBuf::from("/synthetic/bad_00003.png");

    let report = h.pipeline.run(&job(paths, 3)).unwrap();
    assert_eq!(report.written, 6);
    assert_eq!(report.decode_failures, 1);

    let written = h.factory.written.lock().unwrap().clone();
    assert_eq!(written, vec![1, 2, 3, 0, 5, 6]);
}

/// 測試無效的匯出設定在開啟輸出串流前就被拒絕
#[test]
fn test_invalid_job_rejected() {
    let h = harness(SinkBehavior::default(), Arc::new(AtomicBool::new(false)));
    let mut invalid = job(source_paths(3), 2);
    invalid.frame_rate = 0;

    let err = h.pipeline.run(&invalid).unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::InvalidConfig);
    assert!(h.factory.finished.lock().unwrap().is_empty());
}

/// 測試工作者在繪製中 panic 時，匯出以失敗結束而不會卡住
#[test]
fn test_worker_panic_fails_export() {
    let h = harness(SinkBehavior::default(), Arc::new(AtomicBool::new(false)));
    let mut paths = source_paths(5);
    paths[2] = PathBuf::from("/synthetic/panic_00002.png");
    let job = job(paths, 2);

    let (tx, rx) = mpsc::channel();
    let pipeline = h.pipeline.clone();
    thread::spawn(move || {
        let _ = tx.send(pipeline.run(&job));
    });
    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("匯出沒有在時限內結束");

    let err = result.unwrap_err();
    assert!(matches!(err, PipelineError::WorkerPanic { index: 2 }));
    assert_eq!(err.reason_code(), ReasonCode::Internal);
    assert_eq!(h.pipeline.live_buffers(), 0);
    assert_eq!(*h.factory.finished.lock().unwrap(), vec![false]);

    let written = h.factory.written.lock().unwrap().clone();
    assert!(written.len() <= 2);
    let expected: Vec<u8> = (0..written.len()).map(expected_value).collect();
    assert_eq!(written, expected);
}

/// 測試取消後關閉輸出串流失敗時，結果仍然是取消
#[test]
fn test_close_failure_after_cancel_still_cancelled() {
    let shutdown = Arc::new(AtomicBool::new(false));
    let behavior = SinkBehavior {
        cancel_after: Some((3, Arc::clone(&shutdown))),
        fail_finish: true,
        ..SinkBehavior::default()
    };
    let h = harness(behavior, shutdown);

    let err = h.pipeline.run(&job(source_paths(50), 2)).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(*h.factory.finished.lock().unwrap(), vec![false]);
    assert_eq!(h.pipeline.live_buffers(), 0);
}

/// 測試寫入失敗後關閉也失敗時，回報的仍是寫入錯誤
#[test]
fn test_close_failure_after_write_failure_keeps_write_error() {
    let behavior = SinkBehavior {
        fail_at: Some(2),
        fail_finish: true,
        ..SinkBehavior::default()
    };
    let h = harness(behavior, Arc::new(AtomicBool::new(false)));

    let err = h.pipeline.run(&job(source_paths(10), 2)).unwrap_err();
    assert!(matches!(err, PipelineError::SinkWrite(_)));
    assert_eq!(*h.factory.finished.lock().unwrap(), vec![false]);
}
