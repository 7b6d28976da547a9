//! 整合測試 - 以真正的 PNG 檔案驗證載入與匯出流程
//!
//! 測試資料在暫存資料夾中產生，輸出串流以記錄器代替 ffmpeg

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use image_sequence_viewer::component::export_pipeline::{
    FrameSink, SinkFactory, SinkSpec, load_presets,
};
use image_sequence_viewer::component::{LoaderOptions, PreviewLoader, ViewerSession};
use image_sequence_viewer::config::UserSettings;
use image_sequence_viewer::error::{PipelineError, PipelineResult};
use image_sequence_viewer::tools::{
    Dimensions, ImageCrateDecoder, scan_sequence_folder, select_every_nth,
};
use tempfile::TempDir;

/// 把寫入的影格記在記憶體中
#[derive(Default, Clone)]
struct RecordingFactory {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    specs: Arc<Mutex<Vec<SinkSpec>>>,
    finished: Arc<Mutex<Vec<bool>>>,
}

struct RecordingSink {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    finished: Arc<Mutex<Vec<bool>>>,
}

impl SinkFactory for RecordingFactory {
    fn open(&self, spec: &SinkSpec) -> PipelineResult<Box<dyn FrameSink>> {
        self.specs.lock().unwrap().push(spec.clone());
        Ok(Box::new(RecordingSink {
            frames: Arc::clone(&self.frames),
            finished: Arc::clone(&self.finished),
        }))
    }
}

impl FrameSink for RecordingSink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.frames.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn finish(self: Box<Self>, completed: bool) -> PipelineResult<()> {
        self.finished.lock().unwrap().push(completed);
        Ok(())
    }
}

/// 每個檔案填滿單一灰階值 `index * 20`
fn write_sequence(dir: &Path, count: u32, width: u32, height: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|index| {
            let value = (index * 20) as u8;
            let img = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
            let path = dir.join(format!("frame_{index:04}.png"));
            img.save(&path).unwrap();
            path
        })
        .collect()
}

fn test_settings() -> UserSettings {
    UserSettings {
        window_width: 100,
        window_height: 100,
        shrink_factor: 2,
        thread_count: 4,
        ..UserSettings::default()
    }
}

fn new_session(settings: UserSettings, factory: &RecordingFactory) -> ViewerSession {
    ViewerSession::new(
        settings,
        Arc::new(ImageCrateDecoder),
        Arc::new(factory.clone()),
        Arc::new(AtomicBool::new(false)),
    )
}

/// 測試 1: 載入資料夾後匯出，影格依序號寫出
#[test]
fn test_load_and_export_in_order() {
    let temp_dir = TempDir::new().unwrap();
    write_sequence(temp_dir.path(), 10, 200, 200);

    let factory = RecordingFactory::default();
    let mut session = new_session(test_settings(), &factory);

    let summary = session.load_folder(temp_dir.path()).unwrap();
    assert_eq!(summary.frames, 10);
    assert_eq!(summary.source_files, 10);
    assert_eq!(summary.preview_dims, Dimensions::new(100, 100));
    assert_eq!(summary.original_dims, Dimensions::new(200, 200));

    let output = temp_dir.path().join("out.mp4");
    let report = session.export_now(&output).unwrap();
    assert_eq!(report.written, 10);
    assert_eq!(report.total, 10);
    assert_eq!(report.decode_failures, 0);
    assert_eq!(report.leaked_buffers, 0);

    let frames = factory.frames.lock().unwrap();
    assert_eq!(frames.len(), 10);
    for (index, frame) in frames.iter().enumerate() {
        assert_eq!(frame.len(), 30000);
        let expected = (index * 20) as u8;
        assert!(
            frame.iter().all(|&b| b == expected),
            "第 {index} 張影格內容錯誤"
        );
    }

    let specs = factory.specs.lock().unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].dimensions, Dimensions::new(100, 100));
    assert_eq!(specs[0].output_path, output);
    assert_eq!(*factory.finished.lock().unwrap(), vec![true]);
}

/// 測試 2: 預覽尺寸為原始尺寸除以縮小倍率，並依序號排序
#[test]
fn test_loader_dimensions_and_order() {
    let temp_dir = TempDir::new().unwrap();
    // 以相反順序建立檔案
    for index in (0..5u32).rev() {
        let value = (index * 20) as u8;
        RgbImage::from_pixel(64, 48, Rgb([value, 0, 0]))
            .save(temp_dir.path().join(format!("shot_{index:03}.png")))
            .unwrap();
    }

    let entries = scan_sequence_folder(temp_dir.path()).unwrap();
    let paths: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
    let loader = PreviewLoader::new(Arc::new(ImageCrateDecoder), Arc::new(AtomicBool::new(false)));
    let options = LoaderOptions {
        shrink_factor: 4,
        thread_count: 3,
        ..LoaderOptions::default()
    };

    let store = loader.load(&entries, paths.clone(), options).unwrap();
    assert_eq!(store.len(), 5);
    assert_eq!(store.image_dims(), Dimensions::new(16, 12));
    assert_eq!(store.original_dims(), Dimensions::new(64, 48));
    assert_eq!(loader.completed_count(), 5);

    let indices: Vec<u64> = store.frames().iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    for frame in store.frames() {
        assert_eq!(frame.byte_len(), 16 * 12 * 3);
        assert_eq!(frame.pixels[0], (frame.index * 20) as u8);
    }

    // 同樣的輸入載入兩次結果相同
    let again = loader.load(&entries, paths, options).unwrap();
    assert_eq!(again.frames(), store.frames());
}

/// 測試 3: 每 N 張取一張時預覽變少，但匯出仍涵蓋全部檔案
#[test]
fn test_nth_frame_preview_exports_all_files() {
    let temp_dir = TempDir::new().unwrap();
    write_sequence(temp_dir.path(), 7, 40, 40);

    let entries = scan_sequence_folder(temp_dir.path()).unwrap();
    assert_eq!(select_every_nth(&entries, 3).len(), 3);

    let factory = RecordingFactory::default();
    let settings = UserSettings {
        nth_frame: 3,
        shrink_factor: 1,
        window_width: 40,
        window_height: 40,
        thread_count: 2,
        ..UserSettings::default()
    };
    let mut session = new_session(settings, &factory);

    let summary = session.load_folder(temp_dir.path()).unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.source_files, 7);

    let report = session.export_now(&temp_dir.path().join("all.mp4")).unwrap();
    assert_eq!(report.written, 7);
    assert_eq!(factory.frames.lock().unwrap().len(), 7);
}

/// 測試 4: 損壞的檔案在預覽中被略過，匯出時以黑畫面代替
#[test]
fn test_corrupt_file_handling() {
    let temp_dir = TempDir::new().unwrap();
    write_sequence(temp_dir.path(), 4, 20, 20);
    fs::write(temp_dir.path().join("frame_0004.png"), b"broken").unwrap();

    let factory = RecordingFactory::default();
    let settings = UserSettings {
        shrink_factor: 1,
        window_width: 20,
        window_height: 20,
        thread_count: 2,
        ..UserSettings::default()
    };
    let mut session = new_session(settings, &factory);

    let summary = session.load_folder(temp_dir.path()).unwrap();
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.source_files, 5);

    let report = session.export_now(&temp_dir.path().join("out.mp4")).unwrap();
    assert_eq!(report.written, 5);
    assert_eq!(report.decode_failures, 1);

    let frames = factory.frames.lock().unwrap();
    assert!(frames[4].iter().all(|&b| b == 0));
    assert!(frames[3].iter().all(|&b| b == 60));
}

/// 測試 5: 資料夾中沒有可解碼的影像
#[test]
fn test_folder_without_decodable_images() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a_0001.png"), b"x").unwrap();
    fs::write(temp_dir.path().join("a_0002.png"), b"y").unwrap();

    let factory = RecordingFactory::default();
    let settings = UserSettings {
        shrink_factor: 1,
        ..UserSettings::default()
    };
    let mut session = new_session(settings, &factory);

    let err = session.load_folder(temp_dir.path()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyResult { attempted: 2 }));
    assert!(session.store().is_empty());
}

/// 測試 6: 儲存視圖設定後依設定批次匯出
#[test]
fn test_presets_round_trip_through_file() {
    let temp_dir = TempDir::new().unwrap();
    write_sequence(temp_dir.path(), 6, 40, 40);

    let factory = RecordingFactory::default();
    let settings = UserSettings {
        shrink_factor: 2,
        window_width: 20,
        window_height: 20,
        thread_count: 2,
        ..UserSettings::default()
    };
    let mut session = new_session(settings, &factory);
    session.load_folder(temp_dir.path()).unwrap();

    let preset_file = temp_dir.path().join("presets.txt");
    let first = temp_dir.path().join("first.mp4");
    let second = temp_dir.path().join("second.mp4");
    session.save_view_preset(&preset_file, &first).unwrap();
    session.zoom_at((10.0, 10.0), 2.0);
    session.save_view_preset(&preset_file, &second).unwrap();

    let presets = load_presets(&preset_file).unwrap();
    assert_eq!(presets.len(), 2);
    assert_eq!(presets[0].end_frame, 5);
    assert!((presets[1].zoom_level - 2.0).abs() < 1e-9);

    let results = session.export_presets(&presets).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(factory.frames.lock().unwrap().len(), 12);

    let outputs: Vec<PathBuf> = factory
        .specs
        .lock()
        .unwrap()
        .iter()
        .map(|spec| spec.output_path.clone())
        .collect();
    assert_eq!(outputs, vec![first, second]);
}
