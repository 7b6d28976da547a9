use crate::component::export_pipeline::{
    ExportHandle, ExportJob, ExportPipeline, ExportProgress, ExportReport, SinkFactory, ViewPreset,
};
use crate::component::frame_store::{ChannelOrder, FrameStore, Layer, PreviewSet};
use crate::component::preview_loader::{LoaderOptions, PreviewLoader, auto_shrink_factor};
use crate::config::UserSettings;
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{
    Dimensions, ImageDecoder, MemoryMonitor, ViewState, apply_pan, apply_zoom,
    list_layer_directories, render_params, render_view_into, scan_sequence_folder,
    select_every_nth,
};
use log::{info, warn};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 一次載入的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub frames: usize,
    pub source_files: usize,
    pub layers: usize,
    pub preview_dims: Dimensions,
    pub original_dims: Dimensions,
    pub shrink_factor: u32,
    pub resident_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PreviewSource {
    Folder(PathBuf),
    Layered(PathBuf),
}

/// 檢視器的全部狀態
///
/// 同一時間只允許一個載入或匯出作業；背景匯出進行中時，載入與第二次匯出
/// 都會回傳 `Busy`。
pub struct ViewerSession {
    settings: UserSettings,
    decoder: Arc<dyn ImageDecoder>,
    sink_factory: Arc<dyn SinkFactory>,
    shutdown_signal: Arc<AtomicBool>,
    preview: PreviewSet,
    view: ViewState,
    source: Option<PreviewSource>,
    active_export: Option<ExportHandle>,
    show_progress: bool,
}

impl ViewerSession {
    #[must_use]
    pub fn new(
        settings: UserSettings,
        decoder: Arc<dyn ImageDecoder>,
        sink_factory: Arc<dyn SinkFactory>,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            decoder,
            sink_factory,
            shutdown_signal,
            preview: PreviewSet::default(),
            view: ViewState::default(),
            source: None,
            active_export: None,
            show_progress: false,
        }
    }

    /// 載入時是否顯示終端機進度條
    pub fn set_show_progress(&mut self, show: bool) {
        self.show_progress = show;
    }

    #[must_use]
    pub const fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: UserSettings) -> PipelineResult<()> {
        self.ensure_idle("settings")?;
        self.settings = settings;
        self.log_settings();
        Ok(())
    }

    /// 替換輸出串流的建立方式（例如編碼參數改變時）
    pub fn set_sink_factory(&mut self, sink_factory: Arc<dyn SinkFactory>) {
        self.sink_factory = sink_factory;
    }

    fn log_settings(&self) {
        info!(
            "設定已更新: 視窗 {}x{}，輸出 {}x{}，{} fps",
            self.settings.window_width,
            self.settings.window_height,
            self.settings.output_dims().width,
            self.settings.output_dims().height,
            self.settings.frame_rate
        );
    }

    #[must_use]
    pub const fn preview(&self) -> &PreviewSet {
        &self.preview
    }

    #[must_use]
    pub fn store(&self) -> &FrameStore {
        self.preview.active()
    }

    #[must_use]
    pub const fn view(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn current_folder(&self) -> Option<&Path> {
        match &self.source {
            Some(PreviewSource::Folder(path) | PreviewSource::Layered(path)) => Some(path.as_path()),
            None => None,
        }
    }

    fn thread_count(&self) -> usize {
        if self.settings.thread_count > 0 {
            return self.settings.thread_count;
        }
        self.settings
            .effective_threads(MemoryMonitor::new().cpu_count())
    }

    fn begin_operation(&mut self, operation: &'static str) -> PipelineResult<()> {
        self.ensure_idle(operation)?;
        self.shutdown_signal.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn ensure_idle(&mut self, operation: &'static str) -> PipelineResult<()> {
        let Some(handle) = &self.active_export else {
            return Ok(());
        };
        if !handle.is_finished() {
            warn!("匯出進行中，無法執行 {operation}");
            return Err(PipelineError::Busy { operation });
        }

        // 背景匯出已結束但尚未取回結果
        if let Some(handle) = self.active_export.take() {
            match handle.join() {
                Ok(report) => info!("背景匯出已完成: {} 張影格", report.written),
                Err(e) => warn!("背景匯出未完成: {e}"),
            }
        }
        Ok(())
    }

    // ---- 載入 ----

    /// 載入資料夾；失敗時清除先前的預覽
    pub fn load_folder(&mut self, directory: &Path) -> PipelineResult<LoadSummary> {
        self.begin_operation("load")?;
        match self.load_store(directory) {
            Ok(store) => {
                self.preview = PreviewSet::Flat(store);
                self.view = ViewState::default();
                self.source = Some(PreviewSource::Folder(directory.to_path_buf()));
                Ok(self.summary())
            }
            Err(e) => {
                self.discard_preview();
                Err(e)
            }
        }
    }

    /// 以 z-stack 方式載入：每個子資料夾是一層；失敗時清除先前的預覽
    pub fn load_layered(&mut self, root: &Path) -> PipelineResult<LoadSummary> {
        self.begin_operation("load")?;
        match self.load_layers(root) {
            Ok(preview) => {
                self.preview = preview;
                self.view = ViewState::default();
                self.source = Some(PreviewSource::Layered(root.to_path_buf()));
                Ok(self.summary())
            }
            Err(e) => {
                self.discard_preview();
                Err(e)
            }
        }
    }

    /// 以目前設定重新載入；失敗時保留原本的預覽
    pub fn reload(&mut self) -> PipelineResult<LoadSummary> {
        self.begin_operation("reload")?;
        let Some(source) = self.source.clone() else {
            return Err(PipelineError::InvalidConfig("尚未載入任何資料夾".to_string()));
        };

        let position = self.preview.active().current_index();
        let active_layer = self.preview.active_layer();
        let loaded = match &source {
            PreviewSource::Folder(path) => self.load_store(path).map(PreviewSet::Flat),
            PreviewSource::Layered(path) => self.load_layers(path),
        };

        match loaded {
            Ok(preview) => {
                self.preview = preview;
                self.preview.set_active_layer(active_layer);
                self.preview.active_mut().set_current(position);
                self.clamp_view();
                Ok(self.summary())
            }
            Err(e) => {
                warn!("重新載入失敗，保留目前的預覽: {e}");
                Err(e)
            }
        }
    }

    fn discard_preview(&mut self) {
        self.preview = PreviewSet::default();
        self.view = ViewState::default();
        self.source = None;
    }

    fn load_store(&self, directory: &Path) -> PipelineResult<FrameStore> {
        let entries = scan_sequence_folder(directory)?;
        let all_source_paths: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
        let sampled = select_every_nth(&entries, self.settings.nth_frame);

        let shrink_factor = match (self.settings.shrink_factor, sampled.first()) {
            (0, Some(first)) => auto_shrink_factor(
                self.decoder.as_ref(),
                &first.path,
                self.settings.window_dims(),
            ),
            (factor, _) => factor.max(1),
        };

        info!(
            "{}: {} 個檔案，預覽取樣 {} 張",
            directory.display(),
            entries.len(),
            sampled.len()
        );

        let loader = PreviewLoader::new(
            Arc::clone(&self.decoder),
            Arc::clone(&self.shutdown_signal),
        );
        loader.load(
            &sampled,
            all_source_paths,
            LoaderOptions {
                shrink_factor,
                thread_count: self.thread_count(),
                channel_order: ChannelOrder::Rgb,
                show_progress: self.show_progress,
            },
        )
    }

    fn load_layers(&self, root: &Path) -> PipelineResult<PreviewSet> {
        let directories = list_layer_directories(root)?;
        let mut layers = Vec::with_capacity(directories.len());

        for directory in &directories {
            let label = directory
                .file_name()
                .map_or_else(|| directory.display().to_string(), |n| n.to_string_lossy().to_string());
            match self.load_store(directory) {
                Ok(store) => layers.push(Layer { label, store }),
                Err(PipelineError::EmptyResult { .. }) => {
                    warn!("略過沒有可用影像的層 {label}");
                }
                Err(e) => return Err(e),
            }
        }

        info!("z-stack 載入完成: {}/{} 層", layers.len(), directories.len());
        PreviewSet::layered(layers).ok_or(PipelineError::EmptyResult {
            attempted: directories.len(),
        })
    }

    fn summary(&self) -> LoadSummary {
        let store = self.preview.active();
        LoadSummary {
            frames: store.len(),
            source_files: store.all_source_paths().len(),
            layers: self.preview.layer_count(),
            preview_dims: store.image_dims(),
            original_dims: store.original_dims(),
            shrink_factor: store.shrink_factor(),
            resident_bytes: self.preview.resident_bytes(),
        }
    }

    // ---- z-stack ----

    pub fn set_active_layer(&mut self, layer: usize) -> bool {
        let switched = self.preview.set_active_layer(layer);
        if switched {
            self.clamp_view();
        }
        switched
    }

    pub fn next_layer(&mut self) {
        self.preview.next_layer();
        self.clamp_view();
    }

    // ---- 瀏覽與播放 ----

    pub fn next_frame(&mut self) {
        self.preview.active_mut().next_frame();
    }

    pub fn previous_frame(&mut self) {
        self.preview.active_mut().previous_frame();
    }

    pub fn first_frame(&mut self) {
        self.preview.active_mut().first_frame();
    }

    pub fn last_frame(&mut self) {
        self.preview.active_mut().last_frame();
    }

    pub fn toggle_play(&mut self) {
        self.view.is_playing = !self.view.is_playing;
    }

    pub fn reverse_direction(&mut self) {
        self.view.play_direction = self.view.play_direction.reversed();
    }

    /// 播放中時前進一格（繞回），回傳是否有移動
    pub fn advance_playback(&mut self) -> bool {
        if !self.view.is_playing || self.preview.active().is_empty() {
            return false;
        }
        self.preview.active_mut().advance(self.view.play_direction);
        true
    }

    // ---- 縮放與平移 ----

    pub fn zoom_at(&mut self, anchor: (f64, f64), factor: f64) {
        let image = self.preview.active().image_dims();
        apply_zoom(
            &mut self.view,
            self.settings.zoom_limits(),
            self.settings.window_dims(),
            image,
            anchor,
            factor,
        );
    }

    /// 滑鼠從 `from` 拖曳到 `to`（視窗座標）
    pub fn drag(&mut self, from: (f64, f64), to: (f64, f64)) {
        let image = self.preview.active().image_dims();
        apply_pan(
            &mut self.view,
            self.settings.window_dims(),
            image,
            (from.0 - to.0, from.1 - to.1),
        );
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    fn clamp_view(&mut self) {
        let image = self.preview.active().image_dims();
        crate::tools::clamp_pan(&mut self.view, self.settings.window_dims(), image);
    }

    /// 以與匯出相同的繪製方式產生目前影格的視窗畫面
    #[must_use]
    pub fn render_preview(&self) -> Option<Vec<u8>> {
        let store = self.preview.active();
        let frame = store.current()?;
        let window = self.settings.window_dims();
        let image = store.image_dims();

        let params = render_params(&self.view, window, image);
        let mut target = vec![0; window.rgb_len()];
        render_view_into(&mut target, window, &frame.pixels, image, &params);
        Some(target)
    }

    // ---- 匯出 ----

    fn pipeline(&self) -> ExportPipeline {
        ExportPipeline::new(
            Arc::clone(&self.decoder),
            Arc::clone(&self.sink_factory),
            Arc::clone(&self.shutdown_signal),
        )
    }

    /// 以目前的視圖與縮小倍率建立匯出工作
    pub fn build_export_job(
        &self,
        output_path: &Path,
        range: Option<RangeInclusive<usize>>,
        view: ViewState,
        frame_rate: u32,
    ) -> PipelineResult<ExportJob> {
        let store = self.preview.active();
        let all_paths = store.all_source_paths();
        if store.is_empty() || all_paths.is_empty() {
            return Err(PipelineError::EmptyResult { attempted: 0 });
        }

        let source_paths = match range {
            Some(range) => all_paths
                .get(range)
                .ok_or_else(|| PipelineError::InvalidConfig("影格範圍超出序列".to_string()))?
                .to_vec(),
            None => all_paths.to_vec(),
        };

        let workers = self.thread_count();
        Ok(ExportJob::new(
            source_paths,
            output_path.to_path_buf(),
            self.settings.output_dims(),
            frame_rate,
            view,
            store.shrink_factor(),
            workers,
        )
        .with_queue_capacity(self.settings.queue_capacity(workers))
        .with_original_dims(store.original_dims()))
    }

    /// 在背景開始匯出整個序列
    pub fn start_export(&mut self, output_path: &Path) -> PipelineResult<()> {
        self.begin_operation("export")?;
        let job = self.build_export_job(output_path, None, self.view, self.settings.frame_rate)?;
        self.active_export = Some(self.pipeline().spawn(job)?);
        Ok(())
    }

    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.active_export
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    #[must_use]
    pub fn export_progress(&self) -> Option<ExportProgress> {
        self.active_export.as_ref().map(ExportHandle::progress)
    }

    /// 要求目前的作業停止
    pub fn cancel(&self) {
        self.shutdown_signal.store(true, Ordering::SeqCst);
    }

    /// 等待背景匯出結束
    pub fn wait_export(&mut self) -> PipelineResult<ExportReport> {
        let Some(handle) = self.active_export.take() else {
            return Err(PipelineError::InvalidConfig("沒有進行中的匯出".to_string()));
        };
        handle.join()
    }

    /// 在目前執行緒匯出整個序列
    pub fn export_now(&mut self, output_path: &Path) -> PipelineResult<ExportReport> {
        self.begin_operation("export")?;
        let job = self.build_export_job(output_path, None, self.view, self.settings.frame_rate)?;
        self.pipeline().run(&job)
    }

    /// 把目前的視圖附加到設定檔
    pub fn save_view_preset(
        &self,
        preset_file: &Path,
        output_path: &Path,
    ) -> PipelineResult<ViewPreset> {
        let frame_count = self.preview.active().all_source_paths().len();
        let preset = ViewPreset::from_view(
            output_path.to_path_buf(),
            &self.view,
            frame_count,
            self.settings.frame_rate,
        );
        preset.append_to_file(preset_file)?;
        info!("已儲存視圖設定: {}", preset.to_line());
        Ok(preset)
    }

    /// 依序執行每一組視圖設定的匯出，取消時停止後續設定
    pub fn export_presets(
        &mut self,
        presets: &[ViewPreset],
    ) -> PipelineResult<Vec<PipelineResult<ExportReport>>> {
        self.begin_operation("export")?;
        let total = self.preview.active().all_source_paths().len();
        let pipeline = self.pipeline();
        let mut results = Vec::with_capacity(presets.len());

        for preset in presets {
            let Some(range) = preset.frame_range(total) else {
                warn!("視圖設定的影格範圍為空，略過: {}", preset.to_line());
                results.push(Err(PipelineError::InvalidConfig(format!(
                    "影格範圍為空: {}..={}",
                    preset.start_frame, preset.end_frame
                ))));
                continue;
            };

            let view = preset.view(self.settings.zoom_limits());
            let result = self
                .build_export_job(&preset.output_path, Some(range), view, preset.frame_rate)
                .and_then(|job| pipeline.run(&job));
            let cancelled = result.as_ref().is_err_and(PipelineError::is_cancelled);
            results.push(result);
            if cancelled {
                warn!("批次匯出已取消");
                break;
            }
        }

        Ok(results)
    }
}
