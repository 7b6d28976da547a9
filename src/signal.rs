use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 建立全域中斷旗標，Ctrl-C 時設為 true
///
/// 載入與匯出在每個檔案之間檢查這個旗標；每次開始新作業時會重設。
#[must_use]
pub fn setup_shutdown_signal() -> Arc<AtomicBool> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        eprintln!("\n收到中斷信號，正在停止目前的作業...");
    })
    .expect("無法設定 Ctrl-C 處理器");

    shutdown_signal
}
