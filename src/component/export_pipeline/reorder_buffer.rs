//! 有界重排緩衝區
//!
//! 工作者以任意順序完成影格，寫出端只依序號由小到大取出。持有序號 `i` 的
//! 工作者必須等到 `i < next_to_write + capacity` 才能放入，因此緩衝區內的
//! 序號一定落在 `[next_to_write, next_to_write + capacity)`，數量不超過容量；
//! 寫出端等待的那個序號永遠可以放入，不會互相卡死。

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// 等待條件變數時順便檢查取消旗標的間隔
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 一張已繪製的輸出影格
///
/// 建立時遞增、釋放時遞減共用計數器，用來確認沒有遺留的緩衝區。
#[derive(Debug)]
pub struct FrameBuffer {
    data: Vec<u8>,
    live: Arc<AtomicUsize>,
}

impl FrameBuffer {
    #[must_use]
    pub fn new(data: Vec<u8>, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            data,
            live: Arc::clone(live),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Deref for FrameBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct State {
    pending: BTreeMap<usize, FrameBuffer>,
    next_to_write: usize,
    closed: bool,
    high_water_mark: usize,
}

#[derive(Debug)]
pub struct ReorderBuffer {
    state: Mutex<State>,
    not_full: Condvar,
    ready: Condvar,
    capacity: usize,
}

impl ReorderBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            not_full: Condvar::new(),
            ready: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 曾經同時存在的最大影格數
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.lock().high_water_mark
    }

    #[must_use]
    pub fn next_to_write(&self) -> usize {
        self.lock().next_to_write
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// 放入序號 `index` 的影格，空間不足時阻塞
    ///
    /// 緩衝區已關閉或 `cancel` 被設定時釋放影格並回傳 false。
    pub fn insert(&self, index: usize, buffer: FrameBuffer, cancel: &AtomicBool) -> bool {
        let mut state = self.lock();
        loop {
            if state.closed || cancel.load(Ordering::SeqCst) {
                return false;
            }
            if index < state.next_to_write + self.capacity {
                break;
            }
            state = self
                .not_full
                .wait_timeout(state, CANCEL_POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        state.pending.insert(index, buffer);
        state.high_water_mark = state.high_water_mark.max(state.pending.len());
        drop(state);
        self.ready.notify_one();
        true
    }

    /// 取出下一個要寫出的影格，尚未完成時阻塞
    ///
    /// 緩衝區已關閉或 `cancel` 被設定時回傳 `None`。
    pub fn take_next(&self, cancel: &AtomicBool) -> Option<FrameBuffer> {
        let mut state = self.lock();
        loop {
            let next = state.next_to_write;
            if let Some(buffer) = state.pending.remove(&next) {
                state.next_to_write += 1;
                drop(state);
                self.not_full.notify_all();
                return Some(buffer);
            }
            if state.closed || cancel.load(Ordering::SeqCst) {
                return None;
            }
            state = self
                .ready
                .wait_timeout(state, CANCEL_POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// 關閉緩衝區並喚醒所有等待者
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_full.notify_all();
        self.ready.notify_all();
    }

    /// 釋放所有尚未寫出的影格，回傳釋放的數量
    pub fn drain(&self) -> usize {
        let pending = std::mem::take(&mut self.lock().pending);
        pending.len()
    }
}
