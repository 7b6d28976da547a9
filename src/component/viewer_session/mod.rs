//! 檢視器工作階段
//!
//! 以單一物件保存目前的資料夾、預覽影格、視圖狀態與背景匯出

mod main;

pub use main::{LoadSummary, ViewerSession};
