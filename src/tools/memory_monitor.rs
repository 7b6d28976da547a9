use sysinfo::System;

pub struct MemoryMonitor {
    pub system: System,
}

impl MemoryMonitor {
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();
        Self { system }
    }

    pub fn refresh(&mut self) {
        self.system.refresh_memory();
    }

    /// 可用記憶體（位元組）
    pub fn available_bytes(&mut self) -> u64 {
        self.refresh();
        self.system.available_memory()
    }

    pub fn can_hold(&mut self, estimated_bytes: u64) -> bool {
        estimated_bytes <= self.available_bytes()
    }

    /// 邏輯 CPU 數量，至少為 1
    #[must_use]
    pub fn cpu_count(&self) -> usize {
        self.system.cpus().len().max(1)
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// 以易讀單位格式化位元組數
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let value = bytes as f64;
    if value < MIB {
        format!("{:.1} KB", value / KIB)
    } else if value < GIB {
        format!("{:.1} MB", value / MIB)
    } else {
        format!("{:.2} GB", value / GIB)
    }
}
