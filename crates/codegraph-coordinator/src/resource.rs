//! Periodic memory sampling, grounded on `sysinfo`'s `System::refresh_memory`
//! usage in `llmspell-kernel`.

use parking_lot::Mutex;
use sysinfo::System;

pub struct ResourceMonitor {
    system: Mutex<System>,
}

impl ResourceMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
        }
    }

    /// Fraction of total system memory currently in use, in `[0.0, 1.0]`.
    pub fn memory_usage_fraction(&self) -> f32 {
        let mut system = self.system.lock();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        system.used_memory() as f32 / total as f32
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
