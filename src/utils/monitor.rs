#[cfg(feature = "cli")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// 記錄解析、計算、輸出各階段的行程資源使用量
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Arc<Mutex<System>>,
    pid: Option<Pid>,
    start_time: Instant,
    peak_memory: Arc<Mutex<u64>>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = sysinfo::get_current_pid().ok();
        let mut system = System::new();
        if enabled {
            if let Some(pid) = pid {
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            }
        }

        Self {
            system: Arc::new(Mutex::new(system)),
            pid,
            start_time: Instant::now(),
            peak_memory: Arc::new(Mutex::new(0)),
            enabled,
        }
    }

    pub fn get_stats(&self) -> Option<ProcessStats> {
        if !self.enabled {
            return None;
        }

        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let process = system.process(pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(ProcessStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 環境提供空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
