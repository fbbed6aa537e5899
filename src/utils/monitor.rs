#[cfg(feature = "cli")]
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Resource usage sampled at the end of a pipeline phase.
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed: Duration,
}

#[cfg(feature = "cli")]
struct Sampler {
    system: System,
    pid: Pid,
    peak_memory_mb: u64,
}

#[cfg(feature = "cli")]
pub struct RunMonitor {
    sampler: Option<Mutex<Sampler>>,
    started: Instant,
    phases: Mutex<Vec<PhaseStats>>,
}

#[cfg(feature = "cli")]
impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        let sampler = if enabled {
            match sysinfo::get_current_pid() {
                Ok(pid) => {
                    let mut system = System::new();
                    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                    Some(Mutex::new(Sampler {
                        system,
                        pid,
                        peak_memory_mb: 0,
                    }))
                }
                Err(e) => {
                    tracing::warn!("Resource monitoring unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            sampler,
            started: Instant::now(),
            phases: Mutex::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sampler.is_some()
    }

    /// 記錄階段結束時的資源使用
    pub fn record_phase(&self, phase: &str) -> Option<PhaseStats> {
        let mut sampler = self.sampler.as_ref()?.lock().ok()?;
        let pid = sampler.pid;
        sampler.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let (cpu_usage, memory_mb) = {
            let process = sampler.system.process(pid)?;
            (process.cpu_usage(), process.memory() / 1024 / 1024)
        };
        sampler.peak_memory_mb = sampler.peak_memory_mb.max(memory_mb);

        let stats = PhaseStats {
            phase: phase.to_string(),
            cpu_usage,
            memory_usage_mb: memory_mb,
            peak_memory_mb: sampler.peak_memory_mb,
            elapsed: self.started.elapsed(),
        };

        tracing::info!(
            "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
            stats.phase,
            stats.cpu_usage,
            stats.memory_usage_mb,
            stats.peak_memory_mb,
            stats.elapsed
        );

        if let Ok(mut phases) = self.phases.lock() {
            phases.push(stats.clone());
        }
        Some(stats)
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn log_summary(&self) {
        let phases = self.phases();
        if let Some(last) = phases.last() {
            tracing::info!(
                "📊 Final Stats - {} phases, Total Time: {:?}, Peak Memory: {}MB",
                phases.len(),
                last.elapsed,
                last.peak_memory_mb
            );
        }
    }
}

// 非 CLI 環境不取樣
#[cfg(not(feature = "cli"))]
pub struct RunMonitor {
    started: Instant,
}

#[cfg(not(feature = "cli"))]
impl RunMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        false
    }

    pub fn record_phase(&self, phase: &str) -> Option<PhaseStats> {
        tracing::debug!("{} finished after {:?}", phase, self.started.elapsed());
        None
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        Vec::new()
    }

    pub fn log_summary(&self) {}
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_records_nothing() {
        let monitor = RunMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.record_phase("extract").is_none());
        assert!(monitor.phases().is_empty());
    }
}
