//! Free-memory detection
//!
//! Platform-specific sampling for the watchdog's low-memory warning.
//! Returns 0 when the reading is unavailable rather than failing the
//! health check.

/// Bytes of memory currently available to the process.
#[cfg(target_os = "linux")]
pub fn free_memory_bytes() -> u64 {
    std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|content| parse_mem_available(&content))
        .unwrap_or(0)
}

#[cfg(target_os = "linux")]
fn parse_mem_available(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemAvailable:"))
        .and_then(|line| {
            line.split_whitespace()
                .nth(1)
                .and_then(|kb| kb.parse::<u64>().ok())
                .map(|kb| kb * 1024)
        })
}

/// Bytes of memory currently available to the process.
#[cfg(not(target_os = "linux"))]
pub fn free_memory_bytes() -> u64 {
    0
}
