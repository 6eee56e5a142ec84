//! In-memory message buffer sizing

use serde::Deserialize;

/// Ring buffer capacity and advisory watermarks
///
/// The watermarks do not change buffer behavior on their own; the
/// watchdog uses them for early warnings before the drop-oldest policy
/// kicks in at full.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Buffer capacity in messages
    /// Default: 1000
    pub capacity: usize,

    /// Advisory threshold for aggressive draining
    /// Default: 800
    pub high_watermark: usize,

    /// Advisory threshold for imminent overflow
    /// Default: 950
    pub critical_mark: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            high_watermark: 800,
            critical_mark: 950,
        }
    }
}
