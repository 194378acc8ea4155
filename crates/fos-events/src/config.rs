//! Event Loop Configuration

use serde::Deserialize;

/// Event loop configuration options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventLoopConfig {
    /// Lower bound for repeating timer intervals (ms)
    pub min_interval_ms: u64,

    /// Timer nesting depth after which delays are clamped
    pub nesting_clamp_level: u32,

    /// Minimum delay for timers nested deeper than `nesting_clamp_level` (ms)
    pub nested_min_delay_ms: u64,

    /// Hand callback errors to the installed reporter
    pub report_callback_errors: bool,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1,
            nesting_clamp_level: 5,
            nested_min_delay_ms: 4,
            report_callback_errors: true,
        }
    }
}
