//! Garbage-collection configuration and read-only statistics.
//!
//! `GcConfig` is built with a fluent builder, mirroring this workspace's
//! existing `CompilerConfig`/`ExternalBuiltin` pattern: each `with_*` method
//! consumes and returns `self`, and validation happens once, at the end, via
//! `build()` rather than at each setter call.

use std::collections::VecDeque;

use nock_core::NockError;
use serde::{Deserialize, Serialize};

/// How many recent collection durations `GcStats` retains in its ring buffer.
pub const RECENT_TIMES_CAPACITY: usize = 32;

/// Tunable thresholds and switches for the collector and allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcConfig {
    pub enable_gc: bool,
    pub gc_threshold: f64,
    pub emergency_threshold: f64,
    pub auto_expand: bool,
    pub max_capacity: usize,
    pub growth_factor: f64,
    pub debug: bool,
    pub step_budget: Option<u64>,
    pub generational_threshold: f64,
    pub generational_interval: u64,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            enable_gc: true,
            gc_threshold: 0.7,
            emergency_threshold: 0.9,
            auto_expand: true,
            max_capacity: 1 << 24,
            growth_factor: 2.0,
            debug: false,
            step_budget: None,
            generational_threshold: 0.4,
            generational_interval: 1000,
        }
    }
}

impl GcConfig {
    /// Start from the default configuration.
    pub fn new() -> Self {
        GcConfig::default()
    }

    pub fn with_enable_gc(mut self, enable: bool) -> Self {
        self.enable_gc = enable;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.gc_threshold = threshold;
        self
    }

    pub fn with_emergency_threshold(mut self, threshold: f64) -> Self {
        self.emergency_threshold = threshold;
        self
    }

    pub fn with_auto_expand(mut self, auto_expand: bool) -> Self {
        self.auto_expand = auto_expand;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_step_budget(mut self, budget: Option<u64>) -> Self {
        self.step_budget = budget;
        self
    }

    pub fn with_generational_threshold(mut self, threshold: f64) -> Self {
        self.generational_threshold = threshold;
        self
    }

    pub fn with_generational_interval(mut self, interval: u64) -> Self {
        self.generational_interval = interval;
        self
    }

    /// Validate thresholds and factors, returning the config unchanged on
    /// success. Called by `NockContext::configure_gc` before a configuration
    /// is installed.
    pub fn build(self) -> Result<Self, NockError> {
        let in_unit_interval = |name: &'static str, v: f64| -> Result<(), NockError> {
            if v > 0.0 && v < 1.0 {
                Ok(())
            } else {
                Err(NockError::ConfigError(format!(
                    "{name} must be in (0, 1), got {v}"
                )))
            }
        };
        in_unit_interval("gc_threshold", self.gc_threshold)?;
        in_unit_interval("emergency_threshold", self.emergency_threshold)?;
        in_unit_interval("generational_threshold", self.generational_threshold)?;
        if self.gc_threshold >= self.emergency_threshold {
            return Err(NockError::ConfigError(
                "gc_threshold must be less than emergency_threshold".to_string(),
            ));
        }
        if self.growth_factor <= 1.0 {
            return Err(NockError::ConfigError(format!(
                "growth_factor must be greater than 1.0, got {}",
                self.growth_factor
            )));
        }
        if self.max_capacity == 0 {
            return Err(NockError::ConfigError(
                "max_capacity must be nonzero".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Read-only collection and allocation statistics, reported by
/// `NockContext::gc_status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcStats {
    pub usage: usize,
    pub capacity: usize,
    pub high_water_mark: usize,
    pub collections: u64,
    pub emergency_collections: u64,
    pub generational_collections: u64,
    pub expansions: u64,
    pub total_cells_freed: u64,
    pub last_time_ms: f64,
    pub recent_times: VecDeque<f64>,
}

impl GcStats {
    pub fn new() -> Self {
        GcStats::default()
    }

    /// Mean of the retained recent collection times, or 0.0 if none recorded.
    pub fn avg_time_ms(&self) -> f64 {
        if self.recent_times.is_empty() {
            0.0
        } else {
            self.recent_times.iter().sum::<f64>() / self.recent_times.len() as f64
        }
    }

    /// Record one collection's outcome: bumps the relevant counters and
    /// pushes `elapsed_ms` onto the bounded recent-times ring buffer.
    pub fn record_collection(&mut self, cells_freed: u64, elapsed_ms: f64, emergency: bool) {
        self.collections += 1;
        if emergency {
            self.emergency_collections += 1;
        }
        self.total_cells_freed += cells_freed;
        self.last_time_ms = elapsed_ms;
        self.recent_times.push_back(elapsed_ms);
        if self.recent_times.len() > RECENT_TIMES_CAPACITY {
            self.recent_times.pop_front();
        }
    }

    pub fn record_generational_collection(&mut self) {
        self.generational_collections += 1;
    }

    pub fn record_expansion(&mut self) {
        self.expansions += 1;
    }

    pub fn observe_usage(&mut self, usage: usize, capacity: usize) {
        self.usage = usage;
        self.capacity = capacity;
        if usage > self.high_water_mark {
            self.high_water_mark = usage;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(GcConfig::new().build().is_ok());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let err = GcConfig::new().with_threshold(1.5).build().unwrap_err();
        assert!(matches!(err, NockError::ConfigError(_)));
    }

    #[test]
    fn threshold_must_be_below_emergency() {
        let err = GcConfig::new()
            .with_threshold(0.9)
            .with_emergency_threshold(0.9)
            .build()
            .unwrap_err();
        assert!(matches!(err, NockError::ConfigError(_)));
    }

    #[test]
    fn growth_factor_must_exceed_one() {
        let err = GcConfig::new().with_growth_factor(1.0).build().unwrap_err();
        assert!(matches!(err, NockError::ConfigError(_)));
    }

    #[test]
    fn builder_chains_settings() {
        let cfg = GcConfig::new()
            .with_threshold(0.5)
            .with_emergency_threshold(0.8)
            .with_debug(true)
            .build()
            .unwrap();
        assert_eq!(cfg.gc_threshold, 0.5);
        assert_eq!(cfg.emergency_threshold, 0.8);
        assert!(cfg.debug);
    }

    #[test]
    fn stats_track_high_water_mark() {
        let mut stats = GcStats::new();
        stats.observe_usage(10, 100);
        stats.observe_usage(5, 100);
        assert_eq!(stats.high_water_mark, 10);
    }

    #[test]
    fn recent_times_ring_buffer_caps_length() {
        let mut stats = GcStats::new();
        for i in 0..(RECENT_TIMES_CAPACITY + 5) {
            stats.record_collection(1, i as f64, false);
        }
        assert_eq!(stats.recent_times.len(), RECENT_TIMES_CAPACITY);
    }
}
