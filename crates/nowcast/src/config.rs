//! Forecast query options.

use std::time::Duration;

use grid_sampler::{SamplingMode, MAX_WINDOW_RADIUS};
use serde::{Deserialize, Serialize};

use radar_common::DEFAULT_CADENCE_MINUTES;

/// Options for one precipitation forecast query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastOptions {
    /// Analysis steps up to and including the current bucket.
    pub past_window_steps: usize,

    /// Forecast steps after the current bucket.
    pub forecast_window_steps: usize,

    /// Length of the per-minute series after the query instant.
    pub horizon_minutes: u32,

    /// Rain rate (mm/h) a minute must exceed to count as rain.
    pub threshold_mm_per_hour: f64,

    pub sampling_mode: SamplingMode,

    /// Native cadence of the products in minutes.
    pub cadence_minutes: u32,

    /// Upper bound on fetches in flight per query.
    pub max_concurrent_fetches: usize,

    /// Timeout for a single endpoint attempt.
    pub attempt_timeout_ms: u64,

    /// Deadline for the whole query; unfinished steps are reported as cancelled.
    pub query_timeout_ms: Option<u64>,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            past_window_steps: 13,
            forecast_window_steps: 24,
            horizon_minutes: 60,
            threshold_mm_per_hour: 0.1,
            sampling_mode: SamplingMode::default(),
            cadence_minutes: DEFAULT_CADENCE_MINUTES,
            max_concurrent_fetches: 4,
            attempt_timeout_ms: 2500,
            query_timeout_ms: None,
        }
    }
}

impl ForecastOptions {
    /// Load options from `NOWCAST_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        options.apply_overrides(|key| std::env::var(key).ok());
        options
    }

    /// Apply overrides from a key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("NOWCAST_PAST_STEPS") {
            if let Ok(steps) = val.parse() {
                self.past_window_steps = steps;
            }
        }

        if let Some(val) = lookup("NOWCAST_FORECAST_STEPS") {
            if let Ok(steps) = val.parse() {
                self.forecast_window_steps = steps;
            }
        }

        if let Some(val) = lookup("NOWCAST_HORIZON_MINUTES") {
            if let Ok(minutes) = val.parse() {
                self.horizon_minutes = minutes;
            }
        }

        if let Some(val) = lookup("NOWCAST_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                self.threshold_mm_per_hour = threshold;
            }
        }

        if let Some(val) = lookup("NOWCAST_SAMPLING") {
            if let Some(mode) = parse_sampling_mode(&val) {
                self.sampling_mode = mode;
            }
        }

        if let Some(val) = lookup("NOWCAST_MAX_CONCURRENT_FETCHES") {
            if let Ok(n) = val.parse() {
                self.max_concurrent_fetches = n;
            }
        }

        if let Some(val) = lookup("NOWCAST_ATTEMPT_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.attempt_timeout_ms = ms;
            }
        }

        if let Some(val) = lookup("NOWCAST_QUERY_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.query_timeout_ms = Some(ms);
            }
        }
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), String> {
        if self.past_window_steps == 0 {
            return Err("past_window_steps must be > 0".to_string());
        }

        if self.horizon_minutes == 0 {
            return Err("horizon_minutes must be > 0".to_string());
        }

        if !self.threshold_mm_per_hour.is_finite() || self.threshold_mm_per_hour < 0.0 {
            return Err("threshold_mm_per_hour must be a non-negative number".to_string());
        }

        if self.sampling_mode.radius() > MAX_WINDOW_RADIUS {
            return Err(format!(
                "sampling radius must be <= {}, got {}",
                MAX_WINDOW_RADIUS,
                self.sampling_mode.radius()
            ));
        }

        if self.cadence_minutes == 0 {
            return Err("cadence_minutes must be > 0".to_string());
        }

        if self.max_concurrent_fetches == 0 {
            return Err("max_concurrent_fetches must be > 0".to_string());
        }

        if self.attempt_timeout_ms == 0 {
            return Err("attempt_timeout_ms must be > 0".to_string());
        }

        Ok(())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

/// Parse `point`, `window_mean[:r]` or `window_mean_positive[:r]`.
pub fn parse_sampling_mode(s: &str) -> Option<SamplingMode> {
    let s = s.trim().to_lowercase();
    let (name, radius) = match s.split_once(':') {
        Some((name, radius)) => (name.to_string(), Some(radius.parse::<u32>().ok()?)),
        None => (s, None),
    };

    match name.as_str() {
        "point" => Some(SamplingMode::Point),
        "window_mean" | "mean" => Some(SamplingMode::WindowMean {
            radius: radius.unwrap_or(1),
        }),
        "window_mean_positive" | "mean_positive" => Some(SamplingMode::WindowMeanPositive {
            radius: radius.unwrap_or(1),
        }),
        _ => None,
    }
}
