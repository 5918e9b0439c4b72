//! Temporal series assembly.
//!
//! One query plans a fixed set of steps around the current 5-minute
//! bucket:
//!
//! ```text
//!   offset: -60 ... -5   0 | +5 +10 ... +60 ... +120
//!           analysis (rw)  | forecast (fetched at published leads,
//!                          |           interpolated in between)
//! ```
//!
//! Fetches run with bounded concurrency and land in offset-indexed slots,
//! so the series order never depends on completion order. A failed step
//! contributes 0 with a `Degraded` status; only a query in which no fetch
//! reached any source is an error.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use grid_sampler::sample_point;
use radar_common::{
    floor_to_cadence, DegradeReason, GeoPoint, NowcastError, NowcastResult, ProductKind,
    StepStatus, TimeSeries,
};

use crate::config::ForecastOptions;
use crate::provider::{Providers, StepRequest, TileSource};
use crate::zr::{dbz_to_rain, rain_to_dbz};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Analysis,
    Forecast,
}

#[derive(Debug, Clone)]
struct PlannedStep<'a> {
    request: StepRequest,
    source: &'a TileSource,
    phase: Phase,
    /// False for forecast leads the source does not publish.
    fetch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StepOutcome {
    /// Raw sampled value in the product's unit.
    Sampled(f64),
    /// Every provider in the chain failed.
    Unavailable { attempts: usize },
    /// A payload arrived but yielded no usable value.
    Degraded(DegradeReason),
}

impl StepOutcome {
    fn reached_source(&self) -> bool {
        !matches!(self, StepOutcome::Unavailable { .. })
    }
}

/// Assembles the analysis + forecast series for one point.
pub struct SeriesBuilder<'a> {
    providers: &'a Providers,
    options: &'a ForecastOptions,
}

impl<'a> SeriesBuilder<'a> {
    pub fn new(providers: &'a Providers, options: &'a ForecastOptions) -> Self {
        Self { providers, options }
    }

    /// Build the rain-rate series (mm/h) around `now`.
    #[instrument(skip(self), fields(lat = point.lat, lon = point.lon))]
    pub async fn build(&self, point: GeoPoint, now: DateTime<Utc>) -> NowcastResult<TimeSeries> {
        let bucket = floor_to_cadence(now, self.options.cadence_minutes);
        let steps = self.plan(point, bucket);
        let slots = self.collect(&steps).await;
        let series = self.assemble(&steps, &slots)?;

        info!(
            bucket = %bucket,
            points = series.len(),
            degraded = series.degraded_count(),
            "Assembled precipitation series"
        );
        Ok(series)
    }

    fn plan(&self, point: GeoPoint, bucket: DateTime<Utc>) -> Vec<PlannedStep<'a>> {
        let cadence = self.options.cadence_minutes as i64;
        let past = self.options.past_window_steps as i64;
        let mut steps = Vec::with_capacity(
            self.options.past_window_steps + self.options.forecast_window_steps,
        );

        // Oldest first, ending at the current bucket
        for i in (0..past).rev() {
            let offset = -i * cadence;
            let valid_at = bucket + ChronoDuration::minutes(offset);
            steps.push(PlannedStep {
                request: StepRequest {
                    point,
                    issued: valid_at,
                    valid_at,
                    offset_minutes: offset,
                },
                source: &self.providers.analysis,
                phase: Phase::Analysis,
                fetch: true,
            });
        }

        if let Some(forecast) = &self.providers.forecast {
            let issued = forecast.issued_for(bucket);
            for k in 1..=self.options.forecast_window_steps as i64 {
                let offset = k * cadence;
                let request = StepRequest {
                    point,
                    issued,
                    valid_at: bucket + ChronoDuration::minutes(offset),
                    offset_minutes: offset,
                };
                steps.push(PlannedStep {
                    request,
                    source: forecast,
                    phase: Phase::Forecast,
                    fetch: forecast.publishes(request.lead_minutes()),
                });
            }
        }

        steps
    }

    /// Fetch every step that needs a tile; `None` marks steps the query
    /// deadline cut off.
    async fn collect(&self, steps: &[PlannedStep<'a>]) -> Vec<Option<StepOutcome>> {
        let mut slots: Vec<Option<StepOutcome>> = vec![None; steps.len()];

        let jobs = steps
            .iter()
            .enumerate()
            .filter(|(_, step)| step.fetch)
            .map(|(idx, step)| async move { (idx, self.fetch_step(step).await) });

        let mut results = stream::iter(jobs).buffer_unordered(self.options.max_concurrent_fetches);

        let fill = async {
            while let Some((idx, outcome)) = results.next().await {
                slots[idx] = Some(outcome);
            }
        };

        match self.options.query_timeout() {
            Some(limit) => {
                if tokio::time::timeout(limit, fill).await.is_err() {
                    warn!(
                        timeout_ms = limit.as_millis() as u64,
                        "Query deadline reached, remaining steps cancelled"
                    );
                }
            }
            None => fill.await,
        }

        slots
    }

    async fn fetch_step(&self, step: &PlannedStep<'a>) -> StepOutcome {
        let request = &step.request;
        let source = step.source;

        let fetched = match source
            .chain
            .fetch(request, self.options.attempt_timeout())
            .await
        {
            Ok(fetched) => fetched,
            Err(failure) => {
                warn!(
                    source = %source.name,
                    offset = request.offset_minutes,
                    attempts = failure.attempts(),
                    error = %failure,
                    "Step degraded: no provider delivered a tile"
                );
                return StepOutcome::Unavailable {
                    attempts: failure.attempts(),
                };
            }
        };

        let encoding = source.encoding_for(request.point);
        let tile = match raster_decoder::decode(&fetched.bytes, &encoding, source.product) {
            Ok(tile) => tile,
            Err(e) => {
                warn!(
                    source = %source.name,
                    provider = %fetched.provider,
                    offset = request.offset_minutes,
                    error = %e,
                    "Step degraded: payload could not be decoded"
                );
                return StepOutcome::Degraded(DegradeReason::DecodeFailed);
            }
        };

        if let Some(valid_at) = tile.valid_at {
            if valid_at != request.valid_at {
                debug!(
                    requested = %request.valid_at,
                    actual = %valid_at,
                    "Tile validity differs from requested step"
                );
            }
        }

        let result = sample_point(&tile, request.point, self.options.sampling_mode);
        if !result.in_bounds {
            debug!(
                source = %source.name,
                offset = request.offset_minutes,
                "Step degraded: point outside tile"
            );
            return StepOutcome::Degraded(DegradeReason::OutOfBounds);
        }

        StepOutcome::Sampled(result.value)
    }

    fn assemble(
        &self,
        steps: &[PlannedStep<'a>],
        slots: &[Option<StepOutcome>],
    ) -> NowcastResult<TimeSeries> {
        self.check_exhaustion(steps, slots)?;

        let mut series = TimeSeries::new(self.options.cadence_minutes)?;
        let mut last_analysis_rate = 0.0;

        for (step, slot) in steps.iter().zip(slots) {
            if step.phase != Phase::Analysis {
                continue;
            }
            let (value, status) = match slot {
                Some(StepOutcome::Sampled(v)) => (step.source.to_rate(*v), StepStatus::Observed),
                other => (0.0, degraded_status(other)),
            };
            series.push(step.request.valid_at, value, status)?;
            last_analysis_rate = value.max(0.0);
        }

        let forecast: Vec<(&PlannedStep<'a>, &Option<StepOutcome>)> = steps
            .iter()
            .zip(slots)
            .filter(|(step, _)| step.phase == Phase::Forecast)
            .collect();

        let Some((first, _)) = forecast.first() else {
            return Ok(series);
        };
        let domain = InterpolationDomain::for_source(first.source);

        // Brackets: the last analysis value plus every checkpoint that delivered data
        let mut anchors = vec![(0i64, domain.from_rate(last_analysis_rate))];
        for (step, slot) in &forecast {
            if let Some(StepOutcome::Sampled(v)) = slot {
                anchors.push((step.request.offset_minutes, domain.from_sample(*v)));
            }
        }

        for (step, slot) in forecast {
            let (value, status) = if step.fetch {
                match slot {
                    Some(StepOutcome::Sampled(v)) => {
                        (domain.to_rate(domain.from_sample(*v)), StepStatus::Observed)
                    }
                    other => (0.0, degraded_status(other)),
                }
            } else {
                let interpolated = interpolate_bracketed(&anchors, step.request.offset_minutes);
                (domain.to_rate(interpolated), StepStatus::Interpolated)
            };
            series.push(step.request.valid_at, value, status)?;
        }

        Ok(series)
    }

    fn check_exhaustion(
        &self,
        steps: &[PlannedStep<'a>],
        slots: &[Option<StepOutcome>],
    ) -> NowcastResult<()> {
        let fetched: Vec<&Option<StepOutcome>> = steps
            .iter()
            .zip(slots)
            .filter(|(step, _)| step.fetch)
            .map(|(_, slot)| slot)
            .collect();

        if fetched.is_empty() {
            return Ok(());
        }

        let reached = fetched
            .iter()
            .any(|slot| slot.map(|o| o.reached_source()).unwrap_or(false));
        if reached {
            return Ok(());
        }

        if fetched.iter().any(|slot| slot.is_none()) {
            return Err(NowcastError::Cancelled);
        }

        let attempts: usize = fetched
            .iter()
            .map(|slot| match slot {
                Some(StepOutcome::Unavailable { attempts }) => *attempts,
                _ => 0,
            })
            .sum();

        warn!(attempts, "Every provider failed for every step");
        Err(NowcastError::AllSourcesExhausted {
            product: self.providers.analysis.product,
            attempts,
        })
    }
}

fn degraded_status(slot: &Option<StepOutcome>) -> StepStatus {
    let reason = match slot {
        Some(StepOutcome::Degraded(reason)) => *reason,
        Some(StepOutcome::Unavailable { .. }) => DegradeReason::SourceUnavailable,
        Some(StepOutcome::Sampled(_)) | None => DegradeReason::Cancelled,
    };
    StepStatus::Degraded(reason)
}

/// Unit in which forecast checkpoints are interpolated.
#[derive(Debug, Clone, Copy)]
enum InterpolationDomain {
    /// dBZ; converted to mm/h only after interpolation.
    Reflectivity,
    /// mm/h, with an optional accumulation scale.
    Rate { accumulation_minutes: Option<u32> },
}

impl InterpolationDomain {
    fn for_source(source: &TileSource) -> Self {
        match source.product {
            ProductKind::ForecastReflectivity => Self::Reflectivity,
            _ => Self::Rate {
                accumulation_minutes: source.accumulation_minutes,
            },
        }
    }

    fn from_sample(&self, value: f64) -> f64 {
        match self {
            Self::Reflectivity => value,
            Self::Rate {
                accumulation_minutes: Some(minutes),
            } if *minutes > 0 => value * 60.0 / *minutes as f64,
            Self::Rate { .. } => value,
        }
    }

    fn from_rate(&self, rate: f64) -> f64 {
        match self {
            Self::Reflectivity => rain_to_dbz(rate),
            Self::Rate { .. } => rate,
        }
    }

    fn to_rate(&self, value: f64) -> f64 {
        match self {
            Self::Reflectivity => dbz_to_rain(value),
            Self::Rate { .. } => value.max(0.0),
        }
    }
}

/// Linear interpolation between the anchors around `offset`; holds the
/// nearest anchor outside their range.
fn interpolate_bracketed(anchors: &[(i64, f64)], offset: i64) -> f64 {
    let left = anchors.iter().rev().find(|(o, _)| *o <= offset);
    let right = anchors.iter().find(|(o, _)| *o > offset);

    match (left, right) {
        (Some(&(lo, lv)), Some(&(ro, rv))) => {
            lv + (rv - lv) * (offset - lo) as f64 / (ro - lo) as f64
        }
        (Some(&(_, lv)), None) => lv,
        (None, Some(&(_, rv))) => rv,
        (None, None) => 0.0,
    }
}
