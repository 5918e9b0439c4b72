//! The precipitation forecast entry point.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use radar_common::{
    minutes_between, GeoPoint, NowcastError, NowcastResult, RainEvent, ResampledSeries, TimeSeries,
};

use crate::builder::SeriesBuilder;
use crate::config::ForecastOptions;
use crate::event::detect;
use crate::provider::Providers;
use crate::resample::resample;

/// Result of one forecast query.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    /// Per-minute rain rate from the query instant.
    pub series: ResampledSeries,
    pub event: RainEvent,
    /// The native-cadence series the minutes were derived from.
    pub raw: TimeSeries,
}

/// Per-minute precipitation forecast and first rain event at `point`.
///
/// Per-step failures are absorbed into the series; only total source
/// exhaustion, an expired deadline with nothing collected, or invalid
/// input is returned as an error.
#[instrument(skip(options, providers), fields(lat = point.lat, lon = point.lon))]
pub async fn get_precipitation_forecast(
    point: GeoPoint,
    now: DateTime<Utc>,
    options: &ForecastOptions,
    providers: &Providers,
) -> NowcastResult<ForecastResult> {
    options.validate().map_err(NowcastError::InvalidOptions)?;
    if !point.is_valid() {
        return Err(NowcastError::InvalidOptions(format!(
            "invalid point: lat={}, lon={}",
            point.lat, point.lon
        )));
    }

    let raw = SeriesBuilder::new(providers, options)
        .build(point, now)
        .await?;

    let offset = raw
        .first_time()
        .map(|first| minutes_between(first, now))
        .unwrap_or(0.0);
    let series = resample(&raw, now, offset, options.horizon_minutes);
    let event = detect(&series, options.threshold_mm_per_hour);

    info!(
        rain = event.start.is_some(),
        duration_minutes = event.duration_minutes,
        "Forecast complete"
    );

    Ok(ForecastResult { series, event, raw })
}
