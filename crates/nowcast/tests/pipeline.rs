//! Series assembly and full pipeline behaviour against in-memory providers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use nowcast::provider::memory::{FailingProvider, ScriptedProvider, StaticProvider};
use nowcast::{
    dbz_to_rain, detect, get_precipitation_forecast, resample, FetchError, ForecastOptions,
    ProviderChain, Providers, SeriesBuilder, TileSource,
};
use grid_sampler::SamplingMode;
use radar_common::{
    grids, DegradeReason, GeoPoint, NowcastError, ProductKind, StepStatus,
};
use raster_decoder::{RasterEncoding, SampleEncoding};
use test_utils::{assert_approx_eq, assert_series_approx_eq, reference_bucket, reference_now};

const FRANKFURT: GeoPoint = GeoPoint {
    lat: 50.1109,
    lon: 8.6821,
};

/// Single-pixel accumulation source: raw * 0.01 mm per 5 minutes.
fn analysis_source(chain: ProviderChain) -> TileSource {
    let encoding = RasterEncoding::raw(
        SampleEncoding::u8(0.01),
        grids::point_cell(GeoPoint::new(0.0, 0.0), 0.01),
    );
    TileSource::analysis("analysis", encoding, chain).with_point_cell(0.01)
}

/// Single-pixel reflectivity source: dBZ = raw / 2 - 32.5.
fn reflectivity_source(chain: ProviderChain) -> TileSource {
    let sample = SampleEncoding::U8 {
        scale: 0.5,
        offset: -32.5,
        no_data: Some(255),
    };
    let encoding = RasterEncoding::raw(sample, grids::point_cell(GeoPoint::new(0.0, 0.0), 0.01));
    TileSource::new("forecast", ProductKind::ForecastReflectivity, encoding, chain)
        .with_point_cell(0.01)
}

fn dbz_raw(dbz: f32) -> Vec<u8> {
    vec![((dbz + 32.5) * 2.0) as u8]
}

fn static_chain(name: &str, payload: Vec<u8>) -> ProviderChain {
    ProviderChain::single(Arc::new(StaticProvider::new(name, payload)))
}

fn options() -> ForecastOptions {
    ForecastOptions {
        sampling_mode: SamplingMode::Point,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_round_trip_constant_analysis_then_dry() {
    // 0.1 mm / 5 min = 1.2 mm/h; forecast 0 dBZ = no rain
    let providers = Providers::new(
        analysis_source(static_chain("rw", vec![10])),
        reflectivity_source(static_chain("rq", dbz_raw(0.0))),
    );
    let options = options();

    let raw = SeriesBuilder::new(&providers, &options)
        .build(FRANKFURT, reference_now())
        .await
        .unwrap();
    assert_eq!(raw.len(), 13 + 24);
    assert_eq!(raw.degraded_count(), 0);

    let first = raw.first_time().unwrap();
    assert_eq!(first, reference_bucket() - ChronoDuration::minutes(60));
    for point in &raw.points()[..13] {
        assert_approx_eq!(point.value, 1.2, 1e-5);
    }
    assert!(raw.points()[13..].iter().all(|p| p.value == 0.0));

    // Whole series from its first point
    let minutes = resample(&raw, first, 0.0, 36 * 5);
    for value in &minutes.values()[..=60] {
        assert_approx_eq!(*value, 1.2, 1e-5);
    }
    assert_eq!(minutes.values()[65], 0.0);

    let event = detect(&minutes, 0.1);
    let first_forecast = reference_bucket() + ChronoDuration::minutes(5);
    assert_eq!(event.start, Some(first));
    let end = event.end.unwrap();
    assert!(end >= reference_bucket() && end < first_forecast);
}

#[tokio::test]
async fn test_pipeline_starts_at_query_instant() {
    let providers = Providers::new(
        analysis_source(static_chain("rw", vec![10])),
        reflectivity_source(static_chain("rq", dbz_raw(0.0))),
    );

    let result = get_precipitation_forecast(FRANKFURT, reference_now(), &options(), &providers)
        .await
        .unwrap();

    assert_eq!(result.series.len(), 61);
    assert_eq!(result.series.points[0].time, reference_now());
    // 2.5 minutes into the ramp from 1.2 (bucket) to 0 (bucket + 5)
    let values = result.series.values();
    assert_series_approx_eq!(values[..4], [0.6, 0.36, 0.12, 0.0], 1e-5);

    assert_eq!(result.event.start, Some(reference_now()));
    assert_eq!(
        result.event.end,
        Some(reference_now() + ChronoDuration::minutes(2))
    );
    assert_eq!(result.event.duration_minutes, 3);
}

#[tokio::test]
async fn test_failed_steps_degrade_to_zero() {
    let mut scripted = ScriptedProvider::new("rw");
    for i in 0..13 {
        let offset = -5 * i;
        scripted = if offset == -20 || offset == 0 {
            scripted.fail(offset, FetchError::transport("reset"))
        } else {
            scripted.respond(offset, vec![50u8])
        };
    }
    let providers =
        Providers::analysis_only(analysis_source(ProviderChain::single(Arc::new(scripted))));

    let raw = SeriesBuilder::new(&providers, &options())
        .build(FRANKFURT, reference_now())
        .await
        .unwrap();

    assert_eq!(raw.len(), 13);
    assert_eq!(raw.degraded_count(), 2);
    let degraded: Vec<_> = raw
        .points()
        .iter()
        .filter(|p| p.status.is_degraded())
        .collect();
    assert_eq!(
        degraded[0].time,
        reference_bucket() - ChronoDuration::minutes(20)
    );
    assert_eq!(degraded[0].value, 0.0);
    assert_eq!(
        degraded[1].status,
        StepStatus::Degraded(DegradeReason::SourceUnavailable)
    );
    assert_approx_eq!(raw.points()[0].value, 6.0, 1e-4);
}

#[tokio::test]
async fn test_backup_provider_used() {
    let primary = Arc::new(FailingProvider::http("primary", 503));
    let chain = ProviderChain::new()
        .with(primary.clone())
        .with(Arc::new(StaticProvider::new("backup", vec![20u8])));
    let providers = Providers::analysis_only(analysis_source(chain));

    let raw = SeriesBuilder::new(&providers, &options())
        .build(FRANKFURT, reference_now())
        .await
        .unwrap();

    assert_eq!(raw.degraded_count(), 0);
    assert_eq!(primary.calls(), 13);
    assert_approx_eq!(raw.values()[12], 2.4, 1e-4);
}

#[tokio::test]
async fn test_total_exhaustion_is_error() {
    let chain = || {
        ProviderChain::new()
            .with(Arc::new(FailingProvider::http("primary", 500)))
            .with(Arc::new(FailingProvider::transport("backup", "dns")))
    };
    let providers = Providers::new(analysis_source(chain()), reflectivity_source(chain()));

    let err = get_precipitation_forecast(FRANKFURT, reference_now(), &options(), &providers)
        .await
        .unwrap_err();

    match err {
        NowcastError::AllSourcesExhausted { product, attempts } => {
            assert_eq!(product, ProductKind::Analysis);
            assert_eq!(attempts, (13 + 24) * 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err_is_fail_open(&providers).await);
}

async fn err_is_fail_open(providers: &Providers) -> bool {
    get_precipitation_forecast(FRANKFURT, reference_now(), &options(), providers)
        .await
        .map(|_| false)
        .unwrap_or_else(|e| e.is_fail_open())
}

#[tokio::test]
async fn test_forecast_checkpoints_interpolated_in_dbz() {
    let forecast_provider = Arc::new(
        ScriptedProvider::new("rq")
            .respond(60, dbz_raw(40.0))
            .respond(120, dbz_raw(20.0)),
    );
    let providers = Providers::new(
        analysis_source(static_chain("rw", vec![0])),
        reflectivity_source(ProviderChain::single(forecast_provider.clone()))
            .with_published_leads(vec![60, 120]),
    );
    let options = ForecastOptions {
        forecast_window_steps: 26,
        ..options()
    };

    let raw = SeriesBuilder::new(&providers, &options)
        .build(FRANKFURT, reference_now())
        .await
        .unwrap();

    assert_eq!(forecast_provider.calls(), 2);
    let at = |offset: i64| {
        raw.points()
            .iter()
            .find(|p| p.time == reference_bucket() + ChronoDuration::minutes(offset))
            .copied()
            .unwrap()
    };

    // Left bracket is the dry analysis (0 dBZ)
    assert_approx_eq!(at(30).value, dbz_to_rain(20.0), 1e-9);
    assert_eq!(at(30).status, StepStatus::Interpolated);
    assert_approx_eq!(at(60).value, dbz_to_rain(40.0), 1e-9);
    assert_eq!(at(60).status, StepStatus::Observed);
    assert_approx_eq!(at(90).value, dbz_to_rain(30.0), 1e-9);
    // Held after the last checkpoint
    assert_approx_eq!(at(130).value, dbz_to_rain(20.0), 1e-9);
}

#[tokio::test]
async fn test_failed_checkpoint_is_skipped_as_bracket() {
    let forecast_provider = ScriptedProvider::new("rq")
        .fail(60, FetchError::Timeout(Duration::from_millis(2500)))
        .respond(120, dbz_raw(20.0));
    let providers = Providers::new(
        analysis_source(static_chain("rw", vec![0])),
        reflectivity_source(ProviderChain::single(Arc::new(forecast_provider)))
            .with_published_leads(vec![60, 120]),
    );

    let raw = SeriesBuilder::new(&providers, &options())
        .build(FRANKFURT, reference_now())
        .await
        .unwrap();

    let values = raw.values();
    // bucket + 60 is index 12 + 12
    assert_eq!(values[24], 0.0);
    assert_eq!(
        raw.points()[24].status,
        StepStatus::Degraded(DegradeReason::SourceUnavailable)
    );
    // bucket + 30 interpolates 0 dBZ -> 20 dBZ over 120 minutes
    assert_approx_eq!(values[18], dbz_to_rain(5.0), 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_order_independent_of_completion_and_bounded() {
    // Newest steps finish last; each offset carries its own value
    let mut scripted = ScriptedProvider::new("rw");
    for i in 0..13i64 {
        let offset = -5 * i;
        scripted = scripted
            .respond(offset, vec![i as u8 + 1])
            .delay(offset, Duration::from_millis(10 * (13 - i as u64)));
    }
    let provider = Arc::new(scripted);
    let providers =
        Providers::analysis_only(analysis_source(ProviderChain::single(provider.clone())));
    let options = ForecastOptions {
        max_concurrent_fetches: 3,
        ..options()
    };

    let raw = SeriesBuilder::new(&providers, &options)
        .build(FRANKFURT, reference_now())
        .await
        .unwrap();

    assert!(provider.max_in_flight() <= 3);
    let times: Vec<_> = raw.points().iter().map(|p| p.time).collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    // Oldest point is offset -60 -> raw 13
    assert_approx_eq!(raw.values()[0], 13.0 * 0.01 * 12.0, 1e-4);
    assert_approx_eq!(raw.values()[12], 0.01 * 12.0, 1e-4);
}

#[tokio::test(start_paused = true)]
async fn test_query_deadline_cancels_slow_steps() {
    let mut scripted = ScriptedProvider::new("rw");
    for i in 0..13i64 {
        scripted = scripted.respond(-5 * i, vec![10u8]);
    }
    let scripted = scripted.delay(-60, Duration::from_secs(10));
    let providers =
        Providers::analysis_only(analysis_source(ProviderChain::single(Arc::new(scripted))));
    let options = ForecastOptions {
        attempt_timeout_ms: 30_000,
        query_timeout_ms: Some(1_000),
        ..options()
    };

    let raw = SeriesBuilder::new(&providers, &options)
        .build(FRANKFURT, reference_now())
        .await
        .unwrap();

    assert_eq!(
        raw.points()[0].status,
        StepStatus::Degraded(DegradeReason::Cancelled)
    );
    assert_eq!(raw.degraded_count(), 1);
    assert_approx_eq!(raw.values()[12], 1.2, 1e-5);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_before_any_step_is_cancelled_error() {
    let slow = Arc::new(
        (0..13i64).fold(ScriptedProvider::new("rw"), |p, i| {
            p.respond(-5 * i, vec![10u8])
                .delay(-5 * i, Duration::from_secs(10))
        }),
    );
    let providers = Providers::analysis_only(analysis_source(ProviderChain::single(slow)));
    let options = ForecastOptions {
        attempt_timeout_ms: 30_000,
        query_timeout_ms: Some(500),
        ..options()
    };

    let err = SeriesBuilder::new(&providers, &options)
        .build(FRANKFURT, reference_now())
        .await
        .unwrap_err();
    assert!(matches!(err, NowcastError::Cancelled));
}

#[tokio::test]
async fn test_undecodable_payload_degrades() {
    // Two-byte samples but a one-byte payload
    let encoding = RasterEncoding::raw(
        SampleEncoding::u16(0.01),
        grids::point_cell(GeoPoint::new(0.0, 0.0), 0.01),
    );
    let source = TileSource::analysis("rw", encoding, static_chain("rw", vec![1]))
        .with_point_cell(0.01);
    let providers = Providers::analysis_only(source);

    let raw = SeriesBuilder::new(&providers, &options())
        .build(FRANKFURT, reference_now())
        .await
        .unwrap();

    assert!(raw
        .points()
        .iter()
        .all(|p| p.status == StepStatus::Degraded(DegradeReason::DecodeFailed)));
}

#[tokio::test]
async fn test_invalid_options_rejected() {
    let providers = Providers::analysis_only(analysis_source(static_chain("rw", vec![0])));
    let options = ForecastOptions {
        max_concurrent_fetches: 0,
        ..Default::default()
    };

    let err = get_precipitation_forecast(FRANKFURT, reference_now(), &options, &providers)
        .await
        .unwrap_err();
    assert!(matches!(err, NowcastError::InvalidOptions(_)));

    let err = get_precipitation_forecast(
        GeoPoint::new(f64::NAN, 8.0),
        reference_now(),
        &ForecastOptions::default(),
        &providers,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, NowcastError::InvalidOptions(_)));
}
