//! Precipitation nowcast probe.
//!
//! Resolves the configured radar sources for a point, runs the forecast
//! pipeline and prints the result as JSON:
//! - Per-minute rain rate for the configured horizon
//! - First rain event (start, end, duration)
//! - Native-cadence series with per-step status
//!
//! Source exhaustion and cancelled queries are reported as "no rain known"
//! rather than failing the command.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::SourcesConfig;
use nowcast::{
    get_precipitation_forecast, ForecastOptions, ForecastResult, HttpTableLoader, RegionTrend,
    TrendService,
};
use radar_common::{parse_instant, GeoPoint, RainEvent};

#[derive(Parser, Debug)]
#[command(name = "nowcast-probe")]
#[command(about = "Per-minute precipitation nowcast for a point")]
struct Args {
    /// Latitude (degrees north)
    #[arg(allow_hyphen_values = true)]
    lat: f64,

    /// Longitude (degrees east)
    #[arg(allow_hyphen_values = true)]
    lon: f64,

    /// Query instant (ISO 8601); defaults to the current time
    #[arg(long)]
    now: Option<String>,

    /// Source definitions (YAML)
    #[arg(long, env = "NOWCAST_SOURCES", default_value = "config/sources.yaml")]
    sources: PathBuf,

    /// Transport-level timeout for each HTTP request in milliseconds
    #[arg(long, env = "NOWCAST_REQUEST_TIMEOUT_MS", default_value = "10000")]
    request_timeout_ms: u64,

    /// Daily trend table URL (`{date}` is replaced by YYYYMMDD)
    #[arg(long, env = "NOWCAST_TREND_URL")]
    trend_url: Option<String>,

    /// Region name to look up in the trend table
    #[arg(long)]
    region: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum ProbeStatus {
    Ok,
    /// No configured source set covers the point.
    Uncovered,
    /// Sources could not deliver anything in time.
    Unavailable,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProbeOutput {
    point: GeoPoint,
    now: DateTime<Utc>,
    status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    event: RainEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    forecast: Option<ForecastResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trend: Option<RegionTrend>,
}

impl ProbeOutput {
    fn no_rain(point: GeoPoint, now: DateTime<Utc>, status: ProbeStatus) -> Self {
        Self {
            point,
            now,
            status,
            source_set: None,
            reason: None,
            event: RainEvent::none(),
            forecast: None,
            trend: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays a single JSON document
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let point = GeoPoint::new(args.lat, args.lon);
    let now = match &args.now {
        Some(s) => parse_instant(s).with_context(|| format!("Invalid --now value: {}", s))?,
        None => Utc::now(),
    };

    let options = ForecastOptions::from_env();
    options
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid forecast options: {}", e))?;

    let sources = SourcesConfig::load(&args.sources)?;
    let request_timeout = Duration::from_millis(args.request_timeout_ms);

    info!(
        lat = point.lat,
        lon = point.lon,
        now = %now,
        horizon_minutes = options.horizon_minutes,
        "Starting nowcast probe"
    );

    let mut output = match sources.select_for(point) {
        None => {
            warn!(lat = point.lat, lon = point.lon, "No source set covers point");
            ProbeOutput::no_rain(point, now, ProbeStatus::Uncovered)
        }
        Some(set) => {
            let providers = set.build_providers(request_timeout)?;

            match get_precipitation_forecast(point, now, &options, &providers).await {
                Ok(result) => ProbeOutput {
                    source_set: Some(set.name.clone()),
                    event: result.event,
                    forecast: Some(result),
                    ..ProbeOutput::no_rain(point, now, ProbeStatus::Ok)
                },
                Err(e) if e.is_fail_open() => {
                    warn!(source_set = %set.name, error = %e, "Forecast unavailable, reporting no rain");
                    ProbeOutput {
                        source_set: Some(set.name.clone()),
                        reason: Some(e.to_string()),
                        ..ProbeOutput::no_rain(point, now, ProbeStatus::Unavailable)
                    }
                }
                Err(e) => return Err(e).context("Forecast query failed"),
            }
        }
    };

    if let (Some(url), Some(region)) = (&args.trend_url, &args.region) {
        output.trend = lookup_trend(url, region, now, request_timeout).await;
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);

    Ok(())
}

/// Trend lookups are advisory; failures are logged and omitted.
async fn lookup_trend(
    url: &str,
    region: &str,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Option<RegionTrend> {
    let loader = match HttpTableLoader::new(url, timeout) {
        Ok(loader) => loader,
        Err(e) => {
            warn!(error = %e, "Failed to create trend loader");
            return None;
        }
    };

    let service = TrendService::new(loader);
    match service.trend_for(now.date_naive(), region).await {
        Ok(trend) => {
            if trend.is_none() {
                info!(region = %region, "Region not found in trend table");
            }
            trend
        }
        Err(e) => {
            warn!(region = %region, error = %e, "Trend lookup failed");
            None
        }
    }
}
