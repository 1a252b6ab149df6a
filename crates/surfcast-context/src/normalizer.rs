//! Forecast simplification: raw provider rows to bounded, display-ready points.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use surfcast_models::forecast::{Quality, RawForecastRow, SimplifiedForecastPoint};

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];
const COMPASS_SECTOR_DEG: f64 = 22.5;

/// Project a raw row into a simplified point.
///
/// Returns `None` when the timestamp is absent or unparseable. Every numeric
/// field is rounded independently; a missing or non-finite value only blanks
/// that field.
pub fn simplify(row: &RawForecastRow) -> Option<SimplifiedForecastPoint> {
    let time_utc = row.forecast_time.as_deref()?;
    let instant = parse_timestamp(time_utc)?;

    let swell_height_m = round_to(row.swell_height, 2);
    let swell_period_s = round_to(row.swell_period, 1);
    let swell_direction_deg = round_to(row.swell_direction, 0).map(|d| d as i32);
    let wind_direction_deg = round_to(row.wind_direction, 0).map(|d| d as i32);

    Some(SimplifiedForecastPoint {
        time_utc: time_utc.to_string(),
        time_local: instant.format("%a, %b %-d, %I:%M %p").to_string(),
        timestamp: instant.timestamp_millis(),
        swell_height_m,
        swell_period_s,
        swell_direction_deg,
        swell_direction_text: swell_direction_deg
            .and_then(|d| compass_direction(f64::from(d)))
            .map(str::to_string),
        wave_height_m: round_to(row.wave_height, 2),
        wind_speed_kph: round_to(row.wind_speed, 1),
        wind_direction_deg,
        wind_direction_text: wind_direction_deg
            .and_then(|d| compass_direction(f64::from(d)))
            .map(str::to_string),
        quality: quality_label(swell_height_m, swell_period_s),
    })
}

/// Parse the provider's timestamp formats into a UTC instant.
///
/// Accepts RFC 3339, the Postgres text form (`2024-01-01 03:00:00+00`),
/// offset-less date-times and bare dates. The last two are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Map a bearing onto the 16-point compass rose.
///
/// Any finite input is accepted; it is normalized into [0, 360) first.
pub fn compass_direction(degrees: f64) -> Option<&'static str> {
    if !degrees.is_finite() {
        return None;
    }
    let normalized = degrees.rem_euclid(360.0);
    let index = (normalized / COMPASS_SECTOR_DEG + 0.5).floor() as usize % COMPASS_POINTS.len();
    Some(COMPASS_POINTS[index])
}

/// GOOD needs both a 1.5m+ swell and a 10s+ period. FAIR only looks at height.
pub fn quality_label(swell_height_m: Option<f64>, swell_period_s: Option<f64>) -> Quality {
    if let (Some(height), Some(period)) = (swell_height_m, swell_period_s) {
        if height >= 1.5 && period >= 10.0 {
            return Quality::Good;
        }
    }
    match swell_height_m {
        Some(height) if height >= 1.3 => Quality::Fair,
        _ => Quality::Poor,
    }
}

/// Group rows by spot, keeping arrival order within each spot.
/// Rows without a spot id are dropped.
pub fn group_by_spot(
    rows: impl IntoIterator<Item = RawForecastRow>,
) -> HashMap<String, Vec<RawForecastRow>> {
    let mut grouped: HashMap<String, Vec<RawForecastRow>> = HashMap::new();
    for row in rows {
        let Some(spot_id) = row.spot_id.clone().filter(|id| !id.is_empty()) else {
            continue;
        };
        grouped.entry(spot_id).or_default().push(row);
    }
    grouped
}

/// Stride through `points` so roughly `max_count` remain, always keeping the
/// first and the final point.
///
/// `max_count` is a soft cap: the result can hold `max_count + 1` points when
/// the stride does not land on the final one. A cap of zero behaves like one.
pub fn downsample(
    points: Vec<SimplifiedForecastPoint>,
    max_count: usize,
) -> Vec<SimplifiedForecastPoint> {
    let max_count = max_count.max(1);
    if points.len() <= max_count {
        return points;
    }

    let stride = points.len().div_ceil(max_count);
    let last_index = points.len() - 1;

    points
        .into_iter()
        .enumerate()
        .filter(|(i, _)| i % stride == 0 || *i == last_index)
        .map(|(_, point)| point)
        .collect()
}

/// Simplify, sort and downsample one spot's rows.
pub fn normalize_spot_forecast(
    rows: &[RawForecastRow],
    max_count: usize,
) -> Vec<SimplifiedForecastPoint> {
    let mut points: Vec<SimplifiedForecastPoint> = rows.iter().filter_map(simplify).collect();
    points.sort_by_key(|p| p.timestamp);
    downsample(points, max_count)
}

fn round_to(value: Option<f64>, decimals: i32) -> Option<f64> {
    let value = value.filter(|v| v.is_finite())?;
    let factor = 10f64.powi(decimals);
    Some((value * factor + 0.5).floor() / factor)
}
