//! Transform provider payloads into the compact client shape.
//!
//! Everything here is pure; the current time is passed in.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, WeatherError};
use crate::types::{
    DisplayIcon, ForecastPoint, RawCondition, RawCurrent, RawDaily, RawHourly, RawWeatherPayload,
    SiteReport, WeatherOverview, Wind,
};

const FORECAST_WINDOW_HOURS: i64 = 24;
const FORECAST_DAYS: usize = 5;
const LOCAL_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Build the current-conditions overview.
pub fn to_overview(
    current: &RawCurrent,
    timezone: &str,
    timezone_offset: i64,
    now: DateTime<Utc>,
) -> Result<WeatherOverview> {
    let icon = current
        .weather
        .first()
        .and_then(|c| c.icon.as_deref())
        .and_then(DisplayIcon::from_provider_code);

    Ok(WeatherOverview {
        temperature: current.temp,
        icon,
        clouds: current.clouds,
        visibility: current.visibility,
        humidity: current.humidity,
        wind: Wind {
            speed: current.wind_speed,
            deg: current.wind_deg,
        },
        timezone: timezone.to_string(),
        time: local_time(now, timezone_offset)?,
    })
}

/// Hourly samples within `[now, now + 24h]`, in provider order.
///
/// Absent input stays absent; an empty series gives an empty forecast.
pub fn to_24h_forecast(
    hourly: Option<&[RawHourly]>,
    now: DateTime<Utc>,
) -> Result<Option<Vec<ForecastPoint>>> {
    let start = now.timestamp_millis();
    let end = (now + Duration::hours(FORECAST_WINDOW_HOURS)).timestamp_millis();

    hourly
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| match epoch_millis(entry.dt) {
                    Ok(at) if at < start || at > end => None,
                    Ok(at) => Some(Ok(ForecastPoint {
                        datetime: at,
                        temperature: entry.temp,
                        humidity: entry.humidity,
                        description: first_description(&entry.weather),
                    })),
                    Err(e) => Some(Err(e)),
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()
}

/// The next five days, skipping the first entry (today).
pub fn to_5d_forecast(daily: &[RawDaily]) -> Result<Vec<ForecastPoint>> {
    daily
        .iter()
        .skip(1)
        .take(FORECAST_DAYS)
        .map(|entry| {
            Ok(ForecastPoint {
                datetime: epoch_millis(entry.dt)?,
                temperature: entry.temp.day,
                humidity: entry.humidity,
                description: first_description(&entry.weather),
            })
        })
        .collect()
}

/// Assemble the full per-site report from one payload.
///
/// An absent daily series is an empty `forecast5d` rather than a failed site.
pub fn to_report(raw: &RawWeatherPayload, now: DateTime<Utc>) -> Result<SiteReport> {
    Ok(SiteReport {
        overview: to_overview(&raw.current, &raw.timezone, raw.timezone_offset, now)?,
        forecast_5d: to_5d_forecast(raw.daily.as_deref().unwrap_or_default())?,
        forecast_24h: to_24h_forecast(raw.hourly.as_deref(), now)?,
    })
}

fn first_description(weather: &[RawCondition]) -> String {
    weather
        .first()
        .and_then(|c| c.description.clone())
        .unwrap_or_default()
}

fn epoch_millis(secs: i64) -> Result<i64> {
    secs.checked_mul(1000).ok_or_else(|| {
        WeatherError::ProviderResponseInvalid(format!("timestamp out of range: {}", secs))
    })
}

/// Wall-clock time at a UTC offset given in seconds.
fn local_time(now: DateTime<Utc>, offset_secs: i64) -> Result<String> {
    let shifted = Duration::try_seconds(offset_secs)
        .and_then(|offset| now.checked_add_signed(offset))
        .ok_or_else(|| {
            WeatherError::ProviderResponseInvalid(format!(
                "timezone offset out of range: {}",
                offset_secs
            ))
        })?;

    Ok(shifted
        .naive_utc()
        .format(LOCAL_TIME_FORMAT)
        .to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn hourly(dt: i64, temp: f64, description: &str) -> RawHourly {
        serde_json::from_value(serde_json::json!({
            "dt": dt,
            "temp": temp,
            "humidity": 60,
            "weather": [{ "description": description }]
        }))
        .unwrap()
    }

    fn daily(dt: i64, day: f64, description: &str) -> RawDaily {
        serde_json::from_value(serde_json::json!({
            "dt": dt,
            "temp": { "day": day, "min": day - 5.0, "max": day + 5.0 },
            "humidity": 50 + (dt / 1000) * 5,
            "weather": [{ "description": description }]
        }))
        .unwrap()
    }

    fn current() -> RawCurrent {
        serde_json::from_value(serde_json::json!({
            "temp": 22.5,
            "weather": [{ "icon": "01d", "description": "clear sky" }],
            "clouds": 10,
            "visibility": 10000,
            "humidity": 65,
            "wind_speed": 5.5,
            "wind_deg": 180
        }))
        .unwrap()
    }

    #[test]
    fn test_overview_fields() {
        let overview = to_overview(&current(), "UTC", -18000, fixed_now()).unwrap();

        assert_eq!(overview.temperature, 22.5);
        assert_eq!(overview.icon, Some(DisplayIcon::ClearDay));
        assert_eq!(overview.clouds, 10.0);
        assert_eq!(overview.visibility, Some(10000.0));
        assert_eq!(overview.humidity, 65.0);
        assert_eq!(overview.wind, Wind { speed: 5.5, deg: 180.0 });
        assert_eq!(overview.timezone, "UTC");
    }

    #[test]
    fn test_overview_local_time_applies_offset() {
        let overview = to_overview(&current(), "America/New_York", -18000, fixed_now()).unwrap();
        assert_eq!(overview.time, "3/10/2024, 7:00:00 AM");

        let overview = to_overview(&current(), "Asia/Tokyo", 32400, fixed_now()).unwrap();
        assert_eq!(overview.time, "3/10/2024, 9:00:00 PM");
    }

    #[test]
    fn test_overview_unmapped_icon_is_absent() {
        let mut raw = current();
        raw.weather[0].icon = Some("77z".to_string());
        assert_eq!(to_overview(&raw, "UTC", 0, fixed_now()).unwrap().icon, None);

        raw.weather.clear();
        assert_eq!(to_overview(&raw, "UTC", 0, fixed_now()).unwrap().icon, None);
    }

    #[test]
    fn test_24h_window() {
        let now = fixed_now();
        let ts = now.timestamp();
        let hour = 3600;
        let samples = vec![
            hourly(ts - hour, 15.0, "clear"),
            hourly(ts + 100, 20.0, "sunny"),
            hourly(ts + hour, 22.0, "cloudy"),
            hourly(ts + 2 * hour, 23.0, "partly cloudy"),
            hourly(ts + 25 * hour, 18.0, "rainy"),
        ];

        let result = to_24h_forecast(Some(samples.as_slice()), now).unwrap().unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].datetime, (ts + 100) * 1000);
        assert_eq!(result[0].temperature, 20.0);
        assert_eq!(result[0].humidity, 60.0);
        assert_eq!(result[0].description, "sunny");
        assert_eq!(result[1].datetime, (ts + hour) * 1000);
        assert_eq!(result[2].datetime, (ts + 2 * hour) * 1000);
    }

    #[test]
    fn test_24h_window_bounds_inclusive() {
        let now = fixed_now();
        let ts = now.timestamp();
        let samples = vec![hourly(ts, 1.0, "a"), hourly(ts + 24 * 3600, 2.0, "b")];

        let result = to_24h_forecast(Some(samples.as_slice()), now).unwrap().unwrap();

        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_24h_absent_and_empty() {
        assert!(to_24h_forecast(None, fixed_now()).unwrap().is_none());
        assert_eq!(to_24h_forecast(Some(&[][..]), fixed_now()).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_5d_skips_first_day() {
        let days: Vec<RawDaily> = (0..7)
            .map(|i| daily((i + 1) * 1000, 20.0 + i as f64, &format!("day{}", i)))
            .collect();

        let result = to_5d_forecast(&days).unwrap();

        assert_eq!(result.len(), 5);
        assert_eq!(result[0].datetime, 2_000_000);
        assert_eq!(result[0].temperature, 21.0);
        assert_eq!(result[0].humidity, 60.0);
        assert_eq!(result[0].description, "day1");
        assert_eq!(result[4].datetime, 6_000_000);
        assert_eq!(result[4].temperature, 25.0);
    }

    #[test]
    fn test_5d_short_series() {
        assert!(to_5d_forecast(&[]).unwrap().is_empty());
        assert!(to_5d_forecast(&[daily(1000, 20.0, "today")]).unwrap().is_empty());

        let two = vec![daily(1000, 20.0, "day0"), daily(2000, 21.0, "day1")];
        assert_eq!(to_5d_forecast(&two).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_description_is_empty() {
        let entry: RawHourly = serde_json::from_value(serde_json::json!({
            "dt": fixed_now().timestamp(),
            "temp": 1.0,
            "humidity": 2.0
        }))
        .unwrap();

        let result = to_24h_forecast(Some(std::slice::from_ref(&entry)), fixed_now())
            .unwrap()
            .unwrap();

        assert_eq!(result[0].description, "");
    }

    #[test]
    fn test_report_combines_series() {
        let now = fixed_now();
        let raw: RawWeatherPayload = serde_json::from_value(serde_json::json!({
            "timezone": "UTC",
            "timezone_offset": 0,
            "current": {
                "temp": 20, "weather": [{ "icon": "10n" }], "clouds": 75,
                "humidity": 90, "wind_speed": 3, "wind_deg": 45
            },
            "hourly": [{ "dt": now.timestamp(), "temp": 20, "humidity": 60, "weather": [] }],
            "daily": [
                { "dt": 1000, "temp": { "day": 20 }, "humidity": 50, "weather": [] },
                { "dt": 2000, "temp": { "day": 21 }, "humidity": 55, "weather": [] }
            ]
        }))
        .unwrap();

        let report = to_report(&raw, now).unwrap();

        assert_eq!(report.overview.icon, Some(DisplayIcon::RainNight));
        assert_eq!(report.overview.visibility, None);
        assert_eq!(report.forecast_5d.len(), 1);
        assert_eq!(report.forecast_24h.map(|f| f.len()), Some(1));
    }

    #[test]
    fn test_report_without_series() {
        let raw: RawWeatherPayload = serde_json::from_value(serde_json::json!({
            "timezone": "UTC",
            "timezone_offset": 0,
            "current": {
                "temp": 20, "clouds": 0, "humidity": 50, "wind_speed": 1, "wind_deg": 0
            }
        }))
        .unwrap();

        let report = to_report(&raw, fixed_now()).unwrap();

        assert!(report.forecast_5d.is_empty());
        assert!(report.forecast_24h.is_none());
    }

    #[test]
    fn test_out_of_range_offset_is_invalid_response() {
        let err = to_overview(&current(), "UTC", 10_000_000_000_000, fixed_now()).unwrap_err();
        assert!(matches!(err, WeatherError::ProviderResponseInvalid(_)));

        let err = to_overview(&current(), "UTC", i64::MAX, fixed_now()).unwrap_err();
        assert!(matches!(err, WeatherError::ProviderResponseInvalid(_)));
    }

    #[test]
    fn test_overflowing_timestamp_is_invalid_response() {
        let samples = vec![hourly(i64::MAX / 10, 1.0, "far")];
        let err = to_24h_forecast(Some(samples.as_slice()), fixed_now()).unwrap_err();
        assert!(matches!(err, WeatherError::ProviderResponseInvalid(_)));

        let days = vec![daily(1000, 20.0, "today"), daily(i64::MAX / 10, 21.0, "far")];
        assert!(to_5d_forecast(&days).is_err());
    }
}
