//! Reduction of sub-daily forecast samples into per-day summaries, and the
//! parallel sequences the trend view binds to.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Timelike, Utc, Weekday};

use crate::{
    conditions,
    model::{ForecastDay, WeeklyForecast},
};

/// The free forecast endpoint covers five days.
pub const MAX_FORECAST_DAYS: usize = 5;

const NOON_WINDOW: std::ops::RangeInclusive<u32> = 11..=15;

/// One 3-hour forecast bucket as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    /// Unix seconds.
    pub timestamp: i64,
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub icon_code: String,
}

/// Group samples by local calendar day and summarize each day.
///
/// `utc_offset_secs` is the city's offset from UTC. Days are sorted ascending
/// and capped at [`MAX_FORECAST_DAYS`]. The representative condition comes from
/// the last sample inside the 11:00–15:00 window, or the day's first sample.
pub fn summarize_days(samples: &[ForecastSample], utc_offset_secs: i32) -> Vec<ForecastDay> {
    let offset = FixedOffset::east_opt(utc_offset_secs).unwrap_or_else(|| Utc.fix());

    let mut by_day: BTreeMap<NaiveDate, Vec<(u32, &ForecastSample)>> = BTreeMap::new();
    for sample in samples {
        let Some(utc) = DateTime::from_timestamp(sample.timestamp, 0) else {
            tracing::debug!("Skipping forecast sample with bad timestamp {}", sample.timestamp);
            continue;
        };
        let local = utc.with_timezone(&offset);
        by_day
            .entry(local.date_naive())
            .or_default()
            .push((local.hour(), sample));
    }

    by_day
        .into_iter()
        .take(MAX_FORECAST_DAYS)
        .enumerate()
        .filter_map(|(index, (date, day_samples))| {
            let (min, max) = day_samples.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(mn, mx), (_, s)| (mn.min(s.temp_min).min(s.temp), mx.max(s.temp_max).max(s.temp)),
            );

            let representative = day_samples
                .iter()
                .rev()
                .find(|(hour, _)| NOON_WINDOW.contains(hour))
                .or_else(|| day_samples.first())
                .map(|(_, s)| *s)?;
            let condition = conditions::classify(&representative.icon_code);

            Some(ForecastDay {
                date,
                label: day_label(index, date),
                min_temp: min.round() as i64,
                max_temp: max.round() as i64,
                icon: condition.icon.to_string(),
                description: condition.description.to_string(),
            })
        })
        .collect()
}

/// Relative label for the trend view: the first two days are "today" and
/// "tomorrow", the rest use the weekday.
pub fn day_label(index: usize, date: NaiveDate) -> String {
    match index {
        0 => "今天".to_string(),
        1 => "明天".to_string(),
        _ => weekday_name(date.weekday()).to_string(),
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "周一",
        Weekday::Tue => "周二",
        Weekday::Wed => "周三",
        Weekday::Thu => "周四",
        Weekday::Fri => "周五",
        Weekday::Sat => "周六",
        Weekday::Sun => "周日",
    }
}

/// Sequences produced by the client: relative label, `"{max}°C / {min}°C"`, glyph.
pub fn display_sequences(days: &[ForecastDay]) -> WeeklyForecast {
    WeeklyForecast {
        recent_days_name: days.iter().map(|d| d.label.clone()).collect(),
        recent_days_max_min_temperature: days
            .iter()
            .map(|d| format!("{}°C / {}°C", d.max_temp, d.min_temp))
            .collect(),
        recent_days_weather_description_icon: days.iter().map(|d| d.icon.clone()).collect(),
    }
}

/// Sequences the state manager attaches: date, `"{max}°/{min}°"`, `"{icon} {description}"`.
pub fn trend_sequences(days: &[ForecastDay]) -> WeeklyForecast {
    WeeklyForecast {
        recent_days_name: days.iter().map(|d| d.date.format("%Y-%m-%d").to_string()).collect(),
        recent_days_max_min_temperature: days
            .iter()
            .map(|d| format!("{}°/{}°", d.max_temp, d.min_temp))
            .collect(),
        recent_days_weather_description_icon: days
            .iter()
            .map(|d| format!("{} {}", d.icon, d.description))
            .collect(),
    }
}
