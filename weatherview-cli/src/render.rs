use std::fmt::Write;

use chrono::{FixedOffset, Local};
use weatherview_core::{
    App, CityRecord, WeatherPayload, WeatherSnapshot, model::WeeklyForecast, state::ViewMode,
};

/// Text rendering of whatever the app is currently showing.
pub fn render(app: &App) -> String {
    let mut out = String::new();
    let state = app.state();
    let navigation = app.navigation();
    let weather = app.weather();

    let strip = recent_strip(state.recent_cities(), state.current_city_index());
    if !strip.is_empty() {
        let _ = writeln!(out, "{strip}");
    }

    if let Some(view) = navigation.current_view_info() {
        let _ = writeln!(out, "{} {}", view.icon, view.name);
    }

    let snapshot = weather.snapshot();
    match ViewMode::try_from(navigation.current_view()) {
        Ok(ViewMode::Today) => today(&mut out, snapshot),
        Ok(ViewMode::Weekly) => {
            let weekly = match state.weather_data() {
                Some(WeatherPayload::Forecast(f)) if f.city_name == snapshot.city_name() => {
                    &f.weekly_forecast
                }
                _ => snapshot.weekly_forecast(),
            };
            trend(&mut out, snapshot.city_name(), weekly);
        }
        Ok(ViewMode::Detailed) => detailed(&mut out, snapshot),
        Ok(ViewMode::Sunrise) => sunrise(&mut out, snapshot),
        Err(_) => {
            let _ = writeln!(out, "{}", weather.current_weather_data());
        }
    }

    if !weather.error_message().is_empty() {
        let _ = writeln!(out, "⚠️  {}", weather.error_message());
    }
    let _ = write!(out, "Updated {}", Local::now().format("%H:%M:%S"));
    out
}

/// Recent cities on one line, the current one in brackets.
pub fn recent_strip(cities: &[CityRecord], current: usize) -> String {
    cities
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == current {
                format!("[{}]", c.city_name)
            } else {
                c.city_name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn today(out: &mut String, s: &WeatherSnapshot) {
    let _ = writeln!(out, "{}", s.city_name());
    let _ = writeln!(out, "  {} {}  {}", s.weather_icon(), s.weather_description(), s.temperature());
    let _ = writeln!(out, "  High / Low: {}", s.max_min_temp());
}

fn trend(out: &mut String, city: &str, weekly: &WeeklyForecast) {
    let _ = writeln!(out, "{city}");
    if weekly.is_empty() {
        let _ = writeln!(out, "  No forecast loaded");
        return;
    }
    let rows = weekly
        .recent_days_name
        .iter()
        .zip(&weekly.recent_days_max_min_temperature)
        .zip(&weekly.recent_days_weather_description_icon);
    for ((day, temps), condition) in rows {
        let _ = writeln!(out, "  {day:<12} {temps:<14} {condition}");
    }
}

fn detailed(out: &mut String, s: &WeatherSnapshot) {
    let _ = writeln!(out, "{}", s.city_name());
    let Some(info) = s.detailed_info() else {
        let _ = writeln!(out, "  No details loaded");
        return;
    };
    let _ = writeln!(out, "  Humidity:    {}", info.humidity);
    let _ = writeln!(out, "  Wind:        {}", info.wind_speed);
    let _ = writeln!(out, "  Rainfall:    {}", info.rainfall);
    let _ = writeln!(out, "  Air quality: {}", info.air_quality);
    let _ = writeln!(out, "  Pressure:    {}", info.air_pressure);
    let _ = writeln!(out, "  UV index:    {}", info.uv_index);
}

fn sunrise(out: &mut String, s: &WeatherSnapshot) {
    let _ = writeln!(out, "{}", s.city_name());
    let Some(info) = s.sunrise_info() else {
        let _ = writeln!(out, "  No sunrise data loaded");
        return;
    };
    let _ = writeln!(out, "  Sunrise: {}", info.sunrise);
    let _ = writeln!(out, "  Sunset:  {}", info.sunset);
    let _ = writeln!(out, "  {}", utc_offset(info.timezone));
}

/// `UTC+05:30` style label for an offset in seconds east of UTC.
fn utc_offset(seconds: i32) -> String {
    match FixedOffset::east_opt(seconds) {
        Some(offset) => format!("UTC{offset}"),
        None => "UTC".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_marks_current_city() {
        let cities = vec![CityRecord::named("北京"), CityRecord::named("上海")];

        assert_eq!(recent_strip(&cities, 1), "北京  [上海]");
        assert_eq!(recent_strip(&[], 0), "");
    }

    #[test]
    fn utc_offset_keeps_minutes() {
        assert_eq!(utc_offset(28800), "UTC+08:00");
        assert_eq!(utc_offset(19800), "UTC+05:30");
        assert_eq!(utc_offset(-12600), "UTC-03:30");
        assert_eq!(utc_offset(0), "UTC+00:00");
    }

    #[test]
    fn trend_lists_each_day() {
        let weekly = WeeklyForecast {
            recent_days_name: vec!["今天".into(), "明天".into()],
            recent_days_max_min_temperature: vec!["25°C / 14°C".into(), "27°C / 16°C".into()],
            recent_days_weather_description_icon: vec!["☀️".into(), "🌦️".into()],
        };
        let mut out = String::new();

        trend(&mut out, "北京", &weekly);

        assert_eq!(out.lines().count(), 3);
        assert!(out.contains("明天"));
    }
}
