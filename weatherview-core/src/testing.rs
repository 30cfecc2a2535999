//! In-memory provider for service, state and view-model tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    WeatherProvider,
    error::ApiError,
    model::{
        CitySearchResult, CurrentWeather, DetailedInfo, FetchKind, Forecast, ForecastDay,
        WeatherPayload,
    },
};

pub fn current(city: &str, temp: i64) -> CurrentWeather {
    CurrentWeather {
        city_name: city.to_string(),
        temperature: format!("{temp}°C"),
        weather_icon: "☀️".into(),
        weather_description: "晴".into(),
        max_min_temp: format!("{}°C / {}°C", temp + 3, temp - 5),
        humidity: "40%".into(),
        pressure: "1012hPa".into(),
        wind_speed: "3.1m/s".into(),
        sunrise: "05:46".into(),
        sunset: "19:21".into(),
        timezone: 28800,
        is_detailed: false,
        detailed_info: Some(DetailedInfo {
            humidity: "40%".into(),
            wind_speed: "东北风 3.1m/s".into(),
            rainfall: "0mm".into(),
            air_quality: "--".into(),
            air_pressure: "1012hPa".into(),
            uv_index: "--".into(),
        }),
        sunrise_info: None,
    }
}

pub fn forecast(city: &str) -> Forecast {
    let day = |d: u32, label: &str, min: i64, max: i64| ForecastDay {
        date: NaiveDate::from_ymd_opt(2024, 5, d).unwrap(),
        label: label.to_string(),
        min_temp: min,
        max_temp: max,
        icon: "☀️".into(),
        description: "晴".into(),
    };
    let days = vec![day(1, "今天", 14, 25), day(2, "明天", 16, 27)];
    let weekly_forecast = crate::forecast::display_sequences(&days);

    Forecast {
        city_name: city.to_string(),
        forecast: days,
        weekly_forecast,
    }
}

/// Answers from canned tables and records every call it receives.
#[derive(Debug, Default)]
pub struct StubProvider {
    current: HashMap<String, CurrentWeather>,
    forecasts: HashMap<String, Forecast>,
    search: Vec<CitySearchResult>,
    calls: Mutex<Vec<(FetchKind, String)>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a city with both current conditions and a forecast.
    pub fn with_city(mut self, city: &str, temp: i64) -> Self {
        self.current.insert(city.to_string(), current(city, temp));
        self.forecasts.insert(city.to_string(), forecast(city));
        self
    }

    pub fn with_search_result(mut self, name: &str, country: &str) -> Self {
        self.search.push(CitySearchResult {
            name: name.to_string(),
            city_name: name.to_string(),
            country: country.to_string(),
            state: String::new(),
            lat: 0.0,
            lon: 0.0,
            full_name: format!("{name},{country}"),
        });
        self
    }

    pub fn calls(&self) -> Vec<(FetchKind, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn not_found() -> ApiError {
        ApiError::Provider {
            code: "404".into(),
            message: "city not found".into(),
        }
    }
}

#[async_trait]
impl WeatherProvider for StubProvider {
    async fn fetch(&self, kind: FetchKind, city_name: &str) -> Result<WeatherPayload, ApiError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((kind, city_name.to_string()));
        }

        match kind {
            FetchKind::Weekly | FetchKind::Daily => self
                .forecasts
                .get(city_name)
                .cloned()
                .map(WeatherPayload::Forecast)
                .ok_or_else(Self::not_found),
            FetchKind::Current | FetchKind::Detailed | FetchKind::Sunrise => {
                let mut weather = self
                    .current
                    .get(city_name)
                    .cloned()
                    .ok_or_else(Self::not_found)?;
                Ok(match kind {
                    FetchKind::Detailed => {
                        weather.is_detailed = true;
                        WeatherPayload::Detailed(weather)
                    }
                    FetchKind::Sunrise => WeatherPayload::Sunrise(weather.sunrise_info()),
                    _ => WeatherPayload::Current(weather),
                })
            }
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<CitySearchResult>, ApiError> {
        let hits: Vec<_> = self
            .search
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&query.to_lowercase()))
            .cloned()
            .collect();
        if hits.is_empty() {
            Err(ApiError::NoCitiesFound)
        } else {
            Ok(hits)
        }
    }
}
