use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    cities::{CityCodeTable, translate_city_name},
    conditions,
    config::ProviderSettings,
    error::ApiError,
    forecast::{self, ForecastSample},
    model::{
        CitySearchResult, CurrentWeather, DetailedInfo, FetchKind, Forecast, PLACEHOLDER_FIELD,
        PLACEHOLDER_TIME, WeatherPayload,
    },
};

use super::WeatherProvider;

const USER_AGENT: &str = "WeatherApp/1.0";
const UNITS: &str = "metric";
const SEARCH_LIMIT: &str = "5";

/// Client for the OpenWeather current-weather, 5-day forecast and geocoding APIs.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    geocoding_url: String,
    lang: String,
    city_codes: Arc<CityCodeTable>,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(
        api_key: String,
        settings: &ProviderSettings,
        city_codes: CityCodeTable,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            geocoding_url: settings.geocoding_url.trim_end_matches('/').to_string(),
            lang: settings.lang.clone(),
            city_codes: Arc::new(city_codes),
            http,
        })
    }

    fn endpoint(&self, kind: FetchKind) -> String {
        let path = match kind {
            FetchKind::Current | FetchKind::Detailed | FetchKind::Sunrise => "weather",
            FetchKind::Weekly | FetchKind::Daily => "forecast",
        };
        format!("{}/{}", self.base_url, path)
    }

    /// Cities present in the code table are addressed by provider id.
    fn location_param(&self, city_name: &str) -> (&'static str, String) {
        match self.city_codes.code(city_name) {
            Some(code) => ("id", code.to_string()),
            None => ("q", city_name.to_string()),
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        tracing::debug!("Sending request to: {url}");

        let res = self.http.get(url).query(query).send().await?;

        let status = res.status();
        let body = res.text().await?;

        interpret_response(status, &body)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, kind: FetchKind, city_name: &str) -> Result<WeatherPayload, ApiError> {
        let (location_key, location) = self.location_param(city_name);
        let url = self.endpoint(kind);

        let json = self
            .get_json(
                &url,
                &[
                    (location_key, location.as_str()),
                    ("appid", self.api_key.as_str()),
                    ("units", UNITS),
                    ("lang", self.lang.as_str()),
                ],
            )
            .await?;

        let payload = match kind {
            FetchKind::Current => WeatherPayload::Current(parse_current(json)?),
            FetchKind::Detailed => {
                let mut current = parse_current(json)?;
                current.is_detailed = true;
                WeatherPayload::Detailed(current)
            }
            FetchKind::Sunrise => WeatherPayload::Sunrise(parse_current(json)?.sunrise_info()),
            FetchKind::Weekly | FetchKind::Daily => WeatherPayload::Forecast(parse_forecast(json)?),
        };

        tracing::debug!("Parsed {kind} response for {city_name}");
        Ok(payload)
    }

    async fn search(&self, query: &str) -> Result<Vec<CitySearchResult>, ApiError> {
        let url = format!("{}/direct", self.geocoding_url);

        let json = self
            .get_json(
                &url,
                &[
                    ("q", query),
                    ("appid", self.api_key.as_str()),
                    ("limit", SEARCH_LIMIT),
                ],
            )
            .await?;

        parse_search(json)
    }
}

/// Classify a finished response: provider error codes first, then HTTP status,
/// then JSON validity.
fn interpret_response(status: StatusCode, body: &str) -> Result<Value, ApiError> {
    let parsed = serde_json::from_str::<Value>(body);

    if let Ok(json) = &parsed {
        check_provider_code(json)?;
    }

    if !status.is_success() {
        return Err(ApiError::Status(status));
    }

    parsed.map_err(|e| {
        tracing::debug!("JSON parse error: {e}");
        ApiError::InvalidJson
    })
}

/// OpenWeather embeds `cod` as a number on `/weather` and as a string on `/forecast`.
fn check_provider_code(json: &Value) -> Result<(), ApiError> {
    let Some(cod) = json.get("cod") else {
        return Ok(());
    };

    let code = match cod {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if code == "200" {
        return Ok(());
    }

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Provider error {code}"));

    Err(ApiError::Provider { code, message })
}

fn decode<T: DeserializeOwned>(json: Value) -> Result<T, ApiError> {
    serde_json::from_value(json).map_err(|e| {
        tracing::debug!("Unexpected response shape: {e}");
        ApiError::InvalidJson
    })
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
    sys: Option<OwSys>,
    rain: Option<OwRain>,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeocode {
    name: String,
    #[serde(default)]
    country: String,
    state: Option<String>,
    lat: f64,
    lon: f64,
}

pub fn parse_current(json: Value) -> Result<CurrentWeather, ApiError> {
    let parsed: OwCurrentResponse = decode(json)?;

    let icon_code = parsed.weather.first().map(|w| w.icon.as_str()).unwrap_or_default();
    let condition = conditions::classify(icon_code);

    let main = &parsed.main;
    let high = main.temp_max.unwrap_or(main.temp).round() as i64;
    let low = main.temp_min.unwrap_or(main.temp).round() as i64;

    let humidity = main
        .humidity
        .map(|h| format!("{}%", h.round() as i64))
        .unwrap_or_else(|| PLACEHOLDER_FIELD.to_string());
    let pressure = main
        .pressure
        .map(|p| format!("{}hPa", p.round() as i64))
        .unwrap_or_else(|| PLACEHOLDER_FIELD.to_string());
    let wind_speed = parsed
        .wind
        .as_ref()
        .map(|w| format!("{:.1}m/s", w.speed))
        .unwrap_or_else(|| PLACEHOLDER_FIELD.to_string());
    let wind_label = match parsed.wind.as_ref().and_then(|w| w.deg) {
        Some(deg) => format!("{} {}", wind_direction(deg), wind_speed),
        None => wind_speed.clone(),
    };
    let rainfall = parsed
        .rain
        .and_then(|r| r.one_hour)
        .map(|mm| format!("{mm:.1}mm"))
        .unwrap_or_else(|| "0mm".to_string());

    let clock = |ts: Option<i64>| {
        ts.and_then(|ts| format_clock(ts, parsed.timezone))
            .unwrap_or_else(|| PLACEHOLDER_TIME.to_string())
    };
    let sunrise = clock(parsed.sys.as_ref().and_then(|s| s.sunrise));
    let sunset = clock(parsed.sys.as_ref().and_then(|s| s.sunset));

    Ok(CurrentWeather {
        city_name: translate_city_name(&parsed.name),
        temperature: format!("{}°C", main.temp.round() as i64),
        weather_icon: condition.icon.to_string(),
        weather_description: condition.description.to_string(),
        max_min_temp: format!("{high}°C / {low}°C"),
        detailed_info: Some(DetailedInfo {
            humidity: humidity.clone(),
            wind_speed: wind_label,
            rainfall,
            air_quality: PLACEHOLDER_FIELD.to_string(),
            air_pressure: pressure.clone(),
            uv_index: PLACEHOLDER_FIELD.to_string(),
        }),
        humidity,
        pressure,
        wind_speed,
        sunrise,
        sunset,
        timezone: parsed.timezone,
        is_detailed: false,
        sunrise_info: None,
    })
}

pub fn parse_forecast(json: Value) -> Result<Forecast, ApiError> {
    let parsed: OwForecastResponse = decode(json)?;

    let samples: Vec<ForecastSample> = parsed
        .list
        .into_iter()
        .map(|entry| ForecastSample {
            timestamp: entry.dt,
            temp: entry.main.temp,
            temp_min: entry.main.temp_min.unwrap_or(entry.main.temp),
            temp_max: entry.main.temp_max.unwrap_or(entry.main.temp),
            icon_code: entry.weather.into_iter().next().map(|w| w.icon).unwrap_or_default(),
        })
        .collect();

    let days = forecast::summarize_days(&samples, parsed.city.timezone);
    tracing::debug!("Parsed weekly forecast with {} days", days.len());

    Ok(Forecast {
        city_name: translate_city_name(&parsed.city.name),
        weekly_forecast: forecast::display_sequences(&days),
        forecast: days,
    })
}

pub fn parse_search(json: Value) -> Result<Vec<CitySearchResult>, ApiError> {
    let geocodes: Vec<OwGeocode> = decode(json)?;
    if geocodes.is_empty() {
        return Err(ApiError::NoCitiesFound);
    }

    Ok(geocodes
        .into_iter()
        .map(|g| {
            let state = g.state.unwrap_or_default();
            let mut full_name = g.name.clone();
            if !state.is_empty() {
                full_name.push(',');
                full_name.push_str(&state);
            }
            full_name.push(',');
            full_name.push_str(&g.country);

            CitySearchResult {
                city_name: g.name.clone(),
                name: g.name,
                country: g.country,
                state,
                lat: g.lat,
                lon: g.lon,
                full_name,
            }
        })
        .collect())
}

/// `HH:MM` in the city's local time.
fn format_clock(timestamp: i64, utc_offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(utc_offset_secs)?;
    let utc = DateTime::from_timestamp(timestamp, 0)?;
    Some(utc.with_timezone(&offset).format("%H:%M").to_string())
}

fn wind_direction(deg: f64) -> &'static str {
    const DIRECTIONS: [&str; 8] = ["北风", "东北风", "东风", "东南风", "南风", "西南风", "西风", "西北风"];
    let sector = ((deg.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8;
    DIRECTIONS[sector]
}
