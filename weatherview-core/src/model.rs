use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const PLACEHOLDER_TEMPERATURE: &str = "--°C";
pub const PLACEHOLDER_MAX_MIN: &str = "--°C / --°C";
pub const PLACEHOLDER_ICON: &str = "🌤️";
pub const UNKNOWN_DESCRIPTION: &str = "未知";
pub const NO_CITY: &str = "暂无城市";
pub const PLACEHOLDER_TIME: &str = "--:--";
pub const PLACEHOLDER_FIELD: &str = "--";

/// The operations a provider can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Current,
    Weekly,
    Daily,
    Detailed,
    Sunrise,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchKind::Current => "current",
            FetchKind::Weekly => "weekly",
            FetchKind::Daily => "daily",
            FetchKind::Detailed => "detailed",
            FetchKind::Sunrise => "sunrise",
        }
    }
}

impl std::fmt::Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bag of secondary readings shown on the detailed view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetailedInfo {
    pub humidity: String,
    pub wind_speed: String,
    pub rainfall: String,
    pub air_quality: String,
    pub air_pressure: String,
    pub uv_index: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SunriseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    pub sunrise: String,
    pub sunset: String,
    /// Offset from UTC in seconds.
    pub timezone: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub city_name: String,
    pub temperature: String,
    pub weather_icon: String,
    pub weather_description: String,
    pub max_min_temp: String,
    pub humidity: String,
    pub pressure: String,
    pub wind_speed: String,
    pub sunrise: String,
    pub sunset: String,
    pub timezone: i32,
    /// Set by the client for the detailed view.
    #[serde(default)]
    pub is_detailed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_info: Option<DetailedInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunrise_info: Option<SunriseInfo>,
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

impl CurrentWeather {
    /// Sunrise view data; missing times become `--:--`.
    pub fn sunrise_info(&self) -> SunriseInfo {
        SunriseInfo {
            city_name: Some(self.city_name.clone()),
            sunrise: or_placeholder(&self.sunrise, PLACEHOLDER_TIME),
            sunset: or_placeholder(&self.sunset, PLACEHOLDER_TIME),
            timezone: self.timezone,
        }
    }

    /// Detailed view data built from whatever readings are present.
    pub fn fallback_detailed_info(&self) -> DetailedInfo {
        DetailedInfo {
            humidity: or_placeholder(&self.humidity, PLACEHOLDER_FIELD),
            wind_speed: or_placeholder(&self.wind_speed, PLACEHOLDER_FIELD),
            rainfall: "0mm".to_string(),
            air_quality: PLACEHOLDER_FIELD.to_string(),
            air_pressure: or_placeholder(&self.pressure, "--hPa"),
            uv_index: PLACEHOLDER_FIELD.to_string(),
        }
    }
}

/// One summarized forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    /// Relative label: today, tomorrow or the weekday name.
    pub label: String,
    pub min_temp: i64,
    pub max_temp: i64,
    pub icon: String,
    pub description: String,
}

/// Three parallel sequences the trend view binds to, one entry per day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeeklyForecast {
    pub recent_days_name: Vec<String>,
    pub recent_days_max_min_temperature: Vec<String>,
    pub recent_days_weather_description_icon: Vec<String>,
}

impl WeeklyForecast {
    pub fn len(&self) -> usize {
        self.recent_days_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent_days_name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub city_name: String,
    pub forecast: Vec<ForecastDay>,
    pub weekly_forecast: WeeklyForecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySearchResult {
    pub name: String,
    pub city_name: String,
    pub country: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            city_name: None,
        }
    }
}

/// Everything a fetch can deliver. Failures are ordinary values.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherPayload {
    Current(CurrentWeather),
    Detailed(CurrentWeather),
    Forecast(Forecast),
    Sunrise(SunriseInfo),
    Error(ErrorPayload),
}

impl WeatherPayload {
    pub fn has_error(&self) -> bool {
        matches!(self, WeatherPayload::Error(_))
    }

    pub fn city_name(&self) -> Option<&str> {
        match self {
            WeatherPayload::Current(c) | WeatherPayload::Detailed(c) => Some(&c.city_name),
            WeatherPayload::Forecast(f) => Some(&f.city_name),
            WeatherPayload::Sunrise(s) => s.city_name.as_deref(),
            WeatherPayload::Error(e) => e.city_name.as_deref(),
        }
    }

    /// Structured-map form consumed by [`crate::WeatherSnapshot::from_raw_data`].
    pub fn to_raw(&self) -> Value {
        match self {
            WeatherPayload::Current(c) | WeatherPayload::Detailed(c) => {
                serde_json::to_value(c).unwrap_or_default()
            }
            WeatherPayload::Forecast(f) => serde_json::to_value(f).unwrap_or_default(),
            WeatherPayload::Sunrise(s) => {
                let mut raw = json!({ "sunriseInfo": s });
                if let Some(name) = &s.city_name {
                    raw["cityName"] = Value::String(name.clone());
                }
                raw
            }
            WeatherPayload::Error(e) => {
                let mut raw = serde_json::to_value(e).unwrap_or_default();
                raw["hasError"] = Value::Bool(true);
                raw
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> CurrentWeather {
        CurrentWeather {
            city_name: "北京".into(),
            temperature: "21°C".into(),
            weather_icon: "☀️".into(),
            weather_description: "晴".into(),
            max_min_temp: "24°C / 15°C".into(),
            humidity: "40%".into(),
            pressure: "1012hPa".into(),
            wind_speed: "3.1m/s".into(),
            sunrise: "05:46".into(),
            sunset: "19:21".into(),
            timezone: 28800,
            is_detailed: false,
            detailed_info: None,
            sunrise_info: None,
        }
    }

    #[test]
    fn current_payload_raw_form_uses_camel_case_keys() {
        let raw = WeatherPayload::Current(current()).to_raw();

        assert_eq!(raw["cityName"], "北京");
        assert_eq!(raw["maxMinTemp"], "24°C / 15°C");
        assert!(raw.get("detailedInfo").is_none());
    }

    #[test]
    fn derived_records_fall_back_to_placeholders() {
        let mut weather = current();
        weather.sunset.clear();
        weather.pressure.clear();

        let sunrise = weather.sunrise_info();
        assert_eq!(sunrise.sunrise, "05:46");
        assert_eq!(sunrise.sunset, PLACEHOLDER_TIME);

        let detailed = weather.fallback_detailed_info();
        assert_eq!(detailed.humidity, "40%");
        assert_eq!(detailed.air_pressure, "--hPa");
        assert_eq!(detailed.uv_index, PLACEHOLDER_FIELD);
    }

    #[test]
    fn sunrise_payload_nests_info() {
        let raw = WeatherPayload::Sunrise(SunriseInfo {
            city_name: Some("上海".into()),
            sunrise: "05:30".into(),
            sunset: "18:55".into(),
            timezone: 28800,
        })
        .to_raw();

        assert_eq!(raw["cityName"], "上海");
        assert_eq!(raw["sunriseInfo"]["sunset"], "18:55");
    }

    #[test]
    fn error_payload_is_flagged() {
        let payload = WeatherPayload::Error(ErrorPayload::new("boom"));
        assert!(payload.has_error());
        assert_eq!(payload.to_raw()["hasError"], true);
        assert_eq!(payload.city_name(), None);
    }
}
