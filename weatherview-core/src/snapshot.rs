//! The normalized weather record the views bind to.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;

use crate::{
    events::Emitter,
    model::{
        DetailedInfo, NO_CITY, PLACEHOLDER_ICON, PLACEHOLDER_MAX_MIN, PLACEHOLDER_TEMPERATURE,
        SunriseInfo, UNKNOWN_DESCRIPTION, WeatherPayload, WeeklyForecast,
    },
    state::CityRecord,
};

/// Identifies which field of a [`WeatherSnapshot`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotField {
    CityName,
    Temperature,
    WeatherIcon,
    WeatherDescription,
    MaxMinTemp,
    WeeklyForecast,
    DetailedInfo,
    SunriseInfo,
}

/// Display-ready weather for one city.
///
/// Fields start at their placeholders and are only replaced through the
/// setters, which report a [`SnapshotField`] change when the value differs.
#[derive(Debug)]
pub struct WeatherSnapshot {
    city_name: String,
    temperature: String,
    weather_icon: String,
    weather_description: String,
    max_min_temp: String,
    weekly_forecast: WeeklyForecast,
    detailed_info: Option<DetailedInfo>,
    sunrise_info: Option<SunriseInfo>,
    changes: Emitter<SnapshotField>,
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self {
            city_name: String::new(),
            temperature: PLACEHOLDER_TEMPERATURE.to_string(),
            weather_icon: PLACEHOLDER_ICON.to_string(),
            weather_description: UNKNOWN_DESCRIPTION.to_string(),
            max_min_temp: PLACEHOLDER_MAX_MIN.to_string(),
            weekly_forecast: WeeklyForecast::default(),
            detailed_info: None,
            sunrise_info: None,
            changes: Emitter::new(),
        }
    }
}

/// Subscribers are not carried over to the copy.
impl Clone for WeatherSnapshot {
    fn clone(&self) -> Self {
        Self {
            city_name: self.city_name.clone(),
            temperature: self.temperature.clone(),
            weather_icon: self.weather_icon.clone(),
            weather_description: self.weather_description.clone(),
            max_min_temp: self.max_min_temp.clone(),
            weekly_forecast: self.weekly_forecast.clone(),
            detailed_info: self.detailed_info.clone(),
            sunrise_info: self.sunrise_info.clone(),
            changes: Emitter::new(),
        }
    }
}

impl PartialEq for WeatherSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.city_name == other.city_name
            && self.temperature == other.temperature
            && self.weather_icon == other.weather_icon
            && self.weather_description == other.weather_description
            && self.max_min_temp == other.max_min_temp
            && self.weekly_forecast == other.weekly_forecast
            && self.detailed_info == other.detailed_info
            && self.sunrise_info == other.sunrise_info
    }
}

fn text(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Nested record from the map form; an empty or malformed map is `None`.
fn record<T: DeserializeOwned>(raw: &Value, key: &str) -> Option<T> {
    let value = raw.get(key)?;
    if value.as_object().is_none_or(Map::is_empty) {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

fn weekly(raw: &Value) -> Option<WeeklyForecast> {
    raw.get("weeklyForecast")
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

fn or_empty_map<T: serde::Serialize>(value: Option<&T>) -> Value {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or_else(|| json!({}))
}

impl WeatherSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder snapshot shown before any city is loaded.
    pub fn create_empty() -> Self {
        Self {
            city_name: NO_CITY.to_string(),
            ..Self::default()
        }
    }

    /// Build from the structured-map form. Missing keys keep their placeholders;
    /// anything that is not a non-empty map yields [`WeatherSnapshot::create_empty`].
    pub fn from_raw_data(raw: &Value) -> Self {
        if raw.as_object().is_none_or(Map::is_empty) {
            return Self::create_empty();
        }

        let mut snapshot = Self::new();
        snapshot.update_data(raw);
        snapshot
    }

    pub fn from_payload(payload: &WeatherPayload) -> Self {
        Self::from_raw_data(&payload.to_raw())
    }

    /// Start from the fields cached in a recent-cities entry; blank fields
    /// keep their placeholders.
    pub fn from_city(city: &CityRecord) -> Self {
        if city.is_empty() {
            return Self::create_empty();
        }

        let mut snapshot = Self::new();
        snapshot.set_city_name(city.city_name.as_str());
        if !city.temperature.is_empty() {
            snapshot.set_temperature(city.temperature.as_str());
        }
        if !city.weather_icon.is_empty() {
            snapshot.set_weather_icon(city.weather_icon.as_str());
        }
        if !city.weather_description.is_empty() {
            snapshot.set_weather_description(city.weather_description.as_str());
        }
        if !city.max_min_temp.is_empty() {
            snapshot.set_max_min_temp(city.max_min_temp.as_str());
        }
        snapshot
    }

    pub fn to_object(&self) -> Value {
        json!({
            "cityName": self.city_name,
            "temperature": self.temperature,
            "weatherIcon": self.weather_icon,
            "weatherDescription": self.weather_description,
            "maxMinTemp": self.max_min_temp,
            "weeklyForecast": or_empty_map(Some(&self.weekly_forecast)),
            "detailedInfo": or_empty_map(self.detailed_info.as_ref()),
            "sunriseInfo": or_empty_map(self.sunrise_info.as_ref()),
        })
    }

    /// Apply every field present in `raw`. Returns whether anything changed.
    pub fn update_data(&mut self, raw: &Value) -> bool {
        if raw.as_object().is_none_or(Map::is_empty) {
            return false;
        }

        let mut changed = false;
        if let Some(v) = text(raw, "cityName") {
            changed |= self.set_city_name(v);
        }
        if let Some(v) = text(raw, "temperature") {
            changed |= self.set_temperature(v);
        }
        if let Some(v) = text(raw, "weatherIcon") {
            changed |= self.set_weather_icon(v);
        }
        if let Some(v) = text(raw, "weatherDescription") {
            changed |= self.set_weather_description(v);
        }
        if let Some(v) = text(raw, "maxMinTemp") {
            changed |= self.set_max_min_temp(v);
        }
        if let Some(v) = weekly(raw) {
            changed |= self.set_weekly_forecast(v);
        }
        if raw.get("detailedInfo").is_some() {
            changed |= self.set_detailed_info(record(raw, "detailedInfo"));
        }
        if raw.get("sunriseInfo").is_some() {
            changed |= self.set_sunrise_info(record(raw, "sunriseInfo"));
        }
        changed
    }

    /// True once every placeholder has been overwritten with real data.
    pub fn is_valid(&self) -> bool {
        !self.city_name.is_empty()
            && self.city_name != NO_CITY
            && self.temperature != PLACEHOLDER_TEMPERATURE
            && self.weather_icon != PLACEHOLDER_ICON
            && self.weather_description != UNKNOWN_DESCRIPTION
            && self.max_min_temp != PLACEHOLDER_MAX_MIN
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SnapshotField> {
        self.changes.subscribe()
    }

    pub fn city_name(&self) -> &str {
        &self.city_name
    }

    pub fn temperature(&self) -> &str {
        &self.temperature
    }

    pub fn weather_icon(&self) -> &str {
        &self.weather_icon
    }

    pub fn weather_description(&self) -> &str {
        &self.weather_description
    }

    pub fn max_min_temp(&self) -> &str {
        &self.max_min_temp
    }

    pub fn weekly_forecast(&self) -> &WeeklyForecast {
        &self.weekly_forecast
    }

    pub fn detailed_info(&self) -> Option<&DetailedInfo> {
        self.detailed_info.as_ref()
    }

    pub fn sunrise_info(&self) -> Option<&SunriseInfo> {
        self.sunrise_info.as_ref()
    }

    pub fn set_city_name(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        replace(&mut self.city_name, value, SnapshotField::CityName, &mut self.changes)
    }

    pub fn set_temperature(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        replace(&mut self.temperature, value, SnapshotField::Temperature, &mut self.changes)
    }

    pub fn set_weather_icon(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        replace(&mut self.weather_icon, value, SnapshotField::WeatherIcon, &mut self.changes)
    }

    pub fn set_weather_description(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        replace(
            &mut self.weather_description,
            value,
            SnapshotField::WeatherDescription,
            &mut self.changes,
        )
    }

    pub fn set_max_min_temp(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        replace(&mut self.max_min_temp, value, SnapshotField::MaxMinTemp, &mut self.changes)
    }

    pub fn set_weekly_forecast(&mut self, value: WeeklyForecast) -> bool {
        replace(&mut self.weekly_forecast, value, SnapshotField::WeeklyForecast, &mut self.changes)
    }

    pub fn set_detailed_info(&mut self, value: Option<DetailedInfo>) -> bool {
        replace(&mut self.detailed_info, value, SnapshotField::DetailedInfo, &mut self.changes)
    }

    pub fn set_sunrise_info(&mut self, value: Option<SunriseInfo>) -> bool {
        replace(&mut self.sunrise_info, value, SnapshotField::SunriseInfo, &mut self.changes)
    }
}

fn replace<T: PartialEq>(
    slot: &mut T,
    value: T,
    field: SnapshotField,
    changes: &mut Emitter<SnapshotField>,
) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    changes.emit(field);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::drain, testing};

    #[test]
    fn empty_snapshot_is_invalid() {
        let snapshot = WeatherSnapshot::create_empty();

        assert_eq!(snapshot.city_name(), NO_CITY);
        assert_eq!(snapshot.temperature(), PLACEHOLDER_TEMPERATURE);
        assert!(!snapshot.is_valid());
    }

    #[test]
    fn fully_populated_snapshot_is_valid() {
        let payload = WeatherPayload::Current(testing::current("北京", 21));

        let snapshot = WeatherSnapshot::from_payload(&payload);

        assert!(snapshot.is_valid());
        assert_eq!(snapshot.temperature(), "21°C");
        assert_eq!(snapshot.detailed_info().map(|d| d.humidity.as_str()), Some("40%"));
    }

    #[test]
    fn any_placeholder_left_makes_it_invalid() {
        let mut snapshot = WeatherSnapshot::from_payload(&WeatherPayload::Current(
            testing::current("北京", 21),
        ));

        snapshot.set_weather_description(UNKNOWN_DESCRIPTION);

        assert!(!snapshot.is_valid());
    }

    #[test]
    fn no_city_label_is_a_placeholder() {
        let mut snapshot = WeatherSnapshot::from_payload(&WeatherPayload::Current(
            testing::current("北京", 21),
        ));
        assert!(snapshot.is_valid());

        snapshot.set_city_name(NO_CITY);

        assert!(!snapshot.is_valid());
    }

    #[test]
    fn city_record_fields_seed_the_snapshot() {
        let mut city = CityRecord::named("上海");
        city.temperature = "19°C".into();
        city.weather_description = "多云".into();

        let snapshot = WeatherSnapshot::from_city(&city);

        assert_eq!(snapshot.city_name(), "上海");
        assert_eq!(snapshot.temperature(), "19°C");
        assert_eq!(snapshot.weather_description(), "多云");
        assert_eq!(snapshot.weather_icon(), PLACEHOLDER_ICON);
        assert_eq!(WeatherSnapshot::from_city(&CityRecord::default()).city_name(), NO_CITY);
    }

    #[test]
    fn map_form_round_trips() {
        let mut weather = testing::current("上海", 19);
        weather.sunrise_info = Some(weather.sunrise_info());
        let mut snapshot = WeatherSnapshot::from_payload(&WeatherPayload::Current(weather));
        snapshot.set_weekly_forecast(testing::forecast("上海").weekly_forecast);

        let back = WeatherSnapshot::from_raw_data(&snapshot.to_object());

        assert_eq!(back, snapshot);
    }

    #[test]
    fn placeholder_snapshot_round_trips() {
        let snapshot = WeatherSnapshot::create_empty();
        assert_eq!(WeatherSnapshot::from_raw_data(&snapshot.to_object()), snapshot);
    }

    #[test]
    fn non_map_input_gives_placeholder() {
        assert_eq!(WeatherSnapshot::from_raw_data(&json!({})), WeatherSnapshot::create_empty());
        assert_eq!(WeatherSnapshot::from_raw_data(&json!([1, 2])), WeatherSnapshot::create_empty());
    }

    #[test]
    fn setters_notify_only_on_change() {
        let mut snapshot = WeatherSnapshot::new();
        let mut rx = snapshot.subscribe();

        assert!(snapshot.set_temperature("20°C"));
        assert!(!snapshot.set_temperature("20°C"));
        assert!(!snapshot.set_weather_icon(PLACEHOLDER_ICON));

        assert_eq!(drain(&mut rx), vec![SnapshotField::Temperature]);
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut snapshot = WeatherSnapshot::from_payload(&WeatherPayload::Current(
            testing::current("北京", 21),
        ));
        let forecast = WeatherPayload::Forecast(testing::forecast("北京"));

        let changed = snapshot.update_data(&forecast.to_raw());

        assert!(changed);
        assert_eq!(snapshot.temperature(), "21°C");
        assert_eq!(snapshot.weekly_forecast().len(), 2);
    }
}
