//! Application state: recently viewed cities, the active city and view, and the
//! latest weather payload.

use std::{cell::RefCell, fmt, rc::Rc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    config::DEFAULT_MAX_CITIES,
    events::Emitter,
    forecast,
    model::{CurrentWeather, ErrorPayload, WeatherPayload},
    service::{ServiceEvent, WeatherDataService},
};

/// Shared, single-threaded handle the view-models hold.
pub type StateHandle = Rc<RefCell<AppStateManager>>;

/// Summary of a city as shown in the recent-cities strip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CityRecord {
    pub city_name: String,
    pub temperature: String,
    pub weather_icon: String,
    pub weather_description: String,
    pub max_min_temp: String,
}

impl CityRecord {
    pub fn named(city_name: impl Into<String>) -> Self {
        Self {
            city_name: city_name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.city_name.is_empty()
    }
}

impl From<&CurrentWeather> for CityRecord {
    fn from(weather: &CurrentWeather) -> Self {
        Self {
            city_name: weather.city_name.clone(),
            temperature: weather.temperature.clone(),
            weather_icon: weather.weather_icon.clone(),
            weather_description: weather.weather_description.clone(),
            max_min_temp: weather.max_min_temp.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    #[serde(rename = "today_weather")]
    Today,
    #[serde(rename = "temperature_trend")]
    Weekly,
    #[serde(rename = "detailed_info")]
    Detailed,
    #[serde(rename = "sunrise_sunset")]
    Sunrise,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Today,
        ViewMode::Weekly,
        ViewMode::Detailed,
        ViewMode::Sunrise,
    ];

    /// The view id used by navigation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Today => "today_weather",
            ViewMode::Weekly => "temperature_trend",
            ViewMode::Detailed => "detailed_info",
            ViewMode::Sunrise => "sunrise_sunset",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ViewMode {
    type Error = String;

    fn try_from(id: &str) -> Result<Self, Self::Error> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == id)
            .ok_or_else(|| format!("Unknown view mode: {id}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestType {
    WeeklyForecast,
    DetailedInfo,
    SunriseInfo,
}

/// Marker returned when view data was requested and will arrive later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRequest {
    pub city_name: String,
    pub request_type: RequestType,
}

/// The current city as seen by the active view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityView {
    #[serde(flatten)]
    pub city: CityRecord,
    pub view_mode: ViewMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ViewRequest>,
}

impl CityView {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    CurrentCityChanged(CityRecord),
    RecentCitiesChanged(Vec<CityRecord>),
    CurrentCityIndexChanged(usize),
    MaxCitiesChanged(usize),
    ViewModeChanged(ViewMode),
    /// The active city or view changed; carries the view-derived data.
    CityChanged(CityView),
    WeatherDataChanged(WeatherPayload),
}

/// Owner of the application state.
///
/// Mutations happen on one thread; every observable change is announced as a
/// [`StateEvent`] to subscribers.
#[derive(Debug)]
pub struct AppStateManager {
    initialized: bool,
    current_city: CityRecord,
    view_mode: ViewMode,
    recent_cities: Vec<CityRecord>,
    current_city_index: usize,
    max_cities: usize,
    weather_data: Option<WeatherPayload>,
    service: WeatherDataService,
    changes: Emitter<StateEvent>,
}

impl AppStateManager {
    pub fn new(service: WeatherDataService) -> Self {
        Self {
            initialized: false,
            current_city: CityRecord::default(),
            view_mode: ViewMode::default(),
            recent_cities: Vec::new(),
            current_city_index: 0,
            max_cities: DEFAULT_MAX_CITIES,
            weather_data: None,
            service,
            changes: Emitter::new(),
        }
    }

    pub fn into_handle(self) -> StateHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StateEvent> {
        self.changes.subscribe()
    }

    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.load_sample_data();
        self.initialized = true;
        tracing::debug!("State manager initialized");
    }

    /// Nothing is persisted between runs, so the recent list starts empty.
    pub fn load_sample_data(&mut self) {
        self.recent_cities.clear();
        self.changes.emit(StateEvent::RecentCitiesChanged(Vec::new()));
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The active city, or `None` before any city was chosen.
    pub fn current_city(&self) -> Option<&CityRecord> {
        (!self.current_city.is_empty()).then_some(&self.current_city)
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn recent_cities(&self) -> &[CityRecord] {
        &self.recent_cities
    }

    pub fn current_city_index(&self) -> usize {
        self.current_city_index
    }

    pub fn max_cities(&self) -> usize {
        self.max_cities
    }

    pub fn weather_data(&self) -> Option<&WeatherPayload> {
        self.weather_data.as_ref()
    }

    pub fn set_current_city(&mut self, city: CityRecord) {
        if city.is_empty() {
            return;
        }
        tracing::info!("Current city: {}", city.city_name);
        self.current_city = city.clone();
        self.add_to_recent_cities(city);
        self.changes
            .emit(StateEvent::CurrentCityChanged(self.current_city.clone()));
    }

    /// Move `city` to the front of the recent list, dropping any older entry
    /// with the same name and anything beyond `max_cities`.
    pub fn add_to_recent_cities(&mut self, city: CityRecord) {
        if city.is_empty() {
            return;
        }

        self.recent_cities.retain(|c| c.city_name != city.city_name);
        self.recent_cities.insert(0, city);
        self.recent_cities.truncate(self.max_cities);

        self.set_current_city_index(0);
        self.changes
            .emit(StateEvent::RecentCitiesChanged(self.recent_cities.clone()));
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.view_mode == mode {
            return;
        }
        tracing::debug!("View mode: {mode}");
        self.view_mode = mode;
        self.changes.emit(StateEvent::ViewModeChanged(mode));

        if self.weather_data.is_some() {
            if let Some(view) = self.get_current_city_for_view() {
                self.changes.emit(StateEvent::CityChanged(view));
            }
        }
    }

    pub fn set_max_cities(&mut self, max_cities: usize) {
        if max_cities == 0 || max_cities == self.max_cities {
            return;
        }
        self.max_cities = max_cities;
        self.changes.emit(StateEvent::MaxCitiesChanged(max_cities));

        if self.recent_cities.len() > max_cities {
            self.recent_cities.truncate(max_cities);
            self.changes
                .emit(StateEvent::RecentCitiesChanged(self.recent_cities.clone()));

            if self.current_city_index >= max_cities {
                self.set_current_city_index(0);
                match self.recent_cities.first().cloned() {
                    Some(first) => self.set_current_city(first),
                    None => {
                        self.current_city = CityRecord::default();
                        self.changes
                            .emit(StateEvent::CurrentCityChanged(CityRecord::default()));
                    }
                }
            }
        }
    }

    /// Make the `index`-th recent city current. Does not reorder the list.
    pub fn switch_to_city(&mut self, index: usize) -> bool {
        if index >= self.recent_cities.len() || index == self.current_city_index {
            return false;
        }

        self.set_current_city_index(index);
        let city = self.recent_cities[index].clone();
        if self.current_city != city {
            self.current_city = city;
            self.changes
                .emit(StateEvent::CurrentCityChanged(self.current_city.clone()));
        }

        if let Some(view) = self.get_current_city_for_view() {
            self.changes.emit(StateEvent::CityChanged(view));
        }
        true
    }

    pub fn switch_to_next(&mut self) -> bool {
        let len = self.recent_cities.len();
        if len == 0 {
            return false;
        }
        self.switch_to_city((self.current_city_index + 1) % len)
    }

    pub fn switch_to_previous(&mut self) -> bool {
        let len = self.recent_cities.len();
        if len == 0 {
            return false;
        }
        self.switch_to_city((self.current_city_index + len - 1) % len)
    }

    /// The current city tagged with the active view.
    ///
    /// For views that need more than current conditions this starts the fetch
    /// and returns a request marker; the data arrives later as a
    /// [`StateEvent::WeatherDataChanged`].
    pub fn get_current_city_for_view(&self) -> Option<CityView> {
        let city = self.current_city()?.clone();
        let request = match self.view_mode {
            ViewMode::Today => None,
            ViewMode::Weekly => Some(self.request_weekly_forecast(&city.city_name)),
            ViewMode::Detailed => Some(self.request_detailed_info(&city.city_name)),
            ViewMode::Sunrise => Some(self.request_sunrise_info(&city.city_name)),
        };

        Some(CityView {
            city,
            view_mode: self.view_mode,
            request,
        })
    }

    /// Daily forecast for the trend view.
    pub fn request_weekly_forecast(&self, city_name: &str) -> ViewRequest {
        self.service.get_daily_forecast(city_name);
        ViewRequest {
            city_name: city_name.to_string(),
            request_type: RequestType::WeeklyForecast,
        }
    }

    pub fn request_detailed_info(&self, city_name: &str) -> ViewRequest {
        self.service.get_detailed_weather_info(city_name);
        ViewRequest {
            city_name: city_name.to_string(),
            request_type: RequestType::DetailedInfo,
        }
    }

    pub fn request_sunrise_info(&self, city_name: &str) -> ViewRequest {
        self.service.get_sunrise_info(city_name);
        ViewRequest {
            city_name: city_name.to_string(),
            request_type: RequestType::SunriseInfo,
        }
    }

    /// Route a completion of one of this manager's own requests.
    pub fn handle_service_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::DataLoaded(payload) => self.on_weather_data_loaded(payload),
            ServiceEvent::DataLoadError(message) => self.on_weather_data_error(message),
            ServiceEvent::SearchResultsReady(_) => {
                tracing::debug!("State manager ignoring search results");
            }
        }
    }

    /// Store a payload; forecasts get the trend sequences rebuilt first.
    pub fn on_weather_data_loaded(&mut self, payload: WeatherPayload) {
        let payload = match payload {
            WeatherPayload::Forecast(mut forecast) => {
                forecast.weekly_forecast = forecast::trend_sequences(&forecast.forecast);
                tracing::debug!(
                    "Processed forecast for {} with {} days",
                    forecast.city_name,
                    forecast.forecast.len()
                );
                WeatherPayload::Forecast(forecast)
            }
            other => other,
        };

        self.weather_data = Some(payload.clone());
        self.changes.emit(StateEvent::WeatherDataChanged(payload));
    }

    pub fn on_weather_data_error(&mut self, message: String) {
        tracing::warn!("Weather data error: {message}");
        let payload = WeatherPayload::Error(ErrorPayload::new(message));
        self.weather_data = Some(payload.clone());
        self.changes.emit(StateEvent::WeatherDataChanged(payload));
    }

    fn set_current_city_index(&mut self, index: usize) {
        if self.current_city_index != index {
            self.current_city_index = index;
            self.changes.emit(StateEvent::CurrentCityIndexChanged(index));
        }
    }
}
