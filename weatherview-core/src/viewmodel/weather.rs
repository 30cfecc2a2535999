use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    WeatherProvider,
    config::DEFAULT_MAX_CITIES,
    events::{Emitter, EventSender, drain},
    model::{
        CitySearchResult, ErrorPayload, PLACEHOLDER_TEMPERATURE, UNKNOWN_DESCRIPTION,
        WeatherPayload,
    },
    service::{ServiceEvent, WeatherDataService},
    snapshot::WeatherSnapshot,
    state::{CityRecord, CityView, StateEvent, StateHandle, ViewMode},
};

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherEvent {
    IsLoadingChanged(bool),
    ErrorMessageChanged(String),
    CurrentWeatherDataChanged(Value),
    SearchResultsReady(Result<Vec<CitySearchResult>, ErrorPayload>),
}

/// Loading state, error text and the weather map the views render.
#[derive(Debug)]
pub struct WeatherViewModel {
    service: WeatherDataService,
    state: Option<StateHandle>,
    state_events: Option<mpsc::UnboundedReceiver<StateEvent>>,
    is_loading: bool,
    error_message: String,
    snapshot: WeatherSnapshot,
    current_weather_data: Value,
    changes: Emitter<WeatherEvent>,
}

impl WeatherViewModel {
    pub fn new(provider: Arc<dyn WeatherProvider>, events: EventSender) -> Self {
        Self {
            service: WeatherDataService::new(provider, events),
            state: None,
            state_events: None,
            is_loading: false,
            error_message: String::new(),
            snapshot: WeatherSnapshot::create_empty(),
            current_weather_data: Value::Null,
            changes: Emitter::new(),
        }
    }

    pub fn initialize(&mut self, state: StateHandle) {
        self.state_events = Some(state.borrow_mut().subscribe());
        self.state = Some(state);
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<WeatherEvent> {
        self.changes.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn current_weather_data(&self) -> &Value {
        &self.current_weather_data
    }

    pub fn snapshot(&self) -> &WeatherSnapshot {
        &self.snapshot
    }

    pub fn load_city_weather(&mut self, city_name: &str) {
        if city_name.is_empty() {
            return;
        }
        self.set_loading(true);
        self.clear_error();
        self.service.get_city_weather(city_name);
    }

    /// Current conditions and the weekly forecast for the active city.
    pub fn load_weather_data(&mut self) {
        let Some(city_name) = self
            .state
            .as_ref()
            .and_then(|s| s.borrow().current_city().map(|c| c.city_name.clone()))
        else {
            tracing::debug!("No current city to load weather for");
            return;
        };

        tracing::debug!("Loading weather data for {city_name}");
        self.set_loading(true);
        self.clear_error();
        self.service.get_city_weather(&city_name);
        self.service.get_weekly_forecast(&city_name);
    }

    pub fn search_cities(&self, query: &str) {
        self.service.search_cities(query);
    }

    pub fn add_city_to_recent(&self, city: CityRecord) {
        match &self.state {
            Some(state) if !city.is_empty() => state.borrow_mut().add_to_recent_cities(city),
            _ => {}
        }
    }

    pub fn switch_view_mode(&self, mode: ViewMode) {
        if let Some(state) = &self.state {
            state.borrow_mut().set_view_mode(mode);
        }
    }

    pub fn switch_to_next_city(&self) {
        if let Some(state) = &self.state {
            state.borrow_mut().switch_to_next();
        }
    }

    pub fn switch_to_previous_city(&self) {
        if let Some(state) = &self.state {
            state.borrow_mut().switch_to_previous();
        }
    }

    pub fn switch_to_city(&self, index: usize) {
        if let Some(state) = &self.state {
            state.borrow_mut().switch_to_city(index);
        }
    }

    /// The active city tagged with the active view; may start a view fetch.
    pub fn current_city_data(&self) -> Option<CityView> {
        self.state
            .as_ref()
            .and_then(|s| s.borrow().get_current_city_for_view())
    }

    pub fn recent_cities(&self) -> Vec<CityRecord> {
        self.state
            .as_ref()
            .map(|s| s.borrow().recent_cities().to_vec())
            .unwrap_or_default()
    }

    pub fn current_city_index(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |s| s.borrow().current_city_index())
    }

    pub fn max_cities(&self) -> usize {
        self.state
            .as_ref()
            .map_or(DEFAULT_MAX_CITIES, |s| s.borrow().max_cities())
    }

    /// Append `°C` unless already present.
    pub fn format_temperature(temp: &str) -> String {
        if temp.is_empty() {
            PLACEHOLDER_TEMPERATURE.to_string()
        } else if temp.contains("°C") {
            temp.to_string()
        } else {
            format!("{temp}°C")
        }
    }

    pub fn format_weather_description(description: &str) -> String {
        if description.is_empty() {
            UNKNOWN_DESCRIPTION.to_string()
        } else {
            description.to_string()
        }
    }

    /// A map worth rendering: has a city name and a real temperature.
    pub fn validate_weather_data(data: &Value) -> bool {
        let Some(map) = data.as_object() else {
            return false;
        };
        let city = map.get("cityName").and_then(Value::as_str).unwrap_or("");
        let temperature = map.get("temperature").and_then(Value::as_str);

        !map.is_empty()
            && !city.is_empty()
            && temperature.is_some_and(|t| t != PLACEHOLDER_TEMPERATURE)
    }

    /// Route a completion of one of this view-model's own requests.
    pub fn handle_service_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::DataLoaded(payload) => self.on_data_loaded(payload),
            ServiceEvent::DataLoadError(message) => self.on_data_load_error(message),
            ServiceEvent::SearchResultsReady(results) => self.on_search_results_ready(results),
        }
    }

    pub fn on_data_loaded(&mut self, payload: WeatherPayload) {
        self.set_loading(false);

        if let WeatherPayload::Error(err) = &payload {
            self.set_error(err.error.clone());
            self.snapshot = WeatherSnapshot::create_empty();
            self.publish_snapshot();
            return;
        }

        self.clear_error();
        if let (WeatherPayload::Current(weather), Some(state)) = (&payload, &self.state) {
            state.borrow_mut().set_current_city(CityRecord::from(weather));
        }
        self.merge_payload(&payload);
    }

    pub fn on_data_load_error(&mut self, message: String) {
        self.set_loading(false);
        self.set_error(message);
    }

    fn on_search_results_ready(&mut self, results: Result<Vec<CitySearchResult>, ErrorPayload>) {
        match &results {
            Ok(found) => tracing::debug!("Search returned {} cities", found.len()),
            Err(err) => tracing::debug!("Search failed: {}", err.error),
        }
        self.changes.emit(WeatherEvent::SearchResultsReady(results));
    }

    /// Apply state-manager changes this view-model mirrors.
    pub fn sync(&mut self) -> usize {
        let Some(events) = self.state_events.as_mut() else {
            return 0;
        };
        let events = drain(events);
        let count = events.len();

        for event in events {
            match event {
                StateEvent::CityChanged(view) => self.on_city_changed(&view),
                StateEvent::ViewModeChanged(_) => self.on_view_mode_changed(),
                StateEvent::WeatherDataChanged(payload) if !payload.has_error() => {
                    self.merge_payload(&payload);
                }
                _ => {}
            }
        }
        count
    }

    fn on_city_changed(&mut self, view: &CityView) {
        if view.city.city_name != self.snapshot.city_name() {
            self.snapshot = WeatherSnapshot::from_city(&view.city);
        }
        self.current_weather_data = view.to_value();
        self.changes.emit(WeatherEvent::CurrentWeatherDataChanged(
            self.current_weather_data.clone(),
        ));
    }

    /// With weather data present the state manager follows up with a city
    /// change of its own, so only the first view switch is handled here.
    fn on_view_mode_changed(&mut self) {
        let has_data = self
            .state
            .as_ref()
            .is_some_and(|s| s.borrow().weather_data().is_some());
        if has_data {
            return;
        }
        if let Some(view) = self.current_city_data() {
            self.on_city_changed(&view);
        }
    }

    /// Same city: fold the new fields in. Another city: start over.
    fn merge_payload(&mut self, payload: &WeatherPayload) {
        let raw = payload.to_raw();
        let same_city = payload
            .city_name()
            .is_some_and(|name| name == self.snapshot.city_name());

        if same_city {
            self.snapshot.update_data(&raw);
        } else {
            self.snapshot = WeatherSnapshot::from_raw_data(&raw);
        }
        self.publish_snapshot();
    }

    fn publish_snapshot(&mut self) {
        self.current_weather_data = self.snapshot.to_object();
        self.changes.emit(WeatherEvent::CurrentWeatherDataChanged(
            self.current_weather_data.clone(),
        ));
    }

    fn set_loading(&mut self, loading: bool) {
        if self.is_loading != loading {
            self.is_loading = loading;
            self.changes.emit(WeatherEvent::IsLoadingChanged(loading));
        }
    }

    fn set_error(&mut self, message: String) {
        if self.error_message != message {
            tracing::warn!("Weather error: {message}");
            self.error_message = message;
            self.changes
                .emit(WeatherEvent::ErrorMessageChanged(self.error_message.clone()));
        }
    }

    fn clear_error(&mut self) {
        if !self.error_message.is_empty() {
            self.error_message.clear();
            self.changes
                .emit(WeatherEvent::ErrorMessageChanged(String::new()));
        }
    }

    /// Detach from the state manager and drop all subscribers.
    pub fn cleanup(&mut self) {
        self.state = None;
        self.state_events = None;
        self.changes.clear();
    }
}
