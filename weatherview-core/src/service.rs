use std::sync::Arc;

use crate::{
    WeatherProvider,
    error::ApiError,
    events::EventSender,
    model::{CitySearchResult, CurrentWeather, ErrorPayload, FetchKind, WeatherPayload},
};

/// What the data service publishes back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// A fetch finished. Failures arrive here too, as [`WeatherPayload::Error`].
    DataLoaded(WeatherPayload),
    /// The request could not be started at all.
    DataLoadError(String),
    SearchResultsReady(Result<Vec<CitySearchResult>, ErrorPayload>),
}

/// Validation and dispatch in front of a [`WeatherProvider`].
///
/// Every operation returns immediately; the outcome is posted to the event
/// loop the service was built with.
#[derive(Debug, Clone)]
pub struct WeatherDataService {
    provider: Arc<dyn WeatherProvider>,
    events: EventSender,
}

impl WeatherDataService {
    pub fn new(provider: Arc<dyn WeatherProvider>, events: EventSender) -> Self {
        Self { provider, events }
    }

    pub fn get_city_weather(&self, city_name: &str) {
        self.request(FetchKind::Current, city_name);
    }

    pub fn get_weekly_forecast(&self, city_name: &str) {
        self.request(FetchKind::Weekly, city_name);
    }

    pub fn get_daily_forecast(&self, city_name: &str) {
        self.request(FetchKind::Daily, city_name);
    }

    pub fn get_detailed_weather_info(&self, city_name: &str) {
        self.request(FetchKind::Detailed, city_name);
    }

    pub fn get_sunrise_info(&self, city_name: &str) {
        self.request(FetchKind::Sunrise, city_name);
    }

    pub fn search_cities(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.events.post(ServiceEvent::SearchResultsReady(Err(
                ApiError::EmptyQuery.into_payload(None),
            )));
            return;
        }

        tracing::debug!("Searching cities matching {query:?}");
        let provider = Arc::clone(&self.provider);
        let query = query.to_string();
        let spawned = self.events.spawn(async move {
            let result = provider
                .search(&query)
                .await
                .map_err(|err| err.into_payload(None));
            ServiceEvent::SearchResultsReady(result)
        });

        if let Err(err) = spawned {
            tracing::warn!("City search not started: {err}");
            self.events
                .post(ServiceEvent::SearchResultsReady(Err(ErrorPayload::new(err.to_string()))));
        }
    }

    fn request(&self, kind: FetchKind, city_name: &str) {
        let Some(city) = validate_city_name(city_name) else {
            tracing::debug!("Rejecting {kind} request for invalid city name {city_name:?}");
            let payload = ApiError::InvalidCityName.into_payload(Some(city_name.to_string()));
            self.events
                .post(ServiceEvent::DataLoaded(WeatherPayload::Error(payload)));
            return;
        };

        tracing::debug!("Requesting {kind} weather for {city}");
        let provider = Arc::clone(&self.provider);
        let city = city.to_string();
        let spawned = self
            .events
            .spawn(async move { ServiceEvent::DataLoaded(load(provider.as_ref(), kind, &city).await) });

        if let Err(err) = spawned {
            tracing::warn!("{kind} request for {city_name} not started: {err}");
            self.events.post(ServiceEvent::DataLoadError(err.to_string()));
        }
    }
}

/// Trimmed city name, or `None` when nothing is left.
pub fn validate_city_name(city_name: &str) -> Option<&str> {
    let trimmed = city_name.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Run one fetch and shape the result for the views.
pub async fn load(provider: &dyn WeatherProvider, kind: FetchKind, city_name: &str) -> WeatherPayload {
    match provider.fetch(kind, city_name).await {
        Ok(payload) => enrich(payload),
        Err(err) => {
            tracing::warn!("{kind} request for {city_name} failed: {err}");
            WeatherPayload::Error(err.into_payload(Some(city_name.to_string())))
        }
    }
}

/// Attach the sunrise record and make sure a detailed record exists.
fn enrich(payload: WeatherPayload) -> WeatherPayload {
    match payload {
        WeatherPayload::Current(mut weather) => {
            attach_derived(&mut weather);
            WeatherPayload::Current(weather)
        }
        WeatherPayload::Detailed(mut weather) => {
            attach_derived(&mut weather);
            WeatherPayload::Detailed(weather)
        }
        other => other,
    }
}

fn attach_derived(weather: &mut CurrentWeather) {
    weather.sunrise_info = Some(weather.sunrise_info());
    if weather.detailed_info.is_none() {
        weather.detailed_info = Some(weather.fallback_detailed_info());
    }
}
