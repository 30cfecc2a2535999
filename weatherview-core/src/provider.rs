use crate::{
    Config,
    cities::CityCodeTable,
    error::ApiError,
    model::{CitySearchResult, FetchKind, WeatherPayload},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// A remote weather source.
///
/// Implementations normalize the provider's JSON into typed payloads. Every
/// failure is returned as an [`ApiError`]; nothing panics across this seam.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, kind: FetchKind, city_name: &str) -> Result<WeatherPayload, ApiError>;

    async fn search(&self, query: &str) -> Result<Vec<CitySearchResult>, ApiError>;
}

/// Construct the provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for the weather provider.\n\
                 Hint: run `weatherview configure` and enter your OpenWeather API key."
        )
    })?;

    let city_codes = CityCodeTable::load_or_empty(config.app.city_codes.as_deref());
    let provider = OpenWeatherProvider::new(api_key.to_owned(), &config.provider, city_codes)?;

    Ok(Arc::new(provider))
}
