//! Core library for the `weatherview` app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and the typed payloads it produces
//! - The data service, state manager and view-models the front-end binds to
//! - The event loop that carries request completions back to their owners
//!
//! It is used by `weatherview-cli`, but any front-end can drive [`App`] the
//! same way.

pub mod app;
pub mod cities;
pub mod conditions;
pub mod config;
pub mod error;
pub mod events;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod service;
pub mod snapshot;
pub mod state;
pub mod viewmodel;

#[cfg(test)]
mod testing;

pub use app::App;
pub use config::Config;
pub use error::ApiError;
pub use model::{CitySearchResult, CurrentWeather, FetchKind, Forecast, WeatherPayload};
pub use provider::{WeatherProvider, provider_from_config};
pub use service::{ServiceEvent, WeatherDataService};
pub use snapshot::WeatherSnapshot;
pub use state::{AppStateManager, CityRecord, StateEvent, ViewMode};
pub use viewmodel::{NavigationViewModel, WeatherViewModel};
