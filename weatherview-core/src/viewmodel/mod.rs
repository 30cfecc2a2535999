//! UI-facing facades over the state manager and the data service.

pub mod navigation;
pub mod weather;

pub use navigation::{NavigationError, NavigationEvent, NavigationViewModel, ViewDescriptor};
pub use weather::{WeatherEvent, WeatherViewModel};
