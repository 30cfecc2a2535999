use std::{cell::Ref, sync::Arc};

use crate::{
    Config, WeatherProvider,
    events::{Delivery, EventLoop, Origin},
    provider::provider_from_config,
    service::WeatherDataService,
    state::{AppStateManager, StateHandle},
    viewmodel::{NavigationViewModel, WeatherViewModel},
};

/// The state manager and both view-models, wired to one event loop.
///
/// Completions are routed back to whichever component issued the request, and
/// the view-models are brought up to date with the state manager after every
/// step.
#[derive(Debug)]
pub struct App {
    state: StateHandle,
    weather: WeatherViewModel,
    navigation: NavigationViewModel,
    event_loop: EventLoop,
}

impl App {
    pub fn new(provider: Arc<dyn WeatherProvider>, max_cities: usize) -> Self {
        let event_loop = EventLoop::new();

        let mut manager = AppStateManager::new(WeatherDataService::new(
            Arc::clone(&provider),
            event_loop.sender(Origin::StateManager),
        ));
        manager.set_max_cities(max_cities);
        manager.initialize();
        let state = manager.into_handle();

        let mut weather = WeatherViewModel::new(provider, event_loop.sender(Origin::WeatherViewModel));
        weather.initialize(state.clone());

        let mut navigation = NavigationViewModel::new();
        navigation.initialize(state.clone());

        Self {
            state,
            weather,
            navigation,
            event_loop,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = provider_from_config(config)?;
        Ok(Self::new(provider, config.max_cities()))
    }

    pub fn state(&self) -> Ref<'_, AppStateManager> {
        self.state.borrow()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    pub fn weather(&self) -> &WeatherViewModel {
        &self.weather
    }

    pub fn weather_mut(&mut self) -> &mut WeatherViewModel {
        &mut self.weather
    }

    pub fn navigation(&self) -> &NavigationViewModel {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut NavigationViewModel {
        &mut self.navigation
    }

    /// Hand a completion to the component that asked for it.
    pub fn dispatch(&mut self, delivery: Delivery) {
        tracing::debug!("Dispatching {:?} event", delivery.origin);
        match delivery.origin {
            Origin::StateManager => self.state.borrow_mut().handle_service_event(delivery.event),
            Origin::WeatherViewModel => self.weather.handle_service_event(delivery.event),
        }
        self.sync();
    }

    /// Forward pending state changes to the view-models.
    pub fn sync(&mut self) {
        while self.weather.sync() + self.navigation.sync() > 0 {}
    }

    /// Dispatch whatever is already queued. Returns how many deliveries ran.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(delivery) = self.event_loop.try_next() {
            self.dispatch(delivery);
            handled += 1;
        }
        self.sync();
        handled
    }

    /// Wait for one delivery and dispatch it.
    pub async fn process_next(&mut self) -> bool {
        match self.event_loop.next().await {
            Some(delivery) => {
                self.dispatch(delivery);
                true
            }
            None => false,
        }
    }

    /// Run until no request is in flight and nothing is queued.
    pub async fn settle(&mut self) {
        loop {
            self.sync();
            if self.event_loop.is_idle() {
                break;
            }
            if !self.process_next().await {
                break;
            }
        }
    }
}
