use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    events::Emitter,
    state::{StateEvent, StateHandle, ViewMode},
};

pub const DEFAULT_VIEW: &str = "today_weather";
pub const DEFAULT_CUSTOM_ICON: &str = "📄";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    pub id: String,
    pub name: String,
    pub icon: String,
}

impl ViewDescriptor {
    fn new(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
        }
    }
}

fn builtin_views() -> Vec<ViewDescriptor> {
    vec![
        ViewDescriptor::new("today_weather", "今日天气", "☀️"),
        ViewDescriptor::new("temperature_trend", "温度趋势", "📈"),
        ViewDescriptor::new("detailed_info", "详细天气", "📅"),
        ViewDescriptor::new("sunrise_sunset", "日出日落", "🌅"),
    ]
}

fn is_builtin(id: &str) -> bool {
    ViewMode::try_from(id).is_ok()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Invalid view ID: {0}")]
    UnknownView(String),

    #[error("View already exists: {0}")]
    DuplicateView(String),

    #[error("View info is missing `{0}`")]
    MissingField(&'static str),

    #[error("Cannot remove default view: {0}")]
    BuiltinView(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    NavigationRequested(String),
    ViewChanged(String),
    CurrentViewChanged(String),
    AvailableViewsChanged(Vec<ViewDescriptor>),
}

/// Which view is showing, and the list of views that can be shown.
#[derive(Debug)]
pub struct NavigationViewModel {
    current_view: String,
    available_views: Vec<ViewDescriptor>,
    state: Option<StateHandle>,
    state_events: Option<mpsc::UnboundedReceiver<StateEvent>>,
    changes: Emitter<NavigationEvent>,
}

impl Default for NavigationViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationViewModel {
    pub fn new() -> Self {
        Self {
            current_view: DEFAULT_VIEW.to_string(),
            available_views: builtin_views(),
            state: None,
            state_events: None,
            changes: Emitter::new(),
        }
    }

    /// Attach to the state manager and adopt its current view mode.
    pub fn initialize(&mut self, state: StateHandle) {
        let (mode, events) = {
            let mut manager = state.borrow_mut();
            (manager.view_mode(), manager.subscribe())
        };
        self.state = Some(state);
        self.state_events = Some(events);

        self.current_view = mode.as_str().to_string();
        self.changes
            .emit(NavigationEvent::CurrentViewChanged(self.current_view.clone()));
        tracing::debug!("Navigation synced to {mode}");
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<NavigationEvent> {
        self.changes.subscribe()
    }

    pub fn current_view(&self) -> &str {
        &self.current_view
    }

    pub fn available_views(&self) -> &[ViewDescriptor] {
        &self.available_views
    }

    pub fn view_info(&self, id: &str) -> Option<&ViewDescriptor> {
        self.available_views.iter().find(|v| v.id == id)
    }

    pub fn current_view_info(&self) -> Option<&ViewDescriptor> {
        self.view_info(&self.current_view)
    }

    pub fn is_valid_view(&self, id: &str) -> bool {
        self.view_info(id).is_some()
    }

    pub fn is_current_view(&self, id: &str) -> bool {
        self.current_view == id
    }

    /// Position of the current view, or 0 if it is no longer listed.
    pub fn current_view_index(&self) -> usize {
        self.available_views
            .iter()
            .position(|v| v.id == self.current_view)
            .unwrap_or(0)
    }

    pub fn next_view(&self) -> &str {
        let len = self.available_views.len();
        let index = (self.current_view_index() + 1) % len;
        &self.available_views[index].id
    }

    pub fn previous_view(&self) -> &str {
        let len = self.available_views.len();
        let index = (self.current_view_index() + len - 1) % len;
        &self.available_views[index].id
    }

    /// Switch to `id`. Returns `Ok(false)` when it is already showing.
    pub fn navigate_to_view(&mut self, id: &str) -> Result<bool, NavigationError> {
        if !self.is_valid_view(id) {
            tracing::warn!("Invalid view ID: {id}");
            return Err(NavigationError::UnknownView(id.to_string()));
        }
        if self.current_view == id {
            return Ok(false);
        }

        self.current_view = id.to_string();

        if let (Some(state), Ok(mode)) = (&self.state, ViewMode::try_from(id)) {
            state.borrow_mut().set_view_mode(mode);
        }

        self.changes
            .emit(NavigationEvent::NavigationRequested(id.to_string()));
        self.changes.emit(NavigationEvent::ViewChanged(id.to_string()));
        self.changes
            .emit(NavigationEvent::CurrentViewChanged(id.to_string()));

        tracing::debug!("Navigated to view: {id}");
        Ok(true)
    }

    pub fn navigate_to_next(&mut self) -> Result<bool, NavigationError> {
        let id = self.next_view().to_string();
        self.navigate_to_view(&id)
    }

    pub fn navigate_to_previous(&mut self) -> Result<bool, NavigationError> {
        let id = self.previous_view().to_string();
        self.navigate_to_view(&id)
    }

    pub fn reset_to_default(&mut self) -> Result<bool, NavigationError> {
        self.navigate_to_view(DEFAULT_VIEW)
    }

    pub fn add_custom_view(
        &mut self,
        id: &str,
        name: &str,
        icon: Option<&str>,
    ) -> Result<(), NavigationError> {
        let id = id.trim();
        let name = name.trim();
        if id.is_empty() {
            return Err(NavigationError::MissingField("id"));
        }
        if name.is_empty() {
            return Err(NavigationError::MissingField("name"));
        }
        if self.is_valid_view(id) {
            return Err(NavigationError::DuplicateView(id.to_string()));
        }

        self.available_views.push(ViewDescriptor::new(
            id,
            name,
            icon.unwrap_or(DEFAULT_CUSTOM_ICON),
        ));
        self.changes
            .emit(NavigationEvent::AvailableViewsChanged(self.available_views.clone()));

        tracing::debug!("Added custom view: {id}");
        Ok(())
    }

    /// Remove a custom view. Leaving the active one falls back to the default view.
    pub fn remove_custom_view(&mut self, id: &str) -> Result<(), NavigationError> {
        if !self.is_valid_view(id) {
            return Err(NavigationError::UnknownView(id.to_string()));
        }
        if is_builtin(id) {
            return Err(NavigationError::BuiltinView(id.to_string()));
        }

        self.available_views.retain(|v| v.id != id);
        self.changes
            .emit(NavigationEvent::AvailableViewsChanged(self.available_views.clone()));

        if self.current_view == id {
            self.reset_to_default()?;
        }

        tracing::debug!("Removed custom view: {id}");
        Ok(())
    }

    /// Apply view-mode changes announced by the state manager.
    pub fn sync(&mut self) -> usize {
        let Some(events) = self.state_events.as_mut() else {
            return 0;
        };
        let events = crate::events::drain(events);
        let count = events.len();

        for event in events {
            if let StateEvent::ViewModeChanged(mode) = event {
                self.on_view_mode_changed(mode);
            }
        }
        count
    }

    fn on_view_mode_changed(&mut self, mode: ViewMode) {
        if self.current_view == mode.as_str() {
            return;
        }
        self.current_view = mode.as_str().to_string();
        self.changes
            .emit(NavigationEvent::CurrentViewChanged(self.current_view.clone()));
        self.changes
            .emit(NavigationEvent::ViewChanged(self.current_view.clone()));
    }

    /// Detach from the state manager.
    pub fn cleanup(&mut self) {
        self.state = None;
        self.state_events = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        events::{EventLoop, Origin, drain},
        service::WeatherDataService,
        state::AppStateManager,
        testing::StubProvider,
    };

    fn state() -> (StateHandle, EventLoop) {
        let event_loop = EventLoop::new();
        let service = WeatherDataService::new(
            Arc::new(StubProvider::new()),
            event_loop.sender(Origin::StateManager),
        );
        (AppStateManager::new(service).into_handle(), event_loop)
    }

    #[test]
    fn starts_on_today_with_four_builtins() {
        let nav = NavigationViewModel::new();

        assert_eq!(nav.current_view(), "today_weather");
        assert_eq!(nav.available_views().len(), 4);
        assert_eq!(nav.current_view_info().map(|v| v.name.as_str()), Some("今日天气"));
    }

    #[test]
    fn invalid_view_changes_nothing() {
        let mut nav = NavigationViewModel::new();
        let mut rx = nav.subscribe();

        let result = nav.navigate_to_view("not_a_real_view");

        assert_eq!(
            result,
            Err(NavigationError::UnknownView("not_a_real_view".into()))
        );
        assert_eq!(nav.current_view(), "today_weather");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn navigation_notifies_in_order_and_informs_state() {
        let (state, _loop) = state();
        let mut nav = NavigationViewModel::new();
        nav.initialize(state.clone());
        let mut rx = nav.subscribe();

        assert_eq!(nav.navigate_to_view("detailed_info"), Ok(true));

        assert_eq!(
            drain(&mut rx),
            vec![
                NavigationEvent::NavigationRequested("detailed_info".into()),
                NavigationEvent::ViewChanged("detailed_info".into()),
                NavigationEvent::CurrentViewChanged("detailed_info".into()),
            ]
        );
        assert_eq!(state.borrow().view_mode(), ViewMode::Detailed);

        // The echo from the state manager is already applied.
        nav.sync();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn same_view_is_a_no_op() {
        let mut nav = NavigationViewModel::new();
        let mut rx = nav.subscribe();

        assert_eq!(nav.navigate_to_view("today_weather"), Ok(false));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn next_and_previous_cycle() {
        let mut nav = NavigationViewModel::new();

        nav.navigate_to_previous().unwrap();
        assert_eq!(nav.current_view(), "sunrise_sunset");

        nav.navigate_to_next().unwrap();
        assert_eq!(nav.current_view(), "today_weather");

        for _ in 0..nav.available_views().len() {
            nav.navigate_to_next().unwrap();
        }
        assert_eq!(nav.current_view_index(), 0);
    }

    #[test]
    fn custom_views_are_validated() {
        let mut nav = NavigationViewModel::new();

        assert_eq!(
            nav.add_custom_view("", "Radar", None),
            Err(NavigationError::MissingField("id"))
        );
        assert_eq!(
            nav.add_custom_view("radar", " ", None),
            Err(NavigationError::MissingField("name"))
        );
        assert_eq!(
            nav.add_custom_view("detailed_info", "Again", None),
            Err(NavigationError::DuplicateView("detailed_info".into()))
        );

        nav.add_custom_view("radar", "雷达", None).unwrap();
        assert_eq!(nav.view_info("radar").map(|v| v.icon.as_str()), Some("📄"));
        assert_eq!(
            nav.remove_custom_view("today_weather"),
            Err(NavigationError::BuiltinView("today_weather".into()))
        );
    }

    #[test]
    fn removing_active_custom_view_resets_to_default() {
        let (state, _loop) = state();
        let mut nav = NavigationViewModel::new();
        nav.initialize(state.clone());
        nav.add_custom_view("radar", "雷达", Some("📡")).unwrap();

        nav.navigate_to_view("radar").unwrap();
        assert!(nav.is_current_view("radar"));
        assert_eq!(state.borrow().view_mode(), ViewMode::Today);

        nav.remove_custom_view("radar").unwrap();

        assert_eq!(nav.current_view(), "today_weather");
        assert_eq!(nav.available_views().len(), 4);
    }

    #[test]
    fn follows_state_view_mode() {
        let (state, _loop) = state();
        state.borrow_mut().set_view_mode(ViewMode::Sunrise);
        let mut nav = NavigationViewModel::new();

        nav.initialize(state.clone());
        assert_eq!(nav.current_view(), "sunrise_sunset");

        let mut rx = nav.subscribe();
        state.borrow_mut().set_view_mode(ViewMode::Weekly);
        nav.sync();

        assert_eq!(nav.current_view(), "temperature_trend");
        assert_eq!(
            drain(&mut rx),
            vec![
                NavigationEvent::CurrentViewChanged("temperature_trend".into()),
                NavigationEvent::ViewChanged("temperature_trend".into()),
            ]
        );
    }
}
