use std::{fmt, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{CustomType, Password, PasswordDisplayMode, Select, Text};
use weatherview_core::{App, Config, ViewMode, viewmodel::WeatherEvent};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherview", version, about = "Weather views in the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and app settings.
    Configure,

    /// Load one or more cities and print a view of the last one.
    Show {
        /// City names, e.g. "Beijing" or "上海".
        #[arg(required = true)]
        cities: Vec<String>,

        #[arg(long, value_enum, default_value_t = ViewArg::Today)]
        view: ViewArg,
    },

    /// Look up cities by name.
    Search { query: String },

    /// Interactive session: load cities, switch between them and between views.
    Browse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    Today,
    Trend,
    Detailed,
    Sunrise,
}

impl From<ViewArg> for ViewMode {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Today => ViewMode::Today,
            ViewArg::Trend => ViewMode::Weekly,
            ViewArg::Detailed => ViewMode::Detailed,
            ViewArg::Sunrise => ViewMode::Sunrise,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { cities, view } => show(&cities, view.into()).await,
            Command::Search { query } => search(&query).await,
            Command::Browse => browse().await,
        }
    }
}

fn load_app() -> anyhow::Result<App> {
    let config = Config::load()?.with_env_overrides();
    App::from_config(&config)
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    config.set_api_key(api_key.trim().to_string());

    let lang = Text::new("Language:")
        .with_default(&config.provider.lang)
        .prompt()?;
    config.provider.lang = lang.trim().to_string();

    config.app.max_cities = CustomType::<usize>::new("Recent cities to keep:")
        .with_default(config.max_cities())
        .with_error_message("Please enter a positive number")
        .prompt()?
        .max(1);

    let current_codes = config
        .app
        .city_codes
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let codes = Text::new("City code table (JSON, empty for none):")
        .with_default(&current_codes)
        .prompt()?;
    config.app.city_codes = Some(codes.trim())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(cities: &[String], view: ViewMode) -> anyhow::Result<()> {
    let mut app = load_app()?;

    for city in cities {
        app.weather_mut().load_city_weather(city);
        app.settle().await;
    }

    app.navigation_mut()
        .navigate_to_view(view.as_str())
        .context("Failed to switch view")?;
    app.settle().await;

    println!("{}", render::render(&app));
    Ok(())
}

async fn search(query: &str) -> anyhow::Result<()> {
    let mut app = load_app()?;
    let mut events = app.weather_mut().subscribe();

    app.weather().search_cities(query);
    app.settle().await;

    while let Ok(event) = events.try_recv() {
        let WeatherEvent::SearchResultsReady(result) = event else {
            continue;
        };
        match result {
            Ok(cities) => {
                for city in cities {
                    println!("{:<32} {:>8.3} {:>9.3}", city.full_name, city.lat, city.lon);
                }
            }
            Err(err) => println!("{}", err.error),
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Load,
    Next,
    Previous,
    View,
    Search,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Load => "Load a city",
            Action::Next => "Next city",
            Action::Previous => "Previous city",
            Action::View => "Switch view",
            Action::Search => "Search and add a city",
            Action::Quit => "Quit",
        };
        f.write_str(label)
    }
}

async fn browse() -> anyhow::Result<()> {
    let mut app = load_app()?;
    let actions = vec![
        Action::Load,
        Action::Next,
        Action::Previous,
        Action::View,
        Action::Search,
        Action::Quit,
    ];

    loop {
        let action = Select::new("What next?", actions.clone()).prompt()?;
        match action {
            Action::Load => {
                let city = Text::new("City:").prompt()?;
                app.weather_mut().load_city_weather(city.trim());
            }
            Action::Next => app.weather().switch_to_next_city(),
            Action::Previous => app.weather().switch_to_previous_city(),
            Action::View => {
                let views: Vec<String> = app
                    .navigation()
                    .available_views()
                    .iter()
                    .map(|v| format!("{} {}", v.icon, v.name))
                    .collect();
                let choice = Select::new("View:", views).raw_prompt()?;
                let id = app.navigation().available_views()[choice.index].id.clone();
                app.navigation_mut().navigate_to_view(&id)?;
            }
            Action::Search => search_and_add(&mut app).await?,
            Action::Quit => break,
        }

        app.settle().await;
        println!("{}\n", render::render(&app));
    }

    app.weather_mut().cleanup();
    app.navigation_mut().cleanup();
    Ok(())
}

async fn search_and_add(app: &mut App) -> anyhow::Result<()> {
    let query = Text::new("Search:").prompt()?;
    let mut events = app.weather_mut().subscribe();
    app.weather().search_cities(&query);
    app.settle().await;

    let mut found = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            WeatherEvent::SearchResultsReady(Ok(cities)) => found = cities,
            WeatherEvent::SearchResultsReady(Err(err)) => {
                println!("{}", err.error);
                return Ok(());
            }
            _ => {}
        }
    }
    if found.is_empty() {
        return Ok(());
    }

    let labels: Vec<String> = found.iter().map(|c| c.full_name.clone()).collect();
    let choice = Select::new("Add which city?", labels).raw_prompt()?;
    let city = &found[choice.index];
    tracing::debug!("Adding {} from search", city.full_name);

    let name = city.city_name.clone();
    app.weather_mut().load_city_weather(&name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_parses_cities_and_view() {
        let cli = Cli::parse_from(["weatherview", "show", "Beijing", "Shanghai", "--view", "trend"]);

        match cli.command {
            Command::Show { cities, view } => {
                assert_eq!(cities, vec!["Beijing", "Shanghai"]);
                assert_eq!(ViewMode::from(view), ViewMode::Weekly);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn show_requires_a_city() {
        assert!(Cli::try_parse_from(["weatherview", "show"]).is_err());
    }
}
