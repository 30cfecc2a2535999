//! Classification of OpenWeather icon codes into a display glyph and a
//! canonical description.
//!
//! Icon codes look like `"10d"`; only the two-digit prefix matters, the day/night
//! suffix is ignored. See https://openweathermap.org/weather-conditions

/// Display pair for a weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub icon: &'static str,
    pub description: &'static str,
}

const CONDITIONS: &[(&str, Condition)] = &[
    ("01", Condition { icon: "☀️", description: "晴" }),
    ("02", Condition { icon: "⛅", description: "少云" }),
    ("03", Condition { icon: "☁️", description: "多云" }),
    ("04", Condition { icon: "☁️", description: "阴" }),
    ("09", Condition { icon: "🌧️", description: "阵雨" }),
    ("10", Condition { icon: "🌦️", description: "雨" }),
    ("11", Condition { icon: "⛈️", description: "雷阵雨" }),
    ("13", Condition { icon: "❄️", description: "雪" }),
    ("50", Condition { icon: "🌫️", description: "雾" }),
];

/// Used for codes outside the table.
pub const PARTLY_CLOUDY: Condition = Condition {
    icon: "⛅",
    description: "少云",
};

pub fn classify(icon_code: &str) -> Condition {
    let prefix = icon_code.get(..2).unwrap_or_default();
    CONDITIONS
        .iter()
        .find(|(code, _)| *code == prefix)
        .map(|(_, condition)| *condition)
        .unwrap_or(PARTLY_CLOUDY)
}
