/// Conditions reported by the current-weather payload. Temperatures in Celsius.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub station_name: Option<String>,
    pub observed_at: i64,
    pub temperature: f64,
    pub feels_like: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity: u8,
    /// m/s
    pub wind_speed: f64,
    pub wind_direction: Option<f64>,
    pub description: String,
    pub icon: String,
}

/// A geocoded place name for the headline.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub state: Option<String>,
    pub country: String,
}

impl Place {
    /// `"Name, State"` or just `"Name"`.
    pub fn title(&self) -> String {
        match self.state {
            Some(ref state) if !state.is_empty() => format!("{}, {state}", self.name),
            _ => self.name.clone(),
        }
    }
}

#[test]
fn test_place_title() {
    let mut place = Place {
        name: "Madison".to_string(),
        state: Some("Wisconsin".to_string()),
        country: "US".to_string(),
    };
    assert_eq!(place.title(), "Madison, Wisconsin");
    place.state = Some(String::new());
    assert_eq!(place.title(), "Madison");
    place.state = None;
    assert_eq!(place.title(), "Madison");
}

/// Terminal glyph for an OpenWeather icon id such as `"10d"`. Only the
/// condition prefix matters; day and night share a glyph.
pub fn icon_glyph(icon: &str) -> &'static str {
    match icon.get(..2) {
        Some("01") => "☀",
        Some("02") => "⛅",
        Some("03") | Some("04") => "☁",
        Some("09") | Some("10") => "☂",
        Some("11") => "⚡",
        Some("13") => "❄",
        Some("50") => "≡",
        _ => " ",
    }
}

#[test]
fn test_icon_glyph() {
    assert_eq!(icon_glyph("01d"), "☀");
    assert_eq!(icon_glyph("10n"), "☂");
    assert_eq!(icon_glyph("04d"), "☁");
    assert_eq!(icon_glyph(""), " ");
    assert_eq!(icon_glyph("zz"), " ");
}
