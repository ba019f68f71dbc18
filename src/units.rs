use std::fmt;

use serde::Deserialize;

/// Display unit for temperatures. Readings are always stored in Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(alias = "c", alias = "C", alias = "celsius")]
    Celsius,
    #[serde(alias = "f", alias = "F", alias = "fahrenheit")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn toggle(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }

    fn convert(self, temp_c: f64) -> f64 {
        match self {
            Self::Celsius => temp_c,
            Self::Fahrenheit => temperature::c2f(temp_c),
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "°{}", self.symbol())
    }
}

impl std::str::FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(Self::Celsius),
            "f" | "fahrenheit" => Ok(Self::Fahrenheit),
            other => Err(format!("unknown temperature unit '{other}' (expected c or f)")),
        }
    }
}

/// Rounds half-way values toward positive infinity, so -2.5 becomes -2.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Formats a Celsius reading in `unit`, e.g. `20.0` as Fahrenheit gives `"68°F"`.
pub fn format_temperature(value_c: f64, unit: TemperatureUnit) -> String {
    format!("{}{unit}", round_half_up(unit.convert(value_c)))
}

/// Like [`format_temperature`] but with a bare degree sign, for compact rows.
pub fn format_degrees(value_c: f64, unit: TemperatureUnit) -> String {
    format!("{}°", round_half_up(unit.convert(value_c)))
}

pub mod temperature {
    pub fn c2f(temp_c: f64) -> f64 {
        temp_c * 9.0 / 5.0 + 32.0
    }

    #[test]
    fn test_temperature() {
        assert_eq!(c2f(0.0), 32.0);
        assert_eq!(c2f(100.0), 212.0);
        assert_eq!(c2f(-40.0), -40.0);
    }
}

pub mod direction {
    const COMPASS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];

    pub fn degree_to_compass(deg: f64) -> &'static str {
        let deg = (deg % 360.0) + 360.0;
        let val = (deg / 22.5 + 0.5) as usize;
        COMPASS[val % 16]
    }

    #[test]
    fn test_degree_to_compass() {
        assert_eq!(degree_to_compass(0.0), "N");
        assert_eq!(degree_to_compass(90.0), "E");
        assert_eq!(degree_to_compass(180.0), "S");
        assert_eq!(degree_to_compass(270.0), "W");
        assert_eq!(degree_to_compass(360.0), "N");
        assert_eq!(degree_to_compass(-90.0), "W");
    }
}

#[test]
fn test_format_temperature() {
    assert_eq!(format_temperature(20.0, TemperatureUnit::Fahrenheit), "68°F");
    assert_eq!(format_temperature(20.0, TemperatureUnit::Celsius), "20°C");
    assert_eq!(format_temperature(21.5, TemperatureUnit::Celsius), "22°C");
    assert_eq!(format_temperature(-2.5, TemperatureUnit::Celsius), "-2°C");
    assert_eq!(format_temperature(-0.4, TemperatureUnit::Celsius), "0°C");
    assert_eq!(format_temperature(-40.0, TemperatureUnit::Fahrenheit), "-40°F");
}

#[test]
fn test_format_degrees() {
    assert_eq!(format_degrees(13.6, TemperatureUnit::Celsius), "14°");
    assert_eq!(format_degrees(0.0, TemperatureUnit::Fahrenheit), "32°");
}

#[test]
fn test_unit_toggle_and_parse() {
    assert_eq!(TemperatureUnit::Celsius.toggle(), TemperatureUnit::Fahrenheit);
    assert_eq!(TemperatureUnit::Fahrenheit.toggle(), TemperatureUnit::Celsius);
    assert_eq!("F".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Fahrenheit));
    assert_eq!("celsius".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Celsius));
    assert!("kelvin".parse::<TemperatureUnit>().is_err());
}
