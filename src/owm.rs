//! OpenWeather payload shapes, read from JSON files that were fetched elsewhere.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::DashboardError;
use crate::forecast::ForecastSample;
use crate::weather::{CurrentConditions, Place};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Condition {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub icon: String,
}

fn first_condition(weather: &[Condition]) -> Condition {
    weather.first().cloned().unwrap_or_default()
}

fn percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

pub mod current {
    use super::*;

    #[derive(Deserialize, Debug)]
    pub struct CurrentWeatherResponse {
        pub dt: i64,

        pub name: Option<String>,

        pub main: Main,

        pub wind: Wind,

        #[serde(default)]
        pub weather: Vec<Condition>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Main {
        pub temp: f64,
        pub feels_like: f64,
        pub temp_min: f64,
        pub temp_max: f64,
        pub humidity: f64,
    }

    #[derive(Deserialize, Debug)]
    pub struct Wind {
        pub speed: f64,
        pub deg: Option<f64>,
    }

    impl CurrentWeatherResponse {
        pub fn to_conditions(&self) -> CurrentConditions {
            let condition = first_condition(&self.weather);
            CurrentConditions {
                station_name: self.name.clone().filter(|n| !n.is_empty()),
                observed_at: self.dt,
                temperature: self.main.temp,
                feels_like: self.main.feels_like,
                temperature_min: self.main.temp_min,
                temperature_max: self.main.temp_max,
                humidity: percent(self.main.humidity),
                wind_speed: self.wind.speed,
                wind_direction: self.wind.deg,
                description: condition.description,
                icon: condition.icon,
            }
        }
    }
}

pub mod forecast {
    use super::*;

    #[derive(Deserialize, Debug)]
    pub struct ForecastResponse {
        pub list: Vec<ForecastItem>,

        pub city: Option<City>,
    }

    #[derive(Deserialize, Debug)]
    pub struct City {
        /// Seconds east of UTC.
        pub timezone: Option<i32>,
    }

    #[derive(Deserialize, Debug)]
    pub struct ForecastItem {
        pub dt: i64,

        pub main: Main,

        #[serde(default)]
        pub weather: Vec<Condition>,

        pub wind: Wind,

        pub pop: Option<f64>,

        pub rain: Option<Precipitation>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Main {
        pub temp_min: f64,
        pub temp_max: f64,
        pub humidity: f64,
    }

    #[derive(Deserialize, Debug)]
    pub struct Wind {
        pub speed: f64,
    }

    #[derive(Deserialize, Debug)]
    pub struct Precipitation {
        #[serde(rename = "3h")]
        pub three_hours: Option<f64>,
    }

    impl ForecastItem {
        pub fn to_sample(&self) -> ForecastSample {
            let condition = first_condition(&self.weather);
            ForecastSample {
                timestamp: self.dt,
                temperature_min: self.main.temp_min,
                temperature_max: self.main.temp_max,
                humidity: percent(self.main.humidity),
                wind_speed: self.wind.speed.max(0.0),
                weather_description: condition.description,
                weather_icon_id: condition.icon,
                precipitation_probability: self.pop.into(),
                rain_accumulation_3h: self.rain.as_ref().and_then(|r| r.three_hours).into(),
            }
        }
    }
}

pub mod geocoding {
    use super::*;

    #[derive(Deserialize, Debug, Clone)]
    pub struct GeocodingResponse {
        pub name: String,

        pub state: Option<String>,

        #[serde(default)]
        pub country: String,
    }

    /// The direct-geocoding endpoint returns an array; a saved single entry is accepted too.
    #[derive(Deserialize, Debug)]
    #[serde(untagged)]
    pub enum GeocodingFile {
        Many(Vec<GeocodingResponse>),
        One(GeocodingResponse),
    }

    impl GeocodingFile {
        pub fn first(self) -> Option<GeocodingResponse> {
            match self {
                Self::One(place) => Some(place),
                Self::Many(places) => places.into_iter().next(),
            }
        }
    }

    impl GeocodingResponse {
        pub fn to_place(&self) -> Place {
            Place {
                name: self.name.clone(),
                state: self.state.clone(),
                country: self.country.clone(),
            }
        }
    }
}

/// Paths of the payload files backing the dashboard.
#[derive(Debug, Clone)]
pub struct Sources {
    pub forecast: PathBuf,
    pub current: Option<PathBuf>,
    pub location: Option<PathBuf>,
}

/// Everything read from one load of the payload files.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub samples: Vec<ForecastSample>,
    pub current: Option<CurrentConditions>,
    pub place: Option<Place>,
    /// `city.timezone` from the forecast payload, seconds east of UTC.
    pub utc_offset: Option<i32>,
}

impl Dataset {
    pub fn load(sources: &Sources) -> Result<Self, DashboardError> {
        let forecast: forecast::ForecastResponse = read_json(&sources.forecast)?;
        let samples: Vec<ForecastSample> =
            forecast.list.iter().map(forecast::ForecastItem::to_sample).collect();
        tracing::info!(
            path = %sources.forecast.display(),
            samples = samples.len(),
            "loaded forecast"
        );

        let current = match sources.current {
            Some(ref path) => {
                let response: current::CurrentWeatherResponse = read_json(path)?;
                tracing::debug!(path = %path.display(), "loaded current weather");
                Some(response.to_conditions())
            }
            None => None,
        };

        let place = match sources.location {
            Some(ref path) => {
                let file: geocoding::GeocodingFile = read_json(path)?;
                let place = file.first().map(|g| g.to_place());
                if place.is_none() {
                    tracing::warn!(path = %path.display(), "geocoding payload has no entries");
                }
                place
            }
            None => None,
        };

        Ok(Self {
            samples,
            current,
            place,
            utc_offset: forecast.city.and_then(|c| c.timezone),
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DashboardError> {
    let text = fs::read_to_string(path).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DashboardError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) const FORECAST_JSON: &str = r#"{
    "cod": "200",
    "cnt": 3,
    "list": [
        {
            "dt": 1704067200,
            "main": {"temp": 4.1, "temp_min": 3.2, "temp_max": 4.9, "humidity": 81},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10n"}],
            "wind": {"speed": 4.2, "deg": 200},
            "pop": 0.6,
            "rain": {"3h": 0.75}
        },
        {
            "dt": 1704078000,
            "main": {"temp": 5.0, "temp_min": 4.4, "temp_max": 5.6, "humidity": 77},
            "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
            "wind": {"speed": 3.1},
            "pop": 0.2
        },
        {
            "dt": 1704153600,
            "main": {"temp": 1.0, "temp_min": -1.5, "temp_max": 2.0, "humidity": 90},
            "weather": [],
            "wind": {"speed": 1.0}
        }
    ],
    "city": {"id": 5261457, "name": "Madison", "timezone": -21600}
}"#;

#[cfg(test)]
pub(crate) const CURRENT_JSON: &str = r#"{
    "dt": 1704067200,
    "name": "Madison",
    "main": {"temp": 4.3, "feels_like": 1.2, "temp_min": 3.0, "temp_max": 5.5, "humidity": 80, "pressure": 1012},
    "wind": {"speed": 4.6, "deg": 270},
    "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10n"}],
    "timezone": -21600
}"#;

#[cfg(test)]
pub(crate) const LOCATION_JSON: &str = r#"[
    {"name": "Madison", "lat": 43.07, "lon": -89.40, "country": "US", "state": "Wisconsin"}
]"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::ZeroDefault;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_forecast_item_optional_fields() {
        let response: forecast::ForecastResponse = serde_json::from_str(FORECAST_JSON).unwrap();
        let samples: Vec<_> = response.list.iter().map(|i| i.to_sample()).collect();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].rain_mm(), 0.75);
        assert_eq!(samples[0].probability(), 0.6);
        assert_eq!(samples[0].weather_icon_id, "10n");

        assert_eq!(samples[1].rain_accumulation_3h, ZeroDefault::default());
        assert_eq!(samples[1].rain_mm(), 0.0);

        assert_eq!(samples[2].probability(), 0.0);
        assert_eq!(samples[2].weather_description, "");
        assert_eq!(samples[2].humidity, 90);
        assert_eq!(response.city.and_then(|c| c.timezone), Some(-21600));
    }

    #[test]
    fn test_current_conditions() {
        let response: current::CurrentWeatherResponse =
            serde_json::from_str(CURRENT_JSON).unwrap();
        let current = response.to_conditions();

        assert_eq!(current.station_name.as_deref(), Some("Madison"));
        assert_eq!(current.humidity, 80);
        assert_eq!(current.wind_direction, Some(270.0));
        assert_eq!(current.description, "light rain");
    }

    #[test]
    fn test_geocoding_single_or_array() {
        let many: geocoding::GeocodingFile = serde_json::from_str(LOCATION_JSON).unwrap();
        assert_eq!(many.first().unwrap().to_place().title(), "Madison, Wisconsin");

        let one: geocoding::GeocodingFile =
            serde_json::from_str(r#"{"name": "Oslo", "lat": 59.9, "lon": 10.7, "country": "NO"}"#)
                .unwrap();
        assert_eq!(one.first().unwrap().name, "Oslo");

        let none: geocoding::GeocodingFile = serde_json::from_str("[]").unwrap();
        assert!(none.first().is_none());
    }

    #[test]
    fn test_dataset_load() {
        let dir = tempfile::tempdir().unwrap();
        let sources = Sources {
            forecast: write_file(&dir, "forecast.json", FORECAST_JSON),
            current: Some(write_file(&dir, "current.json", CURRENT_JSON)),
            location: Some(write_file(&dir, "location.json", LOCATION_JSON)),
        };

        let dataset = Dataset::load(&sources).unwrap();

        assert_eq!(dataset.samples.len(), 3);
        assert!(dataset.current.is_some());
        assert_eq!(dataset.place.unwrap().country, "US");
        assert_eq!(dataset.utc_offset, Some(-21600));
    }

    #[test]
    fn test_dataset_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Sources {
            forecast: dir.path().join("nope.json"),
            current: None,
            location: None,
        };
        assert!(matches!(Dataset::load(&missing), Err(DashboardError::Io { .. })));

        let broken = Sources {
            forecast: write_file(&dir, "broken.json", "{\"list\": 3}"),
            current: None,
            location: None,
        };
        assert!(matches!(Dataset::load(&broken), Err(DashboardError::Parse { .. })));
    }
}
