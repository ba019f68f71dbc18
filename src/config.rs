use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::cli::Args;
use crate::error::ConfigError;
use crate::forecast::{DayBoundary, SLOTS_PER_DAY};
use crate::owm::Sources;
use crate::units::TemperatureUnit;

pub const DEFAULT_FORECAST_DAYS: usize = 5;

/// Optional TOML config; every key can be overridden on the command line.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub unit: Option<TemperatureUnit>,
    pub timezone: Option<String>,
    pub use_payload_offset: Option<bool>,
    pub hourly_slots: Option<usize>,
    pub forecast_days: Option<usize>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Where day boundaries come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneSetting {
    Explicit(DayBoundary),
    PayloadOffset,
    Local,
}

impl ZoneSetting {
    /// Falls back to the local zone when the payload carries no usable offset.
    pub fn boundary(&self, utc_offset: Option<i32>) -> DayBoundary {
        match self {
            Self::Explicit(boundary) => *boundary,
            Self::PayloadOffset => utc_offset
                .and_then(DayBoundary::from_offset_seconds)
                .unwrap_or_else(|| {
                    tracing::warn!(?utc_offset, "no usable payload offset, using local time");
                    DayBoundary::Local
                }),
            Self::Local => DayBoundary::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Sources,
    pub unit: TemperatureUnit,
    pub zone: ZoneSetting,
    pub hourly_slots: usize,
    pub forecast_days: usize,
    pub log_file: Option<PathBuf>,
    pub summary: bool,
}

impl Settings {
    /// Reads the config file named by `--config`, if any, and layers the arguments over it.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let file = match args.config {
            Some(ref path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let zone = match args.timezone.as_deref().or(file.timezone.as_deref()) {
            Some(name) => ZoneSetting::Explicit(parse_timezone(name)?),
            None if args.payload_offset || file.use_payload_offset.unwrap_or(false) => {
                ZoneSetting::PayloadOffset
            }
            None => ZoneSetting::Local,
        };

        Ok(Self {
            sources: Sources {
                forecast: args.forecast.clone(),
                current: args.current.clone(),
                location: args.location.clone(),
            },
            unit: args.unit.or(file.unit).unwrap_or_default(),
            zone,
            hourly_slots: args.hourly_slots.or(file.hourly_slots).unwrap_or(SLOTS_PER_DAY),
            forecast_days: args
                .days
                .or(file.forecast_days)
                .unwrap_or(DEFAULT_FORECAST_DAYS),
            log_file: args.log_file.clone().or(file.log_file),
            summary: args.summary,
        })
    }
}

pub fn parse_timezone(name: &str) -> Result<DayBoundary, ConfigError> {
    name.parse::<Tz>()
        .map(DayBoundary::Named)
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["wxdash", "forecast.json"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&args(&[]), FileConfig::default()).unwrap();

        assert_eq!(settings.unit, TemperatureUnit::Celsius);
        assert_eq!(settings.zone, ZoneSetting::Local);
        assert_eq!(settings.hourly_slots, 8);
        assert_eq!(settings.forecast_days, 5);
        assert!(!settings.summary);
        assert_eq!(settings.sources.forecast, PathBuf::from("forecast.json"));
    }

    #[test]
    fn test_args_override_file() {
        let file: FileConfig = toml::from_str(
            r#"
            unit = "f"
            timezone = "Europe/Oslo"
            hourly_slots = 4
            forecast_days = 3
            "#,
        )
        .unwrap();

        let settings =
            Settings::resolve(&args(&["--unit", "c", "--days", "2"]), file).unwrap();

        assert_eq!(settings.unit, TemperatureUnit::Celsius);
        assert_eq!(settings.forecast_days, 2);
        assert_eq!(settings.hourly_slots, 4);
        assert_eq!(
            settings.zone,
            ZoneSetting::Explicit(DayBoundary::Named(chrono_tz::Europe::Oslo))
        );
    }

    #[test]
    fn test_unknown_timezone() {
        let result = Settings::resolve(&args(&["--timezone", "Mars/Olympus"]), FileConfig::default());
        assert!(matches!(result, Err(ConfigError::UnknownTimezone(ref name)) if name == "Mars/Olympus"));
    }

    #[test]
    fn test_payload_offset_zone() {
        let settings =
            Settings::resolve(&args(&["--payload-offset"]), FileConfig::default()).unwrap();
        assert_eq!(settings.zone, ZoneSetting::PayloadOffset);

        assert_eq!(
            settings.zone.boundary(Some(3600)),
            DayBoundary::from_offset_seconds(3600).unwrap()
        );
        assert_eq!(settings.zone.boundary(None), DayBoundary::Local);
        assert_eq!(settings.zone.boundary(Some(i32::MAX)), DayBoundary::Local);
    }

    #[test]
    fn test_timezone_wins_over_payload_offset() {
        let settings = Settings::resolve(
            &args(&["--payload-offset", "--timezone", "UTC"]),
            FileConfig::default(),
        )
        .unwrap();
        assert_eq!(settings.zone, ZoneSetting::Explicit(DayBoundary::Named(Tz::UTC)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wxdash.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "unit = \"fahrenheit\"\nuse_payload_offset = true").unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.unit, Some(TemperatureUnit::Fahrenheit));
        assert_eq!(config.use_payload_offset, Some(true));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "units = 3").unwrap();
        assert!(matches!(FileConfig::load(&bad), Err(ConfigError::Parse { .. })));

        assert!(matches!(
            FileConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
