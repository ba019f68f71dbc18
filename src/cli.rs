use std::path::PathBuf;

use clap::builder::{styling::AnsiColor, Styles};
use clap::Parser;

use crate::units::TemperatureUnit;

const ABOUT: &str = "OpenWeather forecast dashboard TUI";

const LONG_ABOUT: &str = "
TUI for viewing current conditions, rainfall and a 5-day forecast from OpenWeather payloads.

The user supplies the 5-day/3-hour forecast JSON and, optionally, the current weather and
direct geocoding JSON saved from the OpenWeather API. Nothing is fetched over the network.

Keys: `u` toggles Celsius/Fahrenheit, `r` reloads the files, `q` quits.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(name = "wxdash", version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(help = "OpenWeather 5-day/3-hour forecast JSON file")]
    pub forecast: PathBuf,

    #[arg(long, help = "OpenWeather current weather JSON file")]
    pub current: Option<PathBuf>,

    #[arg(long, help = "OpenWeather direct geocoding JSON file")]
    pub location: Option<PathBuf>,

    #[arg(short, long, help = "Temperature unit: c or f")]
    pub unit: Option<TemperatureUnit>,

    #[arg(long, help = "IANA time zone for day boundaries (e.g. Europe/Oslo)")]
    pub timezone: Option<String>,

    #[arg(long, help = "Use the forecast payload's city offset for day boundaries")]
    pub payload_offset: bool,

    #[arg(long, help = "Number of 3-hour slots in the rainfall view")]
    pub hourly_slots: Option<usize>,

    #[arg(long, help = "Number of upcoming days in the forecast")]
    pub days: Option<usize>,

    #[arg(short, long, help = "TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Write logs to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, help = "Print a plain-text summary instead of starting the TUI")]
    pub summary: bool,
}
