//! Aggregation of 3-hour forecast samples into the hourly rainfall view and
//! the per-day summaries shown on the dashboard.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

/// Number of 3-hour slots covering the next 24 hours.
pub const SLOTS_PER_DAY: usize = 8;

/// An optional reading from the API that counts as zero when absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroDefault<T>(Option<T>);

impl<T: Copy + Default> ZeroDefault<T> {
    /// The reading, or `T::default()` when the API left it out.
    pub fn get(&self) -> T {
        self.0.unwrap_or_default()
    }
}

impl<T> Default for ZeroDefault<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> From<Option<T>> for ZeroDefault<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

/// Calendar date a sample belongs to, as seen from a [`DayBoundary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Time zone in which day boundaries (and clock labels) are computed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DayBoundary {
    /// The viewer's local zone.
    #[default]
    Local,
    Named(Tz),
    Offset(FixedOffset),
}

impl DayBoundary {
    /// Builds a fixed-offset boundary from seconds east of UTC, as carried in
    /// the forecast payload's `city.timezone`.
    pub fn from_offset_seconds(seconds: i32) -> Option<Self> {
        FixedOffset::east_opt(seconds).map(Self::Offset)
    }

    /// Wall-clock time of `timestamp` in this zone. `None` if chrono cannot
    /// represent the timestamp.
    pub fn local_datetime(&self, timestamp: i64) -> Option<NaiveDateTime> {
        let utc = DateTime::from_timestamp(timestamp, 0)?;
        Some(match self {
            Self::Local => utc.with_timezone(&Local).naive_local(),
            Self::Named(tz) => utc.with_timezone(tz).naive_local(),
            Self::Offset(offset) => utc.with_timezone(offset).naive_local(),
        })
    }

    pub fn date_key(&self, timestamp: i64) -> Option<DateKey> {
        self.local_datetime(timestamp).map(|dt| DateKey(dt.date()))
    }
}

impl fmt::Display for DayBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Named(tz) => write!(f, "{}", tz.name()),
            Self::Offset(offset) => write!(f, "UTC{offset}"),
        }
    }
}

/// One 3-hour forecast slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    /// Seconds since the epoch, start of the slot.
    pub timestamp: i64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity: u8,
    /// m/s
    pub wind_speed: f64,
    pub weather_description: String,
    pub weather_icon_id: String,
    /// 0.0 to 1.0
    pub precipitation_probability: ZeroDefault<f64>,
    /// mm over the 3 hours
    pub rain_accumulation_3h: ZeroDefault<f64>,
}

impl ForecastSample {
    pub fn probability(&self) -> f64 {
        self.precipitation_probability.get().clamp(0.0, 1.0)
    }

    pub fn rain_mm(&self) -> f64 {
        self.rain_accumulation_3h.get().max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: DateKey,
    pub representative_timestamp: i64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub weather_description: String,
    pub weather_icon_id: String,
    /// mm
    pub rainfall_total: f64,
    /// percent, 0 to 100
    pub rain_probability_avg: f64,
    pub sample_count: usize,
}

struct DayAccumulator {
    summary: DailySummary,
    probability_sum: f64,
}

impl DayAccumulator {
    fn open(date: DateKey, sample: &ForecastSample) -> Self {
        Self {
            summary: DailySummary {
                date,
                representative_timestamp: sample.timestamp,
                temperature_min: sample.temperature_min,
                temperature_max: sample.temperature_max,
                humidity: sample.humidity,
                wind_speed: sample.wind_speed,
                weather_description: sample.weather_description.clone(),
                weather_icon_id: sample.weather_icon_id.clone(),
                rainfall_total: sample.rain_mm(),
                rain_probability_avg: 0.0,
                sample_count: 1,
            },
            probability_sum: sample.probability(),
        }
    }

    fn fold(&mut self, sample: &ForecastSample) {
        let day = &mut self.summary;
        day.temperature_min = day.temperature_min.min(sample.temperature_min);
        day.temperature_max = day.temperature_max.max(sample.temperature_max);
        day.rainfall_total += sample.rain_mm();
        day.sample_count += 1;
        self.probability_sum += sample.probability();
    }

    fn finish(self) -> DailySummary {
        let mut summary = self.summary;
        let mean = self.probability_sum / summary.sample_count as f64;
        summary.rain_probability_avg = (mean * 100.0).clamp(0.0, 100.0);
        summary
    }
}

/// Buckets `samples` by calendar date in `boundary` and folds each bucket into
/// a [`DailySummary`]. Days come out in order of first appearance.
pub fn group_by_day(samples: &[ForecastSample], boundary: &DayBoundary) -> Vec<DailySummary> {
    let mut index: HashMap<DateKey, usize> = HashMap::new();
    let mut days: Vec<DayAccumulator> = Vec::new();

    for sample in samples {
        let Some(key) = boundary.date_key(sample.timestamp) else {
            tracing::warn!(
                timestamp = sample.timestamp,
                "skipping forecast sample with unrepresentable timestamp"
            );
            continue;
        };
        match index.get(&key) {
            Some(&i) => days[i].fold(sample),
            None => {
                index.insert(key, days.len());
                days.push(DayAccumulator::open(key, sample));
            }
        }
    }

    tracing::debug!(samples = samples.len(), days = days.len(), %boundary, "grouped forecast");
    days.into_iter().map(DayAccumulator::finish).collect()
}

/// The first `n` samples, or all of them if there are fewer.
pub fn next_n_hourly(samples: &[ForecastSample], n: usize) -> &[ForecastSample] {
    &samples[..n.min(samples.len())]
}

/// The days after the first bucket (normally the partial current day), at most `days` of them.
pub fn upcoming_days(summaries: &[DailySummary], days: usize) -> &[DailySummary] {
    match summaries.get(1..) {
        Some(rest) => &rest[..days.min(rest.len())],
        None => &[],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRainfall {
    pub timestamp: i64,
    /// `HH:MM` in the day boundary's zone
    pub time_label: String,
    /// percent
    pub probability: f64,
    /// mm
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RainfallOutlook {
    pub slots: Vec<HourlyRainfall>,
    pub total_rainfall: f64,
    pub average_probability: f64,
}

impl RainfallOutlook {
    /// Hours covered by the slots actually present.
    pub fn hours(&self) -> usize {
        self.slots.len() * 3
    }
}

/// Rainfall over the first `n` slots: per-slot chance and amount, total mm and mean chance.
pub fn rainfall_outlook(
    samples: &[ForecastSample],
    n: usize,
    boundary: &DayBoundary,
) -> RainfallOutlook {
    let slots: Vec<HourlyRainfall> = next_n_hourly(samples, n)
        .iter()
        .map(|sample| HourlyRainfall {
            timestamp: sample.timestamp,
            time_label: boundary
                .local_datetime(sample.timestamp)
                .map(|dt| dt.format("%H:%M").to_string())
                .unwrap_or_else(|| "--".to_string()),
            probability: sample.probability() * 100.0,
            amount: sample.rain_mm(),
        })
        .collect();

    let total_rainfall = slots.iter().map(|s| s.amount).sum();
    let average_probability = if slots.is_empty() {
        0.0
    } else {
        slots.iter().map(|s| s.probability).sum::<f64>() / slots.len() as f64
    };

    RainfallOutlook {
        slots,
        total_rainfall,
        average_probability,
    }
}

#[cfg(test)]
pub(crate) fn sample(
    timestamp: i64,
    temps: (f64, f64),
    pop: Option<f64>,
    rain: Option<f64>,
) -> ForecastSample {
    ForecastSample {
        timestamp,
        temperature_min: temps.0,
        temperature_max: temps.1,
        humidity: 70,
        wind_speed: 3.5,
        weather_description: "light rain".to_string(),
        weather_icon_id: "10d".to_string(),
        precipitation_probability: pop.into(),
        rain_accumulation_3h: rain.into(),
    }
}
