use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};

use super::position::{GeoLocation, SolarPosition};
use crate::Vector;
use crate::error::InputError;

/// Time sampling of the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SunPathConfig {
    pub year: i32,
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
    /// Local civil hour of the first slot of each day.
    pub start_hour: f64,
    /// Local civil hour of the last slot of each day (inclusive).
    pub end_hour: f64,
    /// Days between consecutive analysed days.
    pub day_step: u32,
    /// Hours between consecutive time slots.
    pub hour_step: f64,
    /// Samples with the sun lower than this are dropped.
    pub min_altitude_deg: f64,
}

impl Default for SunPathConfig {
    fn default() -> Self {
        Self {
            year: 2025,
            start_month: 4,
            start_day: 22,
            end_month: 4,
            end_day: 22,
            start_hour: 0.0,
            end_hour: 24.0,
            day_step: 1,
            hour_step: 10.0 / 60.0,
            min_altitude_deg: 5.0,
        }
    }
}

impl SunPathConfig {
    /// Time step rounded to whole minutes.
    pub fn step_minutes(&self) -> i64 {
        (self.hour_step * 60.0).round() as i64
    }

    fn date(&self, month: u32, day: u32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, month, day).ok_or_else(|| {
            InputError::InvalidDate {
                year: self.year,
                month,
                day,
            }
            .into()
        })
    }

    pub fn validate(&self) -> Result<()> {
        let start = self.date(self.start_month, self.start_day)?;
        let end = self.date(self.end_month, self.end_day)?;
        if end < start {
            return Err(InputError::InvalidConfig(format!(
                "date range ends ({end}) before it starts ({start})"
            ))
            .into());
        }
        if self.day_step == 0 {
            return Err(InputError::InvalidConfig("day_step must be positive".into()).into());
        }
        if self.step_minutes() < 1 {
            return Err(
                InputError::InvalidConfig("hour_step must be at least one minute".into()).into(),
            );
        }
        if !(0.0..=24.0).contains(&self.start_hour)
            || !(0.0..=24.0).contains(&self.end_hour)
            || self.end_hour < self.start_hour
        {
            return Err(InputError::InvalidConfig(format!(
                "invalid hour range {}..{}",
                self.start_hour, self.end_hour
            ))
            .into());
        }
        if !(-90.0..90.0).contains(&self.min_altitude_deg) {
            return Err(InputError::InvalidConfig(format!(
                "min_altitude_deg {} out of range",
                self.min_altitude_deg
            ))
            .into());
        }
        Ok(())
    }
}

/// One sun direction kept for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunSample {
    /// Analysis day (0-based, in the sampled day sequence).
    pub day: usize,
    /// Time slot within the day. Consecutive slots are one time step apart.
    pub slot: usize,
    /// Local civil time, if the sample comes from the ephemeris.
    pub timestamp: Option<NaiveDateTime>,
    pub altitude: f64,
    pub azimuth: f64,
    /// Unit vector toward the sun (east=X, north=Y, up=Z).
    pub direction: Vector,
}

/// Ordered set of sun directions over the analysis window.
///
/// Samples are in chronological order. Slots dropped by the altitude filter
/// leave holes in `(day, slot)` that evaluators treat as blocked time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunPath {
    samples: Vec<SunSample>,
    num_days: usize,
    slots_per_day: usize,
    time_step_minutes: f64,
    min_altitude_deg: f64,
}

impl SunPath {
    /// Samples the sun over the configured date range.
    ///
    /// An empty path is a valid result (no slot reached `min_altitude_deg`);
    /// callers that need directions must reject it themselves.
    pub fn generate(location: &GeoLocation, config: &SunPathConfig) -> Result<Self> {
        config.validate()?;
        let start = config.date(config.start_month, config.start_day)?;
        let end = config.date(config.end_month, config.end_day)?;

        let step = config.step_minutes();
        let first_minute = (config.start_hour * 60.0).round() as i64;
        let last_minute = (config.end_hour * 60.0).round() as i64;
        let slots_per_day = ((last_minute - first_minute) / step + 1) as usize;
        let min_sin = config.min_altitude_deg.to_radians().sin();

        let mut samples = Vec::new();
        let mut day = 0;
        let mut date = start;
        while date <= end {
            let midnight = date.and_time(chrono::NaiveTime::MIN);
            for slot in 0..slots_per_day {
                let local = midnight + Duration::minutes(first_minute + slot as i64 * step);
                let pos = SolarPosition::at(local, location);
                let direction = pos.to_direction();
                if pos.altitude < config.min_altitude_deg || direction.dz < min_sin {
                    continue;
                }
                samples.push(SunSample {
                    day,
                    slot,
                    timestamp: Some(local),
                    altitude: pos.altitude,
                    azimuth: pos.azimuth,
                    direction,
                });
            }
            day += 1;
            date += Duration::days(config.day_step as i64);
        }

        debug!(
            "Sun path: {} days x {} slots, {} samples above {:.1} deg",
            day,
            slots_per_day,
            samples.len(),
            config.min_altitude_deg
        );

        Ok(Self {
            samples,
            num_days: day,
            slots_per_day,
            time_step_minutes: step as f64,
            min_altitude_deg: config.min_altitude_deg,
        })
    }

    /// Builds a single-day path from caller-supplied directions.
    ///
    /// Directions are normalized and taken as consecutive time slots.
    pub fn from_directions(directions: &[Vector], time_step_minutes: f64) -> Result<Self> {
        if time_step_minutes <= 0.0 {
            return Err(
                InputError::InvalidConfig("time step must be positive".into()).into(),
            );
        }
        let samples = directions
            .iter()
            .enumerate()
            .map(|(slot, d)| {
                let direction = d.normalize()?;
                let pos = SolarPosition::from_direction(&direction);
                Ok(SunSample {
                    day: 0,
                    slot,
                    timestamp: None,
                    altitude: pos.altitude,
                    azimuth: pos.azimuth,
                    direction,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            num_days: 1,
            slots_per_day: samples.len(),
            samples,
            time_step_minutes,
            min_altitude_deg: 0.0,
        })
    }

    pub fn samples(&self) -> &[SunSample] {
        &self.samples
    }

    pub fn directions(&self) -> Vec<Vector> {
        self.samples.iter().map(|s| s.direction).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_days(&self) -> usize {
        self.num_days
    }

    pub fn slots_per_day(&self) -> usize {
        self.slots_per_day
    }

    /// Altitude filter the path was generated with.
    pub fn min_altitude_deg(&self) -> f64 {
        self.min_altitude_deg
    }

    pub fn time_step_minutes(&self) -> f64 {
        self.time_step_minutes
    }

    /// Rebuilds one fixed-step free/blocked sequence per analysed day.
    ///
    /// `is_free(i)` is asked for every sample index `i`; slots without a sample
    /// are blocked.
    pub fn day_sequences<F>(&self, is_free: F) -> Vec<Vec<bool>>
    where
        F: Fn(usize) -> bool,
    {
        let mut days = vec![vec![false; self.slots_per_day]; self.num_days];
        for (i, s) in self.samples.iter().enumerate() {
            if is_free(i) {
                days[s.day][s.slot] = true;
            }
        }
        days
    }
}
