use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::Vector;

/// Julian day of the J2000.0 epoch.
const J2000: f64 = 2451545.0;
/// Julian day of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2440587.5;

/// Geographic location of the analysed site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoLocation {
    /// Degrees, positive north.
    pub latitude: f64,
    /// Degrees, positive east.
    pub longitude: f64,
    /// Offset of local civil time from UTC, in hours.
    pub timezone_offset: f64,
    /// Metres above sea level. Informational: the low-precision
    /// ephemeris does not depend on it.
    pub elevation: f64,
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self {
            latitude: 55.75,
            longitude: 37.62,
            timezone_offset: 3.0,
            elevation: 150.0,
        }
    }
}

impl GeoLocation {
    /// Converts local civil time to UTC.
    pub fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        local - Duration::seconds((self.timezone_offset * 3600.0).round() as i64)
    }
}

/// Fractional Julian day of a UTC timestamp.
pub fn julian_day(utc: NaiveDateTime) -> f64 {
    utc.and_utc().timestamp_millis() as f64 / 86_400_000.0 + UNIX_EPOCH_JD
}

/// Solar position (azimuth and altitude angles).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarPosition {
    /// Solar altitude angle in degrees (0 = horizon, 90 = zenith).
    pub altitude: f64,
    /// Solar azimuth angle in degrees from north, clockwise (0=N, 90=E, 180=S, 270=W).
    pub azimuth: f64,
}

impl SolarPosition {
    /// Calculates the solar position with the low-precision ephemeris of the
    /// Astronomical Almanac (about 0.01 deg between 1950 and 2050).
    ///
    /// - `utc`: UTC timestamp
    /// - `latitude`: in degrees (positive north)
    /// - `longitude`: in degrees (positive east)
    pub fn calculate(utc: NaiveDateTime, latitude: f64, longitude: f64) -> Self {
        let n = julian_day(utc) - J2000;

        // Mean longitude and mean anomaly
        let mean_lon = (280.460 + 0.9856474 * n).rem_euclid(360.0);
        let mean_anomaly = (357.528 + 0.9856003 * n).rem_euclid(360.0).to_radians();

        // Ecliptic longitude (equation of center) and obliquity
        let ecl_lon = (mean_lon
            + 1.915 * mean_anomaly.sin()
            + 0.020 * (2.0 * mean_anomaly).sin())
        .to_radians();
        let obliquity = (23.439 - 0.0000004 * n).to_radians();

        let right_ascension = (obliquity.cos() * ecl_lon.sin()).atan2(ecl_lon.cos());
        let declination = (obliquity.sin() * ecl_lon.sin()).clamp(-1.0, 1.0).asin();

        // Local mean sidereal time gives the hour angle
        let gmst_hours = (18.697374558 + 24.06570982441908 * n).rem_euclid(24.0);
        let lmst = (gmst_hours * 15.0 + longitude).to_radians();
        let hour_angle = lmst - right_ascension;

        let lat = latitude.to_radians();
        let sin_alt = lat.sin() * declination.sin()
            + lat.cos() * declination.cos() * hour_angle.cos();
        let altitude = sin_alt.clamp(-1.0, 1.0).asin().to_degrees();

        let y = -declination.cos() * hour_angle.sin();
        let x = declination.sin() * lat.cos() - declination.cos() * lat.sin() * hour_angle.cos();
        let mut azimuth = y.atan2(x).to_degrees().rem_euclid(360.0);
        if azimuth >= 360.0 {
            azimuth = 0.0;
        }

        Self { altitude, azimuth }
    }

    /// Solar position at a local civil time of `location`.
    pub fn at(local: NaiveDateTime, location: &GeoLocation) -> Self {
        Self::calculate(
            location.to_utc(local),
            location.latitude,
            location.longitude,
        )
    }

    /// Recovers altitude and azimuth from a direction toward the sun.
    pub fn from_direction(dir: &Vector) -> Self {
        let altitude = dir.dz.clamp(-1.0, 1.0).asin().to_degrees();
        let mut azimuth = dir.dx.atan2(dir.dy).to_degrees().rem_euclid(360.0);
        if azimuth >= 360.0 {
            azimuth = 0.0;
        }
        Self { altitude, azimuth }
    }

    /// Returns true if the sun is above the horizon.
    pub fn is_above_horizon(&self) -> bool {
        self.altitude > 0.0
    }

    /// Converts solar position to a unit direction vector (pointing toward the sun).
    pub fn to_direction(&self) -> Vector {
        let alt = self.altitude.to_radians();
        let azi = self.azimuth.to_radians();

        // Convention: azimuth from north clockwise
        // North = +Y, East = +X, Up = +Z
        let x = alt.cos() * azi.sin();
        let y = alt.cos() * azi.cos();
        let z = alt.sin();

        Vector::new(x, y, z)
    }
}
