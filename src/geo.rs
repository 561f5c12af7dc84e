// src/geo.rs

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::util::round;

/* ---------------- DOMAIN TYPES ---------------- */

// Indicates whether a value is a latitude or a longitude.
// Used to apply correct bounds and valid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        };
        write!(f, "{s}")
    }
}

// Identifies which field of an angle failed during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordField {
    Deg,
    Min,
    Sec,
}

impl fmt::Display for CoordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoordField::Deg => "degrees",
            CoordField::Min => "minutes",
            CoordField::Sec => "seconds",
        };
        write!(f, "{s}")
    }
}

// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/* ---------------- VALIDATION ---------------- */

// Errors related to numeric values and geographic limits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordError {
    #[error("{axis} `{value}` is not a finite number")]
    NotFinite { axis: Axis, value: f64 },
    #[error("{axis} `{value}` out of range")]
    OutOfRange { axis: Axis, value: f64 },
}

fn check_axis(value: f64, axis: Axis) -> Result<f64, CoordError> {
    if !value.is_finite() {
        return Err(CoordError::NotFinite { axis, value });
    }
    if value.abs() > axis.limit() {
        return Err(CoordError::OutOfRange { axis, value });
    }
    Ok(value)
}

impl Coordinate {
    // Validated constructor: latitude in [-90, 90], longitude in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        Ok(Self {
            latitude: check_axis(latitude, Axis::Latitude)?,
            longitude: check_axis(longitude, Axis::Longitude)?,
        })
    }

    // Unchecked constructor for values that are already trusted.
    pub const fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    // Both axes rounded to `decimals` places.
    pub fn rounded(self, decimals: u32) -> Self {
        Self {
            latitude: round(self.latitude, decimals),
            longitude: round(self.longitude, decimals),
        }
    }

    // "<lat>,<lon>" with the shortest decimal representation of each axis.
    pub fn raw_text(&self) -> String {
        self.to_string()
    }

    pub fn to_dms(&self) -> String {
        format!(
            "{} {}",
            dd_to_dms(self.latitude, Axis::Latitude),
            dd_to_dms(self.longitude, Axis::Longitude)
        )
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coordinate(s)
    }
}

/* ---------------- PARSING ---------------- */

// Decimal degree pair: "13.7563,100.5018" or "13.7563 100.5018".
static DECIMAL_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)^\s*
            ([-+]?(?:\d+(?:\.\d*)?|\.\d+))   # latitude
            \s*(?:,|\s)\s*
            ([-+]?(?:\d+(?:\.\d*)?|\.\d+))   # longitude
            \s*$"#
    ).expect("Invalid decimal pair regex")
});

// Angle pair: everything up to the first N/S is the latitude.
static ANGLE_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)^\s*
            ([^NSns]*[NSns])   # latitude, direction included
            \s*,?\s*
            (.+?)              # longitude
            \s*$"#
    ).expect("Invalid angle pair regex")
});

// One angle in DMS (48°51'29"N) or DDM (48°51.492'N) form.
// Supports ASCII and Unicode symbols.
static ANGLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)^\s*
            ([^°\s]+)\s*°\s*                   # degrees
            ([^'′\s]+)\s*['′]\s*               # minutes
            (?:([^"″\s]+)\s*["″]\s*)?          # seconds, DMS only
            (\S)                               # direction
            \s*$"#
    ).expect("Invalid angle regex")
});

// Errors raised while parsing coordinate text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid coordinate format")]
    InvalidFormat,
    #[error("invalid {axis} field: {field}")]
    InvalidField { axis: Axis, field: CoordField },
    #[error("invalid direction `{dir}` for {axis}")]
    InvalidDirection { axis: Axis, dir: char },
    #[error("invalid coord ({0})")]
    InvalidCoord(#[from] CoordError),
}

// Parses a coordinate pair in decimal, DMS or DDM notation.
pub fn parse_coordinate(input: &str) -> Result<Coordinate, ParseError> {
    if let Some(caps) = DECIMAL_PAIR_RE.captures(input) {
        let lat: f64 = caps[1].parse().map_err(|_| ParseError::InvalidFormat)?;
        let lon: f64 = caps[2].parse().map_err(|_| ParseError::InvalidFormat)?;
        return Ok(Coordinate::new(lat, lon)?);
    }

    let caps = ANGLE_PAIR_RE.captures(input).ok_or(ParseError::InvalidFormat)?;
    let lat = angle_to_dd(&caps[1], Axis::Latitude)?;
    let lon = angle_to_dd(&caps[2], Axis::Longitude)?;

    Ok(Coordinate::new(lat, lon)?)
}

fn parse_field(raw: Option<regex::Match<'_>>, axis: Axis, field: CoordField) -> Result<f64, ParseError> {
    let value: f64 = match raw {
        Some(m) => m
            .as_str()
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidField { axis, field })?,
        None => 0.0,
    };

    if !value.is_finite() {
        return Err(ParseError::InvalidFormat);
    }
    let valid = match field {
        CoordField::Deg => value >= 0.0,
        CoordField::Min | CoordField::Sec => (0.0..60.0).contains(&value),
    };
    if !valid {
        return Err(ParseError::InvalidField { axis, field });
    }

    Ok(value)
}

// Parses one DMS or DDM angle and converts it to signed decimal degrees.
pub fn angle_to_dd(input: &str, axis: Axis) -> Result<f64, ParseError> {
    let caps = ANGLE_RE.captures(input).ok_or(ParseError::InvalidFormat)?;

    let deg = parse_field(caps.get(1), axis, CoordField::Deg)?;
    let min = parse_field(caps.get(2), axis, CoordField::Min)?;
    let sec = parse_field(caps.get(3), axis, CoordField::Sec)?;
    let dir = caps[4]
        .chars()
        .next()
        .ok_or(ParseError::InvalidFormat)?
        .to_ascii_uppercase();

    let negative = match (axis, dir) {
        (Axis::Latitude, 'N') | (Axis::Longitude, 'E') => false,
        (Axis::Latitude, 'S') | (Axis::Longitude, 'W' | 'O') => true,
        _ => return Err(ParseError::InvalidDirection { axis, dir }),
    };

    let value = deg + min / 60.0 + sec / 3600.0;
    let value = if negative { -value } else { value };

    Ok(check_axis(value, axis)?)
}

/* ---------------- FORMATTING ---------------- */

// Converts decimal degrees to a DMS string with seconds to 2 decimals.
// This function does not perform validation.
pub fn dd_to_dms(value: f64, axis: Axis) -> String {
    let dir = match (axis, value >= 0.0) {
        (Axis::Latitude, true) => 'N',
        (Axis::Latitude, false) => 'S',
        (Axis::Longitude, true) => 'E',
        (Axis::Longitude, false) => 'W',
    };

    // Work in hundredths of a second so 59.999" never prints as 60.00".
    let total = (value.abs() * 360_000.0).round() as u64;
    let deg = total / 360_000;
    let min = (total % 360_000) / 6_000;
    let sec = (total % 6_000) as f64 / 100.0;

    format!("{}°{}'{:.2}\"{}", deg, min, sec, dir)
}

/* ---------------- TEST ---------------- */
