// src/provider.rs

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::path::Path;
use std::time::Duration;

use csv::ReaderBuilder;
use serde::Deserialize;
use smol::Timer;
use tracing::debug;

use crate::geo::{CoordError, Coordinate};

/* ---------------- STATUS & ERRORS ---------------- */

// Device support and user permission for location access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderStatus {
    pub available: bool,
    pub enabled: bool,
}

impl ProviderStatus {
    pub const READY: Self = Self { available: true, enabled: true };

    pub fn is_usable(&self) -> bool {
        self.available && self.enabled
    }
}

impl Default for ProviderStatus {
    fn default() -> Self {
        Self::READY
    }
}

// Reasons a provider could not produce a fix.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FixError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("no fix within {0} ms")]
    Timeout(u64),
    #[error("no more fixes available")]
    Exhausted,
}

/* ---------------- PROVIDER TRAIT ---------------- */

// Source of location fixes. `request_fix` is the only call that suspends.
pub trait LocationProvider {
    fn status(&self) -> ProviderStatus;

    fn request_fix(&mut self) -> impl Future<Output = Result<Coordinate, FixError>>;

    // How many readings a stream of fixes can still deliver, when known.
    fn readings_left(&self) -> Option<usize> {
        None
    }
}

async fn wait(delay: Duration) {
    if !delay.is_zero() {
        Timer::after(delay).await;
    }
}

/* ---------------- STATIC PROVIDER ---------------- */

// Answers every request with the same coordinate.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    coordinate: Coordinate,
    status: ProviderStatus,
    delay: Duration,
}

impl StaticProvider {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            status: ProviderStatus::READY,
            delay: Duration::ZERO,
        }
    }

    pub fn with_status(mut self, status: ProviderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl LocationProvider for StaticProvider {
    fn status(&self) -> ProviderStatus {
        self.status
    }

    async fn request_fix(&mut self) -> Result<Coordinate, FixError> {
        if !self.status.enabled {
            return Err(FixError::PermissionDenied);
        }
        wait(self.delay).await;
        debug!(fix = %self.coordinate, "static fix");
        Ok(self.coordinate)
    }
}

/* ---------------- REPLAY PROVIDER ---------------- */

// Errors raised while loading a recorded track.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: latitude and longitude are required")]
    MissingValue { line: usize },

    #[error("Line {line}: invalid coordinate ({source})")]
    InvalidRow { line: usize, source: CoordError },
}

// One recorded reading. A non-empty `error` marks a failed reading.
#[derive(Debug, Deserialize)]
struct TrackRow {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

// Replays a recorded track, one reading per request.
#[derive(Debug, Clone)]
pub struct ReplayProvider {
    fixes: VecDeque<Result<Coordinate, FixError>>,
    status: ProviderStatus,
    delay: Duration,
}

impl ReplayProvider {
    pub fn new(fixes: impl IntoIterator<Item = Result<Coordinate, FixError>>) -> Self {
        Self {
            fixes: fixes.into_iter().collect(),
            status: ProviderStatus::READY,
            delay: Duration::ZERO,
        }
    }

    // Reads a CSV track with `latitude,longitude[,error]` headers.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, TrackError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut fixes = Vec::new();
        // Line 1 is the header.
        for (i, row) in reader.deserialize::<TrackRow>().enumerate() {
            let line = i + 2;
            let row = row?;

            if let Some(error) = row.error.filter(|e| !e.is_empty()) {
                fixes.push(Err(FixError::PositionUnavailable(error)));
                continue;
            }

            let (Some(lat), Some(lon)) = (row.latitude, row.longitude) else {
                return Err(TrackError::MissingValue { line });
            };
            let coordinate = Coordinate::new(lat, lon)
                .map_err(|source| TrackError::InvalidRow { line, source })?;
            fixes.push(Ok(coordinate));
        }

        debug!(readings = fixes.len(), "track loaded");
        Ok(Self::new(fixes))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn with_status(mut self, status: ProviderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn remaining(&self) -> usize {
        self.fixes.len()
    }
}

impl LocationProvider for ReplayProvider {
    fn status(&self) -> ProviderStatus {
        self.status
    }

    fn readings_left(&self) -> Option<usize> {
        Some(self.remaining())
    }

    async fn request_fix(&mut self) -> Result<Coordinate, FixError> {
        if !self.status.enabled {
            return Err(FixError::PermissionDenied);
        }
        wait(self.delay).await;
        let fix = self.fixes.pop_front().unwrap_or(Err(FixError::Exhausted));
        debug!(?fix, remaining = self.remaining(), "replayed fix");
        fix
    }
}

/* ---------------- TEST ---------------- */
