// src/capture.rs

/*
Capture / comparison workflow.

    Idle ──request_fix──▶ AwaitingFix ──on_fix_succeeded──▶ PendingReady
     ▲                        │                                 │
     └──on_fix_failed/cancel──┘                                 │
     └────────────────────────commit / clear_all────────────────┘

The pending coordinate lives inside `PendingReady`, so there is no way to
be awaiting a fix while also holding a pending position. All operations
except `acquire_fix` are synchronous.
*/

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use smol::Timer;
use tracing::{debug, info, warn};

use crate::geo::Coordinate;
use crate::notify::{
    MSG_EMPTY_LABEL, MSG_FIX_IN_FLIGHT, MSG_INVALID_INDEX, MSG_LOCATION_ERROR, MSG_NO_PENDING,
    Notice, NotificationSink,
};
use crate::provider::{FixError, LocationProvider, ProviderStatus};
use crate::util::{KM_TO_MILES, great_circle_distance, planar_distance};

/* ---------------- STATE ---------------- */

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureState {
    Idle,
    AwaitingFix,
    PendingReady(Coordinate),
}

impl CaptureState {
    pub fn pending(&self) -> Option<Coordinate> {
        match self {
            CaptureState::PendingReady(c) => Some(*c),
            _ => None,
        }
    }
}

// Which half of a comparison an entry is selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Side::Left),
            "right" | "r" => Ok(Side::Right),
            other => Err(format!("unknown side `{other}` (expected left or right)")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl Selection {
    pub fn get(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut Option<usize> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn pair(&self) -> Option<(usize, usize)> {
        Some((self.left?, self.right?))
    }
}

// A labelled, committed position. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEntry {
    label: String,
    coordinate: Coordinate,
    raw_text: String,
}

impl PositionEntry {
    fn new(label: String, coordinate: Coordinate) -> Self {
        Self {
            label,
            raw_text: coordinate.raw_text(),
            coordinate,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

// Both distance metrics between the two selected entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    // Degrees, see `planar_distance`.
    pub planar: f64,
    // Meters.
    pub great_circle: f64,
}

impl Comparison {
    pub fn great_circle_km(&self) -> f64 {
        self.great_circle / 1000.0
    }

    pub fn great_circle_miles(&self) -> f64 {
        self.great_circle_km() * KM_TO_MILES
    }
}

/* ---------------- ERRORS ---------------- */

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    #[error("location provider unavailable or disabled")]
    ProviderUnavailable,

    #[error("a fix request is already in flight")]
    FixInFlight,

    #[error("no fix request in flight")]
    NotAwaitingFix,

    #[error("location error: {0}")]
    FixFailed(#[from] FixError),

    #[error("position name is empty")]
    EmptyLabel,

    #[error("no pending position to add")]
    NoPendingFix,

    #[error("index {index} out of range ({len} entries)")]
    InvalidIndex { index: usize, len: usize },
}

/* ---------------- OPTIONS ---------------- */

#[derive(Debug, Clone, Copy)]
pub struct FixOptions {
    // Upper bound, in milliseconds, on how long a provider may take to answer.
    pub timeout_ms: u64,
    // Decimal places kept on each axis of a fix.
    pub precision: u32,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            precision: 7,
        }
    }
}

// Outcome counts of one `watch` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchReport {
    pub received: usize,
    pub failed: usize,
}

// Waits for one provider reading, bounded by `options.timeout_ms`, and
// rounds it to `options.precision`.
async fn next_reading<P: LocationProvider>(
    provider: &mut P,
    options: FixOptions,
) -> Result<Coordinate, FixError> {
    let timeout_ms = options.timeout_ms;
    smol::future::or(provider.request_fix(), async move {
        Timer::after(Duration::from_millis(timeout_ms)).await;
        Err(FixError::Timeout(timeout_ms))
    })
    .await
    .map(|coordinate| coordinate.rounded(options.precision))
}

/* ---------------- SESSION ---------------- */

// Read-only view handed to the rendering layer.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub state: CaptureState,
    pub draft_label: &'a str,
    pub entries: &'a [PositionEntry],
    pub selection: Selection,
    pub comparison: Option<Comparison>,
}

pub struct CaptureSession<N: NotificationSink> {
    state: CaptureState,
    draft_label: String,
    entries: Vec<PositionEntry>,
    selection: Selection,
    notifier: N,
}

impl<N: NotificationSink> CaptureSession<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            state: CaptureState::Idle,
            draft_label: String::new(),
            entries: Vec::new(),
            selection: Selection::default(),
            notifier,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn draft_label(&self) -> &str {
        &self.draft_label
    }

    pub fn entries(&self) -> &[PositionEntry] {
        &self.entries
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    // Reports a validation failure to the user and hands the error back.
    fn reject(&mut self, err: CaptureError, message: &str) -> CaptureError {
        debug!(error = %err, "rejected");
        self.notifier.notify(Notice::error(message));
        err
    }

    /* --- fix lifecycle --------------------*/

    // Idle | PendingReady → AwaitingFix. A pending position is discarded
    // since the new fix will replace it.
    pub fn request_fix(&mut self, status: ProviderStatus) -> Result<(), CaptureError> {
        if !status.is_usable() {
            warn!(?status, "location provider not usable");
            return Err(CaptureError::ProviderUnavailable);
        }
        if self.state == CaptureState::AwaitingFix {
            return Err(self.reject(CaptureError::FixInFlight, MSG_FIX_IN_FLIGHT));
        }

        debug!(from = ?self.state, "awaiting fix");
        self.state = CaptureState::AwaitingFix;
        Ok(())
    }

    pub fn on_fix_succeeded(&mut self, coordinate: Coordinate) -> Result<(), CaptureError> {
        if self.state != CaptureState::AwaitingFix {
            warn!(fix = %coordinate, "fix arrived with no request in flight; ignored");
            return Err(CaptureError::NotAwaitingFix);
        }

        info!(fix = %coordinate, "fix ready");
        self.state = CaptureState::PendingReady(coordinate);
        Ok(())
    }

    pub fn on_fix_failed(&mut self, reason: FixError) -> Result<(), CaptureError> {
        if self.state != CaptureState::AwaitingFix {
            warn!(%reason, "fix failure with no request in flight; ignored");
            return Err(CaptureError::NotAwaitingFix);
        }

        debug!(%reason, "fix failed");
        self.state = CaptureState::Idle;
        self.notifier
            .notify(Notice::error(format!("{MSG_LOCATION_ERROR}: {reason}")));
        Ok(())
    }

    // Abandons an in-flight request without notifying the user.
    pub fn cancel_fix(&mut self) -> Result<(), CaptureError> {
        if self.state != CaptureState::AwaitingFix {
            return Err(CaptureError::NotAwaitingFix);
        }
        debug!("fix request cancelled");
        self.state = CaptureState::Idle;
        Ok(())
    }

    // Requests a fix and waits for the provider, bounded by `options.timeout`.
    // The returned coordinate is the rounded one stored as pending.
    pub async fn acquire_fix<P: LocationProvider>(
        &mut self,
        provider: &mut P,
        options: FixOptions,
    ) -> Result<Coordinate, CaptureError> {
        self.request_fix(provider.status())?;

        match next_reading(provider, options).await {
            Ok(coordinate) => {
                self.on_fix_succeeded(coordinate)?;
                Ok(coordinate)
            }
            Err(reason) => {
                self.on_fix_failed(reason.clone())?;
                Err(CaptureError::FixFailed(reason))
            }
        }
    }

    // Follows the provider's stream of readings. Each reading goes through
    // the normal fix lifecycle, so the newest one is left pending and a
    // failed one drops back to Idle with a notice. Stops after `limit`
    // readings, or when the provider runs out; without a limit the
    // provider's own `readings_left` bounds the stream.
    pub async fn watch<P: LocationProvider>(
        &mut self,
        provider: &mut P,
        options: FixOptions,
        limit: Option<usize>,
    ) -> Result<WatchReport, CaptureError> {
        let limit = limit.or(provider.readings_left()).unwrap_or(1);
        let mut report = WatchReport::default();

        while report.received + report.failed < limit {
            let live = self.state.pending();
            self.request_fix(provider.status())?;

            match next_reading(provider, options).await {
                Ok(coordinate) => {
                    self.on_fix_succeeded(coordinate)?;
                    report.received += 1;
                }
                Err(FixError::Exhausted) => {
                    self.cancel_fix()?;
                    if let Some(coordinate) = live {
                        self.state = CaptureState::PendingReady(coordinate);
                    }
                    break;
                }
                Err(reason) => {
                    self.on_fix_failed(reason)?;
                    report.failed += 1;
                }
            }
        }

        info!(received = report.received, failed = report.failed, "watch ended");
        Ok(report)
    }

    /* --- list --------------------*/

    pub fn set_label(&mut self, text: impl Into<String>) {
        self.draft_label = text.into();
    }

    // PendingReady → Idle, appending the pending position under the
    // trimmed draft label.
    pub fn commit(&mut self) -> Result<&PositionEntry, CaptureError> {
        let Some(coordinate) = self.state.pending() else {
            return Err(self.reject(CaptureError::NoPendingFix, MSG_NO_PENDING));
        };
        let label = self.draft_label.trim().to_string();
        if label.is_empty() {
            return Err(self.reject(CaptureError::EmptyLabel, MSG_EMPTY_LABEL));
        }

        let entry = PositionEntry::new(label, coordinate);
        info!(label = entry.label(), raw = entry.raw_text(), "position added");
        self.notifier
            .notify(Notice::success(format!("added {}", entry.label())));

        self.entries.push(entry);
        self.draft_label.clear();
        self.state = CaptureState::Idle;

        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn clear_all(&mut self) {
        info!(entries = self.entries.len(), "clearing all positions");
        self.entries.clear();
        self.draft_label.clear();
        self.selection = Selection::default();
        self.state = CaptureState::Idle;
    }

    /* --- comparison --------------------*/

    // Selects `index` on `side`, or deselects it when already selected.
    pub fn toggle_selection(&mut self, index: usize, side: Side) -> Result<(), CaptureError> {
        let len = self.entries.len();
        if index >= len {
            return Err(self.reject(CaptureError::InvalidIndex { index, len }, MSG_INVALID_INDEX));
        }

        let slot = self.selection.slot_mut(side);
        *slot = if *slot == Some(index) { None } else { Some(index) };
        debug!(%side, selected = ?self.selection.get(side), "selection toggled");
        Ok(())
    }

    pub fn compute_comparison(&self) -> Option<Comparison> {
        let (left, right) = self.selection.pair()?;
        let a = self.entries.get(left)?.coordinate;
        let b = self.entries.get(right)?.coordinate;

        if left == right {
            return Some(Comparison { planar: 0.0, great_circle: 0.0 });
        }

        Some(Comparison {
            planar: planar_distance(a, b),
            great_circle: great_circle_distance(a, b),
        })
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            state: self.state,
            draft_label: &self.draft_label,
            entries: &self.entries,
            selection: self.selection,
            comparison: self.compute_comparison(),
        }
    }
}

/* ---------------- TEST ---------------- */
