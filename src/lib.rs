//! Position capture and comparison
//!
//! Requests location fixes, lets the user label and keep them for the
//! session, and compares two kept positions by planar and great-circle
//! distance.

pub mod capture;
pub mod command;
pub mod geo;
pub mod notify;
pub mod provider;
pub mod render;
pub mod util;

// Re-export commonly used types
pub use capture::{
    CaptureError, CaptureSession, CaptureState, Comparison, FixOptions, PositionEntry, Selection,
    Side, Snapshot, WatchReport,
};
pub use geo::{Coordinate, CoordError, ParseError, parse_coordinate};
pub use notify::{ConsoleSink, Notice, NoticeKind, NotificationSink};
pub use provider::{FixError, LocationProvider, ProviderStatus, ReplayProvider, StaticProvider};
pub use util::{EARTH_RADIUS_M, great_circle_distance, planar_distance};
