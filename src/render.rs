// src/render.rs

use std::fmt::Write as _;
use std::io;

use csv::Writer;
use serde::Serialize;

use crate::capture::{CaptureState, PositionEntry, Side, Snapshot};
use crate::util::round;

const NOT_SET: &str = "not set";

/* ---------------- SCREEN ---------------- */

fn selected_label<'a>(snapshot: &Snapshot<'a>, side: Side) -> &'a str {
    snapshot
        .selection
        .get(side)
        .and_then(|i| snapshot.entries.get(i))
        .map_or(NOT_SET, |e| e.label())
}

// Renders the whole session as plain text, top to bottom:
// comparison, draft label, pending position, committed list.
pub fn render(snapshot: &Snapshot<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Compare: {} vs {}",
        selected_label(snapshot, Side::Left),
        selected_label(snapshot, Side::Right)
    );
    match snapshot.comparison {
        Some(cmp) => {
            let _ = writeln!(out, "Euclidean distance: {}", cmp.planar);
            let _ = writeln!(
                out,
                "Haversine distance: {} m. ({} km / {} mi)",
                cmp.great_circle,
                round(cmp.great_circle_km(), 2),
                round(cmp.great_circle_miles(), 2)
            );
        }
        None => {
            let _ = writeln!(out, "Euclidean distance: 0");
            let _ = writeln!(out, "Haversine distance: 0 m.");
        }
    }

    let _ = writeln!(out, "Position name: {}", snapshot.draft_label);
    let _ = match snapshot.state {
        CaptureState::Idle => writeln!(out, "Press \"fix\" first"),
        CaptureState::AwaitingFix => writeln!(out, "Locating..."),
        CaptureState::PendingReady(c) => writeln!(out, "Position: {}", c.raw_text()),
    };

    for (idx, entry) in snapshot.entries.iter().enumerate() {
        let mark = |side| if snapshot.selection.get(side) == Some(idx) { 'x' } else { ' ' };
        let _ = writeln!(
            out,
            "[{}] {:>2}. {} | {} | {} [{}]",
            mark(Side::Left),
            idx,
            entry.label(),
            entry.raw_text(),
            entry.coordinate().to_dms(),
            mark(Side::Right),
        );
    }

    out
}

/* ---------------- CSV EXPORT ---------------- */

#[derive(Debug, Serialize)]
struct EntryRecord<'a> {
    index: usize,
    label: &'a str,
    latitude: f64,
    longitude: f64,
    raw: &'a str,
    dms: String,
}

// Writes the committed list as CSV. Display only, nothing is read back.
pub fn write_entries_csv<W: io::Write>(entries: &[PositionEntry], out: W) -> Result<(), csv::Error> {
    let mut writer = Writer::from_writer(out);
    for (index, entry) in entries.iter().enumerate() {
        let coordinate = entry.coordinate();
        writer.serialize(EntryRecord {
            index,
            label: entry.label(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            raw: entry.raw_text(),
            dms: coordinate.to_dms(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/* ---------------- TEST ---------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSession;
    use crate::geo::Coordinate;
    use crate::notify::Notice;
    use crate::provider::ProviderStatus;

    fn with_entries(points: &[(&str, f64, f64)]) -> CaptureSession<Vec<Notice>> {
        let mut s = CaptureSession::new(Vec::new());
        for &(label, lat, lon) in points {
            s.request_fix(ProviderStatus::READY).unwrap();
            s.on_fix_succeeded(Coordinate::from_degrees(lat, lon)).unwrap();
            s.set_label(label);
            s.commit().unwrap();
        }
        s
    }

    #[test]
    fn test_render_empty_session() {
        let s = with_entries(&[]);
        let text = render(&s.snapshot());
        assert_eq!(
            text,
            "Compare: not set vs not set\n\
             Euclidean distance: 0\n\
             Haversine distance: 0 m.\n\
             Position name: \n\
             Press \"fix\" first\n"
        );
    }

    #[test]
    fn test_render_selection_and_pending() {
        let mut s = with_entries(&[("Equator", 0.0, 0.0), ("East", 0.0, 1.0)]);
        s.toggle_selection(0, Side::Left).unwrap();
        s.toggle_selection(1, Side::Right).unwrap();
        s.request_fix(ProviderStatus::READY).unwrap();
        s.on_fix_succeeded(Coordinate::from_degrees(1.5, 2.25)).unwrap();

        let text = render(&s.snapshot());

        assert!(text.starts_with("Compare: Equator vs East\nEuclidean distance: 1\n"));
        assert!(text.contains("(111.19 km / 69.09 mi)"));
        assert!(text.contains("Position: 1.5,2.25\n"));
        assert!(text.contains("[x]  0. Equator | 0,0 | 0°0'0.00\"N 0°0'0.00\"E [ ]\n"));
        assert!(text.contains("[ ]  1. East | 0,1 | 0°0'0.00\"N 1°0'0.00\"E [x]\n"));
    }

    #[test]
    fn test_render_awaiting() {
        let mut s = with_entries(&[]);
        s.request_fix(ProviderStatus::READY).unwrap();
        assert!(render(&s.snapshot()).contains("Locating...\n"));
    }

    #[test]
    fn test_entries_csv() {
        let s = with_entries(&[("Home", 1.0, 2.0)]);
        let mut buf = Vec::new();
        write_entries_csv(s.entries(), &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "index,label,latitude,longitude,raw,dms\n\
             0,Home,1.0,2.0,\"1,2\",\"1°0'0.00\"\"N 2°0'0.00\"\"E\"\n"
        );
    }
}
