//src/util.rs

use crate::geo::Coordinate;

/* ---------------- CONSTANTES ---------------- */

// Mean radius of the Earth in meters (spherical model).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
// Conversion factor kilometers → miles.
pub const KM_TO_MILES: f64 = 0.621371;

/* ---------------- NUMERIC UTILS -------------- */

// Rounding of a floating-point number to N decimal places (max 10).
// Intentional limit to avoid excessively large exponents.
pub fn round(value: f64, decimals: u32) -> f64 {
    let precision = decimals.min(10);
    let factor = 10_f64.powi(precision as i32);
    (value * factor).round() / factor
}

/* ---------------- PLANAR DISTANCE --------------- */

// Euclidean distance treating degrees of latitude and longitude as a flat
// Cartesian plane. The result is in degrees and is not a physical distance:
// a degree of longitude shrinks toward the poles and this ignores it.
// NaN inputs propagate.
pub fn planar_distance(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = b.latitude - a.latitude;
    let dlon = b.longitude - a.longitude;
    (dlat * dlat + dlon * dlon).sqrt()
}

/* ---------------- GREAT CIRCLE DISTANCE --------------- */

// Great circle distance (Haversine) on a sphere of radius EARTH_RADIUS_M.
// Inputs in decimal degrees.
// Output in meters, always within [0, π·R] for finite input.
pub fn great_circle_distance(a: Coordinate, b: Coordinate) -> f64 {

    // Conversion degrés → radians
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let hav = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push hav slightly outside [0, 1] near identical or
    // antipodal points. clamp() keeps NaN as NaN.
    let hav = hav.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * hav.sqrt().atan2((1.0 - hav).sqrt())
}

/* ---------------- TEST ---------------- */
