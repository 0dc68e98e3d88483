//! Wire unit converters.
//!
//! Pure functions mapping physical quantities to the packed integers carried in
//! message bodies, and back. Packing truncates toward zero, so every
//! `unpack(pack(x))` lands within one least-significant step of `x`.

/// Millimetres per second in one knot.
pub const MMPS_PER_KNOT: f64 = 514.444;

/// Metres in one nautical mile.
pub const METERS_PER_NAUTICAL_MILE: f64 = 1852.0;

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Degrees represented by one step of a packed GPS coordinate.
pub const GPS_RESOLUTION_DEG: f64 = 180.0 / 2_147_483_648.0;

/// Degrees represented by one step of a packed heading.
pub const HEADING_RESOLUTION_DEG: f64 = 360.0 / 65_536.0;

/// Degrees represented by one step of a packed signed angle.
pub const ANGLE_RESOLUTION_DEG: f64 = 180.0 / 32_768.0;

/// Largest timestamp representable in a 48-bit field.
pub const MAX_TIMESTAMP_MS: u64 = (1 << 48) - 1;

/// Pack a latitude or longitude (degrees) into signed 32-bit fixed point.
///
/// Values at exactly +180° saturate to `i32::MAX`.
#[inline]
pub fn pack_gps(degrees: f64) -> i32 {
    (degrees * 2_147_483_648.0 / 180.0) as i32
}

/// Unpack a 32-bit fixed-point coordinate into degrees.
#[inline]
pub fn unpack_gps(value: i32) -> f64 {
    value as f64 * 180.0 / 2_147_483_648.0
}

/// Pack a bearing in degrees as an unsigned fraction of a full circle.
///
/// The input is normalized into [0, 360) first.
#[inline]
pub fn pack_heading(degrees: f64) -> u16 {
    let normalized = normalize_degrees(degrees);
    ((normalized / 360.0 * 65_536.0) as u32 & 0xFFFF) as u16
}

/// Unpack a heading into degrees in [0, 360).
#[inline]
pub fn unpack_heading(value: u16) -> f64 {
    value as f64 / 65_536.0 * 360.0
}

/// Pack a signed angle (wind angle, rudder angle) as a fraction of ±180°.
///
/// The input is folded into [-180, 180) first.
#[inline]
pub fn pack_signed_angle(degrees: f64) -> i16 {
    let folded = normalize_degrees(degrees + 180.0) - 180.0;
    (folded / 180.0 * 32_768.0) as i16
}

/// Unpack a signed angle into degrees in [-180, 180).
#[inline]
pub fn unpack_signed_angle(value: i16) -> f64 {
    value as f64 / 32_768.0 * 180.0
}

/// Convert knots to whole millimetres per second, saturating at `u16::MAX`.
#[inline]
pub fn knots_to_mmps(knots: f64) -> u16 {
    let mmps = (knots * MMPS_PER_KNOT).round();
    mmps.clamp(0.0, u16::MAX as f64) as u16
}

/// Convert millimetres per second to knots.
#[inline]
pub fn mmps_to_knots(mmps: u16) -> f64 {
    mmps as f64 / MMPS_PER_KNOT
}

/// Convert an averaging period in milliseconds to tenths of a second.
#[inline]
pub fn millis_to_tenths(millis: u64) -> u16 {
    (millis / 100).min(u16::MAX as u64) as u16
}

/// Convert tenths of a second to milliseconds.
#[inline]
pub fn tenths_to_millis(tenths: u16) -> u64 {
    tenths as u64 * 100
}

/// Distance in metres covered at `knots` over `millis` milliseconds.
#[inline]
pub fn meters_travelled(knots: f64, millis: u64) -> f64 {
    knots * (millis as f64 / MILLIS_PER_HOUR) * METERS_PER_NAUTICAL_MILE
}

/// Normalize an angle into [0, 360).
#[inline]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Smallest absolute angle between two bearings, in [0, 180].
#[inline]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = normalize_degrees(a - b);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_gps_known_values() {
        assert_eq!(pack_gps(0.0), 0);
        assert_eq!(pack_gps(90.0), 1 << 30);
        assert_eq!(pack_gps(-90.0), -(1 << 30));
        assert!((unpack_gps(pack_gps(-36.84)) + 36.84).abs() < GPS_RESOLUTION_DEG);
    }

    #[test]
    fn test_heading_known_values() {
        assert_eq!(pack_heading(0.0), 0);
        assert_eq!(pack_heading(90.0), 16_384);
        assert_eq!(pack_heading(180.0), 32_768);
        assert_eq!(pack_heading(360.0), 0);
        assert_eq!(pack_heading(-90.0), 49_152);
        assert_eq!(unpack_heading(49_152), 270.0);
    }

    #[test]
    fn test_signed_angle_known_values() {
        assert_eq!(pack_signed_angle(90.0), 16_384);
        assert_eq!(pack_signed_angle(-90.0), -16_384);
        assert_eq!(pack_signed_angle(270.0), -16_384);
        assert_eq!(unpack_signed_angle(-32_768), -180.0);
    }

    #[test]
    fn test_speed_conversion() {
        assert_eq!(knots_to_mmps(1.0), 514);
        assert_eq!(knots_to_mmps(10.0), 5144);
        assert_eq!(knots_to_mmps(-3.0), 0);
        assert_eq!(knots_to_mmps(1_000.0), u16::MAX);
        assert!((mmps_to_knots(5144) - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_meters_travelled() {
        // One hour at one knot is one nautical mile
        let m = meters_travelled(1.0, 3_600_000);
        assert!((m - METERS_PER_NAUTICAL_MILE).abs() < 1e-9);
        assert_eq!(meters_travelled(12.0, 0), 0.0);
    }

    #[test]
    fn test_angular_distance() {
        assert_eq!(angular_distance(10.0, 350.0), 20.0);
        assert_eq!(angular_distance(90.0, 0.0), 90.0);
        assert_eq!(angular_distance(0.0, 180.0), 180.0);
        assert_eq!(normalize_degrees(-1e-15), 0.0);
    }

    proptest! {
        #[test]
        fn prop_gps_round_trip(deg in -180.0f64..180.0) {
            let back = unpack_gps(pack_gps(deg));
            prop_assert!((back - deg).abs() <= GPS_RESOLUTION_DEG);
        }

        #[test]
        fn prop_heading_round_trip(deg in 0.0f64..360.0) {
            let back = unpack_heading(pack_heading(deg));
            prop_assert!(angular_distance(back, deg) <= HEADING_RESOLUTION_DEG);
        }

        #[test]
        fn prop_signed_angle_round_trip(deg in -180.0f64..180.0) {
            let back = unpack_signed_angle(pack_signed_angle(deg));
            prop_assert!((back - deg).abs() <= ANGLE_RESOLUTION_DEG);
        }

        #[test]
        fn prop_normalize_range(deg in -1.0e6f64..1.0e6) {
            let n = normalize_degrees(deg);
            prop_assert!((0.0..360.0).contains(&n));
        }
    }
}
