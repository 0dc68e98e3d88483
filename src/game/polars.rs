//! Polar performance table.
//!
//! Maps (true wind speed, true wind angle) to boat speed. Each row is
//! expanded once at construction into 181 one-degree samples by linear
//! interpolation between its measured points, so lookups are a row pick
//! plus an index.

use serde::{Deserialize, Serialize};

use crate::core::units::{angular_distance, normalize_degrees};

/// One measured row: boat speeds at a set of wind angles for one wind speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarRow {
    /// True wind speed, knots.
    pub wind_speed: f64,
    /// `(true wind angle, boat speed)` pairs in knots, ascending by angle.
    pub points: Vec<(f64, f64)>,
}

/// Best velocity-made-good heading in one quadrant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vmg {
    /// Absolute heading, degrees.
    pub heading: f64,
    /// Boat speed on that heading, knots.
    pub speed: f64,
}

/// Angles sampled per row, 0 through 180 inclusive.
const SAMPLES: usize = 181;

/// AC35-class measurements. Columns are TWA/BSP pairs per wind speed.
const DEFAULT_ROWS: &[(f64, [(f64, f64); 10])] = &[
    (4.0, [(0.0, 0.0), (30.0, 4.0), (45.0, 8.0), (60.0, 9.0), (75.0, 10.0), (90.0, 10.0), (115.0, 10.0), (145.0, 10.0), (155.0, 10.0), (175.0, 4.0)]),
    (8.0, [(0.0, 0.0), (30.0, 7.0), (43.0, 10.0), (60.0, 11.0), (75.0, 11.0), (90.0, 11.0), (115.0, 12.0), (145.0, 12.0), (153.0, 12.0), (175.0, 10.0)]),
    (12.0, [(0.0, 0.0), (30.0, 11.0), (43.0, 14.4), (60.0, 16.0), (75.0, 20.0), (90.0, 23.0), (115.0, 24.0), (145.0, 23.0), (153.0, 21.6), (175.0, 14.0)]),
    (16.0, [(0.0, 0.0), (30.0, 12.0), (42.0, 19.2), (60.0, 25.0), (75.0, 27.0), (90.0, 31.0), (115.0, 32.0), (145.0, 30.0), (153.0, 28.8), (175.0, 20.0)]),
    (20.0, [(0.0, 0.0), (30.0, 13.0), (41.0, 24.0), (60.0, 29.0), (75.0, 37.0), (90.0, 39.0), (115.0, 40.0), (145.0, 38.0), (153.0, 36.0), (175.0, 24.0)]),
    (25.0, [(0.0, 0.0), (30.0, 15.0), (40.0, 30.0), (60.0, 38.0), (75.0, 44.0), (90.0, 49.0), (115.0, 50.0), (145.0, 49.0), (151.0, 47.0), (175.0, 30.0)]),
    (30.0, [(0.0, 0.0), (30.0, 15.0), (42.0, 30.0), (60.0, 37.0), (75.0, 42.0), (90.0, 48.0), (115.0, 49.0), (145.0, 48.0), (150.0, 46.0), (175.0, 32.0)]),
];

/// The built-in measurement rows.
pub fn default_rows() -> Vec<PolarRow> {
    DEFAULT_ROWS
        .iter()
        .map(|(wind_speed, points)| PolarRow {
            wind_speed: *wind_speed,
            points: points.to_vec(),
        })
        .collect()
}

/// Interpolated polar table.
#[derive(Debug, Clone)]
pub struct PolarTable {
    wind_speeds: Vec<f64>,
    speeds: Vec<[f64; SAMPLES]>,
}

impl Default for PolarTable {
    fn default() -> Self {
        Self::from_rows(default_rows())
    }
}

impl PolarTable {
    /// Build a table from measured rows. Rows with no points are skipped.
    pub fn from_rows(mut rows: Vec<PolarRow>) -> Self {
        rows.retain(|row| !row.points.is_empty());
        rows.sort_by(|a, b| a.wind_speed.total_cmp(&b.wind_speed));

        let mut wind_speeds = Vec::with_capacity(rows.len());
        let mut speeds = Vec::with_capacity(rows.len());
        for mut row in rows {
            row.points.sort_by(|a, b| a.0.total_cmp(&b.0));
            wind_speeds.push(row.wind_speed);
            speeds.push(interpolate_row(&row.points));
        }
        Self { wind_speeds, speeds }
    }

    /// Number of wind-speed rows.
    pub fn len(&self) -> usize {
        self.wind_speeds.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.wind_speeds.is_empty()
    }

    /// Boat speed in knots for a true wind speed and true wind angle.
    ///
    /// Uses the row with the closest wind speed and the sample at the
    /// rounded angle. An empty table always answers zero.
    pub fn boat_speed(&self, wind_speed: f64, true_wind_angle: f64) -> f64 {
        let Some(row) = self.closest_row(wind_speed) else {
            return 0.0;
        };
        let twa = angular_distance(true_wind_angle, 0.0).round() as usize;
        self.speeds[row][twa.min(SAMPLES - 1)]
    }

    /// Best VMG heading in the quadrant (relative to the wind) that the
    /// current heading lies in.
    ///
    /// `wind_direction` is the direction the wind blows from. Upwind
    /// quadrants maximise progress into the wind, downwind quadrants
    /// progress away from it.
    pub fn best_vmg(&self, heading: f64, wind_direction: f64, wind_speed: f64) -> Vmg {
        let relative = normalize_degrees(heading - wind_direction);
        let quadrant = (relative / 90.0).floor() as i32;
        let start = quadrant * 90;

        let mut best = Vmg {
            heading: normalize_degrees(heading),
            speed: 0.0,
        };
        let mut best_score = f64::MIN;
        for offset in 0..=90 {
            let candidate = f64::from(start + offset);
            let twa = angular_distance(candidate, 0.0);
            let speed = self.boat_speed(wind_speed, twa);
            let score = speed * twa.to_radians().cos().abs();
            if score > best_score {
                best_score = score;
                best = Vmg {
                    heading: normalize_degrees(candidate + wind_direction),
                    speed,
                };
            }
        }
        best
    }

    fn closest_row(&self, wind_speed: f64) -> Option<usize> {
        self.wind_speeds
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - wind_speed).abs().total_cmp(&(*b - wind_speed).abs()))
            .map(|(index, _)| index)
    }
}

/// Expand sorted `(angle, speed)` points into one sample per degree.
///
/// Angles beyond the last point hold its speed.
fn interpolate_row(points: &[(f64, f64)]) -> [f64; SAMPLES] {
    let mut out = [0.0; SAMPLES];
    for (degree, slot) in out.iter_mut().enumerate() {
        let angle = degree as f64;
        let upper = points.iter().position(|(twa, _)| *twa >= angle);
        *slot = match upper {
            Some(0) => points[0].1,
            Some(i) => {
                let (a0, s0) = points[i - 1];
                let (a1, s1) = points[i];
                if (a1 - a0).abs() < f64::EPSILON {
                    s1
                } else {
                    s0 + (s1 - s0) * (angle - a0) / (a1 - a0)
                }
            }
            None => points[points.len() - 1].1,
        };
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measured_points_are_exact() {
        let table = PolarTable::default();
        assert_eq!(table.len(), 7);
        assert!((table.boat_speed(12.0, 90.0) - 23.0).abs() < 1e-9);
        assert!((table.boat_speed(12.0, 43.0) - 14.4).abs() < 1e-9);
        assert_eq!(table.boat_speed(20.0, 0.0), 0.0);
    }

    #[test]
    fn test_linear_interpolation_between_points() {
        let table = PolarTable::default();
        // 12 kn row: 75 -> 20, 90 -> 23
        let mid = table.boat_speed(12.0, 82.0);
        let expected = 20.0 + 3.0 * 7.0 / 15.0;
        assert!((mid - expected).abs() < 1e-9);
    }

    #[test]
    fn test_closest_wind_speed_row() {
        let table = PolarTable::default();
        assert_eq!(table.boat_speed(13.9, 90.0), table.boat_speed(12.0, 90.0));
        assert_eq!(table.boat_speed(14.1, 90.0), table.boat_speed(16.0, 90.0));
        assert_eq!(table.boat_speed(100.0, 90.0), table.boat_speed(30.0, 90.0));
    }

    #[test]
    fn test_angle_is_folded() {
        let table = PolarTable::default();
        assert_eq!(table.boat_speed(12.0, 270.0), table.boat_speed(12.0, 90.0));
        assert_eq!(table.boat_speed(12.0, -45.0), table.boat_speed(12.0, 45.0));
    }

    #[test]
    fn test_past_last_point_holds_speed() {
        let table = PolarTable::default();
        assert!((table.boat_speed(12.0, 180.0) - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_table_is_becalmed() {
        let table = PolarTable::from_rows(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.boat_speed(12.0, 90.0), 0.0);
    }

    #[test]
    fn test_best_vmg_upwind_stays_in_quadrant() {
        let table = PolarTable::default();
        let vmg = table.best_vmg(60.0, 0.0, 12.0);
        assert!(vmg.heading > 30.0 && vmg.heading < 60.0, "{vmg:?}");
        assert!(vmg.speed > 0.0);

        let port = table.best_vmg(300.0, 0.0, 12.0);
        assert!(port.heading > 300.0 && port.heading < 330.0, "{port:?}");
    }

    #[test]
    fn test_best_vmg_downwind() {
        let table = PolarTable::default();
        let vmg = table.best_vmg(120.0, 0.0, 12.0);
        assert!(vmg.heading > 140.0 && vmg.heading <= 180.0, "{vmg:?}");
    }

    #[test]
    fn test_best_vmg_follows_wind() {
        let table = PolarTable::default();
        let calm = table.best_vmg(60.0, 0.0, 12.0);
        let veered = table.best_vmg(150.0, 90.0, 12.0);
        assert!((normalize_degrees(veered.heading - 90.0) - calm.heading).abs() < 1e-9);
    }
}
