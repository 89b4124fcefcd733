//! Noise-Power-Distance tables.
//!
//! An [`NpdData`] maps engine thrust to noise levels at the ten standard
//! slant distances. Lookups interpolate linearly in thrust and
//! logarithmically in distance; outside the table range the nearest two
//! entries extrapolate. A precomputed slope matrix keeps the distance
//! interpolation a single multiply per lookup.

use crate::error::ModelError;

/// Number of standard NPD distances.
pub const NPD_DISTANCE_COUNT: usize = 10;

/// The ten standard NPD slant distances in metres (200 ft to 25000 ft).
pub const NPD_STANDARD_DISTANCES: [f64; NPD_DISTANCE_COUNT] = [
    60.96, 121.92, 192.024, 304.8, 609.6, 1219.2, 1920.24, 3048.0, 4876.8, 7620.0,
];

/// Noise levels at the standard distances, dB.
pub type NoiseLevels = [f64; NPD_DISTANCE_COUNT];

/// Distances closer than this are clamped before the inward extrapolation.
const MINIMUM_DISTANCE: f64 = 30.0;

/// Thrust-sorted NPD table with its distance interpolation slopes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NpdData {
    rows: Vec<(f64, NoiseLevels)>,
    slopes: Vec<[f64; NPD_DISTANCE_COUNT - 1]>,
}

impl NpdData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts noise levels for a thrust setting, keeping rows sorted.
    pub fn insert(&mut self, thrust: f64, levels: NoiseLevels) -> Result<(), ModelError> {
        if !(thrust > 0.0) {
            return Err(ModelError::NonPositiveThrust(thrust));
        }
        let index = self.rows.partition_point(|(row_thrust, _)| *row_thrust < thrust);
        if self
            .rows
            .get(index)
            .is_some_and(|(row_thrust, _)| *row_thrust == thrust)
        {
            return Err(ModelError::DuplicateThrust(thrust));
        }
        self.rows.insert(index, (thrust, levels));
        self.update_slopes();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Interpolation needs two bracketing thrust rows.
    pub fn valid(&self) -> bool {
        self.rows.len() >= 2
    }

    pub fn rows(&self) -> &[(f64, NoiseLevels)] {
        &self.rows
    }

    /// Adds a per-distance delta to every thrust row.
    pub fn apply_delta(&mut self, deltas: &NoiseLevels) {
        for (_, levels) in &mut self.rows {
            for (level, delta) in levels.iter_mut().zip(deltas) {
                *level += delta;
            }
        }
        self.update_slopes();
    }

    /// Noise level at the given thrust and slant distance.
    ///
    /// Thrust interpolates linearly between the bracketing rows and
    /// extrapolates with the first or last pair outside the range. Distance
    /// interpolates against log10 of the standard distances; below the first
    /// standard distance the lookup extrapolates inwards from the first pair,
    /// clamped at 30 m.
    pub fn interpolate(&self, thrust: f64, distance: f64) -> f64 {
        debug_assert!(self.valid());

        let upper = self.rows.partition_point(|(row_thrust, _)| *row_thrust < thrust);
        let row = if upper == self.rows.len() {
            self.rows.len() - 2
        } else if upper > 0 {
            upper - 1
        } else {
            0
        };
        let (thrust1, levels1) = &self.rows[row];
        let (thrust2, levels2) = &self.rows[row + 1];

        let upper_distance = NPD_STANDARD_DISTANCES.partition_point(|standard| *standard < distance);
        let (slope_column, base, distance) = if upper_distance == NPD_DISTANCE_COUNT {
            let column = NPD_DISTANCE_COUNT - 2;
            (column, column, distance)
        } else if upper_distance > 0 {
            let column = upper_distance - 1;
            (column, column, distance)
        } else {
            (0, 1, distance.max(MINIMUM_DISTANCE))
        };

        let factor = distance.log10() - NPD_STANDARD_DISTANCES[base].log10();
        let level1 = levels1[base] + factor * self.slopes[row][slope_column];
        let level2 = levels2[base] + factor * self.slopes[row + 1][slope_column];

        level1 + (thrust - thrust1) * (level2 - level1) / (thrust2 - thrust1)
    }

    fn update_slopes(&mut self) {
        self.slopes = self
            .rows
            .iter()
            .map(|(_, levels)| {
                let mut slopes = [0.0; NPD_DISTANCE_COUNT - 1];
                for (i, slope) in slopes.iter_mut().enumerate() {
                    *slope = (levels[i + 1] - levels[i])
                        / (NPD_STANDARD_DISTANCES[i + 1].log10() - NPD_STANDARD_DISTANCES[i].log10());
                }
                slopes
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(level: f64) -> NoiseLevels {
        [level; NPD_DISTANCE_COUNT]
    }

    fn two_row_table() -> NpdData {
        let mut npd = NpdData::new();
        npd.insert(1000.0, flat(75.0)).unwrap();
        npd.insert(5000.0, flat(85.0)).unwrap();
        npd
    }

    #[test]
    fn test_interpolate_between_thrust_rows() {
        let npd = two_row_table();
        let level = npd.interpolate(3000.0, NPD_STANDARD_DISTANCES[0]);
        assert!((level - 80.0).abs() < 1e-9, "level was {level}");
    }

    #[test]
    fn test_interpolate_monotonic_in_thrust() {
        let npd = two_row_table();
        let mut previous = f64::NEG_INFINITY;
        for thrust in [1000.0, 1500.0, 2500.0, 4000.0, 5000.0] {
            let level = npd.interpolate(thrust, 304.8);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn test_interpolate_extrapolates_outside_thrust_range() {
        let npd = two_row_table();
        // slope is 10 dB per 4000 N
        assert!((npd.interpolate(6000.0, 304.8) - 87.5).abs() < 1e-9);
        assert!((npd.interpolate(500.0, 304.8) - 73.75).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_at_exact_breakpoints() {
        let mut npd = NpdData::new();
        let mut levels = flat(90.0);
        for (i, level) in levels.iter_mut().enumerate() {
            *level -= i as f64 * 3.0;
        }
        npd.insert(1000.0, levels).unwrap();
        npd.insert(2000.0, levels).unwrap();

        for (i, distance) in NPD_STANDARD_DISTANCES.iter().enumerate() {
            let level = npd.interpolate(1500.0, *distance);
            assert!(
                (level - (90.0 - i as f64 * 3.0)).abs() < 1e-9,
                "distance {distance} gave {level}"
            );
        }
    }

    #[test]
    fn test_interpolate_clamps_close_distances() {
        let npd = two_row_table();
        assert!((npd.interpolate(3000.0, 10.0) - npd.interpolate(3000.0, 30.0)).abs() < 1e-12);
    }

    #[test]
    fn test_apply_delta_round_trip() {
        let mut npd = two_row_table();
        let reference = npd.clone();

        let mut deltas = [0.0; NPD_DISTANCE_COUNT];
        for (i, delta) in deltas.iter_mut().enumerate() {
            *delta = 0.5 + i as f64 * 0.25;
        }
        npd.apply_delta(&deltas);
        assert_ne!(npd, reference);

        let negated = deltas.map(|delta| -delta);
        npd.apply_delta(&negated);
        for ((_, restored), (_, original)) in npd.rows().iter().zip(reference.rows()) {
            for (a, b) in restored.iter().zip(original) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_insert_rejects_duplicates_and_bad_thrust() {
        let mut npd = two_row_table();
        assert!(npd.insert(1000.0, flat(70.0)).is_err());
        assert!(npd.insert(0.0, flat(70.0)).is_err());
        assert!(npd.insert(-10.0, flat(70.0)).is_err());
        assert_eq!(npd.len(), 2);
    }

    #[test]
    fn test_valid_requires_two_rows() {
        let mut npd = NpdData::new();
        assert!(!npd.valid());
        npd.insert(1000.0, flat(75.0)).unwrap();
        assert!(!npd.valid());
        npd.insert(2000.0, flat(80.0)).unwrap();
        assert!(npd.valid());
    }
}
