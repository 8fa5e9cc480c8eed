//! Geospatial bounding box for a single record.
//!
//! A `BoundingBox` is built from the four corner coordinates extracted from a
//! record. Construction validates the ranges, collapses boxes that cross the
//! antimeridian into a single non-wrapping box and pulls coordinates that sit
//! exactly on a pole or on the ±180 meridian slightly inward.

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Distance a coordinate lying exactly on ±90/±180 is moved inward.
pub const EDGE_EPSILON: f64 = 0.000001;

/// Longitude used when clamping a box that crosses the antimeridian.
pub const ANTIMERIDIAN_CLAMP: f64 = 179.999999;

/// A validated geospatial footprint in decimal degrees.
///
/// Invariants held by every constructed value:
/// - `-90 < south <= north < 90`
/// - `-180 < west <= east < 180`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

impl BoundingBox {
    /// Construct a bounding box from its four coordinates.
    ///
    /// # Arguments
    ///
    /// * `north` - Northern latitude, -90 to 90
    /// * `south` - Southern latitude, -90 to 90, not greater than `north`
    /// * `east` - Eastern longitude, -180 to 180
    /// * `west` - Western longitude, -180 to 180
    ///
    /// # Returns
    ///
    /// * `Ok(BoundingBox)` - The normalized box
    /// * `Err(ValidationError)` - If a coordinate is out of range or north < south
    ///
    /// # Example
    ///
    /// ```
    /// use xml_indexer_shared::BoundingBox;
    ///
    /// // Crosses the antimeridian: the box keeps its western part.
    /// let bb = BoundingBox::new(10.0, -10.0, -170.0, 170.0).unwrap();
    /// assert_eq!(bb.east(), 179.999999);
    /// assert_eq!(bb.west(), 170.0);
    /// ```
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, ValidationError> {
        check_range("North", north, 90.0)?;
        check_range("South", south, 90.0)?;
        check_range("East", east, 180.0)?;
        check_range("West", west, 180.0)?;

        if north < south {
            return Err(ValidationError::NorthBelowSouth { north, south });
        }

        let (mut east, mut west) = (east, west);

        // A west edge greater than the east edge means the box wraps across
        // ±180. Keep only one side of the wrap.
        if west > east {
            let west_extent = (west - 180.0).abs();
            let east_extent = (-180.0 - east).abs();
            if east_extent > west_extent {
                west = -ANTIMERIDIAN_CLAMP;
            } else {
                east = ANTIMERIDIAN_CLAMP;
            }
        }

        Ok(Self {
            north: pull_inward(north, 90.0),
            south: pull_inward(south, 90.0),
            east: pull_inward(east, 180.0),
            west: pull_inward(west, 180.0),
        })
    }

    /// Northern latitude.
    pub fn north(&self) -> f64 {
        self.north
    }

    /// Southern latitude.
    pub fn south(&self) -> f64 {
        self.south
    }

    /// Eastern longitude.
    pub fn east(&self) -> f64 {
        self.east
    }

    /// Western longitude.
    pub fn west(&self) -> f64 {
        self.west
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "north: {}, south: {}, east: {}, west: {}",
            self.north, self.south, self.east, self.west
        )
    }
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value < -limit || value > limit {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: -limit,
            max: limit,
        });
    }
    Ok(())
}

fn pull_inward(value: f64, limit: f64) -> f64 {
    if value == limit {
        limit - EDGE_EPSILON
    } else if value == -limit {
        -limit + EDGE_EPSILON
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_box_is_preserved() {
        let bb = BoundingBox::new(45.5, -12.25, 100.0, -30.0).unwrap();
        assert_eq!(bb.north(), 45.5);
        assert_eq!(bb.south(), -12.25);
        assert_eq!(bb.east(), 100.0);
        assert_eq!(bb.west(), -30.0);
    }

    #[test]
    fn test_edges_are_pulled_inward() {
        let bb = BoundingBox::new(90.0, -90.0, 180.0, -180.0).unwrap();
        assert_eq!(bb.north(), 90.0 - EDGE_EPSILON);
        assert_eq!(bb.south(), -90.0 + EDGE_EPSILON);
        assert_eq!(bb.east(), 180.0 - EDGE_EPSILON);
        assert_eq!(bb.west(), -180.0 + EDGE_EPSILON);
    }

    #[test]
    fn test_antimeridian_tie_clamps_east() {
        // west extent |170 - 180| == east extent |-180 - -170| == 10
        let bb = BoundingBox::new(10.0, -10.0, -170.0, 170.0).unwrap();
        assert_eq!(bb.east(), ANTIMERIDIAN_CLAMP);
        assert_eq!(bb.west(), 170.0);
    }

    #[test]
    fn test_antimeridian_keeps_larger_west_side() {
        // west extent 30, east extent 5
        let bb = BoundingBox::new(10.0, -10.0, -175.0, 150.0).unwrap();
        assert_eq!(bb.east(), ANTIMERIDIAN_CLAMP);
        assert_eq!(bb.west(), 150.0);
    }

    #[test]
    fn test_antimeridian_keeps_larger_east_side() {
        // west extent 5, east extent 30
        let bb = BoundingBox::new(10.0, -10.0, -150.0, 175.0).unwrap();
        assert_eq!(bb.west(), -ANTIMERIDIAN_CLAMP);
        assert_eq!(bb.east(), -150.0);
    }

    #[test]
    fn test_north_out_of_range() {
        let err = BoundingBox::new(-91.0, -10.0, 10.0, -10.0).unwrap_err();
        match &err {
            ValidationError::OutOfRange { field, value, .. } => {
                assert_eq!(*field, "North");
                assert_eq!(*value, -91.0);
            }
            other => panic!("Expected OutOfRange, got {:?}", other),
        }
        assert!(err.to_string().contains("North"));
        assert!(err.to_string().contains("-91"));
    }

    #[test]
    fn test_longitude_out_of_range() {
        let err = BoundingBox::new(10.0, -10.0, 181.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "East", .. }
        ));
    }

    #[test]
    fn test_north_below_south() {
        let err = BoundingBox::new(-20.0, 20.0, 10.0, -10.0).unwrap_err();
        assert!(matches!(err, ValidationError::NorthBelowSouth { .. }));
    }

    #[test]
    fn test_nan_is_rejected() {
        assert!(BoundingBox::new(f64::NAN, 0.0, 0.0, 0.0).is_err());
    }
}
