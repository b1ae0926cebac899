//! Bounds expression parsing.
//!
//! A bounds expression is the compact path grammar describing a geospatial
//! region: `near/<lat>/<lng>[/<dist>]` or `within/<lat1>/<lng1>/<lat2>/<lng2>`.
//! Parsing yields a [`BoundsQuery`], the structured filter the serve binary
//! renders into an Elasticsearch search body.

use std::str::FromStr;

use regex::Regex;
use thiserror::Error;

/// Mean earth radius in meters. Multiplying an angular radius by this value
/// recovers the distance in meters; it matches the meter divisor below.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Errors produced while parsing a bounds expression.
#[derive(Debug, Error, PartialEq)]
pub enum BoundsError {
    #[error("empty bounds expression")]
    Empty,

    #[error("unrecognized bounds mode '{0}'")]
    UnknownMode(String),

    #[error("invalid coordinate '{0}'")]
    InvalidCoordinate(String),

    #[error("'{mode}' expects {expected} segments after the mode, got {got}")]
    SegmentCount {
        mode: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("invalid distance '{0}', expected <number><mi|km|m|ft>")]
    InvalidDistance(String),
}

/// Distance unit suffix accepted in `near` expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
    Meters,
    Feet,
}

impl DistanceUnit {
    /// Earth radius expressed in this unit. Dividing a distance by it yields
    /// the angular radius stored on [`BoundsQuery::Near`].
    pub fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Miles => 3_959.0,
            DistanceUnit::Kilometers => 6_371.0,
            DistanceUnit::Meters => 6_371_000.0,
            DistanceUnit::Feet => 3_959.0 * 5_280.0,
        }
    }

    /// Map a unit suffix to its variant.
    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "mi" => Some(DistanceUnit::Miles),
            "km" => Some(DistanceUnit::Kilometers),
            "m" => Some(DistanceUnit::Meters),
            "ft" => Some(DistanceUnit::Feet),
            _ => None,
        }
    }
}

/// Structured geospatial filter derived one-to-one from a bounds expression.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundsQuery {
    /// Points sorted by distance from a reference coordinate, optionally
    /// capped by an angular radius in earth radii.
    Near {
        lat: f64,
        lon: f64,
        radius: Option<f64>,
    },

    /// Points inside the box spanned by two corners, each in (lon, lat)
    /// order as handed in by the expression.
    Within { first: [f64; 2], second: [f64; 2] },
}

impl FromStr for BoundsQuery {
    type Err = BoundsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.split('/');
        let mode = segments
            .next()
            .filter(|m| !m.is_empty())
            .ok_or(BoundsError::Empty)?;
        let rest: Vec<&str> = segments.collect();

        match mode {
            "near" => match rest.as_slice() {
                [lat, lon] => Ok(BoundsQuery::Near {
                    lat: parse_coordinate(lat)?,
                    lon: parse_coordinate(lon)?,
                    radius: None,
                }),
                [lat, lon, dist] => Ok(BoundsQuery::Near {
                    lat: parse_coordinate(lat)?,
                    lon: parse_coordinate(lon)?,
                    radius: Some(parse_radius(dist)?),
                }),
                other => Err(BoundsError::SegmentCount {
                    mode: "near",
                    expected: "2 or 3",
                    got: other.len(),
                }),
            },
            "within" => match rest.as_slice() {
                [lat1, lon1, lat2, lon2] => Ok(BoundsQuery::Within {
                    first: [parse_coordinate(lon1)?, parse_coordinate(lat1)?],
                    second: [parse_coordinate(lon2)?, parse_coordinate(lat2)?],
                }),
                other => Err(BoundsError::SegmentCount {
                    mode: "within",
                    expected: "exactly 4",
                    got: other.len(),
                }),
            },
            other => Err(BoundsError::UnknownMode(other.to_string())),
        }
    }
}

/// Parse a path segment as a coordinate. `f64::from_str` accepts the leading
/// minus sign that naive numeric segment matchers reject.
pub fn parse_coordinate(s: &str) -> Result<f64, BoundsError> {
    s.parse::<f64>()
        .map_err(|_| BoundsError::InvalidCoordinate(s.to_string()))
}

/// Parse a `<number><unit>` radius token into earth radii.
fn parse_radius(token: &str) -> Result<f64, BoundsError> {
    // Compiled here for simplicity; a bounds string is parsed once per request
    let pattern = Regex::new(r"^(\d+(?:\.\d+)?)(mi|km|m|ft)$").unwrap();

    let caps = pattern
        .captures(token)
        .ok_or_else(|| BoundsError::InvalidDistance(token.to_string()))?;

    let value: f64 = caps[1]
        .parse()
        .map_err(|_| BoundsError::InvalidDistance(token.to_string()))?;
    let unit = DistanceUnit::from_suffix(&caps[2])
        .ok_or_else(|| BoundsError::InvalidDistance(token.to_string()))?;

    Ok(value / unit.earth_radius())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_with_radius_in_miles() {
        let query: BoundsQuery = "near/10/20/5mi".parse().unwrap();
        assert_eq!(
            query,
            BoundsQuery::Near {
                lat: 10.0,
                lon: 20.0,
                radius: Some(5.0 / 3959.0),
            }
        );
    }

    #[test]
    fn test_near_negative_coordinates_unrestricted() {
        let query: BoundsQuery = "near/-10/-20".parse().unwrap();
        assert_eq!(
            query,
            BoundsQuery::Near {
                lat: -10.0,
                lon: -20.0,
                radius: None,
            }
        );
    }

    #[test]
    fn test_within_corners_in_lon_lat_order() {
        let query: BoundsQuery = "within/1/2/3/4".parse().unwrap();
        assert_eq!(
            query,
            BoundsQuery::Within {
                first: [2.0, 1.0],
                second: [4.0, 3.0],
            }
        );
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = "bogus/1/2".parse::<BoundsQuery>().unwrap_err();
        assert_eq!(err, BoundsError::UnknownMode("bogus".to_string()));
    }

    #[test]
    fn test_radius_divisor_per_unit() {
        for (expr, expected) in [
            ("near/0/0/5mi", 5.0 / 3_959.0),
            ("near/0/0/5km", 5.0 / 6_371.0),
            ("near/0/0/500m", 500.0 / 6_371_000.0),
            ("near/0/0/2ft", 2.0 / 20_903_520.0),
        ] {
            match expr.parse::<BoundsQuery>().unwrap() {
                BoundsQuery::Near { radius, .. } => assert_eq!(radius, Some(expected)),
                other => panic!("expected a near query, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_fractional_distance_parses() {
        let query: BoundsQuery = "near/51.5/-0.1/0.5km".parse().unwrap();
        match query {
            BoundsQuery::Near { radius, .. } => assert_eq!(radius, Some(0.5 / 6_371.0)),
            other => panic!("expected a near query, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_distance_rejected() {
        for expr in ["near/10/20/5parsecs", "near/10/20/mi", "near/10/20/5 mi"] {
            let err = expr.parse::<BoundsQuery>().unwrap_err();
            assert!(
                matches!(err, BoundsError::InvalidDistance(_)),
                "{} produced {:?}",
                expr,
                err
            );
        }
    }

    #[test]
    fn test_wrong_segment_counts_rejected() {
        for expr in ["near", "near/10", "within/1/2/3", "within/1/2/3/4/5"] {
            let err = expr.parse::<BoundsQuery>().unwrap_err();
            assert!(
                matches!(err, BoundsError::SegmentCount { .. }),
                "{} produced {:?}",
                expr,
                err
            );
        }
    }

    #[test]
    fn test_surplus_near_segment_rejected() {
        let err = "near/1/2/5mi/9".parse::<BoundsQuery>().unwrap_err();
        assert_eq!(
            err,
            BoundsError::SegmentCount {
                mode: "near",
                expected: "2 or 3",
                got: 4,
            }
        );
    }

    #[test]
    fn test_empty_expression_rejected() {
        assert_eq!("".parse::<BoundsQuery>().unwrap_err(), BoundsError::Empty);
    }

    #[test]
    fn test_non_numeric_coordinate_rejected() {
        let err = "near/abc/20".parse::<BoundsQuery>().unwrap_err();
        assert_eq!(err, BoundsError::InvalidCoordinate("abc".to_string()));
    }
}
