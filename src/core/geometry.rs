//! Coordinate-string parsing and footprint geography.
//!
//! Manifest coordinate strings arrive in two shapes: comma-joined pairs
//! separated by whitespace ("lat,lon lat,lon ...") or a flat run of
//! whitespace-separated values read pairwise as lat, lon. Either way the
//! output ring is (longitude, latitude) ordered, closed, and at least four
//! points long; anything shorter is skipped rather than treated as an error.
use tracing::{debug, warn};

use crate::io::geocode::ReverseGeocoder;
use crate::record::{Footprint, Ring};

/// Outcome of parsing a raw coordinate string.
#[derive(Debug, Clone, PartialEq)]
pub enum RingParse {
    Resolved(Footprint),
    /// Too few points (or unparseable values) to form a polygon; the caller
    /// leaves the footprint unset and carries on.
    Skipped { points: usize },
}

/// Parse a raw coordinate string into a closed footprint ring.
pub fn parse_ring(raw: &str) -> RingParse {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let mut ring: Ring = Vec::new();

    if raw.contains(',') {
        debug!(raw, "coordinates are comma separated");
        for token in &tokens {
            let mut parts = token.split(',');
            let lat = parts.next().and_then(|v| v.parse::<f64>().ok());
            let lon = parts.next().and_then(|v| v.parse::<f64>().ok());
            match (lat, lon) {
                (Some(lat), Some(lon)) => ring.push((lon, lat)),
                _ => {
                    warn!(token, "unparseable coordinate pair; skipping ring");
                    return RingParse::Skipped { points: ring.len() };
                }
            }
        }
    } else {
        debug!(raw, "coordinates are whitespace separated");
        for pair in tokens.chunks(2) {
            if pair.len() < 2 {
                break;
            }
            let lat = pair[0].parse::<f64>();
            let lon = pair[1].parse::<f64>();
            match (lat, lon) {
                (Ok(lat), Ok(lon)) => ring.push((lon, lat)),
                _ => {
                    warn!(?pair, "unparseable coordinate value; skipping ring");
                    return RingParse::Skipped { points: ring.len() };
                }
            }
        }
    }

    let points = ring.len();
    match Footprint::from_ring(ring) {
        Some(footprint) => RingParse::Resolved(footprint),
        None => {
            warn!(
                points,
                "not enough points to create a polygon; need at least 4"
            );
            RingParse::Skipped { points }
        }
    }
}

/// Area centroid of a closed ring, falling back to the vertex mean when the
/// ring is degenerate (collinear or zero-area). Returns (longitude, latitude).
pub fn centroid(ring: &Ring) -> (f64, f64) {
    if ring.is_empty() {
        return (0.0, 0.0);
    }
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for window in ring.windows(2) {
        let (x0, y0) = window[0];
        let (x1, y1) = window[1];
        let cross = x0 * y1 - x1 * y0;
        area2 += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    if area2.abs() > 1e-12 {
        return (cx / (3.0 * area2), cy / (3.0 * area2));
    }
    // Degenerate ring: average the vertices, skipping the closing duplicate.
    let open = &ring[..ring.len().saturating_sub(1).max(1)];
    let n = open.len() as f64;
    let (sx, sy) = open
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    (sx / n, sy / n)
}

/// Resolve the country name at a footprint's centroid via reverse geocoding.
/// Best-effort: any lookup failure or missing address component yields
/// "Unknown".
pub fn country(footprint: &Footprint, geocoder: &dyn ReverseGeocoder) -> String {
    let (lon, lat) = centroid(&footprint.ring);
    match geocoder.reverse(lat, lon) {
        Ok(address) => match address
            .get("address")
            .and_then(|a| a.get("country"))
            .and_then(|c| c.as_str())
        {
            Some(country) => {
                debug!(country, lat, lon, "resolved country");
                country.to_string()
            }
            None => {
                debug!(lat, lon, "no country component in reverse geocoding result");
                "Unknown".to_string()
            }
        },
        Err(e) => {
            debug!(lat, lon, error = %e, "reverse geocoding failed");
            "Unknown".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::geocode::GeocodeError;

    struct FixedGeocoder(serde_json::Value);

    impl ReverseGeocoder for FixedGeocoder {
        fn reverse(&self, _lat: f64, _lon: f64) -> Result<serde_json::Value, GeocodeError> {
            Ok(self.0.clone())
        }
    }

    struct FailingGeocoder;

    impl ReverseGeocoder for FailingGeocoder {
        fn reverse(&self, _lat: f64, _lon: f64) -> Result<serde_json::Value, GeocodeError> {
            Err(GeocodeError::Malformed("boom".into()))
        }
    }

    #[test]
    fn test_comma_separated_ring_is_closed() {
        let parsed = parse_ring("48.0,8.0 48.0,9.0 49.0,9.0 49.0,8.0");
        let RingParse::Resolved(fp) = parsed else {
            panic!("expected resolved ring");
        };
        assert_eq!(fp.ring.first(), fp.ring.last());
        assert_eq!(fp.ring.len(), 5);
        // pairs are lat,lon in the document; the ring is (lon, lat)
        assert_eq!(fp.ring[0], (8.0, 48.0));
        assert_eq!(fp.ring_latlon[0], (48.0, 8.0));
    }

    #[test]
    fn test_whitespace_separated_ring() {
        let parsed = parse_ring("48.0 8.0 48.0 9.0 49.0 9.0 49.0 8.0");
        let RingParse::Resolved(fp) = parsed else {
            panic!("expected resolved ring");
        };
        assert_eq!(fp.ring[0], (8.0, 48.0));
        assert_eq!(fp.ring.len(), 5);
    }

    #[test]
    fn test_already_closed_ring_not_double_closed() {
        let parsed = parse_ring("0,0 0,1 1,1 1,0 0,0");
        let RingParse::Resolved(fp) = parsed else {
            panic!("expected resolved ring");
        };
        assert_eq!(fp.ring.len(), 5);
    }

    #[test]
    fn test_too_few_points_is_skipped() {
        assert_eq!(parse_ring("48.0,8.0 49.0,9.0"), RingParse::Skipped { points: 2 });
        assert_eq!(parse_ring(""), RingParse::Skipped { points: 0 });
    }

    #[test]
    fn test_garbage_is_skipped_not_panicking() {
        assert!(matches!(
            parse_ring("not,numbers at,all"),
            RingParse::Skipped { .. }
        ));
    }

    #[test]
    fn test_centroid_of_unit_square() {
        let fp = Footprint::from_ring(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]).unwrap();
        let (lon, lat) = centroid(&fp.ring);
        assert!((lon - 1.0).abs() < 1e-9);
        assert!((lat - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_country_from_address() {
        let fp = Footprint::from_ring(vec![(8.0, 48.0), (9.0, 48.0), (9.0, 49.0), (8.0, 49.0)]).unwrap();
        let geocoder = FixedGeocoder(serde_json::json!({"address": {"country": "Germany"}}));
        assert_eq!(country(&fp, &geocoder), "Germany");
    }

    #[test]
    fn test_country_unknown_on_failure() {
        let fp = Footprint::from_ring(vec![(8.0, 48.0), (9.0, 48.0), (9.0, 49.0), (8.0, 49.0)]).unwrap();
        assert_eq!(country(&fp, &FailingGeocoder), "Unknown");
        let empty = FixedGeocoder(serde_json::json!({"address": {}}));
        assert_eq!(country(&fp, &empty), "Unknown");
    }
}
