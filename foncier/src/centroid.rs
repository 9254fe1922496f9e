//! Centre approximatif de la parcelle
//!
//! Moyenne arithmétique des sommets de l'anneau extérieur, sans pondération
//! par l'aire. Suffisant pour une parcelle de petite taille ; l'erreur croît
//! pour les polygones étendus ou très concaves. Les trous et les polygones
//! suivants d'un MultiPolygon sont ignorés.

use crate::types::{FeatureCollection, Position, MIN_RING_POSITIONS};

/// Point latitude/longitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Centroïde du contour de parcelle d'une collection
///
/// Retourne `None` si la collection est absente, si aucune feature n'est
/// marquée `parcel_boundary`, ou si l'anneau extérieur a moins de
/// [`MIN_RING_POSITIONS`] positions (2 sommets utilisables).
pub fn parcel_centroid(collection: Option<&FeatureCollection>) -> Option<LatLon> {
    let feature = collection?.parcel_boundary()?;
    let ring = feature.geometry.outer_ring()?;
    ring_centroid(ring)
}

/// Moyenne des sommets d'un anneau fermé, le dernier point (doublon du premier) exclu
pub fn ring_centroid(ring: &[Position]) -> Option<LatLon> {
    if ring.len() < MIN_RING_POSITIONS {
        return None;
    }
    let usable = ring.len() - 1;

    let (sum_lon, sum_lat) = ring[..usable]
        .iter()
        .fold((0.0, 0.0), |(lon, lat), p| (lon + p.lon, lat + p.lat));

    let n = usable as f64;
    Some(LatLon {
        lat: sum_lat / n,
        lon: sum_lon / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Feature, Geometry, PARCEL_BOUNDARY};

    fn square() -> Vec<Position> {
        vec![
            Position::new(0.0, 0.0),
            Position::new(2.0, 0.0),
            Position::new(2.0, 2.0),
            Position::new(0.0, 2.0),
            Position::new(0.0, 0.0),
        ]
    }

    fn parcel(geometry: Geometry) -> FeatureCollection {
        FeatureCollection::new(vec![
            Feature::new(Geometry::Point(Position::new(50.0, 50.0))),
            Feature::new(geometry).with_property("type", PARCEL_BOUNDARY),
        ])
    }

    #[test]
    fn test_square_centroid() {
        let fc = parcel(Geometry::Polygon(vec![square()]));
        assert_eq!(
            parcel_centroid(Some(&fc)),
            Some(LatLon { lat: 1.0, lon: 1.0 })
        );
    }

    #[test]
    fn test_closing_vertex_is_excluded() {
        // Sans exclusion, (0,0) compterait deux fois et décalerait le centre
        let c = ring_centroid(&square()).unwrap();
        assert!((c.lat - 1.0).abs() < 1e-12);
        assert!((c.lon - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_data_is_not_found() {
        assert_eq!(parcel_centroid(None), None);
        assert_eq!(parcel_centroid(Some(&FeatureCollection::default())), None);

        let unmarked = FeatureCollection::new(vec![Feature::new(Geometry::Polygon(vec![square()]))]);
        assert_eq!(parcel_centroid(Some(&unmarked)), None);
    }

    #[test]
    fn test_point_boundary_is_not_found() {
        let fc = parcel(Geometry::Point(Position::new(1.0, 1.0)));
        assert_eq!(parcel_centroid(Some(&fc)), None);
    }

    #[test]
    fn test_short_ring_is_not_found() {
        assert_eq!(ring_centroid(&[]), None);
        assert_eq!(ring_centroid(&[Position::new(0.0, 0.0)]), None);
        assert_eq!(
            ring_centroid(&[Position::new(0.0, 0.0), Position::new(1.0, 1.0)]),
            None
        );
        // Plus petit anneau admis par la validation
        let segment = ring_centroid(&[
            Position::new(0.0, 0.0),
            Position::new(2.0, 2.0),
            Position::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(segment, LatLon { lat: 1.0, lon: 1.0 });

        let triangle = ring_centroid(&[
            Position::new(0.0, 0.0),
            Position::new(3.0, 0.0),
            Position::new(0.0, 3.0),
            Position::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(triangle, LatLon { lat: 1.0, lon: 1.0 });
    }

    #[test]
    fn test_multipolygon_uses_first_polygon() {
        let far = vec![
            Position::new(10.0, 10.0),
            Position::new(12.0, 10.0),
            Position::new(12.0, 12.0),
            Position::new(10.0, 10.0),
        ];
        let fc = parcel(Geometry::MultiPolygon(vec![vec![square()], vec![far]]));
        assert_eq!(
            parcel_centroid(Some(&fc)),
            Some(LatLon { lat: 1.0, lon: 1.0 })
        );
    }
}
