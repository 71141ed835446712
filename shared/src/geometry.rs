//! Planar and spherical geometry helpers for field boundaries
//!
//! All functions accept a boundary ring as an ordered list of vertices. The
//! ring is implicitly closed: the last vertex connects back to the first.
//! These are approximations tuned for farm-sized polygons (tens of hectares);
//! they are not geodesically exact for large or near-polar shapes.

use crate::types::GpsCoordinates;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Square meters per hectare
const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Polygon area in hectares.
///
/// Each vertex is projected onto a local equirectangular plane at its own
/// latitude, then the shoelace formula is applied. Rings with fewer than
/// three vertices have zero area.
pub fn polygon_area_hectares(ring: &[GpsCoordinates]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let project = |c: &GpsCoordinates| {
        let x = c.longitude.to_radians() * EARTH_RADIUS_METERS * c.latitude.to_radians().cos();
        let y = c.latitude.to_radians() * EARTH_RADIUS_METERS;
        (x, y)
    };

    let twice_area: f64 = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| {
            let (x1, y1) = project(a);
            let (x2, y2) = project(b);
            x1 * y2 - x2 * y1
        })
        .sum();

    (twice_area / 2.0).abs() / SQUARE_METERS_PER_HECTARE
}

/// Vertex centroid: the arithmetic mean of the vertex coordinates.
///
/// This is not the area-weighted centroid. An empty ring yields `(0, 0)`.
pub fn centroid(ring: &[GpsCoordinates]) -> GpsCoordinates {
    if ring.is_empty() {
        return GpsCoordinates::new(0.0, 0.0);
    }

    let n = ring.len() as f64;
    let (lat_sum, lon_sum) = ring.iter().fold((0.0, 0.0), |(lat, lon), c| {
        (lat + c.latitude, lon + c.longitude)
    });

    GpsCoordinates::new(lat_sum / n, lon_sum / n)
}

/// Even-odd ray casting test with longitude as X and latitude as Y.
///
/// The wraparound edge (last vertex to first) is included. Points exactly on
/// an edge may fall on either side.
pub fn point_in_polygon(point: &GpsCoordinates, ring: &[GpsCoordinates]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].longitude, ring[i].latitude);
        let (xj, yj) = (ring[j].longitude, ring[j].latitude);

        let crosses = (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Great-circle (haversine) distance in meters
pub fn distance_meters(a: &GpsCoordinates, b: &GpsCoordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Smallest distance from `point` to any vertex of `ring`.
///
/// Returns `f64::INFINITY` for an empty ring.
pub fn min_vertex_distance_meters(point: &GpsCoordinates, ring: &[GpsCoordinates]) -> f64 {
    ring.iter()
        .map(|v| distance_meters(point, v))
        .fold(f64::INFINITY, f64::min)
}

/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Bounding box of a ring, or `None` when the ring is empty
    pub fn of(ring: &[GpsCoordinates]) -> Option<Self> {
        let first = ring.first()?;
        let init = Self {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lon: first.longitude,
            max_lon: first.longitude,
        };

        Some(ring.iter().skip(1).fold(init, |b, c| Self {
            min_lat: b.min_lat.min(c.latitude),
            max_lat: b.max_lat.max(c.latitude),
            min_lon: b.min_lon.min(c.longitude),
            max_lon: b.max_lon.max(c.longitude),
        }))
    }

    /// Square box of `size_meters` per side centred on `center`
    pub fn around(center: &GpsCoordinates, size_meters: f64) -> Self {
        let d_lat = (size_meters / EARTH_RADIUS_METERS).to_degrees();
        let d_lon =
            (size_meters / (EARTH_RADIUS_METERS * center.latitude.to_radians().cos())).to_degrees();

        Self {
            min_lat: center.latitude - d_lat / 2.0,
            max_lat: center.latitude + d_lat / 2.0,
            min_lon: center.longitude - d_lon / 2.0,
            max_lon: center.longitude + d_lon / 2.0,
        }
    }

    /// Closed ring of `[lon, lat]` pairs in GeoJSON order
    pub fn to_geojson_ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.min_lon, self.min_lat],
            [self.max_lon, self.min_lat],
            [self.max_lon, self.max_lat],
            [self.min_lon, self.max_lat],
            [self.min_lon, self.min_lat],
        ]
    }
}

/// True when any two non-adjacent edges of the ring cross.
///
/// Area, centroid, and containment are only meaningful for simple polygons;
/// the core functions do not call this, callers that want to reject bad
/// drawings do.
pub fn has_self_intersection(ring: &[GpsCoordinates]) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }

    let edge = |i: usize| (ring[i], ring[(i + 1) % n]);

    for i in 0..n {
        for j in (i + 1)..n {
            // Adjacent edges share a vertex; the first and last edge are adjacent too
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (a1, a2) = edge(i);
            let (b1, b2) = edge(j);
            if segments_intersect(&a1, &a2, &b1, &b2) {
                return true;
            }
        }
    }

    false
}

fn orientation(p: &GpsCoordinates, q: &GpsCoordinates, r: &GpsCoordinates) -> f64 {
    (q.longitude - p.longitude) * (r.latitude - p.latitude)
        - (q.latitude - p.latitude) * (r.longitude - p.longitude)
}

fn segments_intersect(
    p1: &GpsCoordinates,
    p2: &GpsCoordinates,
    q1: &GpsCoordinates,
    q2: &GpsCoordinates,
) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}


#[cfg(test)]
mod tests {
    use super::test_support::square;
    use super::*;
    use proptest::prelude::*;

    fn c(lat: f64, lon: f64) -> GpsCoordinates {
        GpsCoordinates::new(lat, lon)
    }

    #[test]
    fn test_area_degenerate_rings_are_zero() {
        assert_eq!(polygon_area_hectares(&[]), 0.0);
        assert_eq!(polygon_area_hectares(&[c(1.0, 1.0)]), 0.0);
        assert_eq!(polygon_area_hectares(&[c(1.0, 1.0), c(1.001, 1.001)]), 0.0);
    }

    #[test]
    fn test_area_of_hectare_square() {
        let ring = square(-34.60, -58.40, 100.0);
        let area = polygon_area_hectares(&ring);
        assert!((area - 1.0).abs() < 0.02, "area was {}", area);
    }

    #[test]
    fn test_area_ignores_winding_direction() {
        let ring = square(18.79, 98.98, 200.0);
        let mut reversed = ring.clone();
        reversed.reverse();
        let a = polygon_area_hectares(&ring);
        let b = polygon_area_hectares(&reversed);
        assert!((a - b).abs() < 1e-9);
        assert!((a - 4.0).abs() < 0.1);
    }

    #[test]
    fn test_centroid_is_vertex_mean() {
        let ring = vec![c(0.0, 0.0), c(0.0, 2.0), c(2.0, 2.0), c(2.0, 0.0), c(0.0, 0.0)];
        let m = centroid(&ring);
        // The repeated vertex counts twice: vertex mean, not area centroid
        assert!((m.latitude - 0.8).abs() < 1e-12);
        assert!((m.longitude - 0.8).abs() < 1e-12);
        assert_eq!(centroid(&[]), c(0.0, 0.0));
    }

    #[test]
    fn test_point_in_polygon_square() {
        let ring = vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0), c(1.0, 0.0)];
        assert!(point_in_polygon(&c(0.5, 0.5), &ring));
        assert!(!point_in_polygon(&c(1.5, 0.5), &ring));
        assert!(!point_in_polygon(&c(0.5, -0.1), &ring));
    }

    #[test]
    fn test_point_in_polygon_concave() {
        // U shape opening north
        let ring = vec![
            c(0.0, 0.0),
            c(0.0, 3.0),
            c(3.0, 3.0),
            c(3.0, 2.0),
            c(1.0, 2.0),
            c(1.0, 1.0),
            c(3.0, 1.0),
            c(3.0, 0.0),
        ];
        assert!(point_in_polygon(&c(2.0, 0.5), &ring));
        assert!(!point_in_polygon(&c(2.0, 1.5), &ring));
        assert!(point_in_polygon(&c(0.5, 1.5), &ring));
    }

    #[test]
    fn test_point_in_polygon_degenerate_ring() {
        assert!(!point_in_polygon(&c(0.0, 0.0), &[]));
        assert!(!point_in_polygon(&c(0.0, 0.0), &[c(0.0, 0.0), c(1.0, 1.0)]));
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let d = distance_meters(&c(0.0, 0.0), &c(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 10.0, "distance was {}", d);
        assert_eq!(distance_meters(&c(10.0, 10.0), &c(10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_bounding_box() {
        assert!(BoundingBox::of(&[]).is_none());
        let b = BoundingBox::of(&[c(1.0, 5.0), c(-2.0, 7.0), c(0.5, 6.0)]).unwrap();
        assert_eq!(b.min_lat, -2.0);
        assert_eq!(b.max_lat, 1.0);
        assert_eq!(b.min_lon, 5.0);
        assert_eq!(b.max_lon, 7.0);
    }

    #[test]
    fn test_box_around_point_is_roughly_square() {
        let center = c(-34.6, -58.4);
        let b = BoundingBox::around(&center, 100.0);
        let width = distance_meters(&c(center.latitude, b.min_lon), &c(center.latitude, b.max_lon));
        let height = distance_meters(&c(b.min_lat, center.longitude), &c(b.max_lat, center.longitude));
        assert!((width - 100.0).abs() < 0.5);
        assert!((height - 100.0).abs() < 0.5);

        let ring = b.to_geojson_ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_self_intersection() {
        let simple = vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0), c(1.0, 0.0)];
        assert!(!has_self_intersection(&simple));

        let bow_tie = vec![c(0.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(1.0, 0.0)];
        assert!(has_self_intersection(&bow_tie));

        let triangle = vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 0.0)];
        assert!(!has_self_intersection(&triangle));
    }

    fn ring_strategy() -> impl Strategy<Value = Vec<GpsCoordinates>> {
        prop::collection::vec((-60.0f64..60.0, -170.0f64..170.0), 3..12)
            .prop_map(|pts| pts.into_iter().map(|(lat, lon)| c(lat, lon)).collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Area is never negative
        #[test]
        fn prop_area_non_negative(ring in ring_strategy()) {
            prop_assert!(polygon_area_hectares(&ring) >= 0.0);
        }

        /// Centroid equals the mean of the vertices
        #[test]
        fn prop_centroid_is_mean(ring in ring_strategy()) {
            let m = centroid(&ring);
            let n = ring.len() as f64;
            let lat: f64 = ring.iter().map(|p| p.latitude).sum::<f64>() / n;
            let lon: f64 = ring.iter().map(|p| p.longitude).sum::<f64>() / n;
            prop_assert!((m.latitude - lat).abs() < 1e-9);
            prop_assert!((m.longitude - lon).abs() < 1e-9);
        }

        /// Membership does not depend on which vertex the ring starts at
        #[test]
        fn prop_point_in_polygon_rotation_invariant(
            ring in ring_strategy(),
            shift in 0usize..12,
            lat in -60.0f64..60.0,
            lon in -170.0f64..170.0,
        ) {
            let point = c(lat, lon);
            let mut rotated = ring.clone();
            let k = shift % ring.len();
            rotated.rotate_left(k);
            prop_assert_eq!(
                point_in_polygon(&point, &ring),
                point_in_polygon(&point, &rotated)
            );
        }

        /// Haversine distance is symmetric and non-negative
        #[test]
        fn prop_distance_symmetric(
            a_lat in -80.0f64..80.0, a_lon in -170.0f64..170.0,
            b_lat in -80.0f64..80.0, b_lon in -170.0f64..170.0,
        ) {
            let a = c(a_lat, a_lon);
            let b = c(b_lat, b_lon);
            let ab = distance_meters(&a, &b);
            prop_assert!(ab >= 0.0);
            prop_assert!((ab - distance_meters(&b, &a)).abs() < 1e-6);
        }
    }
}
