//! Ring winding for vector tiles.
//!
//! MVT v2 wants exterior rings with positive area in tile space, where y
//! grows downward. The tile writer flips y, so in projected (y-up)
//! coordinates exteriors must run clockwise and holes counter-clockwise.

use geo_types::{Geometry, GeometryCollection, LineString, MultiPolygon, Polygon};

/// Twice the signed area of a ring, positive when counter-clockwise (y-up)
pub fn signed_area(ring: &LineString<f64>) -> f64 {
    let coords = &ring.0;
    let n = coords.len();
    (0..n)
        .map(|i| {
            let (a, b) = (coords[i], coords[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}

fn wound(ring: LineString<f64>, clockwise: bool) -> LineString<f64> {
    let area = signed_area(&ring);
    if area == 0.0 || (area < 0.0) == clockwise {
        return ring;
    }
    let mut coords = ring.0;
    coords.reverse();
    LineString(coords)
}

/// Clockwise exterior, counter-clockwise holes
pub fn orient_polygon(polygon: Polygon<f64>) -> Polygon<f64> {
    let (exterior, interiors) = polygon.into_inner();
    Polygon::new(
        wound(exterior, true),
        interiors.into_iter().map(|r| wound(r, false)).collect(),
    )
}

/// Apply [`orient_polygon`] to every polygon in `geometry`
pub fn orient(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::Polygon(p) => Geometry::Polygon(orient_polygon(p)),
        Geometry::MultiPolygon(mp) => {
            Geometry::MultiPolygon(MultiPolygon(mp.0.into_iter().map(orient_polygon).collect()))
        }
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection(
            gc.0.into_iter().map(orient).collect(),
        )),
        other => other,
    }
}
