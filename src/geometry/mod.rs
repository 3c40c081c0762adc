//! Geometry codec: `geo_types` geometries to EWKB for storage and back.
//!
//! Every stored blob carries [`SRID`], the fixed longitude/latitude reference.

pub mod clip;
pub mod mercator;
pub mod orient;

use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use geozero::wkb::Ewkb;
use geozero::{CoordDimensions, ToGeo, ToWkb};

use crate::error::{DatasetError, DatasetResult};
use crate::schema::SRID;

/// Axis-aligned bounds in the geometry's own coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    fn of(coord: Coord<f64>) -> Self {
        Self {
            min_x: coord.x,
            min_y: coord.y,
            max_x: coord.x,
            max_y: coord.y,
        }
    }

    fn expand(&mut self, coord: Coord<f64>) {
        self.min_x = self.min_x.min(coord.x);
        self.min_y = self.min_y.min(coord.y);
        self.max_x = self.max_x.max(coord.x);
        self.max_y = self.max_y.max(coord.y);
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// A geometry ready to be written: WKB bytes plus its envelope
#[derive(Debug, Clone)]
pub struct EncodedGeometry {
    pub wkb: Vec<u8>,
    pub envelope: Envelope,
}

/// Encode a geometry as 2D little-endian EWKB tagged with [`SRID`].
///
/// Empty geometries and non-finite coordinates are rejected since neither
/// has a usable envelope.
pub fn encode(geometry: &Geometry<f64>) -> DatasetResult<EncodedGeometry> {
    let envelope = envelope(geometry)
        .ok_or_else(|| DatasetError::invalid("geometry has no coordinates"))?;
    let finite = [envelope.min_x, envelope.min_y, envelope.max_x, envelope.max_y]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(DatasetError::invalid("geometry has non-finite coordinates"));
    }

    let wkb = geometry
        .to_ewkb(CoordDimensions::default(), Some(SRID))
        .map_err(|e| DatasetError::invalid(format!("cannot encode geometry: {}", e)))?;

    Ok(EncodedGeometry { wkb, envelope })
}

/// Decode stored WKB
pub fn decode(wkb: Vec<u8>) -> DatasetResult<Geometry<f64>> {
    Ewkb(wkb)
        .to_geo()
        .map_err(|e| DatasetError::internal(format!("stored geometry is not valid WKB: {}", e)))
}

/// Visit every coordinate of a geometry
pub fn for_each_coord(geometry: &Geometry<f64>, f: &mut impl FnMut(Coord<f64>)) {
    fn ring(ls: &LineString<f64>, f: &mut impl FnMut(Coord<f64>)) {
        ls.0.iter().for_each(|c| f(*c));
    }
    fn polygon(p: &Polygon<f64>, f: &mut impl FnMut(Coord<f64>)) {
        ring(p.exterior(), f);
        p.interiors().iter().for_each(|r| ring(r, f));
    }

    match geometry {
        Geometry::Point(p) => f(p.0),
        Geometry::Line(l) => {
            f(l.start);
            f(l.end);
        }
        Geometry::LineString(ls) => ring(ls, f),
        Geometry::Polygon(p) => polygon(p, f),
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| f(p.0)),
        Geometry::MultiLineString(mls) => mls.0.iter().for_each(|ls| ring(ls, f)),
        Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| polygon(p, f)),
        Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| for_each_coord(g, f)),
        Geometry::Rect(r) => polygon(&r.to_polygon(), f),
        Geometry::Triangle(t) => polygon(&t.to_polygon(), f),
    }
}

/// Envelope of a geometry, `None` when it has no coordinates
pub fn envelope(geometry: &Geometry<f64>) -> Option<Envelope> {
    let mut env: Option<Envelope> = None;
    for_each_coord(geometry, &mut |c| {
        if let Some(e) = env.as_mut() {
            e.expand(c);
        } else {
            env = Some(Envelope::of(c));
        }
    });
    env
}

/// Apply `f` to every coordinate, producing a new geometry
pub fn map_coords(geometry: &Geometry<f64>, f: &impl Fn(Coord<f64>) -> Coord<f64>) -> Geometry<f64> {
    let line = |ls: &LineString<f64>| LineString(ls.0.iter().map(|c| f(*c)).collect());
    let polygon = |p: &Polygon<f64>| {
        Polygon::new(line(p.exterior()), p.interiors().iter().map(line).collect())
    };

    match geometry {
        Geometry::Point(p) => Geometry::Point(Point(f(p.0))),
        Geometry::Line(l) => Geometry::LineString(LineString(vec![f(l.start), f(l.end)])),
        Geometry::LineString(ls) => Geometry::LineString(line(ls)),
        Geometry::Polygon(p) => Geometry::Polygon(polygon(p)),
        Geometry::MultiPoint(mp) => {
            Geometry::MultiPoint(MultiPoint(mp.0.iter().map(|p| Point(f(p.0))).collect()))
        }
        Geometry::MultiLineString(mls) => {
            Geometry::MultiLineString(MultiLineString(mls.0.iter().map(line).collect()))
        }
        Geometry::MultiPolygon(mp) => {
            Geometry::MultiPolygon(MultiPolygon(mp.0.iter().map(polygon).collect()))
        }
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(
            gc.0.iter().map(|g| map_coords(g, f)).collect(),
        ),
        Geometry::Rect(r) => Geometry::Polygon(polygon(&r.to_polygon())),
        Geometry::Triangle(t) => Geometry::Polygon(polygon(&t.to_polygon())),
    }
}
