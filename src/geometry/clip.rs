//! Clipping of geometries against an axis-aligned rectangle.
//!
//! Lines use Liang–Barsky segment clipping and are split where they leave
//! the rectangle. Polygon rings use Sutherland–Hodgman, which keeps a single
//! ring per input ring (concave shapes may gain zero-area edges along the
//! boundary, which renderers tolerate).

use geo_types::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Polygon};

use super::Envelope;

fn inside(c: Coord<f64>, r: &Envelope) -> bool {
    c.x >= r.min_x && c.x <= r.max_x && c.y >= r.min_y && c.y <= r.max_y
}

fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    // Exact endpoints keep consecutive clipped segments joinable.
    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        Coord {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }
}

fn clip_segment(a: Coord<f64>, b: Coord<f64>, r: &Envelope) -> Option<(Coord<f64>, Coord<f64>)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;

    for (p, q) in [
        (-dx, a.x - r.min_x),
        (dx, r.max_x - a.x),
        (-dy, a.y - r.min_y),
        (dy, r.max_y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }

    Some((lerp(a, b, t0), lerp(a, b, t1)))
}

/// Clip a line string into the pieces that fall inside `r`
pub fn clip_line_string(ls: &LineString<f64>, r: &Envelope) -> Vec<LineString<f64>> {
    let mut pieces = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();

    let mut flush = |current: &mut Vec<Coord<f64>>| {
        if current.len() >= 2 {
            pieces.push(LineString(std::mem::take(current)));
        } else {
            current.clear();
        }
    };

    for segment in ls.0.windows(2) {
        match clip_segment(segment[0], segment[1], r) {
            Some((start, end)) => {
                if current.last() != Some(&start) {
                    flush(&mut current);
                    current.push(start);
                }
                current.push(end);
            }
            None => flush(&mut current),
        }
    }
    flush(&mut current);

    pieces
}

fn clip_ring_edge(
    ring: &[Coord<f64>],
    keep: impl Fn(Coord<f64>) -> bool,
    cross: impl Fn(Coord<f64>, Coord<f64>) -> Coord<f64>,
) -> Vec<Coord<f64>> {
    let mut out = Vec::with_capacity(ring.len() + 4);
    let Some(&last) = ring.last() else {
        return out;
    };
    let mut prev = last;

    for &cur in ring {
        match (keep(prev), keep(cur)) {
            (true, true) => out.push(cur),
            (true, false) => out.push(cross(prev, cur)),
            (false, true) => {
                out.push(cross(prev, cur));
                out.push(cur);
            }
            (false, false) => {}
        }
        prev = cur;
    }
    out
}

fn cross_x(a: Coord<f64>, b: Coord<f64>, x: f64) -> Coord<f64> {
    let t = (x - a.x) / (b.x - a.x);
    Coord { x, y: a.y + (b.y - a.y) * t }
}

fn cross_y(a: Coord<f64>, b: Coord<f64>, y: f64) -> Coord<f64> {
    let t = (y - a.y) / (b.y - a.y);
    Coord { x: a.x + (b.x - a.x) * t, y }
}

/// Clip one polygon ring; `None` when less than a triangle remains
pub fn clip_ring(ring: &LineString<f64>, r: &Envelope) -> Option<LineString<f64>> {
    let mut coords = ring.0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }

    coords = clip_ring_edge(&coords, |c| c.x >= r.min_x, |a, b| cross_x(a, b, r.min_x));
    coords = clip_ring_edge(&coords, |c| c.x <= r.max_x, |a, b| cross_x(a, b, r.max_x));
    coords = clip_ring_edge(&coords, |c| c.y >= r.min_y, |a, b| cross_y(a, b, r.min_y));
    coords = clip_ring_edge(&coords, |c| c.y <= r.max_y, |a, b| cross_y(a, b, r.max_y));

    coords.dedup();
    if coords.len() < 3 {
        return None;
    }
    Some(LineString(coords))
}

pub fn clip_polygon(p: &Polygon<f64>, r: &Envelope) -> Option<Polygon<f64>> {
    let exterior = clip_ring(p.exterior(), r)?;
    let interiors = p
        .interiors()
        .iter()
        .filter_map(|ring| clip_ring(ring, r))
        .collect();
    Some(Polygon::new(exterior, interiors))
}

fn lines(pieces: Vec<LineString<f64>>) -> Option<Geometry<f64>> {
    match pieces.len() {
        0 => None,
        1 => pieces.into_iter().next().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(MultiLineString(pieces))),
    }
}

/// Clip any geometry against `r`; `None` when nothing remains
pub fn clip(geometry: &Geometry<f64>, r: &Envelope) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Point(p) => inside(p.0, r).then(|| Geometry::Point(*p)),
        Geometry::MultiPoint(mp) => {
            let kept: Vec<_> = mp.0.iter().filter(|p| inside(p.0, r)).copied().collect();
            (!kept.is_empty()).then(|| Geometry::MultiPoint(MultiPoint(kept)))
        }
        Geometry::Line(l) => lines(clip_line_string(&LineString(vec![l.start, l.end]), r)),
        Geometry::LineString(ls) => lines(clip_line_string(ls, r)),
        Geometry::MultiLineString(mls) => {
            lines(mls.0.iter().flat_map(|ls| clip_line_string(ls, r)).collect())
        }
        Geometry::Polygon(p) => clip_polygon(p, r).map(Geometry::Polygon),
        Geometry::MultiPolygon(mp) => {
            let kept: Vec<_> = mp.0.iter().filter_map(|p| clip_polygon(p, r)).collect();
            (!kept.is_empty()).then(|| Geometry::MultiPolygon(MultiPolygon(kept)))
        }
        Geometry::Rect(rect) => clip_polygon(&rect.to_polygon(), r).map(Geometry::Polygon),
        Geometry::Triangle(t) => clip_polygon(&t.to_polygon(), r).map(Geometry::Polygon),
        Geometry::GeometryCollection(gc) => {
            let kept: Vec<_> = gc.0.iter().filter_map(|g| clip(g, r)).collect();
            (!kept.is_empty()).then(|| Geometry::GeometryCollection(GeometryCollection(kept)))
        }
    }
}
