//! Feature geometry in map coordinates.

use fc_core::{BoundingBox, Coord};

/// One polygon: an exterior ring and zero or more holes. Rings are closed
/// (first vertex repeated last) when they come from a shapefile.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Coord>,
    pub holes: Vec<Vec<Coord>>,
}

impl Polygon {
    pub fn contains(&self, c: Coord) -> bool {
        ring_contains(&self.exterior, c) && !self.holes.iter().any(|h| ring_contains(h, c))
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.exterior).abs()
            - self.holes.iter().map(|h| signed_area(h).abs()).sum::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Null,
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Null => "Null",
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Geometry::Null)
    }

    pub fn coords(&self) -> Vec<&Coord> {
        match self {
            Geometry::Null => Vec::new(),
            Geometry::Point(c) => vec![c],
            Geometry::MultiPoint(cs) | Geometry::LineString(cs) => cs.iter().collect(),
            Geometry::MultiLineString(lines) => lines.iter().flatten().collect(),
            Geometry::Polygon(p) => polygon_coords(p).collect(),
            Geometry::MultiPolygon(ps) => ps.iter().flat_map(polygon_coords).collect(),
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_coords(self.coords())
    }

    /// Hit test. Areas use the even-odd rule; points and lines match within
    /// `tolerance` map units.
    pub fn hit(&self, c: Coord, tolerance: f64) -> bool {
        let tol_sq = tolerance * tolerance;
        match self {
            Geometry::Null => false,
            Geometry::Point(p) => p.distance_sq(&c) <= tol_sq,
            Geometry::MultiPoint(ps) => ps.iter().any(|p| p.distance_sq(&c) <= tol_sq),
            Geometry::LineString(line) => near_line(line, c, tol_sq),
            Geometry::MultiLineString(lines) => lines.iter().any(|l| near_line(l, c, tol_sq)),
            Geometry::Polygon(p) => p.contains(c),
            Geometry::MultiPolygon(ps) => ps.iter().any(|p| p.contains(c)),
        }
    }
}

fn polygon_coords(p: &Polygon) -> impl Iterator<Item = &Coord> {
    p.exterior.iter().chain(p.holes.iter().flatten())
}

/// Shoelace area; positive for counter-clockwise rings.
pub fn signed_area(ring: &[Coord]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

pub fn is_clockwise(ring: &[Coord]) -> bool {
    signed_area(ring) < 0.0
}

/// Even-odd ray cast.
pub fn ring_contains(ring: &[Coord], c: Coord) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > c.y) != (b.y > c.y) {
            let x_cross = a.x + (c.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if c.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn near_line(line: &[Coord], c: Coord, tol_sq: f64) -> bool {
    match line {
        [] => false,
        [only] => only.distance_sq(&c) <= tol_sq,
        _ => line
            .windows(2)
            .any(|seg| segment_distance_sq(seg[0], seg[1], c) <= tol_sq),
    }
}

fn segment_distance_sq(a: Coord, b: Coord, c: Coord) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a.distance_sq(&c);
    }
    let t = (((c.x - a.x) * dx + (c.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Coord::new(a.x + t * dx, a.y + t * dy).distance_sq(&c)
}

/// Group shapefile rings into polygons. Clockwise rings are exteriors;
/// counter-clockwise rings are holes of the exterior that contains them
/// (falling back to the most recent exterior, or promoted to an exterior
/// when none exists yet).
pub fn assemble_polygons(rings: Vec<Vec<Coord>>) -> Vec<Polygon> {
    let mut polygons: Vec<Polygon> = Vec::new();
    for ring in rings {
        if ring.len() < 3 {
            continue;
        }
        if is_clockwise(&ring) || polygons.is_empty() {
            polygons.push(Polygon {
                exterior: ring,
                holes: Vec::new(),
            });
            continue;
        }
        let probe = ring[0];
        let owner = polygons
            .iter()
            .rposition(|p| ring_contains(&p.exterior, probe))
            .unwrap_or(polygons.len() - 1);
        polygons[owner].holes.push(ring);
    }
    polygons
}
