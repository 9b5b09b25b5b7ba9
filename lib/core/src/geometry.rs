//! Planar polygon geometry
//!
//! Just enough geometry for occurrence association: bounding boxes and
//! area-weighted centroids of polygons and multipolygons. Coordinates are
//! treated as a flat plane (`x` = longitude, `y` = latitude); no geodesic
//! correction is applied anywhere.

/// A planar coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box, inclusive on all four sides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Inclusive containment test for a longitude/latitude pair
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    fn extend(&mut self, c: Coord) {
        self.min_x = self.min_x.min(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_x = self.max_x.max(c.x);
        self.max_y = self.max_y.max(c.y);
    }
}

/// A polygon: one exterior ring and any number of holes.
/// Rings may be given closed (first == last) or open.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Coord>,
    pub holes: Vec<Vec<Coord>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Coord>, holes: Vec<Vec<Coord>>) -> Self {
        Self { exterior, holes }
    }

    /// Axis-aligned rectangle, handy for fixtures
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(
            vec![
                Coord::new(min_x, min_y),
                Coord::new(max_x, min_y),
                Coord::new(max_x, max_y),
                Coord::new(min_x, max_y),
                Coord::new(min_x, min_y),
            ],
            Vec::new(),
        )
    }

    /// Area and area-weighted centroid sums `(area, area * cx, area * cy)`
    fn moments(&self) -> (f64, f64, f64) {
        let (area, cx, cy) = ring_moments(&self.exterior);
        let mut total = (area, area * cx, area * cy);
        for hole in &self.holes {
            let (a, hx, hy) = ring_moments(hole);
            total.0 -= a;
            total.1 -= a * hx;
            total.2 -= a * hy;
        }
        total
    }
}

/// Surface geometry of a soil polygon
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    fn polygons(&self) -> &[Polygon] {
        match self {
            Geometry::Polygon(p) => std::slice::from_ref(p),
            Geometry::MultiPolygon(ps) => ps,
        }
    }

    fn exterior_coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.polygons().iter().flat_map(|p| p.exterior.iter().copied())
    }

    /// Valid geometry has at least one exterior vertex and only finite coordinates
    pub fn is_valid(&self) -> bool {
        let mut any = false;
        for p in self.polygons() {
            for c in p.exterior.iter().chain(p.holes.iter().flatten()) {
                if !c.is_finite() {
                    return false;
                }
                any = true;
            }
        }
        any
    }

    /// Bounding box of all exterior rings, `None` for invalid geometry
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        if !self.is_valid() {
            return None;
        }
        let mut coords = self.exterior_coords();
        let first = coords.next()?;
        let mut bbox = BoundingBox::new(first.x, first.y, first.x, first.y);
        for c in coords {
            bbox.extend(c);
        }
        Some(bbox)
    }

    /// Area-weighted centroid. Degenerate (zero-area) shapes fall back to
    /// the mean of their exterior vertices.
    pub fn centroid(&self) -> Option<Coord> {
        if !self.is_valid() {
            return None;
        }
        let (area, sx, sy) = self
            .polygons()
            .iter()
            .map(Polygon::moments)
            .fold((0.0, 0.0, 0.0), |acc, m| (acc.0 + m.0, acc.1 + m.1, acc.2 + m.2));

        if area.abs() > f64::EPSILON {
            return Some(Coord::new(sx / area, sy / area));
        }

        let (n, tx, ty) = self
            .exterior_coords()
            .fold((0usize, 0.0, 0.0), |acc, c| (acc.0 + 1, acc.1 + c.x, acc.2 + c.y));
        (n > 0).then(|| Coord::new(tx / n as f64, ty / n as f64))
    }
}

/// Unsigned area and centroid of a single ring (shoelace formula)
fn ring_moments(ring: &[Coord]) -> (f64, f64, f64) {
    if ring.len() < 3 {
        return (0.0, 0.0, 0.0);
    }
    let mut signed = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        let cross = a.x * b.y - b.x * a.y;
        signed += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    if signed == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let area = signed / 2.0;
    (area.abs(), cx / (6.0 * area), cy / (6.0 * area))
}
