use nannou::geom::Rect;
use nannou::glam::Vec2;

/// A convex polygon where every edge remembers which constraint produced it. Edge `i` runs
/// from `points[i]` to `points[i + 1]` (wrapping) and was cut by `labels[i]`, or `None` if
/// it lies on the original bounding rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPolygon {
    pub points: Vec<Vec2>,
    pub labels: Vec<Option<usize>>,
}

impl LabeledPolygon {
    /// The counter-clockwise polygon of a rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        let points = vec![
            Vec2::new(rect.left(), rect.bottom()),
            Vec2::new(rect.right(), rect.bottom()),
            Vec2::new(rect.right(), rect.top()),
            Vec2::new(rect.left(), rect.top()),
        ];

        Self {
            points,
            labels: vec![None; 4],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.len() < 3
    }

    /// Keep the part of the polygon that is at least as close to [site] as to [other],
    /// labelling any new edge with [label].
    pub fn clip_bisector(&mut self, site: Vec2, other: Vec2, label: usize) {
        let normal = other - site;
        let middle = (site + other) * 0.5;

        // Signed distance (scaled) from the bisector; <= 0 is on the site's side.
        let side = |p: Vec2| (p - middle).dot(normal);

        let n = self.points.len();

        let mut points = Vec::with_capacity(n + 1);
        let mut labels = Vec::with_capacity(n + 1);

        for i in 0..n {
            let curr = self.points[i];
            let next = self.points[(i + 1) % n];
            let edge = self.labels[i];

            let dc = side(curr);
            let dn = side(next);

            let curr_inside = dc <= 0.0;
            let next_inside = dn <= 0.0;

            if curr_inside {
                points.push(curr);
                labels.push(edge);
            }

            if curr_inside != next_inside {
                let t = dc / (dc - dn);
                points.push(curr.lerp(next, t));

                // Leaving the half plane starts an edge along the bisector; entering it
                // resumes the original edge.
                labels.push(if curr_inside { Some(label) } else { edge });
            }
        }

        self.points = points;
        self.labels = labels;
    }

    /// Merge consecutive vertices closer than [epsilon], keeping the label of the edge
    /// that survives.
    pub fn remove_degenerate_edges(&mut self, epsilon: f32) {
        let eps2 = epsilon * epsilon;

        let mut points: Vec<Vec2> = Vec::with_capacity(self.points.len());
        let mut labels: Vec<Option<usize>> = Vec::with_capacity(self.labels.len());

        for (p, label) in self.points.iter().cloned().zip(self.labels.iter().cloned()) {
            match points.last() {
                Some(last) if last.distance_squared(p) <= eps2 => {
                    if let Some(l) = labels.last_mut() {
                        *l = label;
                    }
                }
                _ => {
                    points.push(p);
                    labels.push(label);
                }
            }
        }

        // The closing edge runs from the last vertex back to the first one.
        while points.len() > 1 {
            let first = points[0];
            let last = points[points.len() - 1];

            if first.distance_squared(last) > eps2 {
                break;
            }

            points.pop();
            labels.pop();
        }

        self.points = points;
        self.labels = labels;
    }

    /// Iterate over the non-boundary edge labels of the polygon.
    pub fn neighbors(&self) -> impl Iterator<Item = usize> + '_ {
        self.labels.iter().filter_map(|l| *l)
    }
}

/// Signed area of a polygon; positive for counter-clockwise winding.
pub fn polygon_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    let mut sum = 0.0;

    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }

    sum * 0.5
}

/// Area-weighted centroid of a polygon. Returns None for polygons without area.
pub fn polygon_centroid(points: &[Vec2]) -> Option<Vec2> {
    if points.len() < 3 {
        return None;
    }

    // Translate to the first vertex to keep the products small.
    let origin = points[0];

    let n = points.len();
    let mut area = 0.0;
    let mut sum = Vec2::ZERO;

    for i in 0..n {
        let a = points[i] - origin;
        let b = points[(i + 1) % n] - origin;
        let cross = a.x * b.y - b.x * a.y;

        area += cross;
        sum += (a + b) * cross;
    }

    if area.abs() <= f32::EPSILON {
        return None;
    }

    let centroid = origin + sum / (3.0 * area);

    if centroid.is_finite() {
        Some(centroid)
    } else {
        None
    }
}
