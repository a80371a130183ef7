use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
///
/// Used by the shape predictor, which works in normalized face-box space
/// before mapping back to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Face rectangle reported by the face detector, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Map a point from normalized [0,1] box coordinates to image coordinates.
    pub fn denormalize_point(&self, p: Point) -> Point {
        Point::new(self.x + p.x * self.width, self.y + p.y * self.height)
    }
}

impl From<&rustface::Rectangle> for BoundingBox {
    fn from(rect: &rustface::Rectangle) -> Self {
        Self::new(
            rect.x() as f32,
            rect.y() as f32,
            rect.width() as f32,
            rect.height() as f32,
        )
    }
}

/// Landmark positions as produced by the shape predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub points: Vec<Point>,
}

impl Shape {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn zeros(n: usize) -> Self {
        Self {
            points: vec![Point::zero(); n],
        }
    }

    pub fn num_landmarks(&self) -> usize {
        self.points.len()
    }

    /// Add a leaf delta to this shape, point by point.
    pub fn add_delta(&mut self, delta: &Shape) {
        debug_assert_eq!(self.points.len(), delta.points.len());
        for (p, d) in self.points.iter_mut().zip(delta.points.iter()) {
            *p += *d;
        }
    }

    /// Build a shape from dlib's column layout `[x0, y0, x1, y1, ...]`.
    pub fn from_flat(values: &[f32]) -> Self {
        debug_assert!(values.len() % 2 == 0);
        Self {
            points: values
                .chunks_exact(2)
                .map(|chunk| Point::new(chunk[0], chunk[1]))
                .collect(),
        }
    }

    /// Arithmetic mean of all points.
    pub fn centroid(&self) -> Point {
        if self.points.is_empty() {
            return Point::zero();
        }
        let n = self.points.len() as f32;
        let sum = self
            .points
            .iter()
            .fold(Point::zero(), |acc, p| acc + *p);
        Point::new(sum.x / n, sum.y / n)
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, 4.0);

        let sum = a + b;
        assert_eq!(sum, Point::new(4.0, 6.0));

        let diff = b - a;
        assert_eq!(diff, Point::new(2.0, 2.0));
    }

    #[test]
    fn denormalize_maps_unit_square_onto_box() {
        let bbox = BoundingBox::new(100.0, 50.0, 200.0, 80.0);

        assert_eq!(bbox.denormalize_point(Point::new(0.0, 0.0)), Point::new(100.0, 50.0));
        assert_eq!(bbox.denormalize_point(Point::new(1.0, 1.0)), Point::new(300.0, 130.0));
        assert_eq!(bbox.denormalize_point(Point::new(0.5, 0.5)), Point::new(200.0, 90.0));
    }

    #[test]
    fn shape_delta_and_centroid() {
        let mut shape = Shape::from_flat(&[0.0, 0.0, 2.0, 2.0]);
        shape.add_delta(&Shape::from_flat(&[0.5, 0.25, 0.5, 0.25]));

        assert!((shape[0].x - 0.5).abs() < 1e-6);
        assert!((shape[1].y - 2.25).abs() < 1e-6);

        let c = shape.centroid();
        assert!((c.x - 1.5).abs() < 1e-6);
        assert!((c.y - 1.25).abs() < 1e-6);
    }
}
