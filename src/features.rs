use crate::types::{BoundingBox, Point, Shape};

/// Grayscale pixel access for the shape predictor.
pub trait ImageAccess {
    /// Intensity at (x, y), or `None` outside the image.
    fn intensity(&self, x: i32, y: i32) -> Option<u8>;
}

impl ImageAccess for image::GrayImage {
    fn intensity(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 {
            return None;
        }
        self.get_pixel_checked(x as u32, y as u32).map(|p| p.0[0])
    }
}

/// Linear part of a 2D similarity transform: rotation plus uniform scale.
///
/// ```text
/// | a  -b |
/// | b   a |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform2D {
    pub a: f32,
    pub b: f32,
}

impl SimilarityTransform2D {
    pub const IDENTITY: Self = Self { a: 1.0, b: 0.0 };

    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.a * p.x - self.b * p.y, self.b * p.x + self.a * p.y)
    }

    pub fn scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }
}

/// Least-squares similarity mapping `from` onto `to`, translation dropped.
///
/// Both shapes are centered on their centroids first. Falls back to the
/// identity when `from` has no spread.
pub fn find_similarity_transform(from: &Shape, to: &Shape) -> SimilarityTransform2D {
    debug_assert_eq!(from.num_landmarks(), to.num_landmarks());

    let from_center = from.centroid();
    let to_center = to.centroid();

    let mut dot = 0.0f32;
    let mut cross = 0.0f32;
    let mut norm = 0.0f32;
    for (f, t) in from.points.iter().zip(to.points.iter()) {
        let f = *f - from_center;
        let t = *t - to_center;
        dot += f.x * t.x + f.y * t.y;
        cross += f.x * t.y - f.y * t.x;
        norm += f.x * f.x + f.y * f.y;
    }

    if norm <= f32::EPSILON {
        return SimilarityTransform2D::IDENTITY;
    }

    SimilarityTransform2D {
        a: dot / norm,
        b: cross / norm,
    }
}

/// Sample the feature pixels of one cascade stage.
///
/// Each feature sits at `offset` (rotated and scaled like the current shape)
/// from its anchor landmark. Pixels outside the image read as zero.
pub fn sample_feature_pixels<I: ImageAccess>(
    image: &I,
    face_rect: &BoundingBox,
    current: &Shape,
    tform: &SimilarityTransform2D,
    anchors: &[u32],
    offsets: &[Point],
) -> Vec<f32> {
    anchors
        .iter()
        .zip(offsets.iter())
        .map(|(&anchor, &offset)| {
            let normalized = tform.apply(offset) + current[anchor as usize];
            let p = face_rect.denormalize_point(normalized);
            image
                .intensity(p.x.round() as i32, p.y.round() as i32)
                .map_or(0.0, f32::from)
        })
        .collect()
}
