//! Named facial landmarks and the validated landmark set.
//!
//! The measurement code never indexes raw point sequences. It asks a
//! [`LandmarkSet`] for a [`Landmark`], and a [`LandmarkLayout`] decides which
//! index of the detector's output that landmark lives at. The only layout
//! shipped is [`Ibug68`], the 68-point annotation used by dlib's models.
//!
//! "Left" and "right" always refer to the side of the image, not the
//! subject's own left and right.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Shape;

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for PixelPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Landmarks read by the geometry extractor and the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landmark {
    /// Outermost jaw point on the left edge of the face.
    JawLeft,
    /// Outermost jaw point on the right edge of the face.
    JawRight,
    /// Left eyebrow reference point.
    BrowLeft,
    /// Right eyebrow reference point.
    BrowRight,
    /// Outer corner of the left eye.
    EyeLeftOuter,
    /// Upper lid of the left eye.
    EyeLeftUpper,
    /// Lower lid of the left eye.
    EyeLeftLower,
    /// Upper lid of the right eye, inner half.
    EyeRightUpperInner,
    /// Upper lid of the right eye, outer half.
    EyeRightUpperOuter,
    /// Outer corner of the right eye.
    EyeRightOuter,
    /// Lower lid of the right eye.
    EyeRightLower,
    /// Top of the nose bridge.
    NoseBridge,
    /// Tip of the nose.
    NoseTip,
    /// Upper lip, left reference point.
    LipLeft,
    /// Upper lip, right reference point.
    LipRight,
}

impl Landmark {
    pub const COUNT: usize = 15;

    pub const ALL: [Landmark; Landmark::COUNT] = [
        Landmark::JawLeft,
        Landmark::JawRight,
        Landmark::BrowLeft,
        Landmark::BrowRight,
        Landmark::EyeLeftOuter,
        Landmark::EyeLeftUpper,
        Landmark::EyeLeftLower,
        Landmark::EyeRightUpperInner,
        Landmark::EyeRightUpperOuter,
        Landmark::EyeRightOuter,
        Landmark::EyeRightLower,
        Landmark::NoseBridge,
        Landmark::NoseTip,
        Landmark::LipLeft,
        Landmark::LipRight,
    ];

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Maps named landmarks onto a detector's point numbering.
pub trait LandmarkLayout {
    /// Number of points the detector emits per face.
    fn num_points(&self) -> usize;

    /// Index of `landmark` in the detector's point sequence.
    fn index_of(&self, landmark: Landmark) -> usize;
}

/// The iBUG 300-W 68-point layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ibug68;

impl LandmarkLayout for Ibug68 {
    fn num_points(&self) -> usize {
        68
    }

    fn index_of(&self, landmark: Landmark) -> usize {
        match landmark {
            Landmark::JawLeft => 0,
            Landmark::JawRight => 16,
            Landmark::BrowLeft => 18,
            Landmark::BrowRight => 25,
            Landmark::NoseBridge => 27,
            Landmark::NoseTip => 30,
            Landmark::EyeLeftOuter => 36,
            Landmark::EyeLeftUpper => 37,
            Landmark::EyeLeftLower => 41,
            Landmark::EyeRightUpperInner => 43,
            Landmark::EyeRightUpperOuter => 44,
            Landmark::EyeRightOuter => 45,
            Landmark::EyeRightLower => 46,
            Landmark::LipLeft => 50,
            Landmark::LipRight => 52,
        }
    }
}

/// The landmark points of one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PixelPoint>", into = "Vec<PixelPoint>")]
pub struct LandmarkSet {
    points: Vec<PixelPoint>,
    named: [PixelPoint; Landmark::COUNT],
}

impl LandmarkSet {
    /// Build a set from 68 points in iBUG order.
    pub fn new(points: Vec<PixelPoint>) -> Result<Self> {
        Self::with_layout(points, &Ibug68)
    }

    /// Build a set from a detector whose numbering is described by `layout`.
    pub fn with_layout(points: Vec<PixelPoint>, layout: &dyn LandmarkLayout) -> Result<Self> {
        let expected = layout.num_points();
        if points.len() != expected {
            return Err(Error::InvalidLandmarks {
                expected,
                found: points.len(),
            });
        }

        let mut named = [PixelPoint::default(); Landmark::COUNT];
        for (slot, landmark) in named.iter_mut().zip(Landmark::ALL) {
            let idx = layout.index_of(landmark);
            *slot = *points.get(idx).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "layout maps {:?} to index {} but only {} points exist",
                    landmark, idx, expected
                ))
            })?;
        }

        Ok(Self { points, named })
    }

    /// Round a predicted shape to pixel coordinates.
    pub fn from_shape(shape: &Shape) -> Result<Self> {
        let points = shape
            .points
            .iter()
            .map(|p| PixelPoint::new(p.x.round() as i32, p.y.round() as i32))
            .collect();
        Self::new(points)
    }

    pub fn get(&self, landmark: Landmark) -> PixelPoint {
        self.named[landmark.slot()]
    }

    /// All raw points in detector order.
    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<Vec<PixelPoint>> for LandmarkSet {
    type Error = Error;

    fn try_from(points: Vec<PixelPoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<PixelPoint> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}
