//! The FWHR measurement box.
//!
//! Width runs between the two jaw extremes. The top edge sits on the eyebrows
//! or just above the upper eyelids, and the bottom edge on the upper lip.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::landmarks::{Landmark, LandmarkSet, PixelPoint};

/// Pixels the eyelid line is raised so it sits just above the lid.
pub const EYELID_OFFSET: i32 = 4;

/// Which facial feature defines the top edge of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopReference {
    Eyebrow,
    #[default]
    Eyelid,
}

impl TopReference {
    fn points(self) -> (Landmark, Landmark) {
        match self {
            TopReference::Eyebrow => (Landmark::BrowLeft, Landmark::BrowRight),
            TopReference::Eyelid => (Landmark::EyeLeftUpper, Landmark::EyeRightUpperInner),
        }
    }
}

impl FromStr for TopReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eyebrow" => Ok(TopReference::Eyebrow),
            "eyelid" => Ok(TopReference::Eyelid),
            other => Err(Error::InvalidArgument(format!(
                "invalid top point {:?}, use either \"eyebrow\" or \"eyelid\"",
                other
            ))),
        }
    }
}

impl fmt::Display for TopReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopReference::Eyebrow => f.write_str("eyebrow"),
            TopReference::Eyelid => f.write_str("eyelid"),
        }
    }
}

/// How the left and right reference points are combined into one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMethod {
    Left,
    Right,
    /// Integer mean of both sides; absorbs small head rolls.
    #[default]
    Average,
}

impl CombineMethod {
    /// Parse a method name. Unknown names fall back to [`CombineMethod::Average`].
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "left" => CombineMethod::Left,
            "right" => CombineMethod::Right,
            "average" => CombineMethod::Average,
            other => {
                log::warn!("unknown box method {:?}, falling back to average", other);
                CombineMethod::Average
            }
        }
    }

    fn combine(self, left: i32, right: i32) -> i32 {
        match self {
            CombineMethod::Left => left,
            CombineMethod::Right => right,
            CombineMethod::Average => ((i64::from(left) + i64::from(right)) / 2) as i32,
        }
    }
}

impl FromStr for CombineMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl fmt::Display for CombineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombineMethod::Left => f.write_str("left"),
            CombineMethod::Right => f.write_str("right"),
            CombineMethod::Average => f.write_str("average"),
        }
    }
}

/// Box construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoxOptions {
    pub method: CombineMethod,
    pub top: TopReference,
}

impl BoxOptions {
    pub const fn new(method: CombineMethod, top: TopReference) -> Self {
        Self { method, top }
    }

    /// Parse textual options: `top` strictly, `method` leniently.
    pub fn parse(method: &str, top: &str) -> Result<Self> {
        Ok(Self {
            top: top.parse()?,
            method: CombineMethod::parse_lenient(method),
        })
    }
}

/// Corners of the measurement box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxCorners {
    pub top_left: PixelPoint,
    pub top_right: PixelPoint,
    pub bottom_left: PixelPoint,
    pub bottom_right: PixelPoint,
}

impl BoxCorners {
    pub fn width(&self) -> i64 {
        i64::from(self.top_right.x) - i64::from(self.top_left.x)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.bottom_left.y) - i64::from(self.top_left.y)
    }

    /// Edges as line segments, in drawing order.
    pub fn edges(&self) -> [(PixelPoint, PixelPoint); 4] {
        [
            (self.bottom_left, self.top_left),
            (self.bottom_left, self.bottom_right),
            (self.top_left, self.top_right),
            (self.top_right, self.bottom_right),
        ]
    }
}

/// Compute the measurement box for one face.
pub fn face_box(landmarks: &LandmarkSet, options: &BoxOptions) -> BoxCorners {
    let left_x = landmarks.get(Landmark::JawLeft).x;
    let right_x = landmarks.get(Landmark::JawRight).x;

    let (top_left, top_right) = options.top.points();
    let mut top = options
        .method
        .combine(landmarks.get(top_left).y, landmarks.get(top_right).y);
    let bottom = options.method.combine(
        landmarks.get(Landmark::LipLeft).y,
        landmarks.get(Landmark::LipRight).y,
    );

    if options.top == TopReference::Eyelid {
        top = top.saturating_sub(EYELID_OFFSET);
    }

    BoxCorners {
        top_left: PixelPoint::new(left_x, top),
        top_right: PixelPoint::new(right_x, top),
        bottom_left: PixelPoint::new(left_x, bottom),
        bottom_right: PixelPoint::new(right_x, bottom),
    }
}
