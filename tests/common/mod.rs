//! Scripted landmark detection for tests that must not depend on model files.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use fwhr::{LandmarkDetector, LandmarkSet, PixelPoint, Result};
use image::{DynamicImage, GenericImageView, RgbImage};

/// Frontal face 200 px wide whose eyelid box is `height` rows tall, so the
/// ratio is `200 / height`.
pub fn frontal_face(height: i32) -> LandmarkSet {
    let mut points = vec![PixelPoint::new(100, 100); 68];
    points[0] = PixelPoint::new(0, 100);
    points[16] = PixelPoint::new(200, 100);
    for p in &mut points[17..27] {
        p.y = 60;
    }
    for p in &mut points[36..48] {
        p.y = 74;
    }
    points[50].y = 70 + height;
    points[52].y = 70 + height;
    LandmarkSet::new(points).unwrap()
}

/// A face looking sideways: the nose tip sits 5 units off the bridge.
pub fn turned_face() -> LandmarkSet {
    let mut points = frontal_face(100).points().to_vec();
    points[30].x = 110;
    LandmarkSet::new(points).unwrap()
}

/// Detector keyed on image width, so test images can be told apart after a
/// round trip through a file. Unknown widths have no face.
#[derive(Default)]
pub struct ScriptedDetector {
    faces: HashMap<u32, LandmarkSet>,
    pub calls: usize,
}

impl ScriptedDetector {
    pub fn with_face(mut self, width: u32, face: LandmarkSet) -> Self {
        self.faces.insert(width, face);
        self
    }
}

impl LandmarkDetector for ScriptedDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<LandmarkSet>> {
        self.calls += 1;
        let (width, _) = image.dimensions();
        Ok(self.faces.get(&width).cloned().into_iter().collect())
    }
}

/// Save a blank picture `width` pixels wide; the format follows `name`.
pub fn write_image(dir: &Path, name: &str, width: u32) {
    RgbImage::new(width, 8).save(dir.join(name)).unwrap();
}
