use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::{find_similarity_transform, sample_feature_pixels, ImageAccess};
use crate::tree::RegressionTree;
use crate::types::{BoundingBox, Point, Shape};

/// One level of the cascade: where to sample pixels and the trees that read them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeStage {
    trees: Vec<RegressionTree>,
    /// Landmark each feature pixel is attached to.
    anchors: Vec<u32>,
    /// Offset of each feature pixel from its anchor, in mean-shape space.
    offsets: Vec<Point>,
}

impl CascadeStage {
    pub fn new(
        trees: Vec<RegressionTree>,
        anchors: Vec<u32>,
        offsets: Vec<Point>,
        num_landmarks: usize,
    ) -> Result<Self> {
        let stage = Self {
            trees,
            anchors,
            offsets,
        };
        stage.validate(num_landmarks)?;
        Ok(stage)
    }

    fn validate(&self, num_landmarks: usize) -> Result<()> {
        if self.anchors.len() != self.offsets.len() {
            return Err(Error::InvalidModel(format!(
                "{} feature anchors but {} offsets",
                self.anchors.len(),
                self.offsets.len()
            )));
        }
        if let Some(bad) = self.anchors.iter().find(|&&a| a as usize >= num_landmarks) {
            return Err(Error::InvalidModel(format!(
                "anchor landmark {} out of range for {} landmarks",
                bad, num_landmarks
            )));
        }
        for tree in &self.trees {
            tree.validate(self.anchors.len(), num_landmarks)?;
        }
        Ok(())
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Ensemble-of-regression-trees facial landmark predictor.
///
/// Shapes live in normalized face-box coordinates. Each stage samples pixels
/// relative to the current estimate, then every tree in the stage adds its
/// leaf delta to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapePredictor {
    mean_shape: Shape,
    cascade: Vec<CascadeStage>,
}

impl ShapePredictor {
    pub fn new(mean_shape: Shape, cascade: Vec<CascadeStage>) -> Self {
        Self {
            mean_shape,
            cascade,
        }
    }

    /// Open a model, picking the format from the file name.
    ///
    /// `.dat` and `.dat.bz2` are dlib models, anything else is a bincode cache
    /// written by [`ShapePredictor::save`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".dat") || name.ends_with(".dat.bz2") {
            crate::dlib::load_dlib_model(path)
        } else {
            Self::load(path)
        }
    }

    /// Load a bincode model cache.
    ///
    /// The cache is checked the same way a freshly parsed dlib model is.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let model: Self = bincode::deserialize(&bytes)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let num_landmarks = self.num_landmarks();
        if num_landmarks == 0 {
            return Err(Error::InvalidModel("mean shape has no points".to_string()));
        }
        for stage in &self.cascade {
            stage.validate(num_landmarks)?;
        }
        Ok(())
    }

    /// Write the model as a bincode cache; parsing it back is much faster
    /// than decompressing and decoding a dlib file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        let bytes = bincode::serialize(self)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    pub fn num_landmarks(&self) -> usize {
        self.mean_shape.num_landmarks()
    }

    pub fn num_cascade_stages(&self) -> usize {
        self.cascade.len()
    }

    /// Trees across all stages.
    pub fn num_trees(&self) -> usize {
        self.cascade.iter().map(CascadeStage::num_trees).sum()
    }

    /// Predict landmark positions, in image pixels, for the face in `face_rect`.
    pub fn predict<I: ImageAccess>(&self, image: &I, face_rect: &BoundingBox) -> Shape {
        let mut current = self.mean_shape.clone();

        for stage in &self.cascade {
            let tform = find_similarity_transform(&self.mean_shape, &current);
            let pixels = sample_feature_pixels(
                image,
                face_rect,
                &current,
                &tform,
                &stage.anchors,
                &stage.offsets,
            );
            for tree in &stage.trees {
                current.add_delta(tree.evaluate(&pixels));
            }
        }

        Shape::new(
            current
                .points
                .into_iter()
                .map(|p| face_rect.denormalize_point(p))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Split;

    fn mean_shape() -> Shape {
        Shape::new(vec![
            Point::new(0.25, 0.25),
            Point::new(0.75, 0.25),
            Point::new(0.50, 0.75),
        ])
    }

    /// One stage that shifts every point right when the first anchor sits on
    /// a bright pixel and left otherwise.
    fn brightness_model() -> ShapePredictor {
        let right = Shape::new(vec![Point::new(0.1, 0.0); 3]);
        let left = Shape::new(vec![Point::new(-0.1, 0.0); 3]);
        let tree = RegressionTree::new(
            vec![Split {
                idx1: 0,
                idx2: 1,
                threshold: 100.0,
            }],
            vec![right, left],
        )
        .unwrap();
        let stage = CascadeStage::new(
            vec![tree],
            vec![0, 1],
            vec![Point::zero(), Point::new(10.0, 10.0)],
            3,
        )
        .unwrap();
        ShapePredictor::new(mean_shape(), vec![stage])
    }

    #[test]
    fn predict_maps_into_face_rect() {
        let model = ShapePredictor::new(mean_shape(), Vec::new());
        let image = image::GrayImage::new(100, 100);
        let rect = BoundingBox::new(20.0, 10.0, 40.0, 80.0);

        let shape = model.predict(&image, &rect);
        assert_eq!(shape.num_landmarks(), 3);
        assert_eq!(shape[0], Point::new(30.0, 30.0));
        assert_eq!(shape[2], Point::new(40.0, 70.0));
    }

    #[test]
    fn predict_applies_leaf_for_sampled_pixels() {
        let model = brightness_model();
        let rect = BoundingBox::new(0.0, 0.0, 100.0, 100.0);

        // The second feature lands outside the image and reads zero.
        let bright = image::GrayImage::from_pixel(100, 100, image::Luma([200]));
        let shape = model.predict(&bright, &rect);
        assert!((shape[0].x - 35.0).abs() < 1e-3);

        let dark = image::GrayImage::from_pixel(100, 100, image::Luma([50]));
        let shape = model.predict(&dark, &rect);
        assert!((shape[0].x - 15.0).abs() < 1e-3);
    }

    #[test]
    fn stage_validation() {
        let tree = RegressionTree::new(
            vec![Split {
                idx1: 0,
                idx2: 5,
                threshold: 0.0,
            }],
            vec![Shape::zeros(3), Shape::zeros(3)],
        )
        .unwrap();
        assert!(CascadeStage::new(vec![tree], vec![0, 1], vec![Point::zero(); 2], 3).is_err());
        assert!(CascadeStage::new(Vec::new(), vec![7], vec![Point::zero()], 3).is_err());
        assert!(CascadeStage::new(Vec::new(), vec![0, 1], vec![Point::zero()], 3).is_err());
    }

    #[test]
    fn save_and_load_cache() {
        let model = brightness_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictor.bin");

        model.save(&path).unwrap();
        let loaded = ShapePredictor::open(&path).unwrap();

        assert_eq!(loaded.num_landmarks(), 3);
        assert_eq!(loaded.num_cascade_stages(), 1);
        assert_eq!(loaded.num_trees(), 1);

        let image = image::GrayImage::from_pixel(100, 100, image::Luma([200]));
        let rect = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(model.predict(&image, &rect), loaded.predict(&image, &rect));
    }

    #[test]
    fn corrupt_cache_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.bin");

        let mut model = brightness_model();
        model.cascade[0].anchors[1] = 9;
        model.save(&path).unwrap();
        assert!(matches!(
            ShapePredictor::load(&path),
            Err(Error::InvalidModel(_))
        ));

        let mut model = brightness_model();
        model.cascade[0].offsets.pop();
        model.save(&path).unwrap();
        assert!(ShapePredictor::open(&path).is_err());

        std::fs::write(&path, b"not a model").unwrap();
        assert!(ShapePredictor::load(&path).is_err());
    }
}
