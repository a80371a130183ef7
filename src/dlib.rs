//! Loader for dlib's `shape_predictor` serialization format.
//!
//! Reads both raw `.dat` files and bzip2-compressed `.dat.bz2` files such as
//! `shape_predictor_68_face_landmarks.dat.bz2` from the dlib-models
//! repository:
//!
//! ```bash
//! git clone --depth 1 https://github.com/davisking/dlib-models.git
//! ```
//!
//! Layout, in order: version (1), mean shape column vector, forests
//! (`vector<vector<regression_tree>>`), feature anchor indices per stage and
//! feature offsets per stage.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;

use crate::error::{Error, Result};
use crate::model::{CascadeStage, ShapePredictor};
use crate::tree::{RegressionTree, Split};
use crate::types::{Point, Shape};

/// dlib's variable-length integer and float decoding.
///
/// Integers: a control byte (bit 7 = negative, low nibble = byte count)
/// followed by that many little-endian bytes. Floats: an integer mantissa and
/// an integer exponent, value = mantissa * 2^exponent.
struct DlibReader<R: Read> {
    reader: R,
}

impl<R: Read> DlibReader<R> {
    fn new(reader: R) -> Self {
        Self { reader }
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_int(&mut self) -> Result<i64> {
        let control = self.read_byte()?;
        let negative = control & 0x80 != 0;
        let len = (control & 0x0F) as usize;
        if len > 8 {
            return Err(Error::InvalidModel(format!(
                "integer encoded with {} bytes",
                len
            )));
        }

        let mut value: u64 = 0;
        for i in 0..len {
            value |= u64::from(self.read_byte()?) << (8 * i);
        }

        let value = value as i64;
        Ok(if negative { -value } else { value })
    }

    fn read_len(&mut self) -> Result<usize> {
        let value = self.read_int()?;
        usize::try_from(value)
            .map_err(|_| Error::InvalidModel(format!("expected a length, got {}", value)))
    }

    fn read_float(&mut self) -> Result<f32> {
        let mantissa = self.read_int()?;
        let exponent = self.read_int()?;
        if mantissa == 0 {
            return Ok(0.0);
        }
        let exponent = i32::try_from(exponent)
            .map_err(|_| Error::InvalidModel(format!("float exponent {} out of range", exponent)))?;
        Ok((mantissa as f64 * 2f64.powi(exponent)) as f32)
    }

    /// Column vector of floats. Newer dlib versions store negated dimensions.
    fn read_column(&mut self) -> Result<Vec<f32>> {
        let rows = self.read_int()?.unsigned_abs() as usize;
        let cols = self.read_int()?.unsigned_abs() as usize;
        if cols != 1 {
            return Err(Error::InvalidModel(format!(
                "expected a column vector, got {}x{}",
                rows, cols
            )));
        }
        (0..rows).map(|_| self.read_float()).collect()
    }
}

/// Load a dlib shape predictor from a `.dat` or `.dat.bz2` file.
pub fn load_dlib_model<P: AsRef<Path>>(path: P) -> Result<ShapePredictor> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    log::debug!("parsing dlib model {}", path.display());
    if path.extension().is_some_and(|ext| ext == "bz2") {
        load_dlib_model_from_reader(BzDecoder::new(reader))
    } else {
        load_dlib_model_from_reader(reader)
    }
}

/// Load an uncompressed dlib shape predictor from any reader.
pub fn load_dlib_model_from_reader<R: Read>(reader: R) -> Result<ShapePredictor> {
    let mut r = DlibReader::new(reader);

    let version = r.read_int()?;
    if version != 1 {
        return Err(Error::InvalidModel(format!(
            "unsupported shape_predictor version {}",
            version
        )));
    }

    let mean = r.read_column()?;
    if mean.is_empty() || mean.len() % 2 != 0 {
        return Err(Error::InvalidModel(format!(
            "mean shape has {} values",
            mean.len()
        )));
    }
    let mean_shape = Shape::from_flat(&mean);
    let num_landmarks = mean_shape.num_landmarks();

    let num_stages = r.read_len()?;
    let mut forests = Vec::with_capacity(num_stages);
    for _ in 0..num_stages {
        let num_trees = r.read_len()?;
        let trees = (0..num_trees)
            .map(|_| read_tree(&mut r, num_landmarks))
            .collect::<Result<Vec<_>>>()?;
        forests.push(trees);
    }

    let anchors = read_nested(&mut r, |r| {
        let idx = r.read_len()?;
        u32::try_from(idx).map_err(|_| Error::InvalidModel(format!("anchor index {}", idx)))
    })?;
    let offsets = read_nested(&mut r, |r| Ok(Point::new(r.read_float()?, r.read_float()?)))?;

    if anchors.len() != num_stages || offsets.len() != num_stages {
        return Err(Error::InvalidModel(format!(
            "{} stages but {} anchor lists and {} offset lists",
            num_stages,
            anchors.len(),
            offsets.len()
        )));
    }

    let cascade = forests
        .into_iter()
        .zip(anchors)
        .zip(offsets)
        .map(|((trees, anchors), offsets)| {
            CascadeStage::new(trees, anchors, offsets, num_landmarks)
        })
        .collect::<Result<Vec<_>>>()?;

    let model = ShapePredictor::new(mean_shape, cascade);
    log::debug!(
        "loaded dlib model: {} landmarks, {} stages, {} trees",
        model.num_landmarks(),
        model.num_cascade_stages(),
        model.num_trees()
    );
    Ok(model)
}

fn read_tree<R: Read>(r: &mut DlibReader<R>, num_landmarks: usize) -> Result<RegressionTree> {
    let num_splits = r.read_len()?;
    let mut splits = Vec::with_capacity(num_splits);
    for _ in 0..num_splits {
        let idx1 = r.read_len()?;
        let idx2 = r.read_len()?;
        let threshold = r.read_float()?;
        splits.push(Split {
            idx1: u32::try_from(idx1)
                .map_err(|_| Error::InvalidModel(format!("feature index {}", idx1)))?,
            idx2: u32::try_from(idx2)
                .map_err(|_| Error::InvalidModel(format!("feature index {}", idx2)))?,
            threshold,
        });
    }

    let num_leaves = r.read_len()?;
    let mut leaves = Vec::with_capacity(num_leaves);
    for _ in 0..num_leaves {
        let values = r.read_column()?;
        if values.len() != num_landmarks * 2 {
            return Err(Error::InvalidModel(format!(
                "leaf has {} values, expected {}",
                values.len(),
                num_landmarks * 2
            )));
        }
        leaves.push(Shape::from_flat(&values));
    }

    RegressionTree::new(splits, leaves)
}

/// `vector<vector<T>>`
fn read_nested<R, T, F>(r: &mut DlibReader<R>, mut read_item: F) -> Result<Vec<Vec<T>>>
where
    R: Read,
    F: FnMut(&mut DlibReader<R>) -> Result<T>,
{
    let outer = r.read_len()?;
    let mut result = Vec::with_capacity(outer);
    for _ in 0..outer {
        let inner = r.read_len()?;
        let items = (0..inner)
            .map(|_| read_item(r))
            .collect::<Result<Vec<_>>>()?;
        result.push(items);
    }
    Ok(result)
}
