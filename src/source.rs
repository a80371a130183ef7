use std::fmt;
use std::path::PathBuf;

use image::DynamicImage;

use crate::error::{Error, Result};

const URL_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Url(String),
}

impl ImageSource {
    /// `http://` and `https://` inputs are URLs, everything else a path.
    pub fn parse(input: &str) -> Result<Self> {
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::url(input)
        } else {
            Ok(ImageSource::Path(PathBuf::from(input)))
        }
    }

    /// A remote image. Only JPEG and PNG URLs are accepted.
    pub fn url(url: &str) -> Result<Self> {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !URL_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return Err(Error::InvalidArgument(format!(
                "unknown image type for {}, use a .jpg or .png URL",
                url
            )));
        }
        Ok(ImageSource::Url(url.to_string()))
    }

    /// Read and decode the image. Remote images are fetched into memory.
    pub fn load(&self) -> Result<DynamicImage> {
        match self {
            ImageSource::Path(path) => {
                log::debug!("loading {}", path.display());
                Ok(image::open(path)?)
            }
            ImageSource::Url(url) => {
                log::debug!("fetching {}", url);
                let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
                Ok(image::load_from_memory(&bytes)?)
            }
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => write!(f, "{}", path.display()),
            ImageSource::Url(url) => f.write_str(url),
        }
    }
}
