//! HTTP endpoint measuring pictures by URL.
//!
//! `GET /calculatefwhr?url=<image url>` answers with
//! `{"fhwr_ratio": <ratio>, "image_base64": "data:image/jpeg;base64,..."}`,
//! the picture with the measurement box drawn on it. Every rejection is a 404
//! carrying `{"message": ...}`. Passing `test_service.jpg` as the URL is a
//! health check and answers `true`.
//!
//! Requests are served one at a time on the calling thread.

use base64::Engine;
use image::DynamicImage;
use serde::Serialize;
use tiny_http::{Header, Method, Response, Server};

use crate::annotate::encode_jpeg;
use crate::detector::LandmarkDetector;
use crate::error::{Error, Result};
use crate::estimator::FwhrEstimator;
use crate::geometry::BoxOptions;
use crate::source::ImageSource;

pub const ENDPOINT: &str = "/calculatefwhr";
pub const HEALTH_CHECK_URL: &str = "test_service.jpg";

/// Successful measurement. The ratio key keeps the historical spelling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FwhrResponse {
    #[serde(rename = "fhwr_ratio")]
    pub ratio: f64,
    pub image_base64: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoUrl,
    InvalidFiletype,
    NotSuitable,
    CalculationFailed,
}

impl Rejection {
    pub fn message(self) -> &'static str {
        match self {
            Rejection::NoUrl => "No valid URL provided.",
            Rejection::InvalidFiletype => "Not a valid filetype, use either jpg or png.",
            Rejection::NotSuitable => "Picture not suitable for FWHR calculation.",
            Rejection::CalculationFailed => "Calculation failed for unknown reasons.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Healthy,
    Measured(FwhrResponse),
    Rejected(Rejection),
    NotFound,
    MethodNotAllowed,
}

impl Reply {
    pub fn status(&self) -> u16 {
        match self {
            Reply::Healthy | Reply::Measured(_) => 200,
            Reply::Rejected(_) | Reply::NotFound => 404,
            Reply::MethodNotAllowed => 405,
        }
    }

    /// JSON body of the reply.
    pub fn body(&self) -> Result<String> {
        let body = match self {
            Reply::Healthy => serde_json::Value::Bool(true),
            Reply::Measured(response) => serde_json::to_value(response)?,
            Reply::Rejected(rejection) => serde_json::json!({ "message": rejection.message() }),
            Reply::NotFound => serde_json::json!({
                "message": "The requested URL was not found on the server."
            }),
            Reply::MethodNotAllowed => serde_json::json!({
                "message": "The method is not allowed for the requested URL."
            }),
        };
        Ok(serde_json::to_string(&body)?)
    }
}

/// The `url` query parameter of a request target, percent-decoded.
///
/// `None` when the target is not the measurement endpoint.
pub fn query_url(target: &str) -> Option<Option<String>> {
    let url = reqwest::Url::parse("http://localhost")
        .and_then(|base| base.join(target))
        .ok()?;
    if url.path() != ENDPOINT {
        return None;
    }
    Some(
        url.query_pairs()
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned()),
    )
}

/// Serves [`ENDPOINT`] with one estimator. Boxes use the default options.
pub struct FwhrService<D> {
    estimator: FwhrEstimator<D>,
    options: BoxOptions,
}

impl<D: LandmarkDetector> FwhrService<D> {
    pub fn new(estimator: FwhrEstimator<D>) -> Self {
        Self {
            estimator,
            options: BoxOptions::default(),
        }
    }

    /// Answer one request given its method and target (`/path?query`).
    pub fn handle(&mut self, method: &Method, target: &str) -> Reply {
        if *method != Method::Get {
            return Reply::MethodNotAllowed;
        }
        match query_url(target) {
            Some(url) => self.calculate(url.as_deref()),
            None => Reply::NotFound,
        }
    }

    /// Fetch and measure the picture at `url`.
    pub fn calculate(&mut self, url: Option<&str>) -> Reply {
        let url = match url {
            None => return Reply::Rejected(Rejection::NoUrl),
            Some(HEALTH_CHECK_URL) => return Reply::Healthy,
            Some(url) => url,
        };

        let source = match ImageSource::url(url) {
            Ok(source) => source,
            Err(e) => {
                log::info!("rejected {}: {}", url, e);
                return Reply::Rejected(Rejection::InvalidFiletype);
            }
        };
        match source.load() {
            Ok(image) => self.measure(&image, url),
            Err(e) => {
                log::warn!("failed to fetch {}: {}", url, e);
                Reply::Rejected(Rejection::CalculationFailed)
            }
        }
    }

    /// Measure an already decoded picture.
    pub fn measure(&mut self, image: &DynamicImage, label: &str) -> Reply {
        let estimate = match self.estimator.estimate_image(image, label, &self.options) {
            Ok(estimate) => estimate,
            Err(e) => {
                log::warn!("calculation failed for {}: {}", label, e);
                return Reply::Rejected(Rejection::CalculationFailed);
            }
        };

        let (Some(ratio), Some(corners)) = (estimate.ratio, estimate.corners) else {
            return Reply::Rejected(Rejection::NotSuitable);
        };

        match encode_jpeg(image, &corners) {
            Ok(bytes) => Reply::Measured(FwhrResponse {
                ratio,
                image_base64: format!(
                    "data:image/jpeg;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(bytes)
                ),
            }),
            Err(e) => {
                log::warn!("failed to encode {}: {}", label, e);
                Reply::Rejected(Rejection::CalculationFailed)
            }
        }
    }

    /// Listen on `addr` and answer requests until the process stops.
    pub fn serve(mut self, addr: &str) -> Result<()> {
        let server = Server::http(addr)
            .map_err(|e| Error::Service(format!("failed to listen on {}: {}", addr, e)))?;
        log::info!("serving {} on http://{}", ENDPOINT, addr);

        for request in server.incoming_requests() {
            let reply = self.handle(request.method(), request.url());
            log::info!(
                "{} {} -> {}",
                request.method(),
                request.url(),
                reply.status()
            );

            let mut response =
                Response::from_string(reply.body()?).with_status_code(reply.status());
            for (field, value) in [
                ("Content-Type", "application/json"),
                ("Access-Control-Allow-Origin", "*"),
            ] {
                if let Ok(header) = Header::from_bytes(field.as_bytes(), value.as_bytes()) {
                    response.add_header(header);
                }
            }

            if let Err(e) = request.respond(response) {
                log::warn!("failed to send response: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{LandmarkSet, PixelPoint};
    use image::{GenericImageView, RgbImage};

    #[derive(Default)]
    struct Scripted {
        faces: Vec<LandmarkSet>,
        calls: usize,
    }

    impl LandmarkDetector for Scripted {
        fn detect(&mut self, _image: &DynamicImage) -> Result<Vec<LandmarkSet>> {
            self.calls += 1;
            Ok(self.faces.clone())
        }
    }

    /// Frontal face 200 px wide with a 100 px tall box.
    fn frontal() -> Vec<PixelPoint> {
        let mut points = vec![PixelPoint::new(100, 100); 68];
        points[0] = PixelPoint::new(0, 100);
        points[16] = PixelPoint::new(200, 100);
        for p in &mut points[36..48] {
            p.y = 74;
        }
        points[50].y = 170;
        points[52].y = 170;
        points
    }

    fn service(faces: Vec<Vec<PixelPoint>>) -> FwhrService<Scripted> {
        let faces = faces
            .into_iter()
            .map(|p| LandmarkSet::new(p).unwrap())
            .collect();
        FwhrService::new(FwhrEstimator::new(Scripted { faces, calls: 0 }))
    }

    fn picture() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(220, 200))
    }

    fn message(reply: &Reply) -> String {
        let body: serde_json::Value = serde_json::from_str(&reply.body().unwrap()).unwrap();
        body["message"].as_str().unwrap().to_string()
    }

    #[test]
    fn measured_reply_carries_ratio_and_jpeg_data_url() {
        let reply = service(vec![frontal()]).measure(&picture(), "face.jpg");
        assert_eq!(reply.status(), 200);

        let body: serde_json::Value = serde_json::from_str(&reply.body().unwrap()).unwrap();
        assert_eq!(body["fhwr_ratio"], 2.0);

        let data_url = body["image_base64"].as_str().unwrap();
        let encoded = data_url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (220, 200));
    }

    #[test]
    fn rejection_messages() {
        let mut svc = service(vec![frontal()]);

        let reply = svc.calculate(None);
        assert_eq!(reply, Reply::Rejected(Rejection::NoUrl));
        assert_eq!(reply.status(), 404);
        assert_eq!(message(&reply), "No valid URL provided.");

        let reply = svc.calculate(Some("http://example.com/face.gif"));
        assert_eq!(reply.status(), 404);
        assert_eq!(message(&reply), "Not a valid filetype, use either jpg or png.");

        let mut turned = frontal();
        turned[30].x = 110;
        let reply = service(vec![turned]).measure(&picture(), "turned.jpg");
        assert_eq!(reply.status(), 404);
        assert_eq!(message(&reply), "Picture not suitable for FWHR calculation.");

        let reply = service(Vec::new()).measure(&picture(), "empty.jpg");
        assert_eq!(message(&reply), "Calculation failed for unknown reasons.");
    }

    #[test]
    fn health_check_skips_detection() {
        let mut svc = service(vec![frontal()]);
        let reply = svc.calculate(Some(HEALTH_CHECK_URL));

        assert_eq!(reply, Reply::Healthy);
        assert_eq!(reply.status(), 200);
        assert_eq!(reply.body().unwrap(), "true");
        assert_eq!(svc.estimator.detector().calls, 0);
    }

    #[test]
    fn routing_and_query_decoding() {
        assert_eq!(query_url("/calculatefwhr"), Some(None));
        assert_eq!(
            query_url("/calculatefwhr?url=test_service.jpg"),
            Some(Some("test_service.jpg".to_string()))
        );
        assert_eq!(
            query_url("/calculatefwhr?size=2&url=http%3A%2F%2Fexample.com%2Fa%20b.png"),
            Some(Some("http://example.com/a b.png".to_string()))
        );
        assert_eq!(query_url("/other?url=a.jpg"), None);

        let mut svc = service(vec![frontal()]);
        assert_eq!(svc.handle(&Method::Get, "/"), Reply::NotFound);
        assert_eq!(
            svc.handle(&Method::Post, "/calculatefwhr?url=test_service.jpg"),
            Reply::MethodNotAllowed
        );
        assert_eq!(
            svc.handle(&Method::Get, "/calculatefwhr?url=test_service.jpg"),
            Reply::Healthy
        );
        assert_eq!(
            svc.handle(&Method::Get, "/calculatefwhr?url=ftp.txt"),
            Reply::Rejected(Rejection::InvalidFiletype)
        );
    }
}
