//! Stock illustrations from the Unsplash search API.
//!
//! A missing illustration never fails a lesson: every error on this path is
//! logged and turned into `None`, and the PDF simply omits that picture.
//!
//! Downloaded photos are resized to the configured landscape size and
//! re-encoded as JPEG so the PDF can embed them without further processing.

use crate::config::ImageConfig;
use crate::models::Image;
use image::ImageFormat;
use image::imageops::FilterType;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
    user: PhotoUser,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: String,
}

/// Searches Unsplash and downloads the first landscape result.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    api_key: Option<String>,
    config: ImageConfig,
}

impl ImageFetcher {
    pub fn new(client: Client, api_key: Option<String>, config: ImageConfig) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("No Unsplash access key; lessons will have no illustrations");
        }
        Self {
            client,
            api_key,
            config,
        }
    }

    /// Fetch one illustration for `query`.
    ///
    /// # Arguments
    ///
    /// * `query` - Short English search terms
    ///
    /// # Returns
    ///
    /// The first landscape result, resized and re-encoded as JPEG with its
    /// photographer credit. `None` without an API key, on any HTTP or decode
    /// failure, or when the search has no results; the failure is logged and
    /// the story is rendered without a picture.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, query: &str) -> Option<Image> {
        let api_key = self.api_key.as_deref()?;
        match self.try_fetch(api_key, query).await {
            Ok(Some(image)) => {
                info!(attribution = %image.attribution, bytes = image.data.len(), "Downloaded image");
                Some(image)
            }
            Ok(None) => {
                warn!("No images found");
                None
            }
            Err(e) => {
                warn!(error = %e, "Image fetch failed; continuing without illustration");
                None
            }
        }
    }

    async fn try_fetch(&self, api_key: &str, query: &str) -> Result<Option<Image>, Box<dyn Error>> {
        let mut search_url = Url::parse(&self.config.base_url)?.join("search/photos")?;
        search_url
            .query_pairs_mut()
            .append_pair("query", query)
            .append_pair("per_page", "5")
            .append_pair("orientation", "landscape");

        let search: SearchResponse = self
            .client
            .get(search_url)
            .header("Authorization", format!("Client-ID {api_key}"))
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(results = search.results.len(), "Unsplash search returned");

        let Some(photo) = search.results.into_iter().next() else {
            return Ok(None);
        };

        let bytes = self
            .client
            .get(&photo.urls.regular)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let image = prepare_image(
            &bytes,
            self.config.width,
            self.config.height,
            format!("Foto: {} / Unsplash", photo.user.name),
        )?;
        Ok(Some(image))
    }
}

/// Decode any supported format, resize to exactly `width`×`height` and re-encode as JPEG.
///
/// # Errors
///
/// Any [`image::ImageError`] from decoding or encoding.
pub fn prepare_image(
    bytes: &[u8],
    width: u32,
    height: u32,
    attribution: String,
) -> Result<Image, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let resized = decoded.resize_exact(width, height, FilterType::Lanczos3).to_rgb8();

    let mut data = Cursor::new(Vec::new());
    resized.write_to(&mut data, ImageFormat::Jpeg)?;

    Ok(Image {
        data: data.into_inner(),
        width,
        height,
        attribution,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn config(base_url: String) -> ImageConfig {
        ImageConfig {
            base_url,
            width: 16,
            height: 9,
        }
    }

    /// Unsplash stand-in: `/search/photos` answers `search_body` with `{base}` replaced, `/photo.png` serves a PNG.
    fn serve(search_status: u16, search_body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}/", server.server_addr());
        let base = base_url.clone();
        let png = fixtures::png(8, 8);
        thread::spawn(move || {
            for request in server.incoming_requests() {
                let path = request.url().split('?').next().unwrap_or("").to_string();
                let response = match path.as_str() {
                    "/search/photos" => {
                        let authorized = request.headers().iter().any(|h| {
                            h.field.equiv("Authorization") && h.value.as_str() == "Client-ID test-key"
                        });
                        if authorized {
                            tiny_http::Response::from_string(search_body.replace("{base}", &base))
                                .with_status_code(search_status)
                        } else {
                            tiny_http::Response::from_string("unauthorized").with_status_code(401)
                        }
                    }
                    "/photo.png" => tiny_http::Response::from_data(png.clone()),
                    "/broken.png" => tiny_http::Response::from_data(b"not an image".to_vec()),
                    _ => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });
        base_url
    }

    const ONE_RESULT: &str =
        r#"{"total": 1, "results": [{"urls": {"regular": "{base}photo.png"}, "user": {"name": "Ana López"}}]}"#;

    #[tokio::test]
    async fn test_fetch_downloads_and_resizes() {
        let fetcher = ImageFetcher::new(
            Client::new(),
            Some("test-key".to_string()),
            config(serve(200, ONE_RESULT)),
        );
        let image = fetcher.fetch("capitol building").await.unwrap();
        assert_eq!(image.attribution, "Foto: Ana López / Unsplash");
        assert_eq!((image.width, image.height), (16, 9));
        // JPEG SOI marker
        assert_eq!(&image.data[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_no_results_is_none() {
        let fetcher = ImageFetcher::new(
            Client::new(),
            Some("test-key".to_string()),
            config(serve(200, r#"{"total": 0, "results": []}"#)),
        );
        assert!(fetcher.fetch("nothing").await.is_none());
    }

    #[tokio::test]
    async fn test_search_error_is_none() {
        let fetcher = ImageFetcher::new(
            Client::new(),
            Some("wrong-key".to_string()),
            config(serve(200, ONE_RESULT)),
        );
        assert!(fetcher.fetch("capitol").await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_image_is_none() {
        let fetcher = ImageFetcher::new(
            Client::new(),
            Some("test-key".to_string()),
            config(serve(
                200,
                r#"{"results": [{"urls": {"regular": "{base}broken.png"}, "user": {"name": "X"}}]}"#,
            )),
        );
        assert!(fetcher.fetch("capitol").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_skips_request() {
        let fetcher = ImageFetcher::new(Client::new(), None, config("http://127.0.0.1:9/".to_string()));
        assert!(fetcher.fetch("capitol").await.is_none());
    }

    #[test]
    fn test_prepare_image_rejects_garbage() {
        assert!(prepare_image(b"garbage", 10, 10, String::new()).is_err());
    }
}
