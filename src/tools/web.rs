//! Web access for the presentation tools: image search and image download.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{required_str, Tool, ToolError};
use crate::pptx::{Image, ImageFormat};

const PEXELS_SEARCH_URL: &str = "https://api.pexels.com/v1/search";

/// Largest image accepted by `add_image_to_slide`.
const MAX_IMAGE_BYTES: usize = 15 * 1024 * 1024;

/// Search stock photos on Pexels.
pub struct SearchImage {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

#[derive(Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Deserialize)]
struct PexelsPhoto {
    #[serde(default)]
    alt: String,
    src: PexelsSources,
}

#[derive(Deserialize)]
struct PexelsSources {
    large: Option<String>,
    original: Option<String>,
}

impl SearchImage {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            endpoint: PEXELS_SEARCH_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Tool for SearchImage {
    fn name(&self) -> &str {
        "search_image"
    }

    fn description(&self) -> &str {
        "Search for a stock photo matching a keyword. \
         Returns an image URL to pass to add_image_to_slide."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "Short search phrase, e.g. 'solar panels'"
                }
            },
            "required": ["keyword"]
        })
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> Result<String, ToolError> {
        let keyword = required_str(&args, "keyword")?;

        let Some(api_key) = &self.api_key else {
            return Ok("Image search is unavailable (no PEXELS_API_KEY configured). \
                       Skip images and use add_shape_to_slide for visuals."
                .to_string());
        };

        let url = format!(
            "{}?query={}&per_page=1",
            self.endpoint,
            urlencoding::encode(keyword)
        );
        let response = self
            .http
            .get(&url)
            .header("Authorization", api_key)
            .send()
            .await
            .map_err(|e| ToolError::rejected(format!("Image search failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::rejected(format!(
                "Image search failed: HTTP {}",
                status
            )));
        }

        let body: PexelsResponse = response
            .json()
            .await
            .map_err(|e| ToolError::rejected(format!("Image search returned bad data: {}", e)))?;

        let found = body.photos.into_iter().find_map(|p| {
            let alt = p.alt;
            p.src.large.or(p.src.original).map(|url| (url, alt))
        });

        match found {
            Some((url, alt)) if alt.is_empty() => Ok(url),
            Some((url, alt)) => Ok(format!("{}\n(alt: {})", url, alt)),
            None => Ok(format!("No images found for: {}", keyword)),
        }
    }
}

/// Download an image and validate that it can be embedded.
pub async fn fetch_image(http: &reqwest::Client, url: &str) -> Result<Image, ToolError> {
    fetch_image_limited(http, url, MAX_IMAGE_BYTES).await
}

async fn fetch_image_limited(
    http: &reqwest::Client,
    url: &str,
    max_bytes: usize,
) -> Result<Image, ToolError> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ToolError::rejected(format!(
            "image_url must be an http(s) URL, got: {}",
            url
        )));
    }

    let mut response = http
        .get(url)
        .send()
        .await
        .map_err(|e| ToolError::rejected(format!("Could not download image: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::rejected(format!(
            "Could not download image: HTTP {}",
            status
        )));
    }

    let too_large =
        || ToolError::rejected(format!("Image too large (over {} bytes)", max_bytes));
    if response.content_length().is_some_and(|len| len > max_bytes as u64) {
        return Err(too_large());
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    // Content-Length may be absent or wrong; enforce the cap while streaming.
    let mut data = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ToolError::rejected(format!("Could not download image: {}", e)))?
    {
        if data.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        data.extend_from_slice(&chunk);
    }

    let format = ImageFormat::detect(&data, content_type.as_deref()).ok_or_else(|| {
        ToolError::rejected(format!(
            "Unsupported image type ({}); use a PNG, JPEG or GIF",
            content_type.as_deref().unwrap_or("unknown")
        ))
    })?;

    tracing::debug!(url, bytes = data.len(), ?format, "Downloaded image");
    Ok(Image::new(data, format))
}
