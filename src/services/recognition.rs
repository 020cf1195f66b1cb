use std::io::Cursor;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::GrayImage;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;

use crate::core::config::Settings;

/// Text recognition capability: one entry point, raster region in,
/// recognized text out.
#[async_trait]
pub(crate) trait Recognizer: Send + Sync {
    async fn recognize(&self, region: &GrayImage) -> Result<String>;
}

/// Recognizer backed by an external OCR service.
#[derive(Debug, Clone)]
pub(crate) struct HttpRecognizer {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpRecognizer {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.ocr().base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            anyhow::bail!("OCR_BASE_URL is not configured");
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(Duration::from_secs(settings.ocr().timeout_seconds))
            .build()
            .context("Failed to build OCR HTTP client")?;

        Ok(Self { client, base_url, api_key: settings.ocr().api_key.clone() })
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, region: &GrayImage) -> Result<String> {
        let mut png = Cursor::new(Vec::new());
        region
            .write_to(&mut png, image::ImageFormat::Png)
            .context("Failed to encode recognition region")?;

        let part = Part::bytes(png.into_inner())
            .file_name("region.png")
            .mime_str("image/png")
            .context("Failed to build recognition request")?;
        let form = Form::new().part("file", part);

        let endpoint = format!("{}/recognize", self.base_url);
        let mut request = self.client.post(&endpoint).multipart(form);
        if !self.api_key.is_empty() {
            request = request.header("X-Api-Key", &self.api_key);
        }

        let response = request.send().await.context("Failed to call recognition service")?;
        let status = response.status();
        let raw_body = response.text().await.context("Failed to read recognition response")?;

        let parsed: Value = serde_json::from_str(&raw_body).map_err(|err| {
            anyhow::anyhow!("recognition service returned non-JSON body (status {status}): {err}")
        })?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "recognition request failed (status {status}): {}",
                extract_error_message(&parsed)
            ));
        }

        Ok(extract_text(&parsed))
    }
}

fn extract_text(payload: &Value) -> String {
    payload.get("text").and_then(Value::as_str).unwrap_or_default().trim().to_string()
}

fn extract_error_message(payload: &Value) -> String {
    payload
        .get("detail")
        .and_then(Value::as_str)
        .or_else(|| payload.get("message").and_then(Value::as_str))
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}
