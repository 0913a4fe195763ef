//! Client of the OCR microservice.
//!
//! The service takes the image as multipart field `file` on `POST /parse`
//! and answers with the fields it could read.

use std::{path::Path, time::Duration};

use engine::{EngineError, Extraction, MoneyCents, ReceiptExtractor, content_type_for};
use reqwest::{Client, multipart};
use serde::Deserialize;

#[derive(Clone, Debug)]
pub struct OcrClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    hsa_qualified: bool,
    #[serde(default)]
    hsa_status: Option<String>,
    #[serde(default)]
    raw_text: Option<String>,
}

impl OcrClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn parse(&self, image_path: &Path, bytes: Vec<u8>) -> Result<Extraction, EngineError> {
        let file_name = image_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("receipt")
            .to_string();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type_for(image_path))
            .map_err(|err| EngineError::Extraction(format!("invalid content type: {err}")))?;
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/parse", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| EngineError::Extraction(format!("request to {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Extraction(format!(
                "OCR service returned {status}: {body}"
            )));
        }

        let parsed: ParseResponse = response
            .json()
            .await
            .map_err(|err| EngineError::Extraction(format!("invalid OCR response: {err}")))?;
        let amount = MoneyCents::from_dollars(parsed.amount.unwrap_or_default())
            .map_err(|err| EngineError::Extraction(format!("invalid OCR amount: {err}")))?;

        Ok(Extraction {
            vendor: parsed.vendor.unwrap_or_default(),
            amount,
            date: parsed.date,
            hsa_qualified: parsed.hsa_qualified,
            hsa_status: parsed.hsa_status,
            raw_text: parsed.raw_text.unwrap_or_default(),
        })
    }
}

impl ReceiptExtractor for OcrClient {
    async fn extract(&self, image_path: &Path, bytes: &[u8]) -> Result<Extraction, EngineError> {
        tracing::debug!("sending {} to OCR service", image_path.display());
        self.parse(image_path, bytes.to_vec()).await
    }
}
