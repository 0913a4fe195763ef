//! Receipt text extraction (OCR) boundary.
//!
//! The engine does not read receipts itself: it hands the stored image to a
//! [`ReceiptExtractor`] and normalizes what comes back.

use std::{future::Future, path::Path};

use chrono::NaiveDate;

use crate::{HsaStatus, MoneyCents, ResultEngine};

/// Date format produced by the extraction service.
pub const EXTRACTED_DATE_FORMAT: &str = "%m/%d/%Y";

/// Raw fields reported by the extraction service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    pub vendor: String,
    pub amount: MoneyCents,
    /// `MM/DD/YYYY`, possibly missing or malformed.
    pub date: Option<String>,
    pub hsa_qualified: bool,
    pub hsa_status: Option<String>,
    pub raw_text: String,
}

impl Extraction {
    /// Purchase date, or `fallback` when the service gave none or an
    /// unparseable one.
    pub fn purchase_date(&self, fallback: NaiveDate) -> NaiveDate {
        let Some(text) = self.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return fallback;
        };
        match NaiveDate::parse_from_str(text, EXTRACTED_DATE_FORMAT) {
            Ok(date) => date,
            Err(err) => {
                tracing::warn!("failed to parse extracted date {text:?}: {err}");
                fallback
            }
        }
    }

    /// Eligibility status. A missing or unknown status string falls back to
    /// the qualified flag.
    pub fn status(&self) -> HsaStatus {
        match self.hsa_status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => HsaStatus::from_qualified(self.hsa_qualified),
            Some(text) => HsaStatus::try_from(text).unwrap_or_else(|_| {
                tracing::warn!("unknown extracted hsa status {text:?}, using qualified flag");
                HsaStatus::from_qualified(self.hsa_qualified)
            }),
        }
    }
}

/// Something that can read a receipt image.
///
/// Failures must be reported as [`EngineError::Extraction`].
///
/// [`EngineError::Extraction`]: crate::EngineError::Extraction
pub trait ReceiptExtractor: Send + Sync {
    fn extract(
        &self,
        image_path: &Path,
        bytes: &[u8],
    ) -> impl Future<Output = ResultEngine<Extraction>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn parses_us_date() {
        let extraction = Extraction {
            date: Some("11/07/2025".to_string()),
            ..Default::default()
        };
        assert_eq!(
            extraction.purchase_date(fallback()),
            NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
        );
    }

    #[test]
    fn missing_or_bad_date_uses_fallback() {
        let mut extraction = Extraction::default();
        assert_eq!(extraction.purchase_date(fallback()), fallback());

        extraction.date = Some("2025-11-07".to_string());
        assert_eq!(extraction.purchase_date(fallback()), fallback());

        extraction.date = Some("  ".to_string());
        assert_eq!(extraction.purchase_date(fallback()), fallback());
    }

    #[test]
    fn status_string_wins_over_flag() {
        let extraction = Extraction {
            hsa_qualified: false,
            hsa_status: Some("Partially".to_string()),
            ..Default::default()
        };
        assert_eq!(extraction.status(), HsaStatus::Partially);
    }

    #[test]
    fn missing_or_unknown_status_derives_from_flag() {
        let mut extraction = Extraction {
            hsa_qualified: true,
            ..Default::default()
        };
        assert_eq!(extraction.status(), HsaStatus::Yes);

        extraction.hsa_qualified = false;
        assert_eq!(extraction.status(), HsaStatus::No);

        extraction.hsa_status = Some("Maybe".to_string());
        assert_eq!(extraction.status(), HsaStatus::No);
    }
}
