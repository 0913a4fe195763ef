//! Command structs for engine operations.
//!
//! These types group parameters for write operations (upload, partial update)
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{HsaStatus, MoneyCents};

/// Admit a newly uploaded receipt image.
#[derive(Clone, Debug)]
pub struct UploadCmd {
    /// File name as sent by the client.
    pub original_name: String,
    pub bytes: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
    /// Skip the same-purchase check (the exact image check always runs).
    pub allow_similar: bool,
}

impl UploadCmd {
    #[must_use]
    pub fn new(original_name: impl Into<String>, bytes: Vec<u8>, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes,
            uploaded_at,
            allow_similar: false,
        }
    }

    #[must_use]
    pub fn allow_similar(mut self, allow: bool) -> Self {
        self.allow_similar = allow;
        self
    }
}

/// Partial update of a receipt. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiptUpdate {
    pub vendor: Option<String>,
    pub total_amount: Option<MoneyCents>,
    pub date: Option<NaiveDate>,
    pub hsa_status: Option<HsaStatus>,
    pub used: Option<bool>,
    pub use_reason: Option<String>,
}

impl ReceiptUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    #[must_use]
    pub fn total_amount(mut self, amount: MoneyCents) -> Self {
        self.total_amount = Some(amount);
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn hsa_status(mut self, status: HsaStatus) -> Self {
        self.hsa_status = Some(status);
        self
    }

    #[must_use]
    pub fn used(mut self, used: bool) -> Self {
        self.used = Some(used);
        self
    }

    #[must_use]
    pub fn use_reason(mut self, reason: impl Into<String>) -> Self {
        self.use_reason = Some(reason.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
