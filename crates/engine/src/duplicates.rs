//! Duplicate detection for incoming receipts.
//!
//! Two independent checks, either one is enough to flag a resubmission:
//!
//! - **exact image**: the SHA-256 of the uploaded bytes matches a stored
//!   `image_hash` (catches renamed copies of the same file);
//! - **same purchase**: a stored receipt has the same vendor, the same purchase
//!   date and a total within one cent (catches two photos of one receipt).

use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{MoneyCents, Receipt};

/// Totals closer than this are the same purchase.
pub const AMOUNT_TOLERANCE: MoneyCents = MoneyCents::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    ExactImage,
    SamePurchase,
}

impl DuplicateKind {
    pub fn message(self) -> &'static str {
        match self {
            Self::ExactImage => "This receipt has already been uploaded",
            Self::SamePurchase => {
                "A similar receipt already exists (same vendor, amount, and date)"
            }
        }
    }
}

/// An upload rejected as a resubmission, with the receipt it collides with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Duplicate {
    pub kind: DuplicateKind,
    pub existing: Receipt,
}

/// Lowercase hex SHA-256 of the image bytes.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Whether `existing` records the same real-world purchase.
pub fn is_same_purchase(
    existing: &Receipt,
    vendor: &str,
    amount: MoneyCents,
    date: NaiveDate,
) -> bool {
    existing.vendor == vendor
        && existing.date == date
        && existing.total_amount.abs_diff(amount) < AMOUNT_TOLERANCE
}
