use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// HSA eligibility as sent over the wire (`"Yes"`, `"No"`, `"Partially"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HsaStatus {
    Yes,
    No,
    Partially,
}

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub service: String,
    }
}

pub mod receipt {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ReceiptView {
        pub id: i64,
        pub user_id: String,
        pub vendor: String,
        pub total_amount_minor: i64,
        /// Purchase date.
        pub date: NaiveDate,
        pub hsa_qualified: bool,
        pub hsa_status: HsaStatus,
        pub image_path: String,
        /// Where the image can be downloaded from.
        pub image_url: String,
        pub used: bool,
        pub used_at: Option<DateTime<Utc>>,
        pub use_reason: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    /// Query of `GET /api/receipts`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReceiptList {
        /// Household; the server default when absent.
        pub user_id: Option<String>,
        /// Only unused, HSA eligible receipts.
        pub eligible: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptsResponse {
        pub receipts: Vec<ReceiptView>,
    }

    /// Body of `PUT /api/receipts/{id}`. Absent fields are left unchanged.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReceiptUpdate {
        pub vendor: Option<String>,
        pub total_amount_minor: Option<i64>,
        pub date: Option<NaiveDate>,
        pub hsa_status: Option<HsaStatus>,
        pub used: Option<bool>,
        pub use_reason: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UploadCreated {
        pub message: String,
        pub receipt: ReceiptView,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DuplicateKind {
        ExactImage,
        SamePurchase,
    }

    /// 409 body of a rejected upload.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DuplicateConflict {
        /// Always `"duplicate"`.
        pub error: String,
        pub kind: DuplicateKind,
        pub message: String,
        /// The receipt the upload collides with.
        pub receipt: ReceiptView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MarkUsed {
        pub ids: Vec<i64>,
        pub use_reason: Option<String>,
    }
}

pub mod deduct {
    use super::*;
    use crate::receipt::ReceiptView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DeductRequest {
        pub user_id: Option<String>,
        /// Must be >= 0.
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DeductResponse {
        /// Newest purchase first.
        pub receipts: Vec<ReceiptView>,
        pub total_minor: i64,
        pub target_minor: i64,
        pub remainder_minor: i64,
    }
}
