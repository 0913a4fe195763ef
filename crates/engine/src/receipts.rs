//! Receipt primitives.
//!
//! A `Receipt` is one scanned purchase: the extracted metadata, where its image
//! lives in the archive, and whether it has already been used for a
//! reimbursement.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents};

/// HSA eligibility of a receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HsaStatus {
    Yes,
    No,
    Partially,
}

impl HsaStatus {
    pub const ALL: [HsaStatus; 3] = [Self::Yes, Self::No, Self::Partially];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Partially => "Partially",
        }
    }

    /// `Yes` and `Partially` receipts can be reimbursed.
    pub fn is_qualified(self) -> bool {
        matches!(self, Self::Yes | Self::Partially)
    }

    /// Status implied by a bare qualified/not-qualified flag.
    pub fn from_qualified(qualified: bool) -> Self {
        if qualified { Self::Yes } else { Self::No }
    }
}

impl TryFrom<&str> for HsaStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Yes" => Ok(Self::Yes),
            "No" => Ok(Self::No),
            "Partially" => Ok(Self::Partially),
            other => Err(EngineError::InvalidReceipt(format!(
                "invalid hsa status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    /// Owning household.
    pub user_id: String,
    pub vendor: String,
    pub total_amount: MoneyCents,
    /// Purchase date.
    pub date: NaiveDate,
    pub hsa_status: HsaStatus,
    pub image_path: PathBuf,
    /// Lowercase hex SHA-256 of the image bytes.
    pub image_hash: String,
    pub raw_text: String,
    pub used: bool,
    /// Set iff `used`.
    pub used_at: Option<DateTime<Utc>>,
    /// Only meaningful while `used`.
    pub use_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Receipt {
    pub fn hsa_qualified(&self) -> bool {
        self.hsa_status.is_qualified()
    }

    /// Year that decides the archive folder: the usage year while used, the
    /// purchase year otherwise.
    pub fn archive_year(&self) -> i32 {
        match (self.used, self.used_at) {
            (true, Some(used_at)) => used_at.year(),
            _ => self.date.year(),
        }
    }

    /// File name component of the stored image path.
    pub fn file_name(&self) -> Option<&str> {
        self.image_path.file_name().and_then(|name| name.to_str())
    }

    /// Content type used when streaming the image back to clients.
    pub fn content_type(&self) -> &'static str {
        content_type_for(&self.image_path)
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub vendor: String,
    pub total_amount_minor: i64,
    pub date: Date,
    pub hsa_qualified: bool,
    pub hsa_status: String,
    pub image_path: String,
    #[sea_orm(unique)]
    pub image_hash: String,
    pub raw_text: String,
    pub used: bool,
    pub used_at: Option<DateTimeUtc>,
    pub use_reason: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Receipt> for ActiveModel {
    fn from(receipt: &Receipt) -> Self {
        Self {
            id: ActiveValue::Set(receipt.id),
            user_id: ActiveValue::Set(receipt.user_id.clone()),
            vendor: ActiveValue::Set(receipt.vendor.clone()),
            total_amount_minor: ActiveValue::Set(receipt.total_amount.cents()),
            date: ActiveValue::Set(receipt.date),
            hsa_qualified: ActiveValue::Set(receipt.hsa_qualified()),
            hsa_status: ActiveValue::Set(receipt.hsa_status.as_str().to_string()),
            image_path: ActiveValue::Set(receipt.image_path.to_string_lossy().into_owned()),
            image_hash: ActiveValue::Set(receipt.image_hash.clone()),
            raw_text: ActiveValue::Set(receipt.raw_text.clone()),
            used: ActiveValue::Set(receipt.used),
            used_at: ActiveValue::Set(receipt.used_at),
            use_reason: ActiveValue::Set(receipt.use_reason.clone()),
            created_at: ActiveValue::Set(receipt.created_at),
        }
    }
}

impl TryFrom<Model> for Receipt {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            vendor: model.vendor,
            total_amount: MoneyCents::new(model.total_amount_minor),
            date: model.date,
            hsa_status: HsaStatus::try_from(model.hsa_status.as_str())?,
            image_path: PathBuf::from(model.image_path),
            image_hash: model.image_hash,
            raw_text: model.raw_text,
            used: model.used,
            used_at: model.used_at,
            use_reason: model.use_reason,
            created_at: model.created_at,
        })
    }
}
