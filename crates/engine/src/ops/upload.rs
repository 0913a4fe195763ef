//! Receipt intake: store, extract, deduplicate, file.

use chrono::Datelike;
use sea_orm::{ActiveValue, SqlErr, prelude::*};

use crate::{
    EngineError, Receipt, ResultEngine, UploadCmd, archive,
    duplicates::{Duplicate, DuplicateKind, content_digest},
    extraction::ReceiptExtractor,
    receipts,
};

use super::{Engine, blocking, normalize_required_text};

/// Result of an upload: either a new receipt or the one it duplicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Created(Receipt),
    Duplicate(Duplicate),
}

impl Engine {
    /// Admits an uploaded receipt image.
    ///
    /// The image is first written to the unused area of the upload year so the
    /// extractor can read it, then moved to the purchase year once the date is
    /// known. An upload whose bytes, or whose vendor, total and date, match a
    /// stored receipt is reported as [`UploadOutcome::Duplicate`] and leaves
    /// nothing behind. If extraction fails the stored image is left in place.
    pub async fn upload<E: ReceiptExtractor>(
        &self,
        cmd: UploadCmd,
        extractor: &E,
    ) -> ResultEngine<UploadOutcome> {
        if cmd.bytes.is_empty() {
            return Err(EngineError::InvalidReceipt("uploaded file is empty".to_string()));
        }
        let filename = archive::upload_file_name(cmd.uploaded_at.timestamp(), &cmd.original_name)?;
        let digest = content_digest(&cmd.bytes);
        let _guard = self.upload_locks.lock(&digest).await;

        if let Some(existing) = self.find_by_hash(&digest).await? {
            tracing::info!("upload {filename} matches receipt {} byte for byte", existing.id);
            return Ok(UploadOutcome::Duplicate(Duplicate {
                kind: DuplicateKind::ExactImage,
                existing,
            }));
        }

        let archive = self.archive.clone();
        let upload_year = cmd.uploaded_at.year();
        let stored_name = filename.clone();
        let bytes = cmd.bytes.clone();
        let stored = blocking(move || archive.store_new(upload_year, &stored_name, &bytes)).await?;
        tracing::debug!("stored upload at {}", stored.display());

        let extraction = extractor.extract(&stored, &cmd.bytes).await.inspect_err(|err| {
            tracing::warn!("extraction of {} failed: {err}", stored.display());
        })?;

        let vendor = normalize_required_text(&extraction.vendor, "vendor").unwrap_or_else(|_| {
            tracing::warn!("extraction of {filename} returned no vendor");
            "Unknown".to_string()
        });
        if let Err(err) = extraction.amount.ensure_receipt_total() {
            self.discard_image(stored).await;
            return Err(err);
        }
        let date = extraction.purchase_date(cmd.uploaded_at.date_naive());
        let hsa_status = extraction.status();

        if !cmd.allow_similar {
            if let Some(existing) = self
                .find_by_vendor_amount_date(&vendor, extraction.amount, date)
                .await?
            {
                tracing::info!("upload {filename} repeats the purchase of receipt {}", existing.id);
                self.discard_image(stored).await;
                return Ok(UploadOutcome::Duplicate(Duplicate {
                    kind: DuplicateKind::SamePurchase,
                    existing,
                }));
            }
        }

        let mut receipt = Receipt {
            id: 0,
            user_id: self.household.clone(),
            vendor,
            total_amount: extraction.amount,
            date,
            hsa_status,
            image_path: stored,
            image_hash: digest.clone(),
            raw_text: extraction.raw_text,
            used: false,
            used_at: None,
            use_reason: None,
            created_at: cmd.uploaded_at,
        };
        let pending = self.stage_relocation(&mut receipt).await?;

        let mut model = receipts::ActiveModel::from(&receipt);
        model.id = ActiveValue::NotSet;
        match model.insert(&self.database).await {
            Ok(model) => {
                let created = Receipt::try_from(model)?;
                tracing::info!(
                    "created receipt {} ({} {} on {})",
                    created.id,
                    created.vendor,
                    created.total_amount,
                    created.date
                );
                Ok(UploadOutcome::Created(created))
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                drop(pending);
                self.discard_image(receipt.image_path.clone()).await;
                let existing = self.find_by_hash(&digest).await?.ok_or_else(|| {
                    EngineError::Internal(format!("image hash {digest} collided but is missing"))
                })?;
                Ok(UploadOutcome::Duplicate(Duplicate {
                    kind: DuplicateKind::ExactImage,
                    existing,
                }))
            }
            Err(err) => {
                drop(pending);
                self.discard_image(receipt.image_path.clone()).await;
                Err(err.into())
            }
        }
    }
}
