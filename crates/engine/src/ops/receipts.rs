//! Receipt record store operations.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, HsaStatus, MoneyCents, Receipt, ReceiptUpdate, ResultEngine, archive,
    duplicates::is_same_purchase, receipts,
};

use super::{
    Engine, blocking, normalize_optional_text, normalize_required_text, receipts_from_models,
    relocation::PendingRelocation,
};

impl Engine {
    /// All receipts of a household, newest purchase first.
    pub async fn receipts(&self, household: Option<&str>) -> ResultEngine<Vec<Receipt>> {
        let household = self.resolve_household(household);
        let models = receipts::Entity::find()
            .filter(receipts::Column::UserId.eq(household))
            .order_by_desc(receipts::Column::Date)
            .order_by_desc(receipts::Column::Id)
            .all(&self.database)
            .await?;
        receipts_from_models(models)
    }

    /// Unused receipts with status `Yes` or `Partially`, newest purchase first.
    ///
    /// This order is the input order of the selection, so it decides which of
    /// two equally good subsets a deduction picks.
    pub async fn eligible_receipts(&self, household: Option<&str>) -> ResultEngine<Vec<Receipt>> {
        let household = self.resolve_household(household);
        let qualified: Vec<&str> = HsaStatus::ALL
            .into_iter()
            .filter(|status| status.is_qualified())
            .map(HsaStatus::as_str)
            .collect();
        let models = receipts::Entity::find()
            .filter(receipts::Column::UserId.eq(household))
            .filter(receipts::Column::Used.eq(false))
            .filter(receipts::Column::HsaStatus.is_in(qualified))
            .order_by_desc(receipts::Column::Date)
            .order_by_desc(receipts::Column::Id)
            .all(&self.database)
            .await?;
        receipts_from_models(models)
    }

    /// Every receipt regardless of household, by id.
    pub async fn all_receipts(&self) -> ResultEngine<Vec<Receipt>> {
        let models = receipts::Entity::find()
            .order_by_asc(receipts::Column::Id)
            .all(&self.database)
            .await?;
        receipts_from_models(models)
    }

    pub async fn receipt(&self, id: i64) -> ResultEngine<Receipt> {
        let model = receipts::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("receipt {id}")))?;
        Receipt::try_from(model)
    }

    /// Location and content type of a receipt's image.
    pub async fn receipt_file(&self, id: i64) -> ResultEngine<(PathBuf, &'static str)> {
        let receipt = self.receipt(id).await?;
        let path = receipt.image_path.clone();
        let exists = !path.as_os_str().is_empty()
            && tokio::fs::try_exists(&path).await.unwrap_or(false);
        if !exists {
            return Err(EngineError::KeyNotFound(format!("image of receipt {id}")));
        }
        Ok((path, receipt.content_type()))
    }

    /// Receipt whose image has the given content digest, if any.
    pub async fn find_by_hash(&self, digest: &str) -> ResultEngine<Option<Receipt>> {
        receipts::Entity::find()
            .filter(receipts::Column::ImageHash.eq(digest))
            .one(&self.database)
            .await?
            .map(Receipt::try_from)
            .transpose()
    }

    /// First receipt recording the same purchase (vendor, date, total within a
    /// cent), if any.
    pub async fn find_by_vendor_amount_date(
        &self,
        vendor: &str,
        amount: MoneyCents,
        date: NaiveDate,
    ) -> ResultEngine<Option<Receipt>> {
        let models = receipts::Entity::find()
            .filter(receipts::Column::Vendor.eq(vendor))
            .filter(receipts::Column::Date.eq(date))
            .order_by_asc(receipts::Column::Id)
            .all(&self.database)
            .await?;
        for model in models {
            let receipt = Receipt::try_from(model)?;
            if is_same_purchase(&receipt, vendor, amount, date) {
                return Ok(Some(receipt));
            }
        }
        Ok(None)
    }

    /// Applies a partial update.
    ///
    /// When the usage flag flips (or the purchase date of an unused receipt
    /// changes) the image is moved to its new archive folder first. If that
    /// move fails the update is rejected and nothing is written.
    pub async fn update_receipt(&self, id: i64, update: ReceiptUpdate) -> ResultEngine<Receipt> {
        let _guard = self.receipt_locks.lock(&id).await;

        let current = self.receipt(id).await?;
        let mut receipt = apply_update(current.clone(), &update, Utc::now())?;

        let pending = if needs_relocation(&current, &receipt) {
            self.stage_relocation(&mut receipt).await?
        } else {
            None
        };

        let saved = self.commit_receipt(&self.database, &receipt, pending).await?;
        if saved.used != current.used {
            tracing::info!(
                "receipt {id} marked {}",
                if saved.used { "used" } else { "unused" }
            );
        }
        Ok(saved)
    }

    /// Marks a batch of receipts used, e.g. after a deduction was confirmed.
    ///
    /// All or nothing: every image is moved first, then all records are
    /// written in one transaction. Any failure reverts the moves already made.
    pub async fn mark_used(
        &self,
        ids: &[i64],
        use_reason: Option<&str>,
    ) -> ResultEngine<Vec<Receipt>> {
        if ids.is_empty() {
            return Err(EngineError::InvalidReceipt(
                "at least one receipt id is required".to_string(),
            ));
        }
        let _guards = self.receipt_locks.lock_many(ids).await;

        let now = Utc::now();
        let mut update = ReceiptUpdate::new().used(true);
        update.use_reason = use_reason.map(ToString::to_string);

        let mut seen = Vec::with_capacity(ids.len());
        let mut staged = Vec::with_capacity(ids.len());
        for &id in ids {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            let current = self.receipt(id).await?;
            staged.push(apply_update(current, &update, now)?);
        }

        let mut pending: Vec<PendingRelocation> = Vec::new();
        for receipt in &mut staged {
            match self.stage_relocation(receipt).await {
                Ok(Some(moved)) => pending.push(moved),
                Ok(None) => {}
                Err(err) => {
                    self.revert_all(pending).await;
                    return Err(err);
                }
            }
        }

        match self.write_all(&staged).await {
            Ok(saved) => {
                tracing::info!("marked {} receipts used", saved.len());
                Ok(saved)
            }
            Err(err) => {
                self.revert_all(pending).await;
                Err(err)
            }
        }
    }

    /// Deletes the record, then its image. A leftover image only logs a
    /// warning.
    pub async fn delete_receipt(&self, id: i64) -> ResultEngine<Receipt> {
        let _guard = self.receipt_locks.lock(&id).await;

        let receipt = self.receipt(id).await?;
        receipts::Entity::delete_by_id(id)
            .exec(&self.database)
            .await?;

        if !receipt.image_path.as_os_str().is_empty() {
            self.discard_image(receipt.image_path.clone()).await;
        }
        tracing::info!("deleted receipt {id}");
        Ok(receipt)
    }

    async fn write_all(&self, staged: &[Receipt]) -> ResultEngine<Vec<Receipt>> {
        let db_tx = self.database.begin().await?;
        let mut saved = Vec::with_capacity(staged.len());
        for receipt in staged {
            let model = receipts::ActiveModel::from(receipt).update(&db_tx).await?;
            saved.push(Receipt::try_from(model)?);
        }
        db_tx.commit().await?;
        Ok(saved)
    }

    async fn revert_all(&self, pending: Vec<PendingRelocation>) {
        for moved in pending.into_iter().rev() {
            self.revert_relocation(moved).await;
        }
    }

    /// Removes an image that no record points at.
    pub(crate) async fn discard_image(&self, path: PathBuf) {
        let target = path.clone();
        let result = blocking(move || {
            std::fs::remove_file(&target).map_err(|source| archive::ArchiveError::Write {
                path: target.clone(),
                source,
            })
        })
        .await;
        if let Err(err) = result {
            tracing::warn!("failed to discard image {}: {err}", path.display());
        }
    }
}

/// Field-level update of a receipt, keeping its invariants:
/// `used_at` is set iff `used`, `use_reason` only while used, totals stay
/// within `0..=MoneyCents::MAX_TOTAL` and the vendor is never blank.
pub(crate) fn apply_update(
    mut receipt: Receipt,
    update: &ReceiptUpdate,
    now: DateTime<Utc>,
) -> ResultEngine<Receipt> {
    if let Some(vendor) = update.vendor.as_deref() {
        receipt.vendor = normalize_required_text(vendor, "vendor")?;
    }
    if let Some(amount) = update.total_amount {
        receipt.total_amount = amount.ensure_receipt_total()?;
    }
    if let Some(date) = update.date {
        receipt.date = date;
    }
    if let Some(status) = update.hsa_status {
        receipt.hsa_status = status;
    }
    if let Some(used) = update.used {
        if used != receipt.used {
            receipt.used = used;
            receipt.used_at = used.then_some(now);
        }
    }
    if receipt.used {
        if let Some(reason) = update.use_reason.as_deref() {
            receipt.use_reason = normalize_optional_text(Some(reason));
        }
    } else {
        receipt.use_reason = None;
    }
    Ok(receipt)
}

fn needs_relocation(before: &Receipt, after: &Receipt) -> bool {
    before.used != after.used || (!after.used && before.date != after.date)
}
