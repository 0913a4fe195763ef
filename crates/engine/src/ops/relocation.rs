//! Two-step image relocation.
//!
//! Changing where a receipt image lives is done in two phases:
//!
//! 1. [`Engine::stage_relocation`] moves the file on disk and returns a
//!    [`PendingRelocation`]. Between phase 1 and phase 2 the file is at its new
//!    path while the database still records the old one.
//! 2. The caller persists the receipt with the new path. On success the pending
//!    relocation is simply dropped; on failure it is handed to
//!    [`Engine::revert_relocation`], which moves the file back.
//!
//! If phase 1 fails nothing is persisted, so the stored path and the file
//! stay consistent with each other.

use std::path::PathBuf;

use sea_orm::{ActiveModelTrait, ConnectionTrait};

use crate::{EngineError, Receipt, ResultEngine, archive, receipts};

use super::{Engine, blocking};

/// A file move that happened on disk but is not recorded yet.
#[derive(Debug)]
#[must_use = "a staged relocation must be committed or reverted"]
pub(crate) struct PendingRelocation {
    pub(crate) receipt_id: i64,
    pub(crate) from: PathBuf,
    pub(crate) to: PathBuf,
}

impl Engine {
    /// Phase 1: move `receipt`'s image to the canonical path for its current
    /// usage flag and archive year, updating `receipt.image_path`.
    ///
    /// Returns `None` when no move was needed (already in place, or no image).
    pub(crate) async fn stage_relocation(
        &self,
        receipt: &mut Receipt,
    ) -> ResultEngine<Option<PendingRelocation>> {
        if receipt.image_path.as_os_str().is_empty() {
            return Ok(None);
        }
        let filename = receipt
            .file_name()
            .ok_or_else(|| {
                EngineError::InvalidReceipt(format!(
                    "receipt {} has an unusable image path",
                    receipt.id
                ))
            })?
            .to_string();

        let year = receipt.archive_year();
        let used = receipt.used;
        let expected = self.archive.path_for(used, year, &filename);
        if expected == receipt.image_path {
            return Ok(None);
        }

        let from = receipt.image_path.clone();
        let root = self.archive.root().to_path_buf();
        let source = from.clone();
        let to = blocking(move || archive::relocate(&source, &root, year, &filename, used)).await?;

        tracing::info!(
            "moved receipt {} image to {}: {}",
            receipt.id,
            if used { archive::USED_DIR } else { archive::UNUSED_DIR },
            to.display()
        );
        receipt.image_path = to.clone();
        Ok(Some(PendingRelocation {
            receipt_id: receipt.id,
            from,
            to,
        }))
    }

    /// Undo a staged relocation after its metadata write failed.
    ///
    /// Best effort: a failure here is logged, and leaves the file at the new
    /// path while the database points at the old one.
    pub(crate) async fn revert_relocation(&self, pending: PendingRelocation) {
        let PendingRelocation {
            receipt_id,
            from,
            to,
        } = pending;
        let (source, target) = (to.clone(), from.clone());
        match blocking(move || archive::move_file(&source, &target)).await {
            Ok(()) => tracing::warn!(
                "reverted image move of receipt {receipt_id} back to {}",
                from.display()
            ),
            Err(err) => tracing::error!(
                "receipt {receipt_id}: image left at {} while the record points at {}: {err}",
                to.display(),
                from.display()
            ),
        }
    }

    /// Phase 2 for a single receipt: persist it, reverting the staged move if
    /// the write fails.
    pub(crate) async fn commit_receipt<C: ConnectionTrait>(
        &self,
        db: &C,
        receipt: &Receipt,
        pending: Option<PendingRelocation>,
    ) -> ResultEngine<Receipt> {
        match receipts::ActiveModel::from(receipt).update(db).await {
            Ok(model) => Receipt::try_from(model),
            Err(err) => {
                if let Some(pending) = pending {
                    self.revert_relocation(pending).await;
                }
                Err(err.into())
            }
        }
    }
}
