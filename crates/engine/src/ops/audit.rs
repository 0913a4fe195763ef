//! Reconciliation of the archive against stored image paths.
//!
//! A crash between the two relocation phases, or a failed revert, can leave a
//! record pointing at a path its file no longer lives at. The audit reports
//! such records and the repair moves existing files back in line.

use std::path::PathBuf;

use serde::Serialize;

use crate::{Receipt, ResultEngine};

use super::Engine;

/// Archive state of one receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArchiveCheck {
    pub receipt_id: i64,
    pub current: PathBuf,
    /// `None` when the stored path has no usable file name.
    pub expected: Option<PathBuf>,
    /// Whether a file exists at `current`.
    pub exists: bool,
}

impl ArchiveCheck {
    pub fn is_consistent(&self) -> bool {
        self.exists && self.expected.as_ref() == Some(&self.current)
    }
}

impl Engine {
    /// Checks every receipt, across all households.
    pub async fn audit_archive(&self) -> ResultEngine<Vec<ArchiveCheck>> {
        let receipts = self.all_receipts().await?;
        let mut checks = Vec::with_capacity(receipts.len());
        for receipt in &receipts {
            checks.push(self.check(receipt).await);
        }
        let misplaced = checks.iter().filter(|c| !c.is_consistent()).count();
        tracing::info!("audited {} receipts, {misplaced} inconsistent", checks.len());
        Ok(checks)
    }

    /// Moves misplaced images that still exist to their canonical path and
    /// returns the repaired receipts. Missing files are only reported.
    pub async fn repair_archive(&self) -> ResultEngine<Vec<Receipt>> {
        let mut repaired = Vec::new();
        for check in self.audit_archive().await? {
            if check.is_consistent() {
                continue;
            }
            if !check.exists {
                tracing::warn!(
                    "receipt {} image is missing at {}",
                    check.receipt_id,
                    check.current.display()
                );
                continue;
            }
            if check.expected.is_none() {
                tracing::warn!(
                    "receipt {} has an unusable image path {}",
                    check.receipt_id,
                    check.current.display()
                );
                continue;
            }

            let _guard = self.receipt_locks.lock(&check.receipt_id).await;
            let mut receipt = self.receipt(check.receipt_id).await?;
            let pending = self.stage_relocation(&mut receipt).await?;
            repaired.push(self.commit_receipt(&self.database, &receipt, pending).await?);
        }
        tracing::info!("repaired {} receipt images", repaired.len());
        Ok(repaired)
    }

    async fn check(&self, receipt: &Receipt) -> ArchiveCheck {
        let expected = receipt
            .file_name()
            .map(|name| self.archive.path_for(receipt.used, receipt.archive_year(), name));
        let exists = !receipt.image_path.as_os_str().is_empty()
            && tokio::fs::try_exists(&receipt.image_path)
                .await
                .unwrap_or(false);
        ArchiveCheck {
            receipt_id: receipt.id,
            current: receipt.image_path.clone(),
            expected,
            exists,
        }
    }
}
