use serde::Serialize;

use crate::{EngineError, MoneyCents, Receipt, ResultEngine, selection::select_capped};

use super::{Engine, blocking};

/// Receipts chosen to cover a deduction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// In eligible order (newest purchase first).
    pub receipts: Vec<Receipt>,
    pub total: MoneyCents,
    pub target: MoneyCents,
}

impl Selection {
    /// What the selected receipts leave uncovered.
    pub fn remainder(&self) -> MoneyCents {
        self.target - self.total
    }
}

impl Engine {
    /// Picks the unused eligible receipts whose totals come closest to
    /// `target` without exceeding it. Nothing is marked used here: the caller
    /// confirms with [`Engine::mark_used`].
    pub async fn deduct(
        &self,
        household: Option<&str>,
        target: MoneyCents,
    ) -> ResultEngine<Selection> {
        if target.is_negative() {
            return Err(EngineError::InvalidAmount(
                "deduction amount must not be negative".to_string(),
            ));
        }

        // Zero totals can never reduce the remainder.
        let candidates: Vec<Receipt> = self
            .eligible_receipts(household)
            .await?
            .into_iter()
            .filter(|receipt| receipt.total_amount.is_positive())
            .collect();
        let amounts: Vec<MoneyCents> = candidates.iter().map(|r| r.total_amount).collect();

        let limit = self.max_candidates;
        let indices = blocking(move || select_capped(&amounts, target, limit)).await?;
        let receipts: Vec<Receipt> = indices.iter().map(|&i| candidates[i].clone()).collect();
        let total = receipts.iter().map(|r| r.total_amount).sum();

        tracing::info!(
            "deduction of {target}: {} of {} eligible receipts, total {total}",
            receipts.len(),
            candidates.len()
        );
        Ok(Selection {
            receipts,
            total,
            target,
        })
    }
}
