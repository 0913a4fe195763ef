use std::path::PathBuf;

use sea_orm::DatabaseConnection;

use crate::{
    EngineError, Receipt, ResultEngine,
    archive::Archive,
    locks::KeyedLocks,
    selection::DEFAULT_MAX_CANDIDATES,
};

mod audit;
mod deduct;
mod receipts;
mod relocation;
mod upload;

pub use audit::ArchiveCheck;
pub use deduct::Selection;
pub use upload::UploadOutcome;

/// Owner used when a request does not name a household.
pub const DEFAULT_HOUSEHOLD: &str = "household";

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    archive: Archive,
    household: String,
    max_candidates: usize,
    receipt_locks: KeyedLocks<i64>,
    upload_locks: KeyedLocks<String>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The household new uploads are assigned to.
    pub fn household(&self) -> &str {
        &self.household
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    fn resolve_household<'a>(&'a self, household: Option<&'a str>) -> &'a str {
        household
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(self.household.as_str())
    }
}

/// Run blocking work (archive I/O, the selection search) off the async
/// executor.
async fn blocking<T, E, F>(f: F) -> ResultEngine<T>
where
    T: Send + 'static,
    E: Into<EngineError> + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| EngineError::Internal(format!("blocking task failed: {err}")))?
        .map_err(Into::into)
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidReceipt(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn receipts_from_models(models: Vec<crate::receipts::Model>) -> ResultEngine<Vec<Receipt>> {
    models.into_iter().map(Receipt::try_from).collect()
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    storage_root: Option<PathBuf>,
    household: String,
    max_candidates: usize,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            storage_root: None,
            household: DEFAULT_HOUSEHOLD.to_string(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Root of the receipt image archive (required).
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> EngineBuilder {
        self.storage_root = Some(root.into());
        self
    }

    pub fn household(mut self, household: impl Into<String>) -> EngineBuilder {
        self.household = household.into();
        self
    }

    /// Largest number of eligible receipts a deduction will search over.
    pub fn max_candidates(mut self, limit: usize) -> EngineBuilder {
        self.max_candidates = limit;
        self
    }

    /// Construct `Engine`, creating the archive layout if needed.
    pub async fn build(self) -> ResultEngine<Engine> {
        let root = self.storage_root.ok_or_else(|| {
            EngineError::InvalidReceipt("storage root is required".to_string())
        })?;
        let household = normalize_required_text(&self.household, "household")?;

        let archive = Archive::new(root);
        let layout = archive.clone();
        blocking(move || layout.ensure_layout()).await?;
        tracing::info!("receipt archive ready at {}", archive.root().display());

        Ok(Engine {
            database: self.database,
            archive,
            household,
            max_candidates: self.max_candidates,
            receipt_locks: KeyedLocks::new(),
            upload_locks: KeyedLocks::new(),
        })
    }
}
