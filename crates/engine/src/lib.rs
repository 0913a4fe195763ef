//! Receipt archive engine.
//!
//! Holds the receipt model and its persistence, the image archive, duplicate
//! detection and the deduction selection, and exposes them through [`Engine`].

pub use archive::{Archive, ArchiveError};
pub use commands::{ReceiptUpdate, UploadCmd};
pub use duplicates::{Duplicate, DuplicateKind, content_digest};
pub use error::EngineError;
pub use extraction::{Extraction, ReceiptExtractor};
pub use money::MoneyCents;
pub use ops::{ArchiveCheck, DEFAULT_HOUSEHOLD, Engine, EngineBuilder, Selection, UploadOutcome};
pub use receipts::{HsaStatus, Receipt, content_type_for};
pub use selection::{DEFAULT_MAX_CANDIDATES, MAX_SELECTION_INPUT, select, select_capped};

pub mod archive;
mod commands;
mod duplicates;
mod error;
mod extraction;
mod locks;
mod money;
mod ops;
pub mod receipts;
mod selection;

type ResultEngine<T> = Result<T, EngineError>;
