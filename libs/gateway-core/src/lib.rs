//! The generic dispatch engine: one handler implementation answering every
//! route the loaded OpenAPI document describes, plus the ambient
//! collaborator seams (identity, content negotiation) it depends on.

pub mod coerce;
pub mod format;
pub mod handler;
pub mod identity;

pub use format::{ContentFormatter, CsvFormatter, FormatError, UnsupportedFormatter};
pub use handler::{GenericHandler, PaginationParams};
pub use identity::{HeaderIdentityProvider, IdentityProvider};
