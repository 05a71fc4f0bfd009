//! The single interface the generic handler dispatches against, regardless
//! of which concrete backing store answers it.

use async_trait::async_trait;
use gateway_errors::GatewayResult;
use serde_json::Value as Json;
use spec_model::ProjectionTree;

use crate::audit::AuditRecord;
use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Next,
    Prev,
}

impl PageAction {
    pub fn from_str(raw: &str) -> Self {
        match raw {
            "prev" => PageAction::Prev,
            _ => PageAction::Next,
        }
    }
}

/// One resolved query-filter predicate, ready to be applied against the
/// backing store's native filtering facility.
#[derive(Debug, Clone)]
pub struct StoredFilter {
    pub field: String,
    pub comparison: spec_model::Comparison,
    pub value: Json,
}

/// Backing-store-agnostic view of what a generic operation needs: which
/// kind/collection, what the response should be shaped like, and the
/// resolved filters (query + forced) to apply.
#[derive(Debug, Clone)]
pub struct StorageRequest<'a> {
    pub table_name: &'a str,
    pub table_id: &'a str,
    pub keys: &'a ProjectionTree,
    pub filters: &'a [StoredFilter],
}

#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    pub request: StorageRequest<'a>,
    pub cursor: Option<String>,
    pub page_size: u32,
    pub action: PageAction,
    pub filter_hash: String,
}

/// Implemented once per backing store family. All operations return
/// storage-shaped (nested) JSON; translating to/from the wire-flat entity
/// shape is the caller's job via the `entity` crate.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get_single(&self, req: &StorageRequest<'_>, id: &str) -> GatewayResult<Option<Json>>;

    async fn put_single(&self, req: &StorageRequest<'_>, id: &str, body: Json) -> GatewayResult<Option<Json>>;

    async fn post_single(&self, req: &StorageRequest<'_>, body: Json) -> GatewayResult<(String, Json)>;

    async fn get_multiple(&self, req: &StorageRequest<'_>) -> GatewayResult<Vec<(String, Json)>>;

    async fn get_multiple_page(&self, req: &PageRequest<'_>) -> GatewayResult<Page<(String, Json)>>;

    /// Best-effort; implementations log and swallow their own failures
    /// rather than propagate them to the caller.
    async fn process_audit_logging(&self, record: AuditRecord);
}
