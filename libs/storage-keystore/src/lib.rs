//! In-memory simulation of a key/kind store (the shape of a system like
//! Google Cloud Datastore): entities addressed by `(kind, id)`, queried with
//! a native ascending/descending cursor rather than an offset.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use cursor_codec::{hash_filters, CursorCodec, CursorPayload, KmsClient};
use gateway_errors::{GatewayError, GatewayResult};
use parking_lot::RwLock;
use serde_json::Value as Json;
use spec_model::{results_item_tree, Comparison};
use storage_core::{
    AttributeChange, AuditRecord, Page, PageAction, PageRequest, StorageAdapter, StorageRequest,
};
use tracing::warn;

type Kind = BTreeMap<String, Json>;

/// `parking_lot::RwLock` guards every kind's table; there is no cross-kind
/// lock and no transaction spanning multiple operations, matching the
/// adapter trait's one-call-at-a-time contract.
pub struct KeyStoreAdapter {
    kinds: RwLock<std::collections::HashMap<String, Kind>>,
    kms: Arc<dyn KmsClient>,
    audit_enabled: bool,
}

impl KeyStoreAdapter {
    pub fn new(kms: Arc<dyn KmsClient>) -> Self {
        Self::with_audit(kms, true)
    }

    /// `audit_enabled` mirrors `AUDIT_LOGS_NAME`: a non-empty name enables
    /// audit logging, an absent/empty one disables it entirely.
    pub fn with_audit(kms: Arc<dyn KmsClient>, audit_enabled: bool) -> Self {
        Self {
            kinds: RwLock::new(std::collections::HashMap::new()),
            kms,
            audit_enabled,
        }
    }

    fn codec(&self) -> CursorCodec<'_> {
        CursorCodec::new(self.kms.as_ref())
    }
}

fn matches_filters(entity: &Json, filters: &[storage_core::StoredFilter]) -> bool {
    filters.iter().all(|f| {
        let actual = lookup(entity, &f.field);
        compare(f.comparison, actual, &f.value)
    })
}

fn lookup<'a>(entity: &'a Json, dotted: &str) -> Option<&'a Json> {
    let mut cur = entity;
    for segment in dotted.split('.') {
        cur = cur.get(segment)?;
    }
    Some(cur)
}

fn compare(comparison: Comparison, actual: Option<&Json>, expected: &Json) -> bool {
    let Some(actual) = actual else { return false };
    match comparison {
        Comparison::Eq => actual == expected,
        Comparison::Ne => actual != expected,
        Comparison::Lt | Comparison::Le | Comparison::Gt | Comparison::Ge => {
            match (actual.as_f64(), expected.as_f64()) {
                (Some(a), Some(b)) => match comparison {
                    Comparison::Lt => a < b,
                    Comparison::Le => a <= b,
                    Comparison::Gt => a > b,
                    Comparison::Ge => a >= b,
                    _ => unreachable!(),
                },
                _ => false,
            }
        }
    }
}

#[async_trait]
impl StorageAdapter for KeyStoreAdapter {
    async fn get_single(&self, req: &StorageRequest<'_>, id: &str) -> GatewayResult<Option<Json>> {
        let kinds = self.kinds.read();
        Ok(kinds
            .get(req.table_name)
            .and_then(|kind| kind.get(id))
            .cloned())
    }

    async fn put_single(&self, req: &StorageRequest<'_>, id: &str, body: Json) -> GatewayResult<Option<Json>> {
        let mut kinds = self.kinds.write();
        let kind = kinds.entry(req.table_name.to_string()).or_default();
        let Some(existing) = kind.get(id).cloned() else {
            return Ok(None);
        };

        let mut merged = existing.clone();
        if let (Some(dst), Some(src)) = (merged.as_object_mut(), body.as_object()) {
            for (k, v) in src {
                dst.insert(k.clone(), v.clone());
            }
        }
        kind.insert(id.to_string(), merged.clone());
        drop(kinds);

        self.process_audit_logging(AuditRecord {
            table_name: req.table_name.to_string(),
            table_id: id.to_string(),
            attributes_changed: storage_core::diff(&existing, &merged),
            timestamp: Utc::now(),
            user: None,
        })
        .await;

        Ok(Some(merged))
    }

    async fn post_single(&self, req: &StorageRequest<'_>, body: Json) -> GatewayResult<(String, Json)> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut kinds = self.kinds.write();
        let kind = kinds.entry(req.table_name.to_string()).or_default();
        kind.insert(id.clone(), body.clone());
        drop(kinds);

        self.process_audit_logging(AuditRecord {
            table_name: req.table_name.to_string(),
            table_id: id.clone(),
            attributes_changed: storage_core::diff(&Json::Object(Default::default()), &body),
            timestamp: Utc::now(),
            user: None,
        })
        .await;

        Ok((id, body))
    }

    async fn get_multiple(&self, req: &StorageRequest<'_>) -> GatewayResult<Vec<(String, Json)>> {
        let kinds = self.kinds.read();
        let Some(kind) = kinds.get(req.table_name) else {
            return Ok(Vec::new());
        };
        Ok(kind
            .iter()
            .filter(|(_, v)| matches_filters(v, req.filters))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn get_multiple_page(&self, req: &PageRequest<'_>) -> GatewayResult<Page<(String, Json)>> {
        results_item_tree(req.request.keys)?;

        let kinds = self.kinds.read();
        let Some(kind) = kinds.get(req.request.table_name) else {
            return Ok(Page::empty());
        };

        // Native key order is descending, matching a Datastore-style kind
        // scan; `next` walks toward smaller keys, `prev` back toward larger
        // ones.
        let mut matching: Vec<(&String, &Json)> = kind
            .iter()
            .filter(|(_, v)| matches_filters(v, req.request.filters))
            .collect();
        matching.sort_by(|a, b| b.0.cmp(a.0));

        let codec = self.codec();
        let position = match &req.cursor {
            None => None,
            Some(c) => {
                let payload = codec
                    .decode(c)
                    .ok_or_else(|| GatewayError::BadCursor("Cursor is not valid".to_string()))?;
                if payload.filter_hash != req.filter_hash {
                    return Err(GatewayError::BadCursor("Cursor is not valid".to_string()));
                }
                Some(payload.position)
            }
        };

        let size = req.page_size.max(1) as usize;
        let page_ids: Vec<(&String, &Json)> = match (req.action, &position) {
            (PageAction::Next, None) => matching.into_iter().take(size).collect(),
            (PageAction::Next, Some(after)) => matching
                .into_iter()
                .skip_while(|(k, _)| k.as_str() >= after.as_str())
                .take(size)
                .collect(),
            // No page precedes the first; mirrors the forward default of
            // "no cursor -> first page" rather than erroring.
            (PageAction::Prev, None) => Vec::new(),
            (PageAction::Prev, Some(before)) => {
                let mut candidates: Vec<_> = matching
                    .into_iter()
                    .take_while(|(k, _)| k.as_str() >= before.as_str())
                    .collect();
                let start = candidates.len().saturating_sub(size);
                candidates.split_off(start)
            }
        };

        let next_page = page_ids.last().map(|(id, _)| {
            codec.encode(&CursorPayload {
                position: id.to_string(),
                filter_hash: req.filter_hash.clone(),
            })
        });

        let items = page_ids
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Page::new(items, next_page))
    }

    async fn process_audit_logging(&self, record: AuditRecord) {
        if !self.audit_enabled || record.attributes_changed.is_empty() {
            return;
        }
        log_audit_record(&record);
    }
}

fn log_audit_record(record: &AuditRecord) {
    tracing::info!(
        table = %record.table_name,
        id = %record.table_id,
        changes = record.attributes_changed.len(),
        "audit record"
    );
    let _: &[AttributeChange] = &record.attributes_changed;
}
