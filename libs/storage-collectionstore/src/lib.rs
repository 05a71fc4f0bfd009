//! In-memory simulation of a document/collection store (the shape of a
//! system like Google Cloud Firestore): entities addressed as documents
//! within a named collection, queried with a snapshot-index cursor rather
//! than the backing store's native key ordering.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use cursor_codec::{CursorCodec, CursorPayload, KmsClient};
use gateway_errors::{GatewayError, GatewayResult};
use parking_lot::RwLock;
use serde_json::Value as Json;
use spec_model::{results_item_tree, Comparison};
use storage_core::{AuditRecord, Page, PageAction, PageRequest, StorageAdapter, StorageRequest};

type Collection = BTreeMap<String, Json>;

/// Unlike `KeyStoreAdapter`'s native cursor, a cursor here is a snapshot
/// index: the position of the last-returned document within that request's
/// matching set, re-queried fresh on every call. A probe fetch of one extra
/// document past the page boundary decides whether `next_page` is set,
/// mirroring how a real document store answers "is there more" without a
/// separate count query.
pub struct CollectionStoreAdapter {
    collections: RwLock<std::collections::HashMap<String, Collection>>,
    kms: Arc<dyn KmsClient>,
    audit_enabled: bool,
}

impl CollectionStoreAdapter {
    pub fn new(kms: Arc<dyn KmsClient>) -> Self {
        Self::with_audit(kms, true)
    }

    /// `audit_enabled` mirrors `AUDIT_LOGS_NAME`: a non-empty name enables
    /// audit logging, an absent/empty one disables it entirely.
    pub fn with_audit(kms: Arc<dyn KmsClient>, audit_enabled: bool) -> Self {
        Self {
            collections: RwLock::new(std::collections::HashMap::new()),
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
impl StorageAdapter for CollectionStoreAdapter {
    async fn get_single(&self, req: &StorageRequest<'_>, id: &str) -> GatewayResult<Option<Json>> {
        let collections = self.collections.read();
        Ok(collections
            .get(req.table_name)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn put_single(&self, req: &StorageRequest<'_>, id: &str, body: Json) -> GatewayResult<Option<Json>> {
        let mut collections = self.collections.write();
        let collection = collections.entry(req.table_name.to_string()).or_default();
        let Some(existing) = collection.get(id).cloned() else {
            return Ok(None);
        };

        let mut merged = existing.clone();
        if let (Some(dst), Some(src)) = (merged.as_object_mut(), body.as_object()) {
            for (k, v) in src {
                dst.insert(k.clone(), v.clone());
            }
        }
        collection.insert(id.to_string(), merged.clone());
        drop(collections);

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
        let mut collections = self.collections.write();
        let collection = collections.entry(req.table_name.to_string()).or_default();
        collection.insert(id.clone(), body.clone());
        drop(collections);

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
        let collections = self.collections.read();
        let Some(collection) = collections.get(req.table_name) else {
            return Ok(Vec::new());
        };
        Ok(collection
            .iter()
            .filter(|(_, v)| matches_filters(v, req.filters))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn get_multiple_page(&self, req: &PageRequest<'_>) -> GatewayResult<Page<(String, Json)>> {
        results_item_tree(req.request.keys)?;

        let collections = self.collections.read();
        let Some(collection) = collections.get(req.request.table_name) else {
            return Ok(Page::empty());
        };

        let snapshot: Vec<(String, Json)> = collection
            .iter()
            .filter(|(_, v)| matches_filters(v, req.request.filters))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let codec = self.codec();
        let start_index = match &req.cursor {
            None => 0usize,
            Some(c) => {
                let payload = codec
                    .decode(c)
                    .ok_or_else(|| GatewayError::BadCursor("Cursor is not valid".to_string()))?;
                if payload.filter_hash != req.filter_hash {
                    return Err(GatewayError::BadCursor("Cursor is not valid".to_string()));
                }
                payload
                    .position
                    .parse::<usize>()
                    .map_err(|_| GatewayError::BadCursor("Cursor is not valid".to_string()))?
            }
        };

        let size = req.page_size.max(1) as usize;
        let (from, to) = match req.action {
            PageAction::Next => (start_index, start_index.saturating_add(size)),
            PageAction::Prev => (start_index.saturating_sub(size), start_index),
        };

        let page_items: Vec<(String, Json)> = snapshot
            .iter()
            .skip(from)
            .take(to.saturating_sub(from))
            .cloned()
            .collect();

        // Probe one document past the page boundary to decide next_page.
        let has_more = snapshot.len() > to;
        let next_page = if has_more {
            Some(codec.encode(&CursorPayload {
                position: to.to_string(),
                filter_hash: req.filter_hash.clone(),
            }))
        } else {
            None
        };

        Ok(Page::new(page_items, next_page))
    }

    async fn process_audit_logging(&self, record: AuditRecord) {
        if !self.audit_enabled || record.attributes_changed.is_empty() {
            return;
        }
        tracing::info!(
            table = %record.table_name,
            id = %record.table_id,
            changes = record.attributes_changed.len(),
            "audit record"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cursor_codec::{hash_filters, NullKms};
    use serde_json::json;
    use spec_model::{Node, ProjectionTree};

    fn adapter() -> CollectionStoreAdapter {
        CollectionStoreAdapter::new(Arc::new(NullKms))
    }

    fn keys() -> ProjectionTree {
        ProjectionTree::new()
    }

    /// A list/page response schema's projection tree always wraps its item
    /// shape under `results`.
    fn page_keys() -> ProjectionTree {
        let mut tree = ProjectionTree::new();
        tree.insert(
            "results".to_string(),
            Node::Inner {
                target: vec!["results".to_string()],
                properties: ProjectionTree::new(),
            },
        );
        tree
    }

    #[tokio::test]
    async fn audit_disabled_still_serves_writes() {
        let adapter = CollectionStoreAdapter::with_audit(Arc::new(NullKms), false);
        let keys = keys();
        let req = StorageRequest {
            table_name: "Widget",
            table_id: "id",
            keys: &keys,
            filters: &[],
        };
        let (id, _) = adapter
            .post_single(&req, json!({"name": "bolt"}))
            .await
            .unwrap();
        let fetched = adapter.get_single(&req, &id).await.unwrap().unwrap();
        assert_eq!(fetched["name"], json!("bolt"));
    }

    #[tokio::test]
    async fn probe_query_detects_next_page() {
        let adapter = adapter();
        let keys = page_keys();
        let req = StorageRequest {
            table_name: "Widget",
            table_id: "id",
            keys: &keys,
            filters: &[],
        };
        for i in 0..5 {
            adapter.post_single(&req, json!({"n": i})).await.unwrap();
        }

        let page_req = PageRequest {
            request: req.clone(),
            cursor: None,
            page_size: 2,
            action: PageAction::Next,
            filter_hash: hash_filters(&[]),
        };
        let first = adapter.get_multiple_page(&page_req).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.page_info.next_page.is_some());

        let page_req_2 = PageRequest {
            request: req,
            cursor: first.page_info.next_page,
            page_size: 2,
            action: PageAction::Next,
            filter_hash: hash_filters(&[]),
        };
        let second = adapter.get_multiple_page(&page_req_2).await.unwrap();
        assert_eq!(second.items.len(), 2);
    }

    #[tokio::test]
    async fn last_page_has_no_next_page() {
        let adapter = adapter();
        let keys = page_keys();
        let req = StorageRequest {
            table_name: "Widget",
            table_id: "id",
            keys: &keys,
            filters: &[],
        };
        for i in 0..3 {
            adapter.post_single(&req, json!({"n": i})).await.unwrap();
        }
        let page_req = PageRequest {
            request: req,
            cursor: None,
            page_size: 10,
            action: PageAction::Next,
            filter_hash: hash_filters(&[]),
        };
        let page = adapter.get_multiple_page(&page_req).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.page_info.next_page.is_none());
    }

    #[tokio::test]
    async fn cursor_bound_to_different_filter_hash_is_rejected() {
        let adapter = adapter();
        let keys = page_keys();
        let req = StorageRequest {
            table_name: "Widget",
            table_id: "id",
            keys: &keys,
            filters: &[],
        };
        adapter.post_single(&req, json!({"n": 1})).await.unwrap();

        let page_req = PageRequest {
            request: req.clone(),
            cursor: None,
            page_size: 1,
            action: PageAction::Next,
            filter_hash: hash_filters(&["a".to_string()]),
        };
        let first = adapter.get_multiple_page(&page_req).await.unwrap();
        let cursor = first.page_info.next_page;

        if let Some(cursor) = cursor {
            let page_req_2 = PageRequest {
                request: req,
                cursor: Some(cursor),
                page_size: 1,
                action: PageAction::Next,
                filter_hash: hash_filters(&["b".to_string()]),
            };
            let err = adapter.get_multiple_page(&page_req_2).await.unwrap_err();
            assert!(matches!(err, GatewayError::BadCursor(_)));
        }
    }

    #[tokio::test]
    async fn get_multiple_page_without_results_key_is_validation_failed() {
        let adapter = adapter();
        let keys = keys();
        let req = StorageRequest {
            table_name: "Widget",
            table_id: "id",
            keys: &keys,
            filters: &[],
        };
        let page_req = PageRequest {
            request: req,
            cursor: None,
            page_size: 2,
            action: PageAction::Next,
            filter_hash: hash_filters(&[]),
        };
        let err = adapter.get_multiple_page(&page_req).await.unwrap_err();
        assert!(matches!(err, GatewayError::ValidationFailed(msg) if msg.contains("results")));
    }
}
