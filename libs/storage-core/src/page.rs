//! Pagination envelope shared by both storage adapter backends.

use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct PageInfo {
    /// Opaque, caller-facing next-page URL, already absolute; populated by
    /// the handler once it knows the request's host and route template.
    pub next_page: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page: Option<String>) -> Self {
        Self {
            items,
            page_info: PageInfo { next_page },
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            page_info: PageInfo { next_page: None },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
