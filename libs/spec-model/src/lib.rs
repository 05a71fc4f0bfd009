//! Parses the OpenAPI document once at startup into the normalized shapes
//! the rest of the gateway dispatches against: path -> table/schema
//! bindings, projection trees, and query/forced filters.

pub mod context;
pub mod filters;
pub mod loader;
pub mod projection;
pub mod route;

pub use context::RequestContext;
pub use filters::{Comparison, ForcedFilter, ForcedValue, QueryFilter};
pub use loader::{SpecDocument, SpecError};
pub use projection::{find_table_id, project, results_item_tree, Node, ProjectionTree};
pub use route::{normalize_path_template, pagination_base_segment, resolve_route, Method, ResolvedRoute};
