//! Enforces server-imposed row-level predicates against an already-loaded
//! entity. Forced filters never touch the storage query itself here — they
//! gate whether the caller is allowed to see/keep what was already fetched.

use gateway_errors::{GatewayError, GatewayResult};
use serde_json::Value as Json;
use spec_model::filters::{Comparison, ForcedFilter, ForcedValue};

/// Resolved caller context a forced filter's `_UPN`/`_IP` directives bind to.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub upn: Option<String>,
    pub ip: Option<String>,
}

/// Validates every forced filter against `entity`. An empty filter list
/// always succeeds. A `None` entity with a non-empty filter list is a 400 —
/// there is nothing to check a predicate against. Any filter that evaluates
/// false is a 401, never a 404: the caller sees that *something* exists at
/// that identifier, just not that they may have it.
pub fn validate(
    filters: &[ForcedFilter],
    entity: Option<&Json>,
    caller: &CallerContext,
) -> GatewayResult<()> {
    if filters.is_empty() {
        return Ok(());
    }

    let entity = entity.ok_or_else(|| {
        GatewayError::ValidationFailed("entity required to evaluate forced filters".to_string())
    })?;

    for filter in filters {
        if !evaluate(filter, entity, caller) {
            return Err(GatewayError::Unauthorized("Unauthorized request".to_string()));
        }
    }

    Ok(())
}

fn evaluate(filter: &ForcedFilter, entity: &Json, caller: &CallerContext) -> bool {
    let actual = entity.get(&filter.field);

    let expected = match &filter.value {
        ForcedValue::Upn => caller.upn.as_deref().map(|s| Json::String(s.to_string())),
        ForcedValue::Ip => caller.ip.as_deref().map(|s| Json::String(s.to_string())),
        ForcedValue::NotExisting => return actual.is_none() || actual == Some(&Json::Null),
        ForcedValue::Literal(v) => Some(v.clone()),
    };

    match (actual, expected) {
        (Some(actual), Some(expected)) => compare(filter.comparison, actual, &expected),
        _ => false,
    }
}

fn compare(comparison: Comparison, actual: &Json, expected: &Json) -> bool {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upn_filter() -> ForcedFilter {
        ForcedFilter {
            field: "owner".to_string(),
            comparison: Comparison::Eq,
            value: ForcedValue::Upn,
        }
    }

    #[test]
    fn empty_filters_always_pass() {
        assert!(validate(&[], None, &CallerContext::default()).is_ok());
    }

    #[test]
    fn null_entity_with_filters_is_validation_failure() {
        let err = validate(&[upn_filter()], None, &CallerContext::default()).unwrap_err();
        assert!(matches!(err, GatewayError::ValidationFailed(_)));
    }

    #[test]
    fn matching_upn_passes() {
        let entity = json!({"owner": "alice@example.com"});
        let caller = CallerContext { upn: Some("alice@example.com".to_string()), ip: None };
        assert!(validate(&[upn_filter()], Some(&entity), &caller).is_ok());
    }

    #[test]
    fn mismatched_upn_is_unauthorized() {
        let entity = json!({"owner": "alice@example.com"});
        let caller = CallerContext { upn: Some("bob@example.com".to_string()), ip: None };
        let err = validate(&[upn_filter()], Some(&entity), &caller).unwrap_err();
        match err {
            GatewayError::Unauthorized(msg) => assert_eq!(msg, "Unauthorized request"),
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn not_existing_directive_passes_when_field_absent() {
        let filter = ForcedFilter {
            field: "deleted_at".to_string(),
            comparison: Comparison::Eq,
            value: ForcedValue::NotExisting,
        };
        let entity = json!({"owner": "alice"});
        assert!(validate(&[filter], Some(&entity), &CallerContext::default()).is_ok());
    }
}
