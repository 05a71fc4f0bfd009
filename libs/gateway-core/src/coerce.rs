//! Coerces raw query-string values into typed JSON per the query filter's
//! declared schema type (and, for strings, `date`/`date-time` format), ahead
//! of handing them to a storage adapter.

use chrono::{DateTime, NaiveDate, Utc};
use gateway_errors::{GatewayError, GatewayResult};
use serde_json::Value as Json;

pub fn coerce_query_value(
    raw: &str,
    schema_type: &str,
    schema_format: Option<&str>,
    param_name: &str,
) -> GatewayResult<Json> {
    let bad_type = || {
        GatewayError::ValidationFailed(format!(
            "value {raw} for query param {param_name} is not of type {schema_type}"
        ))
    };

    match schema_type {
        "string" => match schema_format {
            Some("date-time") => raw
                .parse::<DateTime<Utc>>()
                .map(|dt| Json::String(dt.to_rfc3339()))
                .map_err(|_| bad_type()),
            Some("date") => raw
                .parse::<NaiveDate>()
                .map(|d| Json::String(d.to_string()))
                .map_err(|_| bad_type()),
            _ => Ok(Json::String(raw.to_string())),
        },
        "integer" => raw
            .parse::<i64>()
            .map(Json::from)
            .map_err(|_| bad_type()),
        "number" => raw
            .parse::<f64>()
            .map(Json::from)
            .map_err(|_| bad_type()),
        "boolean" => match raw {
            "true" | "1" | "yes" => Ok(Json::Bool(true)),
            "false" | "0" | "no" => Ok(Json::Bool(false)),
            _ => Err(bad_type()),
        },
        _ => Err(bad_type()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_integer() {
        assert_eq!(coerce_query_value("42", "integer", None, "count").unwrap(), Json::from(42));
    }

    #[test]
    fn rejects_non_integer() {
        let err = coerce_query_value("nope", "integer", None, "count").unwrap_err();
        match err {
            GatewayError::ValidationFailed(msg) => {
                assert_eq!(msg, "value nope for query param count is not of type integer")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn boolean_accepts_documented_synonyms() {
        assert_eq!(coerce_query_value("yes", "boolean", None, "active").unwrap(), Json::Bool(true));
        assert_eq!(coerce_query_value("0", "boolean", None, "active").unwrap(), Json::Bool(false));
    }

    #[test]
    fn boolean_rejects_other_tokens() {
        assert!(coerce_query_value("maybe", "boolean", None, "active").is_err());
    }

    #[test]
    fn date_time_format_parses_rfc3339() {
        let value = coerce_query_value("2026-01-02T03:04:05Z", "string", Some("date-time"), "since").unwrap();
        assert_eq!(value, Json::String("2026-01-02T03:04:05+00:00".to_string()));
    }

    #[test]
    fn date_time_format_rejects_malformed_input() {
        assert!(coerce_query_value("not-a-date", "string", Some("date-time"), "since").is_err());
    }

    #[test]
    fn date_format_parses_plain_date() {
        let value = coerce_query_value("2026-01-02", "string", Some("date"), "on").unwrap();
        assert_eq!(value, Json::String("2026-01-02".to_string()));
    }

    #[test]
    fn plain_string_without_format_passes_through() {
        assert_eq!(
            coerce_query_value("owner-a", "string", None, "owner").unwrap(),
            Json::String("owner-a".to_string())
        );
    }
}
