//! Typed tool arguments
//!
//! Each tool declares its input as a struct deriving `Deserialize` and
//! `JsonSchema`. [`schema_of`] turns that struct into the schema the model
//! sees and [`parse_arguments`] turns the model's JSON back into the struct.
//!
//! Models often send `"42"` or `42.0` where an integer is expected, so
//! numeric fields can opt into [`integer`] or [`number`], which accept both.

use crate::{Result, ToolError};
use schemars::JsonSchema;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Input schema of `T` as a plain JSON object
///
/// Generator metadata (`$schema`, `title`, top-level `description`) is
/// dropped; the tool's own description is sent alongside.
pub fn schema_of<T: JsonSchema>() -> Value {
    let mut schema = schemars::schema_for!(T).to_value();
    if let Some(object) = schema.as_object_mut() {
        for key in ["$schema", "title", "description"] {
            object.remove(key);
        }
    }
    schema
}

/// Deserialize the arguments of `tool`
///
/// A missing argument object counts as empty. Failures become
/// [`ToolError::InvalidArguments`] with serde's message as the detail.
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        detail: e.to_string(),
    })
}

/// Integer field that also accepts integral floats and numeric strings
pub fn integer<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}")))
}

/// Number field that also accepts numeric strings
pub fn number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("expected a number, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct LookupArgs {
        /// ID of the company
        #[serde(deserialize_with = "integer")]
        #[schemars(with = "i64")]
        company_id: i64,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct MarginArgs {
        /// Earnings before interest, taxes, depreciation and amortization
        #[serde(deserialize_with = "number")]
        #[schemars(with = "f64")]
        ebitda: f64,
        #[serde(deserialize_with = "number")]
        #[schemars(with = "f64")]
        revenue: f64,
    }

    #[test]
    fn test_schema_from_struct() {
        let schema = schema_of::<MarginArgs>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["ebitda", "revenue"]));
        assert_eq!(schema["properties"]["revenue"]["type"], "number");
        assert_eq!(
            schema["properties"]["ebitda"]["description"],
            "Earnings before interest, taxes, depreciation and amortization"
        );
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());

        let schema = schema_of::<LookupArgs>();
        assert_eq!(schema["properties"]["company_id"]["type"], "integer");
    }

    #[test]
    fn test_integers_from_floats_and_strings() {
        for raw in [json!(42), json!(42.0), json!("42"), json!(" 42 ")] {
            let args: LookupArgs = parse_arguments("lookup", json!({ "company_id": raw })).unwrap();
            assert_eq!(args.company_id, 42);
        }
    }

    #[test]
    fn test_numbers_from_strings() {
        let args: MarginArgs =
            parse_arguments("margin", json!({ "ebitda": "1000.5", "revenue": 4000 })).unwrap();
        assert_eq!(args.ebitda, 1000.5);
        assert_eq!(args.revenue, 4000.0);
    }

    #[test]
    fn test_invalid_arguments_name_the_tool() {
        let err = parse_arguments::<LookupArgs>("lookup", json!({ "company_id": 4.5 })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments for 'lookup': expected an integer, got 4.5"
        );

        let err = parse_arguments::<MarginArgs>("margin", json!({ "ebitda": "lots", "revenue": 1 }))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments for 'margin': expected a number, got \"lots\""
        );

        let err = parse_arguments::<LookupArgs>("lookup", Value::Null).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments for 'lookup': missing field `company_id`"
        );

        let err = parse_arguments::<LookupArgs>("lookup", json!("7")).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
