//! Per-type column decoders for text encoded values
//!
//! Every decoder is total: a value it cannot parse becomes `Nil` instead of
//! failing the row.

use chrono::{DateTime, NaiveDateTime, SecondsFormat};

use crate::script::ScriptValue;

/// Converts one column's raw text into a script value
pub type Decoder = fn(&str) -> ScriptValue;

/// Pick the decoder for a Postgres type name
pub fn decoder_for(type_name: &str) -> Decoder {
    match type_name {
        "BOOL" => decode_bool,
        "INT2" | "INT4" | "INT8" | "OID" | "FLOAT4" | "FLOAT8" | "NUMERIC" => decode_number,
        "TIMESTAMPTZ" => decode_timestamptz,
        "TIMESTAMP" => decode_timestamp,
        "JSON" | "JSONB" => decode_json,
        _ => decode_text,
    }
}

pub fn decode_text(raw: &str) -> ScriptValue {
    ScriptValue::String(raw.to_string())
}

pub fn decode_bool(raw: &str) -> ScriptValue {
    match raw {
        "t" | "true" => ScriptValue::Bool(true),
        "f" | "false" => ScriptValue::Bool(false),
        _ => ScriptValue::Nil,
    }
}

pub fn decode_number(raw: &str) -> ScriptValue {
    raw.trim()
        .parse::<f64>()
        .map(ScriptValue::Number)
        .unwrap_or(ScriptValue::Nil)
}

/// `2024-03-01 12:00:00.5+02` -> `2024-03-01T10:00:00.500Z`
pub fn decode_timestamptz(raw: &str) -> ScriptValue {
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z")
        .map(|dt| {
            ScriptValue::String(
                dt.with_timezone(&chrono::Utc)
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            )
        })
        .unwrap_or(ScriptValue::Nil)
}

/// Timestamps without zone are rendered as UTC
pub fn decode_timestamp(raw: &str) -> ScriptValue {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|dt| {
            ScriptValue::String(dt.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true))
        })
        .unwrap_or(ScriptValue::Nil)
}

pub fn decode_json(raw: &str) -> ScriptValue {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(ScriptValue::from)
        .unwrap_or(ScriptValue::Nil)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_selection() {
        assert_eq!(decoder_for("BOOL")("t"), ScriptValue::Bool(true));
        assert_eq!(decoder_for("INT8")("42"), ScriptValue::Number(42.0));
        assert_eq!(decoder_for("NUMERIC")("3.25"), ScriptValue::Number(3.25));
        assert_eq!(decoder_for("TEXT")("hello"), ScriptValue::from("hello"));
        assert_eq!(decoder_for("my_enum")("red"), ScriptValue::from("red"));
    }

    #[test]
    fn test_unparseable_degrades_to_nil() {
        assert_eq!(decode_bool("maybe"), ScriptValue::Nil);
        assert_eq!(decode_number("abc"), ScriptValue::Nil);
        assert_eq!(decode_timestamptz("yesterday"), ScriptValue::Nil);
        assert_eq!(decode_json("{oops"), ScriptValue::Nil);
    }

    #[test]
    fn test_empty_text_stays_empty_string() {
        assert_eq!(decode_text(""), ScriptValue::from(""));
        assert!(!decode_text("").is_nil());
    }

    #[test]
    fn test_timestamptz_to_utc() {
        assert_eq!(
            decode_timestamptz("2024-03-01 12:00:00+02"),
            ScriptValue::from("2024-03-01T10:00:00Z")
        );
        assert_eq!(
            decode_timestamptz("2024-03-01 12:00:00.25+05:30"),
            ScriptValue::from("2024-03-01T06:30:00.250Z")
        );
    }

    #[test]
    fn test_timestamp_without_zone() {
        assert_eq!(
            decode_timestamp("2024-03-01 12:00:00"),
            ScriptValue::from("2024-03-01T12:00:00Z")
        );
    }

    #[test]
    fn test_json_column() {
        let value = decode_json(r#"{"ok": true, "n": 2}"#);
        assert_eq!(value.get("ok"), Some(&ScriptValue::Bool(true)));
        assert_eq!(value.get("n"), Some(&ScriptValue::Number(2.0)));
    }
}
