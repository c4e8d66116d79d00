//! Encoding composite and custom-typed values.
use chrono::NaiveDate;
use insta::assert_snapshot;
use snowmock::sql::encoder::{EncodeError, LiteralEncoder, LiteralRule};
use snowmock::sql::{encode, Value};

fn event_content() -> Value {
    Value::object([
        ("correlation_id", Value::from(1)),
        (
            "properties",
            Value::array([Value::object([
                ("data_origin", "Service.Mail"),
                ("email_provider", "SendGrid"),
            ])]),
        ),
    ])
}

#[test]
fn test_nested_composite() {
    assert_snapshot!(
        encode(&event_content()).unwrap(),
        @"TO_VARIANT(OBJECT_CONSTRUCT('correlation_id',1::number,'properties',TO_VARIANT(ARRAY_CONSTRUCT(TO_VARIANT(OBJECT_CONSTRUCT('data_origin','Service.Mail'::text,'email_provider','SendGrid'::text))))))"
    );
}

#[test]
fn test_composite_from_json_keeps_key_order() {
    let json = serde_json::json!({"z": [1, 2.5, null], "a": {"ok": true}});
    assert_eq!(
        encode(&Value::from(json)).unwrap(),
        "TO_VARIANT(OBJECT_CONSTRUCT('z',TO_VARIANT(ARRAY_CONSTRUCT(1::number,2.5::float,NULL)),'a',TO_VARIANT(OBJECT_CONSTRUCT('ok',true::boolean))))"
    );
}

#[test]
fn test_null_inside_composites_is_untyped() {
    let value = Value::array([Value::Null, Value::from(Option::<i64>::None)]);
    assert_eq!(encode(&value).unwrap(), "TO_VARIANT(ARRAY_CONSTRUCT(NULL,NULL))");
}

#[test]
fn test_timestamp_with_fraction() {
    let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_milli_opt(8, 30, 0, 250)
        .unwrap();
    assert_snapshot!(encode(&ts.into()).unwrap(), @"'2024-03-01 08:30:00.250'::datetime");
}

#[test]
fn test_unregistered_type_inside_composite_is_fatal() {
    let value = Value::object([("location", Value::extension("geography", "POINT(4 50)"))]);
    let err = encode(&value).unwrap_err();
    assert_eq!(
        err,
        EncodeError::UnregisteredType {
            type_name: "geography".to_string()
        }
    );
    assert_eq!(
        err.to_string(),
        "Unknown type 'geography'. Register an encoding rule for it with LiteralEncoder::register"
    );
}

#[derive(Debug)]
struct GeographyRule;

impl LiteralRule for GeographyRule {
    fn encode(&self, value: &Value, _encoder: &LiteralEncoder) -> Result<String, EncodeError> {
        match value {
            Value::Extension { raw, .. } => Ok(format!("TO_GEOGRAPHY('{}')", raw)),
            other => Err(EncodeError::RuleMismatch {
                rule: "geography".to_string(),
                type_name: other.type_tag().to_string(),
            }),
        }
    }
}

#[test]
fn test_custom_rule() {
    let mut encoder = LiteralEncoder::snowflake();
    encoder.register("geography", GeographyRule);
    assert!(encoder.is_registered("geography"));

    let value = Value::object([("location", Value::extension("geography", "POINT(4 50)"))]);
    assert_eq!(
        encoder.encode(&value).unwrap(),
        "TO_VARIANT(OBJECT_CONSTRUCT('location',TO_GEOGRAPHY('POINT(4 50)')))"
    );
}

#[test]
fn test_empty_encoder_rejects_builtins() {
    let encoder = LiteralEncoder::empty();
    assert!(matches!(
        encoder.encode(&"sent".into()),
        Err(EncodeError::UnregisteredType { type_name }) if type_name == "text"
    ));
}

#[test]
fn test_overriding_a_builtin_rule() {
    let mut encoder = LiteralEncoder::snowflake();
    encoder.register_scalar("text", "varchar", true);
    assert_eq!(encoder.encode(&"sent".into()).unwrap(), "'sent'::varchar");
}
