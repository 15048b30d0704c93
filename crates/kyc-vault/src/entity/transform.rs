//! Record-level encryption and decryption.

use common::{EntityRecord, ServiceError};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::crypto::{CipherError, EncryptedField, FieldCipher};

/// Failure to transform one field of a record.
///
/// Carries the field name (never its value) so operators can locate the
/// offending data.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to encrypt field `{field}`: {source}")]
    Encrypt {
        field: String,
        #[source]
        source: CipherError,
    },

    #[error("failed to decrypt field `{field}`: {source}")]
    Decrypt {
        field: String,
        #[source]
        source: CipherError,
    },
}

impl From<TransformError> for ServiceError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Encrypt { .. } => ServiceError::Encryption(err.to_string()),
            TransformError::Decrypt { .. } => ServiceError::Decryption(err.to_string()),
        }
    }
}

/// Canonical string form of a plaintext value.
///
/// Strings are returned verbatim; numbers and booleans use their JSON
/// rendering; arrays and objects are rendered as compact JSON. Callers must
/// treat decrypted values as strings: the original JSON type is not recovered.
pub fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encrypt every non-null value of `record`.
///
/// Keys and their order are preserved; nulls stay null. The first codec
/// failure aborts the whole record so nothing half-encrypted is returned.
pub fn encrypt_record(cipher: &FieldCipher, record: &EntityRecord) -> Result<EntityRecord, TransformError> {
    let mut out = Map::with_capacity(record.len());
    for (field, value) in record {
        out.insert(field.clone(), encrypt_value(cipher, field, value)?);
    }
    Ok(out)
}

/// Encrypt each record of a batch, aborting on the first failure.
pub fn encrypt_records(
    cipher: &FieldCipher,
    records: &[EntityRecord],
) -> Result<Vec<EntityRecord>, TransformError> {
    records.iter().map(|r| encrypt_record(cipher, r)).collect()
}

/// Encrypt the values of a flat patch map.
///
/// Same null and coercion rules as [`encrypt_record`]. The map names fields
/// of an existing record; it is not a record itself.
pub fn encrypt_fields(
    cipher: &FieldCipher,
    fields: &Map<String, Value>,
) -> Result<Map<String, Value>, TransformError> {
    encrypt_record(cipher, fields)
}

/// Decrypt every encrypted value of `record`.
///
/// - `null` stays `null`.
/// - `{iv, cipherText}` objects are decrypted; a failure aborts the record.
/// - Anything else is legacy or malformed data and is passed through as its
///   string form instead of failing the read.
pub fn decrypt_record(cipher: &FieldCipher, record: &EntityRecord) -> Result<EntityRecord, TransformError> {
    let mut out = Map::with_capacity(record.len());
    for (field, value) in record {
        let plain = match value {
            Value::Null => Value::Null,
            other => match EncryptedField::from_value(other) {
                Some(encrypted) => {
                    let text = cipher.decrypt(&encrypted).map_err(|source| TransformError::Decrypt {
                        field: field.clone(),
                        source,
                    })?;
                    Value::String(text)
                }
                None => Value::String(string_form(other)),
            },
        };
        out.insert(field.clone(), plain);
    }
    Ok(out)
}

fn encrypt_value(cipher: &FieldCipher, field: &str, value: &Value) -> Result<Value, TransformError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let encrypted = cipher
        .encrypt(&string_form(value))
        .map_err(|source| TransformError::Encrypt {
            field: field.to_owned(),
            source,
        })?;
    Ok(encrypted.into_value())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::crypto::EncryptionKey;

    fn cipher() -> FieldCipher {
        FieldCipher::new(EncryptionKey::generate())
    }

    fn record(value: Value) -> EntityRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn null_is_preserved_both_ways() {
        let c = cipher();
        let rec = record(json!({"a": null}));
        let enc = encrypt_record(&c, &rec).unwrap();
        assert_eq!(Value::Object(enc.clone()), json!({"a": null}));
        let dec = decrypt_record(&c, &enc).unwrap();
        assert_eq!(Value::Object(dec), json!({"a": null}));
    }

    #[test]
    fn every_non_null_value_is_encrypted() {
        let c = cipher();
        let rec = record(json!({"name": "Alice", "age": 31, "verified": true, "note": null}));
        let enc = encrypt_record(&c, &rec).unwrap();
        for (field, value) in &enc {
            if field == "note" {
                assert!(value.is_null());
            } else {
                assert!(EncryptedField::from_value(value).is_some(), "{field} left in plaintext");
            }
        }
    }

    #[test]
    fn round_trip_coerces_to_strings() {
        let c = cipher();
        let rec = record(json!({
            "name": "Alice",
            "age": 31,
            "ratio": 0.5,
            "verified": false,
            "tags": ["a", "b"],
            "empty": ""
        }));
        let dec = decrypt_record(&c, &encrypt_record(&c, &rec).unwrap()).unwrap();
        assert_eq!(
            Value::Object(dec),
            json!({
                "name": "Alice",
                "age": "31",
                "ratio": "0.5",
                "verified": "false",
                "tags": "[\"a\",\"b\"]",
                "empty": ""
            })
        );
    }

    #[test]
    fn field_order_is_preserved() {
        let c = cipher();
        let rec: EntityRecord =
            serde_json::from_str(r#"{"surname": "Doe", "dob": "1990-01-01", "address": "1 Main St"}"#).unwrap();
        let enc = encrypt_record(&c, &rec).unwrap();
        let dec = decrypt_record(&c, &enc).unwrap();
        let keys: Vec<&str> = dec.keys().map(String::as_str).collect();
        assert_eq!(keys, ["surname", "dob", "address"]);
    }

    #[test]
    fn malformed_fields_pass_through_as_strings() {
        let c = cipher();
        let rec = record(json!({
            "legacy": "plain value",
            "count": 7,
            "partial": {"iv": "abc"}
        }));
        let dec = decrypt_record(&c, &rec).unwrap();
        assert_eq!(dec["legacy"], "plain value");
        assert_eq!(dec["count"], "7");
        assert_eq!(dec["partial"], r#"{"iv":"abc"}"#);
    }

    #[test]
    fn one_bad_ciphertext_fails_the_record() {
        let c = cipher();
        let mut enc = encrypt_record(&c, &record(json!({"a": "1", "b": "2"}))).unwrap();
        enc.insert("b".into(), json!({"iv": "AAAAAAAAAAAAAAAA", "cipherText": "AAAAAAAAAAAAAAAAAAAAAA=="}));
        let err = decrypt_record(&c, &enc).unwrap_err();
        assert!(matches!(err, TransformError::Decrypt { ref field, .. } if field == "b"));
        assert!(matches!(ServiceError::from(err), ServiceError::Decryption(_)));
    }

    #[test]
    fn wrong_key_fails_the_record() {
        let enc = encrypt_record(&cipher(), &record(json!({"doc_number": "X123"}))).unwrap();
        assert!(decrypt_record(&cipher(), &enc).is_err());
    }

    #[test]
    fn encrypt_fields_encrypts_flat_map() {
        let c = cipher();
        let patch = record(json!({"doc_number": "Z9", "expiry": null}));
        let enc = encrypt_fields(&c, &patch).unwrap();
        let field = EncryptedField::from_value(&enc["doc_number"]).unwrap();
        assert_eq!(c.decrypt(&field).unwrap(), "Z9");
        assert!(enc["expiry"].is_null());
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            ".*".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn decrypt_inverts_encrypt(fields in prop::collection::vec(("[a-z_]{1,12}", scalar()), 0..8)) {
            let c = cipher();
            let rec: EntityRecord = fields.into_iter().collect();
            let dec = decrypt_record(&c, &encrypt_record(&c, &rec).unwrap()).unwrap();
            prop_assert_eq!(dec.len(), rec.len());
            for (field, original) in &rec {
                let expected = if original.is_null() {
                    Value::Null
                } else {
                    Value::String(string_form(original))
                };
                prop_assert_eq!(&dec[field], &expected);
            }
        }
    }
}
