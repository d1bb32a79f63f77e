//! Interop with serde data formats.
//!
//! Records map onto the closest serde shape: records of slots become maps, records of
//! plain values become sequences, and anything else becomes a sequence whose fields
//! are single-entry maps (attributes keyed by `@name`).
use crate::num::Num;
use crate::record::Record;
use crate::value::{Field, Item, Value};
use base64::Engine as _;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Record(record) => serialize_record(record, serializer),
            Value::Text(text) => serializer.serialize_str(text),
            Value::Data(data) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
            }
            Value::Num(num) => match *num {
                Num::I32(v) => serializer.serialize_i32(v),
                Num::I64(v) => serializer.serialize_i64(v),
                Num::U32(v) => serializer.serialize_u32(v),
                Num::U64(v) => serializer.serialize_u64(v),
                Num::F32(v) => serializer.serialize_f32(v),
                Num::F64(v) => serializer.serialize_f64(v),
            },
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Selector(_) | Value::Operator(_) => serializer.serialize_str(&self.to_recon()),
            Value::Extant | Value::Absent => serializer.serialize_unit(),
        }
    }
}

impl Serialize for Item {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Item::Value(value) => value.serialize(serializer),
            Item::Field(field) => {
                let mut map = serializer.serialize_map(Some(1))?;
                match field {
                    Field::Attr { key, value } => map.serialize_entry(&format!("@{key}"), value)?,
                    Field::Slot { key, value } => map.serialize_entry(&MapKey(key), value)?,
                }
                map.end()
            }
        }
    }
}

/// Slot keys that are not text are written as their Recon form.
struct MapKey<'a>(&'a Value);

impl Serialize for MapKey<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Value::Text(text) => serializer.serialize_str(text),
            other => serializer.serialize_str(&other.to_recon()),
        }
    }
}

fn serialize_record<S>(record: &Record, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let slots_only = !record.is_empty()
        && record
            .iter()
            .all(|item| matches!(item, Item::Field(Field::Slot { .. })));
    if slots_only {
        let mut map = serializer.serialize_map(Some(record.len()))?;
        for item in record {
            if let Item::Field(Field::Slot { key, value }) = item {
                map.serialize_entry(&MapKey(key), value)?;
            }
        }
        map.end()
    } else {
        let mut seq = serializer.serialize_seq(Some(record.len()))?;
        for item in record {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Extant,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(i) => Value::Num(Num::I32(i)),
                        Err(_) => Value::Num(Num::I64(i)),
                    }
                } else if let Some(u) = n.as_u64() {
                    Value::Num(Num::U64(u))
                } else {
                    Value::Num(Num::F64(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(values) => Value::Record(
                values
                    .into_iter()
                    .map(|value| Item::Value(Value::from(value)))
                    .collect(),
            ),
            serde_json::Value::Object(map) => Value::Record(
                map.into_iter()
                    .map(|(key, value)| Item::slot(key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn to_json(text: &str) -> serde_json::Value {
        serde_json::to_value(parse_str(text).unwrap()).unwrap()
    }

    #[test]
    fn test_record_shapes() {
        assert_eq!(to_json("{a:1,b:\"x y\"}"), json!({"a": 1, "b": "x y"}));
        assert_eq!(to_json("{1,2,true}"), json!([1, 2, true]));
        assert_eq!(
            to_json("@point{x:1,2}"),
            json!([{"@point": null}, {"x": 1}, 2])
        );
        assert_eq!(to_json("{}"), json!([]));
    }

    #[test]
    fn test_scalars() {
        assert_eq!(to_json("%AQID"), json!("AQID"));
        assert_eq!(to_json("$a.b"), json!("$a.b"));
        assert_eq!(to_json("1.5"), json!(1.5));
    }

    #[test]
    fn test_from_json() {
        let value = Value::from(json!({"a": [1, 2.5], "b": null, "c": "d"}));
        assert_eq!(
            value,
            Value::Record(Record::of([
                Item::slot(
                    "a",
                    Value::Record(Record::of([Item::from(1), Item::from(2.5)]))
                ),
                Item::slot("b", Value::Extant),
                Item::slot("c", "d"),
            ]))
        );
    }
}
