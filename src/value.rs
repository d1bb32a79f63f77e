//! The Recon value model: items, fields and values.
use crate::error::CastError;
use crate::num::Num;
use crate::operator::Operator;
use crate::record::Record;
use crate::selector::Selector;
use crate::writer;
use std::cmp::Ordering;
use std::fmt;

/// The universal parseable unit: either a field or a value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Item {
    Field(Field),
    Value(Value),
}

/// A keyed item. Attributes are written `@key(value)`, slots `key:value`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Attr { key: String, value: Value },
    Slot { key: Value, value: Value },
}

/// Every value a Recon document can hold.
///
/// Variants are declared in their total-order position, so the derived ordering
/// sorts heterogeneous values by kind before comparing contents.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Value {
    Record(Record),
    Text(String),
    Data(Vec<u8>),
    Num(Num),
    Bool(bool),
    Selector(Selector),
    Operator(Operator),
    /// Present, but without a value.
    Extant,
    /// Entirely missing.
    #[default]
    Absent,
}

impl Field {
    pub fn attr(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Field::Attr {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn slot(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Field::Slot {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The key as a value; attribute names become text.
    pub fn key(&self) -> Value {
        match self {
            Field::Attr { key, .. } => Value::Text(key.clone()),
            Field::Slot { key, .. } => key.clone(),
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Field::Attr { value, .. } | Field::Slot { value, .. } => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Field::Attr { value, .. } | Field::Slot { value, .. } => value,
        }
    }

    pub fn is_attr(&self) -> bool {
        matches!(self, Field::Attr { .. })
    }

    /// Returns true if this field's key equals `key`.
    pub fn key_equals(&self, key: &Value) -> bool {
        match (self, key) {
            (Field::Attr { key: name, .. }, Value::Text(text)) => name == text,
            (Field::Attr { .. }, _) => false,
            (Field::Slot { key: own, .. }, _) => own == key,
        }
    }

    /// Rebuilds this field with a new value, keeping its kind and key.
    pub fn with_value(&self, value: Value) -> Field {
        match self {
            Field::Attr { key, .. } => Field::Attr {
                key: key.clone(),
                value,
            },
            Field::Slot { key, .. } => Field::Slot {
                key: key.clone(),
                value,
            },
        }
    }
}

impl Item {
    pub fn attr(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Item::Field(Field::attr(key, value))
    }

    pub fn slot(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Item::Field(Field::slot(key, value))
    }

    /// A field converts to its value, a value converts to itself.
    pub fn to_value(&self) -> Value {
        match self {
            Item::Field(field) => field.value().clone(),
            Item::Value(value) => value.clone(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Item::Field(field) => field.into_value(),
            Item::Value(value) => value,
        }
    }

    pub fn as_value(&self) -> &Value {
        match self {
            Item::Field(field) => field.value(),
            Item::Value(value) => value,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Item::Field(field) => Some(field),
            Item::Value(_) => None,
        }
    }

    pub fn key(&self) -> Option<Value> {
        self.as_field().map(Field::key)
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Item::Field(_))
    }

    pub fn is_attr(&self) -> bool {
        matches!(self, Item::Field(Field::Attr { .. }))
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Item::Value(Value::Absent))
    }

    /// Position of this item's kind in the cross-variant total order.
    pub fn type_order(&self) -> u8 {
        match self {
            Item::Field(Field::Attr { .. }) => 1,
            Item::Field(Field::Slot { .. }) => 2,
            Item::Value(value) => value.type_order(),
        }
    }
}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Item::Field(a), Item::Field(b)) => a.cmp(b),
            (Item::Value(a), Item::Value(b)) => a.cmp(b),
            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn type_order(&self) -> u8 {
        match self {
            Value::Record(_) => 0,
            Value::Text(_) => 3,
            Value::Data(_) => 4,
            Value::Num(_) => 5,
            Value::Bool(_) => 6,
            Value::Selector(_) => 7,
            Value::Operator(_) => 8,
            Value::Extant => 9,
            Value::Absent => 10,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Record(_) => "Record",
            Value::Text(_) => "Text",
            Value::Data(_) => "Data",
            Value::Num(_) => "Num",
            Value::Bool(_) => "Bool",
            Value::Selector(_) => "Selector",
            Value::Operator(_) => "Operator",
            Value::Extant => "Extant",
            Value::Absent => "Absent",
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Absent)
    }

    /// Truthiness: `Absent`, `Extant` and `false` are falsy, everything else is truthy.
    pub fn is_definite(&self) -> bool {
        !matches!(self, Value::Absent | Value::Extant | Value::Bool(false))
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    /// `Absent` and `Extant` carry no data.
    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Absent | Value::Extant)
    }

    pub fn as_record(&self) -> Result<&Record, CastError> {
        match self {
            Value::Record(record) => Ok(record),
            other => Err(Value::cast_error("Record", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, CastError> {
        match self {
            Value::Text(text) => Ok(text),
            other => Err(Value::cast_error("Text", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, CastError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Value::cast_error("Bool", other)),
        }
    }

    pub fn as_data(&self) -> Result<&[u8], CastError> {
        match self {
            Value::Data(data) => Ok(data),
            other => Err(Value::cast_error("Data", other)),
        }
    }

    pub fn as_num(&self) -> Result<Num, CastError> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Text(text) => crate::lexer::parse_num(text.trim())
                .ok_or_else(|| CastError::new("Num", format!("{text:?}"))),
            other => Err(Value::cast_error("Num", other)),
        }
    }

    pub fn as_i32(&self) -> Result<i32, CastError> {
        self.as_num()?
            .to_i32()
            .ok_or_else(|| CastError::new("i32", self.to_string()))
    }

    pub fn as_i64(&self) -> Result<i64, CastError> {
        self.as_num()?
            .to_i64()
            .ok_or_else(|| CastError::new("i64", self.to_string()))
    }

    pub fn as_u32(&self) -> Result<u32, CastError> {
        self.as_num()?
            .to_u32()
            .ok_or_else(|| CastError::new("u32", self.to_string()))
    }

    pub fn as_u64(&self) -> Result<u64, CastError> {
        self.as_num()?
            .to_u64()
            .ok_or_else(|| CastError::new("u64", self.to_string()))
    }

    pub fn as_f64(&self) -> Result<f64, CastError> {
        Ok(self.as_num()?.as_f64())
    }

    pub fn as_f32(&self) -> Result<f32, CastError> {
        Ok(self.as_num()?.as_f64() as f32)
    }

    fn cast_error(expected: &'static str, found: &Value) -> CastError {
        CastError::new(expected, found.kind_name())
    }

    /// Serializes this value to Recon text.
    pub fn to_recon(&self) -> String {
        writer::write_string(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_recon())
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&writer::write_item_string(self))
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        Item::Value(value)
    }
}

impl From<Field> for Item {
    fn from(field: Field) -> Self {
        Item::Field(field)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<Selector> for Value {
    fn from(selector: Selector) -> Self {
        Value::Selector(selector)
    }
}

impl From<Operator> for Value {
    fn from(operator: Operator) -> Self {
        Value::Operator(operator)
    }
}

impl From<Num> for Value {
    fn from(num: Num) -> Self {
        Value::Num(num)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::Data(data)
    }
}

macro_rules! value_from_num {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Num(Num::from(v))
                }
            }

            impl From<$t> for Item {
                fn from(v: $t) -> Self {
                    Item::Value(Value::from(v))
                }
            }
        )*
    };
}

value_from_num!(i32, i64, u32, u64, f32, f64);

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::Value(Value::from(s))
    }
}

impl From<bool> for Item {
    fn from(b: bool) -> Self {
        Item::Value(Value::Bool(b))
    }
}

impl From<Record> for Item {
    fn from(record: Record) -> Self {
        Item::Value(Value::Record(record))
    }
}

macro_rules! value_try_into {
    ($($t:ty => $method:ident),*) => {
        $(
            impl TryFrom<&Value> for $t {
                type Error = CastError;

                fn try_from(value: &Value) -> Result<Self, Self::Error> {
                    value.$method()
                }
            }
        )*
    };
}

value_try_into!(i32 => as_i32, i64 => as_i64, u32 => as_u32, u64 => as_u64, f32 => as_f32, f64 => as_f64, bool => as_bool);

impl TryFrom<&Value> for String {
    type Error = CastError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_str().map(str::to_string)
    }
}
