//! Message envelopes: records tagged by a leading attribute whose header addresses
//! a node and lane, followed by a body.
//!
//! ```text
//! @link(node:"/house",lane:lights,prio:0.5)
//! @event(node:"/house",lane:lights){on:true}
//! ```
use crate::error::EnvelopeError;
use crate::record::{Record, RecordBuilder};
use crate::value::{Field, Item, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Event,
    Command,
    Link,
    Linked,
    Sync,
    Synced,
    Unlink,
    Unlinked,
    Auth,
    Authed,
    Deauth,
    Deauthed,
}

const KINDS: [EnvelopeKind; 12] = [
    EnvelopeKind::Event,
    EnvelopeKind::Command,
    EnvelopeKind::Link,
    EnvelopeKind::Linked,
    EnvelopeKind::Sync,
    EnvelopeKind::Synced,
    EnvelopeKind::Unlink,
    EnvelopeKind::Unlinked,
    EnvelopeKind::Auth,
    EnvelopeKind::Authed,
    EnvelopeKind::Deauth,
    EnvelopeKind::Deauthed,
];

impl EnvelopeKind {
    pub fn tag(self) -> &'static str {
        match self {
            EnvelopeKind::Event => "event",
            EnvelopeKind::Command => "command",
            EnvelopeKind::Link => "link",
            EnvelopeKind::Linked => "linked",
            EnvelopeKind::Sync => "sync",
            EnvelopeKind::Synced => "synced",
            EnvelopeKind::Unlink => "unlink",
            EnvelopeKind::Unlinked => "unlinked",
            EnvelopeKind::Auth => "auth",
            EnvelopeKind::Authed => "authed",
            EnvelopeKind::Deauth => "deauth",
            EnvelopeKind::Deauthed => "deauthed",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        KINDS.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Link envelopes carry `prio` and `rate` besides their address.
    pub fn is_link(self) -> bool {
        matches!(
            self,
            EnvelopeKind::Link | EnvelopeKind::Linked | EnvelopeKind::Sync | EnvelopeKind::Synced
        )
    }

    /// Auth envelopes have no address, only a body.
    pub fn is_addressed(self) -> bool {
        !matches!(
            self,
            EnvelopeKind::Auth | EnvelopeKind::Authed | EnvelopeKind::Deauth | EnvelopeKind::Deauthed
        )
    }

    fn headers(self) -> &'static [&'static str] {
        if self.is_link() {
            &["node", "lane", "prio", "rate"]
        } else if self.is_addressed() {
            &["node", "lane"]
        } else {
            &[]
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub node: String,
    pub lane: String,
    pub prio: f64,
    pub rate: f64,
    pub body: Value,
}

impl Envelope {
    pub fn new(kind: EnvelopeKind, node: impl Into<String>, lane: impl Into<String>) -> Self {
        Envelope {
            kind,
            node: node.into(),
            lane: lane.into(),
            prio: 0.0,
            rate: 0.0,
            body: Value::Absent,
        }
    }

    pub fn with_prio(mut self, prio: f64) -> Self {
        self.prio = prio;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    /// Reads an envelope from a parsed value.
    ///
    /// Header fields may be named slots (`node:x`) or positional values taken in the
    /// order node, lane, prio, rate. Missing `prio` and `rate` default to `0`.
    pub fn decode(value: &Value) -> Result<Envelope, EnvelopeError> {
        let Value::Record(record) = value else {
            return Err(EnvelopeError::NotAnEnvelope);
        };
        let (Some(tag), Some(header)) = (record.tag(), record.header()) else {
            return Err(EnvelopeError::NotAnEnvelope);
        };
        let kind = EnvelopeKind::from_tag(tag).ok_or_else(|| EnvelopeError::UnknownTag {
            tag: tag.to_string(),
        })?;
        let names = kind.headers();
        let mut fields: Vec<Option<&Value>> = vec![None; names.len()];

        let header_items: Vec<Item> = match header {
            Value::Record(header) => header.iter().cloned().collect(),
            Value::Extant | Value::Absent => Vec::new(),
            value => vec![Item::Value(value.clone())],
        };
        let mut positional = Vec::new();
        for item in &header_items {
            match item {
                Item::Field(Field::Slot {
                    key: Value::Text(key),
                    value,
                }) => {
                    if let Some(index) = names.iter().position(|name| name == key) {
                        fields[index] = Some(value);
                    }
                }
                Item::Value(value) => positional.push(value),
                Item::Field(_) => {}
            }
        }
        let mut positional = positional.into_iter();
        for field in fields.iter_mut().filter(|field| field.is_none()) {
            match positional.next() {
                Some(value) => *field = Some(value),
                None => break,
            }
        }

        let text = |index: usize| -> Result<String, EnvelopeError> {
            match fields.get(index).copied().flatten() {
                Some(Value::Text(text)) => Ok(text.clone()),
                Some(other) => Err(EnvelopeError::InvalidHeader {
                    field: names[index],
                    found: other.to_recon(),
                }),
                None => Err(EnvelopeError::MissingHeader {
                    tag: kind.tag(),
                    field: names[index],
                }),
            }
        };
        let number = |index: usize| -> Result<f64, EnvelopeError> {
            match fields.get(index).copied().flatten() {
                None => Ok(0.0),
                Some(value) => value.as_f64().map_err(|_| EnvelopeError::InvalidHeader {
                    field: names[index],
                    found: value.to_recon(),
                }),
            }
        };

        let mut envelope = if kind.is_addressed() {
            Envelope::new(kind, text(0)?, text(1)?)
        } else {
            Envelope::new(kind, "", "")
        };
        if kind.is_link() {
            envelope.prio = number(2)?;
            envelope.rate = number(3)?;
        }
        envelope.body = record.body();
        Ok(envelope)
    }

    /// Builds the envelope record, eliding `prio` and `rate` when they are `0`.
    pub fn encode(&self) -> Value {
        let mut header = RecordBuilder::new();
        if self.kind.is_addressed() {
            header
                .slot("node", self.node.as_str())
                .slot("lane", self.lane.as_str());
        }
        if self.kind.is_link() {
            if self.prio != 0.0 {
                header.slot("prio", self.prio);
            }
            if self.rate != 0.0 {
                header.slot("rate", self.rate);
            }
        }
        let header = if header.is_empty() {
            Value::Extant
        } else {
            Value::Record(header.commit())
        };

        let mut record = RecordBuilder::new();
        record.attr(self.kind.tag(), header);
        match &self.body {
            Value::Absent => {}
            Value::Record(body) if !is_lone_value(body) => {
                for item in body {
                    record.push(item.clone());
                }
            }
            body => {
                record.push(body.clone());
            }
        }
        Value::Record(record.commit())
    }
}

/// A record holding one plain value would collapse to that value when read back as
/// an envelope body, so it is kept intact instead of being spliced.
fn is_lone_value(record: &Record) -> bool {
    record.is_empty() || (record.len() == 1 && !record.items()[0].is_field())
}

impl From<&Envelope> for Value {
    fn from(envelope: &Envelope) -> Self {
        envelope.encode()
    }
}

impl TryFrom<&Value> for Envelope {
    type Error = EnvelopeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Envelope::decode(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_tags() {
        for kind in KINDS {
            assert_eq!(EnvelopeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EnvelopeKind::from_tag("linky"), None);
    }

    #[test]
    fn test_decode_named_and_positional() {
        let named = parse_str("@sync(node:\"/a\",lane:b,rate:2)").unwrap();
        let positional = parse_str("@sync(\"/a\", b, 0, 2)").unwrap();
        let expected = Envelope::new(EnvelopeKind::Sync, "/a", "b").with_rate(2.0);
        assert_eq!(Envelope::decode(&named).unwrap(), expected);
        assert_eq!(Envelope::decode(&positional).unwrap(), expected);
    }

    #[test]
    fn test_body_round_trip() {
        let bodies = [
            Value::Absent,
            Value::from(42),
            Value::Record(Record::of([Item::slot("x", 1)])),
            Value::Record(Record::of([Item::from(1)])),
            Value::Record(Record::empty()),
        ];
        for body in bodies {
            let envelope = Envelope::new(EnvelopeKind::Event, "n", "l").with_body(body);
            let decoded = Envelope::decode(&envelope.encode()).unwrap();
            assert_eq!(decoded, envelope);
        }
    }

    #[test]
    fn test_auth_has_no_address() {
        let value = parse_str("@auth{token:abc}").unwrap();
        let envelope = Envelope::decode(&value).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Auth);
        assert_eq!(envelope.body, Value::Record(Record::of([Item::slot("token", "abc")])));
        assert_eq!(envelope.encode().to_recon(), "@auth{token:abc}");
    }

    #[test]
    fn test_decode_errors() {
        let missing = parse_str("@event(node:n)").unwrap();
        assert_eq!(
            Envelope::decode(&missing),
            Err(EnvelopeError::MissingHeader {
                tag: "event",
                field: "lane"
            })
        );
        let unknown = parse_str("@shout(a, b)").unwrap();
        assert!(matches!(
            Envelope::decode(&unknown),
            Err(EnvelopeError::UnknownTag { .. })
        ));
        assert_eq!(
            Envelope::decode(&Value::from(1)),
            Err(EnvelopeError::NotAnEnvelope)
        );
    }
}
