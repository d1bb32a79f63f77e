use pretty_assertions::assert_eq;
use recon_core::api::{parse, parse_envelope, write_string};
use recon_core::{Envelope, EnvelopeError, EnvelopeKind, Item, ReconError, Record, Value};

#[test]
fn test_named_link_header() {
    let value = parse("@link(node:node_uri,lane:lane_uri,prio:0.5,rate:1)").unwrap();
    let Value::Record(record) = &value else {
        panic!("expected a record");
    };
    assert_eq!(record.tag(), Some("link"));
    let header = record.header().unwrap().as_record().unwrap();
    let keys: Vec<Value> = header.keys().collect();
    assert_eq!(
        keys,
        vec![
            Value::from("node"),
            Value::from("lane"),
            Value::from("prio"),
            Value::from("rate")
        ]
    );

    let envelope = Envelope::decode(&value).unwrap();
    assert_eq!(envelope.kind, EnvelopeKind::Link);
    assert_eq!(envelope.node, "node_uri");
    assert_eq!(envelope.lane, "lane_uri");
    assert_eq!(envelope.prio, 0.5);
    assert_eq!(envelope.rate, 1.0);
    assert_eq!(envelope.body, Value::Absent);
}

#[test]
fn test_positional_link_header() {
    let positional = parse_envelope("@link(node_uri, lane_uri)").unwrap();
    let named = parse_envelope("@link(node:node_uri,lane:lane_uri)").unwrap();
    assert_eq!(positional, named);
    assert_eq!(positional.prio, 0.0);
    assert_eq!(positional.rate, 0.0);
}

#[test]
fn test_default_header_elision() {
    let plain = Envelope::new(EnvelopeKind::Link, "/a", "b");
    assert_eq!(write_string(&plain.encode()), "@link(node:\"/a\",lane:b)");

    let prio = plain.clone().with_prio(0.5);
    assert_eq!(
        write_string(&prio.encode()),
        "@link(node:\"/a\",lane:b,prio:0.5)"
    );

    let rate = plain.with_rate(2.5);
    assert_eq!(
        write_string(&rate.encode()),
        "@link(node:\"/a\",lane:b,rate:2.5)"
    );
}

#[test]
fn test_event_body_round_trip() {
    let body = Value::Record(Record::of([Item::slot("on", true), Item::slot("level", 3)]));
    let envelope = Envelope::new(EnvelopeKind::Event, "/house", "lights").with_body(body);
    let text = write_string(&Value::from(&envelope));
    assert_eq!(text, "@event(node:\"/house\",lane:lights){on:true,level:3}");
    assert_eq!(parse_envelope(&text).unwrap(), envelope);
}

#[test]
fn test_scalar_and_record_bodies() {
    let scalar = Envelope::new(EnvelopeKind::Command, "n", "l").with_body(42);
    let text = write_string(&scalar.encode());
    assert_eq!(text, "@command(node:n,lane:l) 42");
    assert_eq!(parse_envelope(&text).unwrap(), scalar);

    let lone = Envelope::new(EnvelopeKind::Command, "n", "l")
        .with_body(Value::Record(Record::of([Item::from("x")])));
    let decoded = parse_envelope(&write_string(&lone.encode())).unwrap();
    assert_eq!(decoded, lone);
}

#[test]
fn test_auth_has_no_address() {
    let auth = parse_envelope("@auth{token: abc}").unwrap();
    assert_eq!(auth.kind, EnvelopeKind::Auth);
    assert_eq!(auth.node, "");
    assert_eq!(
        auth.body,
        Value::Record(Record::of([Item::slot("token", "abc")]))
    );
    assert_eq!(write_string(&auth.encode()), "@auth{token:abc}");
}

#[test]
fn test_envelope_errors() {
    assert!(matches!(
        parse_envelope("{a: 1}"),
        Err(ReconError::Envelope(EnvelopeError::NotAnEnvelope))
    ));
    assert!(matches!(
        parse_envelope("@linky(node: a, lane: b)"),
        Err(ReconError::Envelope(EnvelopeError::UnknownTag { tag })) if tag == "linky"
    ));
    assert!(matches!(
        parse_envelope("@event(node: a)"),
        Err(ReconError::Envelope(EnvelopeError::MissingHeader {
            tag: "event",
            field: "lane"
        }))
    ));
    assert!(matches!(
        parse_envelope("@link(a, b, prio: high)"),
        Err(ReconError::Envelope(EnvelopeError::InvalidHeader { field: "prio", .. }))
    ));
    assert!(matches!(parse_envelope("@event("), Err(ReconError::Parse(_))));
}
