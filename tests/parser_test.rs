use pretty_assertions::assert_eq;
use recon_core::api::parse;
use recon_core::{BinaryOp, Item, Num, Operator, Record, Selector, Value};

fn record(items: impl IntoIterator<Item = Item>) -> Value {
    Value::Record(Record::of(items))
}

#[test]
fn test_nested_document() {
    let source = r#"
        # service configuration
        @service(name: "api", version: 2) {
            host: localhost
            port: 8080,
            tags: {fast; small}
            limits: {rps: 1.5e3, burst: 0x0000FFFF}
        }
    "#;
    let value = parse(source).unwrap();
    assert_eq!(
        value,
        record([
            Item::attr(
                "service",
                record([Item::slot("name", "api"), Item::slot("version", 2)])
            ),
            Item::slot("host", "localhost"),
            Item::slot("port", 8080),
            Item::slot("tags", record([Item::from("fast"), Item::from("small")])),
            Item::slot(
                "limits",
                record([
                    Item::slot("rps", 1500.0),
                    Item::slot("burst", Value::Num(Num::U32(0xFFFF)))
                ])
            ),
        ])
    );
}

#[test]
fn test_strings_and_escapes() {
    assert_eq!(parse(r#""tab\there""#).unwrap(), Value::from("tab\there"));
    assert_eq!(parse(r#"'single "quoted"'"#).unwrap(), Value::from("single \"quoted\""));
    assert_eq!(parse(r#""é\/\@\{""#).unwrap(), Value::from("é/@{"));
    assert_eq!(parse("\"\"").unwrap(), Value::from(""));
}

#[test]
fn test_raw_strings() {
    assert_eq!(parse("`a``b`").unwrap(), Value::from("a`b"));
    assert_eq!(parse("``a`b``").unwrap(), Value::from("a`b"));
    assert_eq!(parse("```x``y```").unwrap(), Value::from("x``y"));
}

#[test]
fn test_identifier_literals() {
    assert_eq!(parse("false").unwrap(), Value::Bool(false));
    assert_eq!(parse("Infinity").unwrap(), Value::Num(Num::F64(f64::INFINITY)));
    assert!(matches!(parse("NaN").unwrap(), Value::Num(n) if n.is_nan()));
    assert_eq!(parse("kebab-case_ident").unwrap(), Value::from("kebab-case_ident"));
}

#[test]
fn test_number_widths() {
    assert_eq!(parse("2147483647").unwrap(), Value::Num(Num::I32(i32::MAX)));
    assert!(matches!(parse("2147483648").unwrap(), Value::Num(Num::I64(2147483648))));
    assert!(matches!(
        parse("0x123456789").unwrap(),
        Value::Num(Num::U64(0x1_2345_6789))
    ));
    assert!(matches!(
        parse("99999999999999999999").unwrap(),
        Value::Num(Num::F64(_))
    ));
    assert!(parse("0x12345678901234567").is_err());
}

#[test]
fn test_slot_keys_of_any_kind() {
    assert_eq!(
        parse("{1: one, \"two words\": 2, {k}: 3}").unwrap(),
        record([
            Item::slot(1, "one"),
            Item::slot("two words", 2),
            Item::slot(record([Item::from("k")]), 3),
        ])
    );
}

#[test]
fn test_markup_with_nested_tags() {
    let value = parse("[Hello, @b[bold @i{it}] world]").unwrap();
    assert_eq!(
        value,
        record([
            Item::from("Hello, "),
            Item::from(record([
                Item::attr("b", Value::Extant),
                Item::from("bold "),
                Item::from(record([Item::attr("i", Value::Extant), Item::from("it")])),
            ])),
            Item::from(" world"),
        ])
    );
}

#[test]
fn test_selector_and_expression_values() {
    let value = parse("{total: $price * $qty, first: $items#0}").unwrap();
    assert_eq!(
        value,
        record([
            Item::slot(
                "total",
                Operator::binary(
                    BinaryOp::Times,
                    Selector::identity().get("price"),
                    Selector::identity().get("qty")
                )
            ),
            Item::slot("first", Selector::identity().get("items").get_item(0)),
        ])
    );
}

#[test]
fn test_comments_between_items() {
    let value = parse("{a: 1 # first\n# standalone\nb: 2}").unwrap();
    assert_eq!(value, record([Item::slot("a", 1), Item::slot("b", 2)]));
}
