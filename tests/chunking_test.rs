//! A document must parse to the same value however its bytes are split into chunks.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use recon_core::api::parse;
use recon_core::{StreamParser, Value};

const DOCUMENTS: &[&str] = &[
    "@event(node:\"/ünit\",lane:\"up\"){count:42,ratio:-1.5e-3,flag:true}",
    "{a: 0x0000ff01, b: %AQIDBA==, c: `raw``tick`, d: [mark @em{up} here]}",
    "{total: $price * ($qty + 1) >= 10 ? 'big' : 'small', f: x => $x.keys#0}",
    "# leading comment\n@a @b(1) {\n  ключ: \"значение\" # trailing\n  n: NaN\n}\n",
    "`a``b`",
];

fn parse_chunks<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> Value {
    let mut parser = StreamParser::new();
    for chunk in chunks {
        parser = parser.feed(chunk);
    }
    parser.end().bind().unwrap()
}

#[test]
fn test_every_split_point() {
    for source in DOCUMENTS {
        let expected = parse(source).unwrap();
        let bytes = source.as_bytes();
        for i in 0..=bytes.len() {
            let value = parse_chunks([&bytes[..i], &bytes[i..]]);
            assert_eq!(value, expected, "split at byte {i} of {source:?}");
        }
    }
}

#[test]
fn test_byte_at_a_time() {
    for source in DOCUMENTS {
        let expected = parse(source).unwrap();
        let value = parse_chunks(source.as_bytes().chunks(1));
        assert_eq!(value, expected, "byte-wise feed of {source:?}");
    }
}

#[test]
fn test_raw_string_with_doubled_fence() {
    let bytes = b"`a``b`";
    for i in 0..=bytes.len() {
        assert_eq!(
            parse_chunks([&bytes[..i], &bytes[i..]]),
            Value::from("a`b")
        );
    }
}

#[test]
fn test_empty_chunks_are_harmless() {
    let value = parse_chunks([&b""[..], &b"{a:"[..], &b""[..], &b"1}"[..], &b""[..]]);
    assert_eq!(value, parse("{a:1}").unwrap());
}

#[test]
fn test_error_is_the_same_however_split() {
    let source = b"{a: 1, b: ?}";
    let expected = parse_chunks_err(&[&source[..]]);
    for i in 0..=source.len() {
        assert_eq!(parse_chunks_err(&[&source[..i], &source[i..]]), expected);
    }
}

fn parse_chunks_err(chunks: &[&[u8]]) -> recon_core::ParseError {
    let mut parser = StreamParser::new();
    for chunk in chunks {
        parser = parser.feed(chunk);
    }
    parser.end().bind().unwrap_err()
}

proptest! {
    #[test]
    fn prop_random_splits(doc in 0..DOCUMENTS.len(), cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6)) {
        let source = DOCUMENTS[doc];
        let bytes = source.as_bytes();
        let mut points: Vec<usize> = cuts.iter().map(|cut| cut.index(bytes.len() + 1)).collect();
        points.sort_unstable();
        let mut chunks = Vec::new();
        let mut start = 0;
        for point in points {
            chunks.push(&bytes[start..point]);
            start = point;
        }
        chunks.push(&bytes[start..]);
        prop_assert_eq!(parse_chunks(chunks), parse(source).unwrap());
    }

    #[test]
    fn prop_text_survives_splitting(text in "\\PC{0,24}", cut in any::<prop::sample::Index>()) {
        let source = recon_core::api::write_string(&Value::from(text.as_str()));
        let bytes = source.as_bytes();
        let i = cut.index(bytes.len() + 1);
        prop_assert_eq!(parse_chunks([&bytes[..i], &bytes[i..]]), Value::from(text.as_str()));
    }
}
