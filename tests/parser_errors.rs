// Unhappy paths through the parser: every malformed document must fail, and the
// error must point at the offending position.

use recon_core::api::{parse, parse_with_config};
use recon_core::{InterpreterConfig, ParseError, ReconError, StreamParser};

fn parse_error(source: &str) -> ParseError {
    match parse(source) {
        Err(ReconError::Parse(error)) => error,
        other => panic!("expected a parse error for {source:?}, got {other:?}"),
    }
}

#[test]
fn test_parser_error_missing_closing_brace() {
    let error = parse_error("{ key: 123");
    assert!(matches!(error, ParseError::UnexpectedEnd { .. }));
    assert_eq!(error.expected(), Some("'}'"));
}

#[test]
fn test_parser_error_mismatched_bracket() {
    let error = parse_error("{ a: (1, 2 }");
    match error {
        ParseError::UnexpectedChar { found, .. } => assert_eq!(found, '}'),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_parser_error_missing_separator() {
    assert!(parse("{ key 123 }").is_err(), "Should fail without a separator");
}

#[test]
fn test_parser_error_unexpected_eof_after_colon_in_attr() {
    assert!(parse("@a(").is_err());
    assert!(parse("@").is_err());
    assert!(parse("@a(b:").is_err());
}

#[test]
fn test_parser_error_unterminated_strings() {
    assert!(matches!(parse_error("\"abc"), ParseError::UnexpectedEnd { .. }));
    assert!(matches!(parse_error("`abc"), ParseError::UnexpectedEnd { .. }));
    assert!(parse("\"bad \\q escape\"").is_err());
    assert!(parse("\"\\u12\"").is_err());
}

#[test]
fn test_parser_error_dangling_operators() {
    assert!(parse("1 +").is_err());
    assert!(parse("$a ? 1").is_err());
    assert!(parse("1 = 2").is_err());
    assert!(parse("1 ! 2").is_err());
}

#[test]
fn test_parser_error_bad_numbers_and_data() {
    assert!(matches!(parse_error("1."), ParseError::UnexpectedEnd { .. }));
    assert!(matches!(parse_error("0x"), ParseError::UnexpectedEnd { .. }));
    assert!(matches!(parse_error("%A"), ParseError::InvalidData { .. }));
}

#[test]
fn test_parser_error_stray_separator() {
    let error = parse_error("{,}");
    assert_eq!(error.expected(), Some("item"));
}

#[test]
fn test_parser_error_reports_line_and_column() {
    let error = parse_error("{\n  a: 1\n  b: ?\n}");
    match error {
        ParseError::UnexpectedChar {
            found,
            line,
            column,
            span,
            ..
        } => {
            assert_eq!(found, '?');
            assert_eq!((line, column), (3, 6));
            assert_eq!(span.offset(), 14);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

fn too_deep(source: &str, max: usize) -> ParseError {
    let config = InterpreterConfig::default().with_max_scope_depth(max);
    match parse_with_config(source, &config) {
        Err(ReconError::Parse(error @ ParseError::TooDeep { .. })) => error,
        other => panic!("expected {source:?} to nest too deeply, got {other:?}"),
    }
}

#[test]
fn test_parser_error_nesting_limit() {
    let config = InterpreterConfig::default().with_max_scope_depth(4);
    assert!(parse_with_config("{{{1}}}", &config).is_ok());
    let error = too_deep("{{{{1}}}}", 4);
    assert!(matches!(error, ParseError::TooDeep { max: 4, .. }));
    assert_eq!(error.span().offset(), 4);
}

#[test]
fn test_parser_error_hostile_nesting() {
    too_deep(&"{".repeat(100_000), 64);
    too_deep(&"(".repeat(100_000), 64);
    too_deep(&"@a(".repeat(100_000), 64);
    too_deep(&"[@a".repeat(100_000), 64);
    too_deep(&format!("{}1", "!".repeat(100_000)), 64);
    too_deep(&format!("$a{}", ".b".repeat(100_000)), 64);
    too_deep(&format!("1{}", " + 1".repeat(100_000)), 64);
    too_deep(&format!("{}1", "$a ? 1 : ".repeat(100_000)), 64);
}

#[test]
fn test_parser_error_default_nesting_limit() {
    let source = "{".repeat(100_000);
    assert!(matches!(parse_error(&source), ParseError::TooDeep { max: 128, .. }));
}

#[test]
fn test_parser_error_nesting_limit_across_chunks() {
    let source = "{a:{b:{c:{d:1}}}}";
    let whole = too_deep(source, 3);
    let mut parser = StreamParser::new().with_max_depth(3);
    for chunk in source.as_bytes().chunks(1) {
        parser = parser.feed(chunk);
    }
    assert_eq!(parser.end().bind(), Err(whole));
}
