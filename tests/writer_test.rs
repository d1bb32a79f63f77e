use pretty_assertions::assert_eq;
use recon_core::api::{parse, write_string};
use recon_core::writer::write_item_string;
use recon_core::{size_of, Item, Output, Value, WriteError, Writer};

const SOURCE: &str = "@msg(id:7,to:\"ünïcode ✓\"){body:[say @b{hi}],data:%AQID,n:-1.25}";

fn sample() -> Value {
    parse(SOURCE).unwrap()
}

#[test]
fn test_size_is_exact() {
    let value = sample();
    let text = write_string(&value);
    assert_eq!(size_of(&value), text.len());
    assert_eq!(size_of(&Value::Extant), 0);
    assert_eq!(size_of(&Value::from("tab\t")), "\"tab\\t\"".len());
}

#[test]
fn test_one_byte_buffers() {
    let value = sample();
    let mut out = Vec::new();
    let mut writer = Writer::new(&value);
    let mut pulls = 0;
    while writer.is_cont() {
        let mut buf = [0u8; 1];
        let mut output = Output::new(&mut buf);
        writer = writer.pull(&mut output);
        out.extend_from_slice(output.bytes());
        pulls += 1;
    }
    assert!(writer.is_done());
    assert_eq!(pulls, size_of(&value));
    assert_eq!(String::from_utf8(out).unwrap(), write_string(&value));
}

#[test]
fn test_exact_last_buffer_is_done() {
    let value = sample();
    let mut buf = vec![0u8; size_of(&value)];
    let mut output = Output::last(&mut buf);
    let writer = Writer::new(&value).pull(&mut output);
    assert!(writer.is_done());
    assert_eq!(output.len(), buf.len());
}

#[test]
fn test_short_last_buffer_is_exhausted() {
    let value = sample();
    let size = size_of(&value);
    let mut buf = vec![0u8; size - 1];
    let mut output = Output::last(&mut buf);
    match Writer::new(&value).pull(&mut output) {
        Writer::Error(error) => assert_eq!(
            error,
            WriteError::OutputExhausted {
                written: size - 1,
                remaining: 1
            }
        ),
        _ => panic!("expected the writer to run out of output"),
    }
}

#[test]
fn test_short_buffer_then_last_buffer() {
    let value = sample();
    let size = size_of(&value);
    let mut first = vec![0u8; 10];
    let mut output = Output::new(&mut first);
    let writer = Writer::new(&value).pull(&mut output);
    assert!(writer.is_cont());
    let mut rest = vec![0u8; size - 10];
    let mut output = Output::last(&mut rest);
    assert!(writer.pull(&mut output).is_done());
    let mut text = first;
    text.extend_from_slice(&rest);
    assert_eq!(String::from_utf8(text).unwrap(), write_string(&value));
}

#[test]
fn test_finished_writer_ignores_further_pulls() {
    let value = Value::from(1);
    let mut buf = [0u8; 4];
    let mut output = Output::new(&mut buf);
    let writer = Writer::new(&value).pull(&mut output);
    assert!(writer.is_done());
    let mut output = Output::new(&mut buf);
    assert!(writer.pull(&mut output).is_done());
    assert!(output.is_empty());
}

#[test]
fn test_item_writer() {
    assert_eq!(write_item_string(&Item::slot("a b", 1)), "\"a b\":1");
    assert_eq!(write_item_string(&Item::attr("x", Value::Extant)), "@x");
}

#[test]
fn test_canonical_spacing() {
    let value = parse("{ a : 1 , b : { c , d } }").unwrap();
    assert_eq!(write_string(&value), "{a:1,b:{c,d}}");
}
