use crate::config::InterpreterConfig;
use crate::envelope::Envelope;
use crate::error::ReconError;
use crate::parser::{parse_str, parse_str_with_max_depth, StreamParser};
use crate::value::Value;
use crate::writer::{self, Output, Writer};
use log::trace;
use std::io::{Read, Write};

/// Default chunk size for [`parse_reader`] and buffer size for [`write_to`].
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Parses a complete Recon document.
///
/// # Errors
/// Returns a `ReconError::Parse` if the document is not valid Recon.
pub fn parse(source: &str) -> Result<Value, ReconError> {
    Ok(parse_str(source)?)
}

/// Parses a Recon document nested no deeper than the configured `max_scope_depth`,
/// so that the result can be evaluated under the same configuration.
///
/// # Errors
/// Returns a `ReconError::Parse` if the document is not valid Recon or nests too deeply.
pub fn parse_with_config(source: &str, config: &InterpreterConfig) -> Result<Value, ReconError> {
    Ok(parse_str_with_max_depth(source, config.max_scope_depth)?)
}

/// Parses a Recon document, attaching `file_name` and the source text to any error so
/// that it renders with a labelled snippet.
///
/// # Errors
/// Returns a `ReconError::Source` if the document is not valid Recon.
pub fn parse_named(source: &str, file_name: &str) -> Result<Value, ReconError> {
    parse_str(source).map_err(|error| ReconError::with_source(error, file_name, source))
}

/// Parses a document read from `reader`, feeding it to a [`StreamParser`] in chunks of
/// at most `chunk_size` bytes.
///
/// # Errors
/// Returns a `ReconError::Io` if reading fails and a `ReconError::Parse` if the bytes
/// are not valid Recon.
pub fn parse_reader(mut reader: impl Read, chunk_size: usize) -> Result<Value, ReconError> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut parser = StreamParser::new();
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        parser = parser.feed(&buf[..n]);
        if !parser.is_cont() {
            break;
        }
    }
    Ok(parser.end().bind()?)
}

/// Renders `value` as compact Recon text.
#[must_use]
pub fn write_string(value: &Value) -> String {
    writer::write_string(value)
}

/// Writes `value` to `sink` through a fixed buffer of `buffer_size` bytes, returning the
/// number of bytes written.
///
/// # Errors
/// Returns a `ReconError::Io` if the sink fails.
pub fn write_to(mut sink: impl Write, value: &Value, buffer_size: usize) -> Result<usize, ReconError> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut writer = Writer::new(value);
    let mut total = 0;
    while writer.is_cont() {
        let mut output = Output::new(&mut buf);
        writer = writer.pull(&mut output);
        sink.write_all(output.bytes())?;
        total += output.len();
        trace!("wrote {} bytes, {total} in total", output.len());
    }
    match writer {
        Writer::Error(error) => Err(error.into()),
        _ => Ok(total),
    }
}

/// Serializes `value` as pretty-printed JSON.
///
/// # Errors
/// Returns a `serde_json::Error` if serialization fails.
pub fn to_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Serializes `value` as YAML.
///
/// # Errors
/// Returns a `serde_yaml::Error` if serialization fails.
pub fn to_yaml(value: &Value) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(value)
}

/// Parses a document and reads it as a message envelope.
///
/// # Errors
/// Returns a `ReconError::Parse` for invalid Recon and a `ReconError::Envelope` when the
/// value is not a well-formed envelope.
pub fn parse_envelope(source: &str) -> Result<Envelope, ReconError> {
    let value = parse(source)?;
    Ok(Envelope::decode(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::value::Item;

    #[test]
    fn test_simple_parse_to_json() {
        let value = parse("{name: \"Recon\", version: 1.0, tags: {fast, small}}").unwrap();
        let json = to_json(&value).unwrap();
        let expected: serde_json::Value = serde_json::from_str(
            r#"{"name": "Recon", "version": 1.0, "tags": ["fast", "small"]}"#,
        )
        .unwrap();
        let actual: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_simple_parse_to_yaml() {
        let value = parse("{a: 1, b: true}").unwrap();
        assert_eq!(to_yaml(&value).unwrap(), "a: 1\nb: true\n");
    }

    #[test]
    fn test_parse_reader_small_chunks() {
        let source = "@greeting(lang:\"日本語\") {text: \"こんにちは\"}";
        let value = parse_reader(source.as_bytes(), 1).unwrap();
        assert_eq!(value, parse(source).unwrap());
    }

    #[test]
    fn test_write_to_small_buffer() {
        let value = Value::Record(Record::of([Item::slot("a", "b c"), Item::from(2)]));
        let mut sink = Vec::new();
        let written = write_to(&mut sink, &value, 3).unwrap();
        assert_eq!(written, sink.len());
        assert_eq!(String::from_utf8(sink).unwrap(), "{a:\"b c\",2}");
    }
}
