use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Crate-level error, wrapping every failure a Recon pipeline can surface.
#[derive(Error, Debug, Diagnostic)]
pub enum ReconError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("{error}")]
    #[diagnostic(
        code(recon::document),
        help("The document could not be parsed as Recon.")
    )]
    Source {
        #[source_code]
        src: NamedSource<String>,
        #[label("{error}")]
        span: SourceSpan,
        error: ParseError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Interpreter(#[from] InterpreterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cast(#[from] CastError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("I/O error")]
    #[diagnostic(code(recon::io))]
    Io(#[from] std::io::Error),
}

impl ReconError {
    /// Attaches the named source document to a parse error so that it renders with context.
    pub fn with_source(error: ParseError, name: &str, source: &str) -> Self {
        ReconError::Source {
            src: NamedSource::new(name, source.to_string()),
            span: error.span(),
            error,
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected character {found:?}, expected {expected}")]
    #[diagnostic(
        code(recon::parser::unexpected_char),
        help("The parser found a character it did not expect in this position.")
    )]
    UnexpectedChar {
        found: char,
        expected: String,
        #[label("Expected {expected}, but found this")]
        span: SourceSpan,
        line: usize,
        column: usize,
    },

    #[error("Unexpected end of input, expected {expected}")]
    #[diagnostic(
        code(recon::parser::unexpected_end),
        help("The input ended inside an unterminated construct.")
    )]
    UnexpectedEnd {
        expected: String,
        #[label("Input ended here")]
        span: SourceSpan,
        line: usize,
        column: usize,
    },

    #[error("Invalid UTF-8 sequence")]
    #[diagnostic(code(recon::parser::invalid_utf8))]
    InvalidUtf8 {
        #[label("Not valid UTF-8")]
        span: SourceSpan,
    },

    #[error("Invalid number literal {literal:?}")]
    #[diagnostic(
        code(recon::parser::invalid_number),
        help("Hexadecimal literals hold at most 16 digits.")
    )]
    InvalidNumber {
        literal: String,
        #[label("This number cannot be represented")]
        span: SourceSpan,
    },

    #[error("Invalid base64 data literal")]
    #[diagnostic(code(recon::parser::invalid_data))]
    InvalidData {
        #[label("Not valid base64")]
        span: SourceSpan,
    },

    #[error("Nesting deeper than {max} levels")]
    #[diagnostic(
        code(recon::parser::too_deep),
        help("Raise the parser's maximum depth, or flatten the document.")
    )]
    TooDeep {
        max: usize,
        #[label("Too deeply nested")]
        span: SourceSpan,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn span(&self) -> SourceSpan {
        match self {
            ParseError::UnexpectedChar { span, .. }
            | ParseError::UnexpectedEnd { span, .. }
            | ParseError::InvalidUtf8 { span }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::InvalidData { span }
            | ParseError::TooDeep { span, .. } => *span,
        }
    }

    /// The human readable description of what the parser was looking for, if any.
    pub fn expected(&self) -> Option<&str> {
        match self {
            ParseError::UnexpectedChar { expected, .. }
            | ParseError::UnexpectedEnd { expected, .. } => Some(expected),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("Output exhausted after {written} bytes with {remaining} bytes still pending")]
    #[diagnostic(
        code(recon::writer::output_exhausted),
        help("Size the final output buffer with `size_of` before writing.")
    )]
    OutputExhausted { written: usize, remaining: usize },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("Scope stack overflow at depth {depth} (maximum {max})")]
    #[diagnostic(
        code(recon::interpreter::scope_overflow),
        help("Raise `max_scope_depth` in the interpreter configuration.")
    )]
    ScopeOverflow { depth: usize, max: usize },

    #[error("Expression nesting exceeds {max} levels")]
    #[diagnostic(
        code(recon::interpreter::too_deep),
        help("Raise `max_scope_depth` in the interpreter configuration.")
    )]
    TooDeep { max: usize },

    #[error("Scope stack underflow")]
    #[diagnostic(code(recon::interpreter::scope_underflow))]
    ScopeUnderflow,

    #[error("Value {callee} is not callable")]
    #[diagnostic(code(recon::interpreter::not_callable))]
    NotCallable { callee: String },

    #[error("Unknown function {name:?}")]
    #[diagnostic(code(recon::interpreter::unknown_function))]
    UnknownFunction { name: String },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[error("Cannot cast {found} to {expected}")]
#[diagnostic(code(recon::cast))]
pub struct CastError {
    pub expected: &'static str,
    pub found: String,
}

impl CastError {
    pub fn new(expected: &'static str, found: impl Into<String>) -> Self {
        CastError {
            expected,
            found: found.into(),
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Index {index} out of bounds for record of length {len}")]
    #[diagnostic(code(recon::record::index_out_of_bounds))]
    IndexOutOfBounds { index: usize, len: usize },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Value is not an envelope: expected a record starting with an attribute")]
    #[diagnostic(code(recon::envelope::not_an_envelope))]
    NotAnEnvelope,

    #[error("Unknown envelope tag @{tag}")]
    #[diagnostic(
        code(recon::envelope::unknown_tag),
        help("Known tags: event, command, link, linked, sync, synced, unlink, unlinked, auth, authed, deauth, deauthed.")
    )]
    UnknownTag { tag: String },

    #[error("Envelope @{tag} is missing its {field} header")]
    #[diagnostic(code(recon::envelope::missing_header))]
    MissingHeader { tag: &'static str, field: &'static str },

    #[error("Envelope header {field} has an invalid value {found}")]
    #[diagnostic(code(recon::envelope::invalid_header))]
    InvalidHeader { field: &'static str, found: String },
}
