pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod expr;
pub mod input;
pub mod interpreter;
pub mod lexer;
pub mod num;
pub mod operator;
pub mod parser;
pub mod record;
pub mod selector;
pub mod utils;
pub mod value;
pub mod writer;
mod serialization;

pub use config::InterpreterConfig;
pub use envelope::{Envelope, EnvelopeKind};
pub use error::{
    CastError, EnvelopeError, InterpreterError, ParseError, ReconError, RecordError, WriteError,
};
pub use input::{Input, Mark, Parse, Progress};
pub use interpreter::Interpreter;
pub use num::Num;
pub use operator::{BinaryOp, Operator, UnaryOp};
pub use parser::{Parser, StreamParser};
pub use record::{Builder, Record, RecordBuilder, ValueBuilder};
pub use selector::Selector;
pub use value::{Field, Item, Value};
pub use writer::{size_of, Output, Writer};
