//! Incremental Recon writer.
//!
//! A value is rendered as a stream of tokens produced by an explicit frame stack, so
//! writing can stop whenever the caller's buffer is full and resume later. The same
//! token stream backs [`size_of`] and [`write_string`], which keeps the three in exact
//! agreement.
use crate::error::WriteError;
use crate::expr::is_method;
use crate::operator::{precedence, Operator};
use crate::record::Record;
use crate::selector::Selector;
use crate::utils::{is_ident, is_ident_char, is_ident_start_char};
use crate::value::{Field, Item, Value};
use base64::Engine as _;
use log::debug;

/// A caller-provided output buffer.
pub struct Output<'a> {
    buf: &'a mut [u8],
    index: usize,
    last: bool,
}

impl<'a> Output<'a> {
    /// A buffer that more buffers will follow.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Output {
            buf,
            index: 0,
            last: false,
        }
    }

    /// The final buffer; a value that does not fit is an error.
    pub fn last(buf: &'a mut [u8]) -> Self {
        Output {
            buf,
            index: 0,
            last: true,
        }
    }

    /// Number of bytes written into this buffer.
    pub fn len(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    pub fn is_full(&self) -> bool {
        self.index >= self.buf.len()
    }

    pub fn is_last(&self) -> bool {
        self.last
    }

    /// The bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.index]
    }

    fn push(&mut self, byte: u8) {
        self.buf[self.index] = byte;
        self.index += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'v> {
    /// Text written as is.
    Raw(&'v str),
    /// Text written between double quotes with escapes.
    Quoted(&'v str),
    Formatted(String),
}

impl Token<'_> {
    fn len(&self) -> usize {
        match self {
            Token::Raw(s) => s.len(),
            Token::Formatted(s) => s.len(),
            Token::Quoted(s) => {
                let mut buf = [0u8; 6];
                2 + s.chars().map(|c| escape(c, &mut buf)).sum::<usize>()
            }
        }
    }

    fn write_into(&self, out: &mut String) {
        match self {
            Token::Raw(s) => out.push_str(s),
            Token::Formatted(s) => out.push_str(s),
            Token::Quoted(s) => {
                let mut buf = [0u8; 6];
                out.push('"');
                for c in s.chars() {
                    let len = escape(c, &mut buf);
                    if len == c.len_utf8() && buf[0] != b'\\' {
                        out.push(c);
                    } else {
                        // escape sequences are plain ASCII
                        out.extend(buf[..len].iter().map(|&b| char::from(b)));
                    }
                }
                out.push('"');
            }
        }
    }
}

/// Writes the quoted form of `c` into `buf`, returning its length in bytes.
fn escape(c: char, buf: &mut [u8; 6]) -> usize {
    let simple = match c {
        '"' => Some(b'"'),
        '\\' => Some(b'\\'),
        '\u{8}' => Some(b'b'),
        '\u{c}' => Some(b'f'),
        '\n' => Some(b'n'),
        '\r' => Some(b'r'),
        '\t' => Some(b't'),
        _ => None,
    };
    if let Some(e) = simple {
        buf[0] = b'\\';
        buf[1] = e;
        2
    } else if c.is_control() && (c as u32) < 0x10000 {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let code = c as u32;
        buf[0] = b'\\';
        buf[1] = b'u';
        for i in 0..4 {
            buf[2 + i] = HEX[((code >> (12 - 4 * i)) & 0xF) as usize];
        }
        6
    } else {
        c.encode_utf8(&mut buf[..]).len()
    }
}

/// The token being emitted, with its position.
#[derive(Debug, Clone, Default)]
struct Cursor<'v> {
    token: Option<Token<'v>>,
    /// Byte offset into the token text.
    index: usize,
    /// Escaped bytes of the current quoted character.
    pending: [u8; 6],
    pending_len: usize,
    pending_index: usize,
    quote: QuotePhase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum QuotePhase {
    #[default]
    Open,
    Body,
    Close,
    Finished,
}

impl<'v> Cursor<'v> {
    fn new(token: Token<'v>) -> Self {
        Cursor {
            token: Some(token),
            ..Cursor::default()
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        if let Some(Token::Quoted(text)) = self.token {
            return self.next_quoted(text);
        }
        let text: &str = match self.token.as_ref()? {
            Token::Raw(s) => s,
            Token::Formatted(s) => s.as_str(),
            Token::Quoted(_) => return None,
        };
        let byte = text.as_bytes().get(self.index).copied();
        if byte.is_some() {
            self.index += 1;
        }
        byte
    }

    fn next_quoted(&mut self, text: &'v str) -> Option<u8> {
        loop {
            match self.quote {
                QuotePhase::Open => {
                    self.quote = QuotePhase::Body;
                    return Some(b'"');
                }
                QuotePhase::Body => {
                    if self.pending_index < self.pending_len {
                        let byte = self.pending[self.pending_index];
                        self.pending_index += 1;
                        return Some(byte);
                    }
                    match text[self.index..].chars().next() {
                        Some(c) => {
                            self.index += c.len_utf8();
                            self.pending_len = escape(c, &mut self.pending);
                            self.pending_index = 0;
                        }
                        None => self.quote = QuotePhase::Close,
                    }
                }
                QuotePhase::Close => {
                    self.quote = QuotePhase::Finished;
                    return Some(b'"');
                }
                QuotePhase::Finished => return None,
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Frame<'v> {
    Token(Token<'v>),
    /// A value in item position: a block item, a slot value or a whole document.
    Value(&'v Value),
    Item(&'v Item),
    /// Items joined by commas.
    Items { items: &'v [Item], index: usize },
    /// The parts of a record that has attributes.
    RecordParts { record: &'v Record, index: usize },
    /// An expression operand, optionally parenthesized.
    Operand { value: &'v Value, parens: bool },
    /// The contents of `(...)` after an attribute or an invocation.
    Body(&'v Value),
    Selector {
        selector: &'v Selector,
        first: bool,
    },
}

/// Walks a value and yields its tokens in order.
#[derive(Debug, Clone)]
struct Tokens<'v> {
    frames: Vec<Frame<'v>>,
}

impl<'v> Tokens<'v> {
    fn new(frame: Frame<'v>) -> Self {
        Tokens {
            frames: vec![frame],
        }
    }

    /// Pushes frames so that they run in the given order.
    fn then<const N: usize>(&mut self, frames: [Frame<'v>; N]) {
        self.frames.extend(frames.into_iter().rev());
    }

    fn next_token(&mut self) -> Option<Token<'v>> {
        while let Some(frame) = self.frames.pop() {
            match frame {
                Frame::Token(token) => return Some(token),
                Frame::Value(value) => self.value(value),
                Frame::Item(item) => self.item(item),
                Frame::Items { items, index } => {
                    if let Some(item) = items.get(index) {
                        self.frames.push(Frame::Items {
                            items,
                            index: index + 1,
                        });
                        self.frames.push(Frame::Item(item));
                        if index > 0 {
                            return Some(Token::Raw(","));
                        }
                    }
                }
                Frame::RecordParts { record, index } => self.record_parts(record, index),
                Frame::Operand { value, parens } => self.operand(value, parens),
                Frame::Body(value) => self.body(value),
                Frame::Selector { selector, first } => self.selector(selector, first),
            }
        }
        None
    }

    fn value(&mut self, value: &'v Value) {
        match value {
            Value::Record(record) if record.is_empty() => {
                self.frames.push(Frame::Token(Token::Raw("{}")));
            }
            Value::Record(record) if record.has_attrs() => {
                self.frames.push(Frame::RecordParts { record, index: 0 });
            }
            Value::Record(record) => self.then([
                Frame::Token(Token::Raw("{")),
                Frame::Items {
                    items: record.items(),
                    index: 0,
                },
                Frame::Token(Token::Raw("}")),
            ]),
            Value::Text(text) => self.frames.push(Frame::Token(text_token(text))),
            Value::Data(data) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                self.frames
                    .push(Frame::Token(Token::Formatted(format!("%{encoded}"))));
            }
            Value::Num(num) => self
                .frames
                .push(Frame::Token(Token::Formatted(num.to_string()))),
            Value::Bool(b) => self
                .frames
                .push(Frame::Token(Token::Raw(if *b { "true" } else { "false" }))),
            Value::Selector(selector) => self.then([
                Frame::Token(Token::Raw("$")),
                Frame::Selector {
                    selector,
                    first: true,
                },
            ]),
            Value::Operator(_) => self.frames.push(Frame::Operand {
                value,
                parens: false,
            }),
            Value::Extant | Value::Absent => {}
        }
    }

    fn item(&mut self, item: &'v Item) {
        match item {
            Item::Field(Field::Attr { key, value }) => self.attr(key, value),
            Item::Field(Field::Slot { key, value }) => self.then([
                if key.is_unit() {
                    Frame::Token(Token::Raw("()"))
                } else {
                    Frame::Value(key)
                },
                Frame::Token(Token::Raw(":")),
                // an empty slot value reads back as extant
                if matches!(value, Value::Absent) {
                    Frame::Token(Token::Raw("()"))
                } else {
                    Frame::Value(value)
                },
            ]),
            Item::Value(value) => self.frames.push(Frame::Value(value)),
        }
    }

    fn attr(&mut self, name: &'v str, value: &'v Value) {
        let name = if is_ident(name) {
            Token::Raw(name)
        } else {
            Token::Quoted(name)
        };
        if value.is_unit() {
            self.then([Frame::Token(Token::Raw("@")), Frame::Token(name)]);
        } else {
            self.then([
                Frame::Token(Token::Raw("@")),
                Frame::Token(name),
                Frame::Token(Token::Raw("(")),
                Frame::Body(value),
                Frame::Token(Token::Raw(")")),
            ]);
        }
    }

    fn record_parts(&mut self, record: &'v Record, index: usize) {
        let items = record.items();
        let Some(item) = items.get(index) else {
            return;
        };
        if let Item::Field(Field::Attr { key, value }) = item {
            self.frames.push(Frame::RecordParts {
                record,
                index: index + 1,
            });
            self.attr(key, value);
            return;
        }
        let end = items[index..]
            .iter()
            .position(Item::is_attr)
            .map_or(items.len(), |offset| index + offset);
        self.frames.push(Frame::RecordParts { record, index: end });
        match item {
            Item::Value(value)
                if end == items.len()
                    && end == index + 1
                    && !value.is_record()
                    && !value.is_unit() =>
            {
                self.then([Frame::Token(Token::Raw(" ")), Frame::Value(value)]);
            }
            _ => self.then([
                Frame::Token(Token::Raw("{")),
                Frame::Items {
                    items: &items[index..end],
                    index: 0,
                },
                Frame::Token(Token::Raw("}")),
            ]),
        }
    }

    fn body(&mut self, value: &'v Value) {
        match value {
            Value::Record(record)
                if !record.is_empty()
                    && !record.has_attrs()
                    && !(record.len() == 1 && !record.items()[0].is_field()) =>
            {
                self.frames.push(Frame::Items {
                    items: record.items(),
                    index: 0,
                });
            }
            value => self.frames.push(Frame::Value(value)),
        }
    }

    fn operand(&mut self, value: &'v Value, parens: bool) {
        if parens {
            self.then([
                Frame::Token(Token::Raw("(")),
                Frame::Operand {
                    value,
                    parens: false,
                },
                Frame::Token(Token::Raw(")")),
            ]);
            return;
        }
        let operator = match value {
            Value::Operator(operator) => operator,
            Value::Record(_) => {
                self.then([
                    Frame::Token(Token::Raw("(")),
                    Frame::Body(value),
                    Frame::Token(Token::Raw(")")),
                ]);
                return;
            }
            Value::Extant | Value::Absent => {
                self.frames.push(Frame::Token(Token::Raw("()")));
                return;
            }
            value => {
                self.frames.push(Frame::Value(value));
                return;
            }
        };
        match operator {
            Operator::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                self.then([
                    Frame::Operand {
                        value: lhs,
                        parens: precedence_of(lhs) < prec,
                    },
                    Frame::Token(Token::Formatted(format!(" {} ", op.symbol()))),
                    Frame::Operand {
                        value: rhs,
                        parens: precedence_of(rhs) <= prec,
                    },
                ]);
            }
            Operator::Unary { op, operand } => self.then([
                Frame::Token(Token::Raw(op.symbol())),
                Frame::Operand {
                    value: operand,
                    parens: precedence_of(operand) < precedence::UNARY,
                },
            ]),
            Operator::Conditional {
                cond,
                then,
                otherwise,
            } => self.then([
                Frame::Operand {
                    value: cond,
                    parens: precedence_of(cond) <= precedence::CONDITIONAL,
                },
                Frame::Token(Token::Raw(" ? ")),
                Frame::Operand {
                    value: then,
                    parens: precedence_of(then) < precedence::CONDITIONAL,
                },
                Frame::Token(Token::Raw(" : ")),
                Frame::Operand {
                    value: otherwise,
                    parens: precedence_of(otherwise) < precedence::CONDITIONAL,
                },
            ]),
            Operator::Lambda { bindings, body } => self.then([
                Frame::Operand {
                    value: bindings,
                    parens: precedence_of(bindings) <= precedence::LAMBDA,
                },
                Frame::Token(Token::Raw(" => ")),
                Frame::Operand {
                    value: body,
                    parens: false,
                },
            ]),
            Operator::Invoke { func, args } => self.then([
                Frame::Operand {
                    value: func,
                    parens: precedence_of(func) < precedence::INVOKE || ends_in_method_name(func),
                },
                Frame::Token(Token::Raw("(")),
                Frame::Body(args),
                Frame::Token(Token::Raw(")")),
            ]),
        }
    }

    fn selector(&mut self, selector: &'v Selector, first: bool) {
        let Some(then) = selector.then() else {
            return;
        };
        self.frames.push(Frame::Selector {
            selector: then,
            first: false,
        });
        let dot = if first { "" } else { "." };
        match selector {
            Selector::Get { key, .. } => match key.as_ref() {
                Value::Text(name) if is_selector_name(name) => {
                    self.then([Frame::Token(Token::Raw(dot)), Frame::Token(Token::Raw(name))]);
                }
                key => self.then([
                    Frame::Token(Token::Raw(".get(")),
                    Frame::Body(key),
                    Frame::Token(Token::Raw(")")),
                ]),
            },
            Selector::GetAttr { key, .. } => self.then([
                Frame::Token(Token::Raw(if first { "@" } else { ".@" })),
                Frame::Token(if is_selector_name(key) {
                    Token::Raw(key)
                } else {
                    Token::Quoted(key)
                }),
            ]),
            Selector::GetItem { index, .. } => {
                self.frames
                    .push(Frame::Token(Token::Formatted(format!("#{index}"))));
            }
            Selector::Children { .. } => {
                self.frames
                    .push(Frame::Token(Token::Raw(if first { "*" } else { ".*" })));
            }
            Selector::Descendants { .. } => {
                self.frames
                    .push(Frame::Token(Token::Raw(if first { "**" } else { ".**" })));
            }
            Selector::Keys { .. } => self.frames.push(Frame::Token(Token::Raw(".keys()"))),
            Selector::Values { .. } => self.frames.push(Frame::Token(Token::Raw(".values()"))),
            Selector::Filter { predicate, .. } => self.then([
                Frame::Token(Token::Raw("[")),
                Frame::Body(predicate),
                Frame::Token(Token::Raw("]")),
            ]),
            Selector::Identity => {}
        }
    }
}

fn text_token(text: &str) -> Token<'_> {
    if is_ident(text) {
        Token::Raw(text)
    } else {
        Token::Quoted(text)
    }
}

/// Selector steps read names as plain identifiers, reserved words included.
fn is_selector_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if is_ident_start_char(c)) && chars.all(is_ident_char)
}

/// A selector ending in `.keys` or similar would read back as a method call when
/// followed by `(`.
fn ends_in_method_name(value: &Value) -> bool {
    let Value::Selector(first) = value else {
        return false;
    };
    let mut step: &Selector = first;
    let mut last = None;
    while let Some(then) = step.then() {
        last = Some(step);
        step = then;
    }
    match last {
        Some(Selector::Get { key, .. }) => {
            matches!(key.as_ref(), Value::Text(name) if is_method(name))
        }
        _ => false,
    }
}

/// Binding strength of a value in operand position.
fn precedence_of(value: &Value) -> u8 {
    match value {
        Value::Operator(operator) => operator.precedence(),
        Value::Num(num) if num.as_f64().is_sign_negative() && !num.is_nan() => precedence::UNARY,
        _ => precedence::PRIMARY,
    }
}

#[derive(Debug, Clone)]
pub struct WriteState<'v> {
    tokens: Tokens<'v>,
    cursor: Cursor<'v>,
    peeked: Option<u8>,
    written: usize,
}

impl WriteState<'_> {
    fn next_byte(&mut self) -> Option<u8> {
        if let Some(byte) = self.peeked.take() {
            return Some(byte);
        }
        loop {
            if let Some(byte) = self.cursor.next_byte() {
                return Some(byte);
            }
            self.cursor = Cursor::new(self.tokens.next_token()?);
        }
    }

    fn is_finished(&mut self) -> bool {
        if self.peeked.is_none() {
            self.peeked = self.next_byte();
        }
        self.peeked.is_none()
    }

    fn remaining(&self) -> usize {
        let mut rest = self.clone();
        let mut count = 0;
        while rest.next_byte().is_some() {
            count += 1;
        }
        count
    }
}

/// A resumable write of one value.
#[derive(Debug, Clone)]
pub enum Writer<'v> {
    Cont(WriteState<'v>),
    Done,
    Error(WriteError),
}

impl<'v> Writer<'v> {
    pub fn new(value: &'v Value) -> Self {
        Writer::start(Frame::Value(value))
    }

    /// Writes a single item, such as a slot, as it would appear in a block.
    pub fn item(item: &'v Item) -> Self {
        Writer::start(Frame::Item(item))
    }

    fn start(frame: Frame<'v>) -> Self {
        Writer::Cont(WriteState {
            tokens: Tokens::new(frame),
            cursor: Cursor::default(),
            peeked: None,
            written: 0,
        })
    }

    /// Fills `output` with as many bytes as fit.
    pub fn pull(self, output: &mut Output<'_>) -> Self {
        let Writer::Cont(mut state) = self else {
            return self;
        };
        while !output.is_full() {
            match state.next_byte() {
                Some(byte) => {
                    output.push(byte);
                    state.written += 1;
                }
                None => return Writer::Done,
            }
        }
        if state.is_finished() {
            return Writer::Done;
        }
        if output.is_last() {
            let error = WriteError::OutputExhausted {
                written: state.written,
                remaining: state.remaining(),
            };
            debug!("writer failed: {error}");
            return Writer::Error(error);
        }
        Writer::Cont(state)
    }

    pub fn is_cont(&self) -> bool {
        matches!(self, Writer::Cont(_))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Writer::Done)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Writer::Error(_))
    }
}

/// Exact number of bytes [`Writer`] emits for `value`.
pub fn size_of(value: &Value) -> usize {
    let mut tokens = Tokens::new(Frame::Value(value));
    let mut size = 0;
    while let Some(token) = tokens.next_token() {
        size += token.len();
    }
    size
}

pub fn write_string(value: &Value) -> String {
    render(Tokens::new(Frame::Value(value)))
}

pub fn write_item_string(item: &Item) -> String {
    render(Tokens::new(Frame::Item(item)))
}

fn render(mut tokens: Tokens<'_>) -> String {
    let mut out = String::new();
    while let Some(token) = tokens.next_token() {
        token.write_into(&mut out);
    }
    out
}
