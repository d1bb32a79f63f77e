//! Structural Recon grammar and the public parser drivers.
//!
//! [`Parser`] wraps any [`Parse`] rule in the three observable states a caller sees.
//! [`StreamParser`] adds byte-level decoding on top of the document rule so that
//! chunks may split UTF-8 sequences anywhere.
use crate::config::DEFAULT_MAX_PARSE_DEPTH;
use crate::error::ParseError;
use crate::expr::{is_expr_start, ExprRule};
use crate::input::{head_or_end, Input, Mark, Parse, Progress};
use crate::lexer::{IdentRule, StringRule};
use crate::record::{Builder, Record, RecordBuilder, ValueBuilder};
use crate::utils::{is_ident_start_char, is_item_terminator, is_newline, is_space, is_whitespace};
use crate::value::{Field, Item, Value};
use log::{debug, trace};

/// A resumable parse in one of three states.
pub enum Parser<P: Parse> {
    /// More input is needed.
    Cont(P),
    Done(P::Output),
    Error(ParseError),
}

impl<P: Parse> Parser<P> {
    pub fn new(rule: P) -> Self {
        Parser::Cont(rule)
    }

    /// Offers a chunk to a continuing parser. Finished parsers are returned unchanged.
    pub fn feed(self, input: &mut Input<'_>) -> Self {
        match self {
            Parser::Cont(mut rule) => match rule.feed(input) {
                Ok(Progress::Pending) => Parser::Cont(rule),
                Ok(Progress::Done(output)) => Parser::Done(output),
                Err(error) => {
                    debug!("parser failed: {error}");
                    Parser::Error(error)
                }
            },
            finished => finished,
        }
    }

    pub fn is_cont(&self) -> bool {
        matches!(self, Parser::Cont(_))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Parser::Done(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Parser::Error(_))
    }

    /// Returns the result. A parser still waiting for input is first told that the
    /// stream has ended.
    pub fn bind(self) -> Result<P::Output, ParseError> {
        match self {
            Parser::Done(output) => Ok(output),
            Parser::Error(error) => Err(error),
            cont @ Parser::Cont(_) => match cont.feed(&mut Input::last("")) {
                Parser::Done(output) => Ok(output),
                Parser::Error(error) => Err(error),
                Parser::Cont(_) => Err(Input::last("").error("end of input")),
            },
        }
    }
}

/// Parses a complete document held in memory.
pub fn parse_str(text: &str) -> Result<Value, ParseError> {
    parse_str_with_max_depth(text, DEFAULT_MAX_PARSE_DEPTH)
}

/// Parses a complete document, rejecting nesting deeper than `max_depth`.
pub fn parse_str_with_max_depth(text: &str, max_depth: usize) -> Result<Value, ParseError> {
    Parser::new(BlockRule::document())
        .feed(&mut Input::last(text).with_max_depth(max_depth))
        .bind()
}

/// A byte-level document parser, fed one chunk at a time.
pub struct StreamParser {
    parser: Parser<BlockRule<ValueBuilder>>,
    mark: Mark,
    carry: Vec<u8>,
    max_depth: usize,
}

impl Default for StreamParser {
    fn default() -> Self {
        StreamParser::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        StreamParser {
            parser: Parser::new(BlockRule::document()),
            mark: Mark::default(),
            carry: Vec::new(),
            max_depth: DEFAULT_MAX_PARSE_DEPTH,
        }
    }

    /// Rejects documents nested deeper than `max_depth`.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Feeds the next chunk. A UTF-8 sequence cut off at the end of the chunk is held
    /// until the next call.
    pub fn feed(mut self, bytes: &[u8]) -> Self {
        if !self.parser.is_cont() {
            return self;
        }
        trace!(
            "feeding {} bytes at offset {}",
            bytes.len(),
            self.mark.offset
        );
        let mut bytes = bytes;
        if !self.carry.is_empty() {
            let width = utf8_width(self.carry[0]);
            let take = (width - self.carry.len()).min(bytes.len());
            self.carry.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.carry.len() < width {
                return self;
            }
            let carry = std::mem::take(&mut self.carry);
            self = match std::str::from_utf8(&carry) {
                Ok(text) => self.feed_text(text, false),
                Err(_) => self.invalid_utf8(carry.len()),
            };
            if !self.parser.is_cont() {
                return self;
            }
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => self.feed_text(text, false),
            Err(error) => {
                let valid = error.valid_up_to();
                let text = std::str::from_utf8(&bytes[..valid]).unwrap_or_default();
                self = self.feed_text(text, false);
                if !self.parser.is_cont() {
                    return self;
                }
                match error.error_len() {
                    None => {
                        self.carry.extend_from_slice(&bytes[valid..]);
                        self
                    }
                    Some(len) => self.invalid_utf8(len),
                }
            }
        }
    }

    /// Signals that no more input will follow.
    pub fn end(self) -> Self {
        if !self.parser.is_cont() {
            return self;
        }
        if !self.carry.is_empty() {
            let len = self.carry.len();
            return self.invalid_utf8(len);
        }
        self.feed_text("", true)
    }

    pub fn is_cont(&self) -> bool {
        self.parser.is_cont()
    }

    pub fn is_done(&self) -> bool {
        self.parser.is_done()
    }

    pub fn is_error(&self) -> bool {
        self.parser.is_error()
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.mark.offset
    }

    pub fn bind(self) -> Result<Value, ParseError> {
        match self.parser {
            Parser::Done(value) => Ok(value),
            Parser::Error(error) => Err(error),
            Parser::Cont(_) => Err(Input::resume("", self.mark, true).error("end of input")),
        }
    }

    fn feed_text(mut self, text: &str, last: bool) -> Self {
        let mut input = Input::resume(text, self.mark, last).with_max_depth(self.max_depth);
        self.parser = self.parser.feed(&mut input);
        self.mark = input.mark();
        self
    }

    fn invalid_utf8(mut self, len: usize) -> Self {
        let error = ParseError::InvalidUtf8 {
            span: (self.mark.offset, len).into(),
        };
        debug!("parser failed: {error}");
        self.parser = Parser::Error(error);
        self
    }
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

#[derive(Debug, Clone)]
enum BlockStep {
    Lead,
    LeadComment,
    Item(Box<ItemRule>),
    After,
    AfterComment,
}

/// A sequence of items separated by `,`, `;` or newlines, ended by a closing
/// character or, for a document, by the end of input. The closing character is
/// consumed; the opening one is the caller's.
#[derive(Debug, Clone)]
pub struct BlockRule<B> {
    step: BlockStep,
    close: Option<char>,
    builder: B,
}

impl BlockRule<ValueBuilder> {
    pub fn document() -> Self {
        BlockRule::new(None)
    }
}

impl<B: Builder + Default> BlockRule<B> {
    pub fn new(close: Option<char>) -> Self {
        BlockRule {
            step: BlockStep::Lead,
            close,
            builder: B::default(),
        }
    }

    fn expected_close(&self) -> String {
        match self.close {
            Some(close) => format!("'{close}'"),
            None => "end of input".to_string(),
        }
    }

    fn finish(&mut self) -> Progress<B::Output> {
        Progress::Done(std::mem::take(&mut self.builder).bind())
    }
}

impl<B: Builder + Default> Parse for BlockRule<B> {
    type Output = B::Output;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<B::Output>, ParseError> {
        input.descend()?;
        let progress = self.feed_items(input);
        input.ascend();
        progress
    }
}

impl<B: Builder + Default> BlockRule<B> {
    fn feed_items(&mut self, input: &mut Input<'_>) -> Result<Progress<B::Output>, ParseError> {
        loop {
            if let BlockStep::Item(rule) = &mut self.step {
                match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(item) => {
                        if item.is_defined() {
                            self.builder.push(item);
                        }
                        self.step = BlockStep::After;
                        continue;
                    }
                }
            }
            let Some(c) = input.head() else {
                if !input.is_done() {
                    return Ok(Progress::Pending);
                }
                return match self.close {
                    None => Ok(self.finish()),
                    Some(_) => Err(input.error(self.expected_close())),
                };
            };
            match self.step {
                BlockStep::Item(_) => {}
                BlockStep::Lead => {
                    if Some(c) == self.close {
                        input.step();
                        return Ok(self.finish());
                    } else if is_whitespace(c) {
                        input.step();
                    } else if c == '#' {
                        self.step = BlockStep::LeadComment;
                    } else if is_part_start(c) {
                        self.step = BlockStep::Item(Box::new(ItemRule::new()));
                    } else {
                        return Err(input.error("item"));
                    }
                }
                BlockStep::After => {
                    if Some(c) == self.close {
                        input.step();
                        return Ok(self.finish());
                    } else if is_space(c) {
                        input.step();
                    } else if is_newline(c) || c == ',' || c == ';' {
                        input.step();
                        self.step = BlockStep::Lead;
                    } else if c == '#' {
                        self.step = BlockStep::AfterComment;
                    } else {
                        return Err(input.error(format!("',' or {}", self.expected_close())));
                    }
                }
                BlockStep::LeadComment | BlockStep::AfterComment => {
                    if is_newline(c) {
                        self.step = match self.step {
                            BlockStep::LeadComment => BlockStep::Lead,
                            _ => BlockStep::After,
                        };
                    } else {
                        input.step();
                    }
                }
            }
        }
    }
}

/// Characters that can begin a part: an attribute, a record, markup or an expression.
pub(crate) fn is_part_start(c: char) -> bool {
    c == '@' || is_expr_start(c)
}

#[derive(Debug, Clone)]
enum ItemStep {
    Key(PartsRule),
    AfterKey,
    SlotLead,
    SlotValue(PartsRule),
}

/// A block item: a value, or a slot when a `:` follows the first value.
#[derive(Debug, Clone)]
pub struct ItemRule {
    step: ItemStep,
    key: Value,
}

impl Default for ItemRule {
    fn default() -> Self {
        ItemRule::new()
    }
}

impl ItemRule {
    pub fn new() -> Self {
        ItemRule {
            step: ItemStep::Key(PartsRule::new()),
            key: Value::Absent,
        }
    }

    fn slot(&mut self, value: Value) -> Progress<Item> {
        Progress::Done(Item::slot(std::mem::take(&mut self.key), value))
    }
}

impl Parse for ItemRule {
    type Output = Item;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Item>, ParseError> {
        loop {
            match &mut self.step {
                ItemStep::Key(parts) => match parts.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(key) => {
                        self.key = key;
                        self.step = ItemStep::AfterKey;
                    }
                },
                ItemStep::SlotValue(parts) => match parts.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(value) => return Ok(self.slot(value)),
                },
                ItemStep::AfterKey => match input.head() {
                    Some(c) if is_space(c) => input.step(),
                    Some(':') => {
                        input.step();
                        self.step = ItemStep::SlotLead;
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => {
                        return Ok(Progress::Done(Item::Value(std::mem::take(&mut self.key))));
                    }
                },
                ItemStep::SlotLead => match input.head() {
                    Some(c) if is_space(c) => input.step(),
                    Some(c) if is_item_terminator(c) => return Ok(self.slot(Value::Extant)),
                    Some(c) if is_part_start(c) => {
                        self.step = ItemStep::SlotValue(PartsRule::new());
                    }
                    Some(_) => return Err(input.error("slot value")),
                    None if !input.is_done() => return Ok(Progress::Pending),
                    None => return Ok(self.slot(Value::Extant)),
                },
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Part {
    Attr(Field),
    Record(Record),
    Expr(Value),
}

#[derive(Debug, Clone)]
enum PartsStep {
    Lead,
    Attr(AttrRule),
    Record(Box<BlockRule<RecordBuilder>>),
    Markup(Box<MarkupRule>),
    Expr(Box<ExprRule>),
    Between,
}

/// Adjacent parts of one value, such as `@event(x) {body}` or `@tag 42`.
///
/// An expression part may only open the value or directly follow an attribute.
#[derive(Debug, Clone)]
pub struct PartsRule {
    step: PartsStep,
    parts: Vec<Part>,
}

impl Default for PartsRule {
    fn default() -> Self {
        PartsRule::new()
    }
}

impl PartsRule {
    pub fn new() -> Self {
        PartsRule {
            step: PartsStep::Lead,
            parts: Vec::new(),
        }
    }

    /// Starts the part opening at `c`, if any may start there.
    fn start_part(&mut self, c: char, input: &mut Input<'_>) -> bool {
        let expr_allowed = match self.parts.last() {
            None | Some(Part::Attr(_)) => true,
            Some(_) => false,
        };
        self.step = match c {
            '@' => PartsStep::Attr(AttrRule::new()),
            '{' => {
                input.step();
                PartsStep::Record(Box::new(BlockRule::new(Some('}'))))
            }
            '[' => PartsStep::Markup(Box::new(MarkupRule::new())),
            c if expr_allowed && is_expr_start(c) => PartsStep::Expr(Box::new(ExprRule::new())),
            _ => return false,
        };
        true
    }

    fn bind(&mut self) -> Value {
        let mut parts = std::mem::take(&mut self.parts);
        if parts.len() == 1 {
            return match parts.pop() {
                Some(Part::Attr(field)) => Value::Record(Record::of([Item::Field(field)])),
                Some(Part::Record(record)) => Value::Record(record),
                Some(Part::Expr(value)) => value,
                None => Value::Absent,
            };
        }
        let mut builder = RecordBuilder::new();
        for part in parts {
            match part {
                Part::Attr(field) => {
                    builder.push(field);
                }
                Part::Record(record) => {
                    for item in &record {
                        builder.push(item.clone());
                    }
                }
                Part::Expr(value) => {
                    if value.is_defined() {
                        builder.push(value);
                    }
                }
            }
        }
        Value::Record(builder.commit())
    }
}

impl Parse for PartsRule {
    type Output = Value;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Value>, ParseError> {
        loop {
            let part = match &mut self.step {
                PartsStep::Attr(rule) => rule.feed(input)?.map(Part::Attr),
                PartsStep::Record(rule) => rule.feed(input)?.map(Part::Record),
                PartsStep::Markup(rule) => rule.feed(input)?.map(Part::Record),
                PartsStep::Expr(rule) => rule.feed(input)?.map(Part::Expr),
                PartsStep::Lead => {
                    let Some(c) = head_or_end(input, "value")? else {
                        return Ok(Progress::Pending);
                    };
                    if !self.start_part(c, input) {
                        return Err(input.error("value"));
                    }
                    continue;
                }
                PartsStep::Between => match input.head() {
                    Some(c) if is_space(c) => {
                        input.step();
                        continue;
                    }
                    Some(c) => {
                        if self.start_part(c, input) {
                            continue;
                        }
                        return Ok(Progress::Done(self.bind()));
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    None => return Ok(Progress::Done(self.bind())),
                },
            };
            match part {
                Progress::Pending => return Ok(Progress::Pending),
                Progress::Done(part) => {
                    self.parts.push(part);
                    self.step = PartsStep::Between;
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum AttrStep {
    Start,
    Name,
    Ident(IdentRule),
    Quoted(StringRule),
    AfterName,
    Body(Box<BlockRule<ValueBuilder>>),
}

/// `@name` or `@name(body)`. The name is an identifier or a quoted string; an absent
/// or empty body binds to `Extant`.
#[derive(Debug, Clone)]
pub struct AttrRule {
    step: AttrStep,
    name: String,
}

impl Default for AttrRule {
    fn default() -> Self {
        AttrRule::new()
    }
}

impl AttrRule {
    pub fn new() -> Self {
        AttrRule {
            step: AttrStep::Start,
            name: String::new(),
        }
    }

    fn finish(&mut self, value: Value) -> Progress<Field> {
        let value = if value.is_defined() {
            value
        } else {
            Value::Extant
        };
        Progress::Done(Field::attr(std::mem::take(&mut self.name), value))
    }
}

impl Parse for AttrRule {
    type Output = Field;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Field>, ParseError> {
        loop {
            let name = match &mut self.step {
                AttrStep::Ident(rule) => rule.feed(input)?,
                AttrStep::Quoted(rule) => rule.feed(input)?,
                AttrStep::Body(rule) => {
                    return Ok(match rule.feed(input)? {
                        Progress::Pending => Progress::Pending,
                        Progress::Done(value) => self.finish(value),
                    });
                }
                AttrStep::Start => {
                    let Some(c) = head_or_end(input, "'@'")? else {
                        return Ok(Progress::Pending);
                    };
                    if c != '@' {
                        return Err(input.error("'@'"));
                    }
                    input.step();
                    self.step = AttrStep::Name;
                    continue;
                }
                AttrStep::Name => {
                    let Some(c) = head_or_end(input, "attribute name")? else {
                        return Ok(Progress::Pending);
                    };
                    self.step = if is_ident_start_char(c) {
                        AttrStep::Ident(IdentRule::new())
                    } else if c == '"' || c == '\'' {
                        AttrStep::Quoted(StringRule::new())
                    } else {
                        return Err(input.error("attribute name"));
                    };
                    continue;
                }
                AttrStep::AfterName => match input.head() {
                    Some('(') => {
                        input.step();
                        self.step = AttrStep::Body(Box::new(BlockRule::new(Some(')'))));
                        continue;
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => return Ok(self.finish(Value::Extant)),
                },
            };
            match name {
                Progress::Pending => return Ok(Progress::Pending),
                Progress::Done(name) => {
                    self.name = name;
                    self.step = AttrStep::AfterName;
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum MarkupStep {
    Open,
    Text,
    Escape,
    Attr(Box<AttrRule>),
    AfterAttr,
    AttrBlock(Box<BlockRule<RecordBuilder>>),
    AttrMarkup(Box<MarkupRule>),
    Block(Box<BlockRule<RecordBuilder>>),
}

/// Markup: `[text @tag{inline} more text]`.
///
/// Runs of text become text items. An inline attribute becomes a nested record
/// holding the attribute followed by the items of an immediately adjacent block or
/// markup. A bare `{block}` splices its items into the markup record.
#[derive(Debug, Clone)]
pub struct MarkupRule {
    step: MarkupStep,
    builder: RecordBuilder,
    text: String,
    attr: Option<Field>,
}

impl Default for MarkupRule {
    fn default() -> Self {
        MarkupRule::new()
    }
}

impl MarkupRule {
    pub fn new() -> Self {
        MarkupRule {
            step: MarkupStep::Open,
            builder: RecordBuilder::new(),
            text: String::new(),
            attr: None,
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.builder.push(Value::Text(std::mem::take(&mut self.text)));
        }
    }

    fn push_inline(&mut self, body: Option<Record>) {
        let mut nested = RecordBuilder::new();
        if let Some(attr) = self.attr.take() {
            nested.push(attr);
        }
        for item in body.iter().flat_map(Record::iter) {
            nested.push(item.clone());
        }
        self.builder.push(Value::Record(nested.commit()));
        self.step = MarkupStep::Text;
    }
}

impl Parse for MarkupRule {
    type Output = Record;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Record>, ParseError> {
        input.descend()?;
        let progress = self.feed_markup(input);
        input.ascend();
        progress
    }
}

impl MarkupRule {
    fn feed_markup(&mut self, input: &mut Input<'_>) -> Result<Progress<Record>, ParseError> {
        loop {
            match &mut self.step {
                MarkupStep::Attr(rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(attr) => {
                        self.attr = Some(attr);
                        self.step = MarkupStep::AfterAttr;
                    }
                },
                MarkupStep::AttrBlock(rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(body) => self.push_inline(Some(body)),
                },
                MarkupStep::AttrMarkup(rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(body) => self.push_inline(Some(body)),
                },
                MarkupStep::Block(rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(body) => {
                        for item in &body {
                            self.builder.push(item.clone());
                        }
                        self.step = MarkupStep::Text;
                    }
                },
                MarkupStep::AfterAttr => match input.head() {
                    Some('{') => {
                        input.step();
                        self.step = MarkupStep::AttrBlock(Box::new(BlockRule::new(Some('}'))));
                    }
                    Some('[') => {
                        self.step = MarkupStep::AttrMarkup(Box::new(MarkupRule::new()));
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => self.push_inline(None),
                },
                MarkupStep::Open => {
                    let Some(c) = head_or_end(input, "'['")? else {
                        return Ok(Progress::Pending);
                    };
                    if c != '[' {
                        return Err(input.error("'['"));
                    }
                    input.step();
                    self.step = MarkupStep::Text;
                }
                MarkupStep::Text => {
                    let Some(c) = head_or_end(input, "']'")? else {
                        return Ok(Progress::Pending);
                    };
                    match c {
                        ']' => {
                            input.step();
                            self.flush_text();
                            return Ok(Progress::Done(std::mem::take(&mut self.builder).commit()));
                        }
                        '\\' => {
                            input.step();
                            self.step = MarkupStep::Escape;
                        }
                        '@' => {
                            self.flush_text();
                            self.step = MarkupStep::Attr(Box::new(AttrRule::new()));
                        }
                        '{' => {
                            self.flush_text();
                            input.step();
                            self.step = MarkupStep::Block(Box::new(BlockRule::new(Some('}'))));
                        }
                        '[' => return Err(input.error("markup text")),
                        c => {
                            self.text.push(c);
                            input.step();
                        }
                    }
                }
                MarkupStep::Escape => {
                    let Some(c) = head_or_end(input, "escape character")? else {
                        return Ok(Progress::Pending);
                    };
                    self.text.push(match c {
                        'b' => '\u{8}',
                        'f' => '\u{c}',
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        c => c,
                    });
                    input.step();
                    self.step = MarkupStep::Text;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Num;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Value {
        parse_str(text).unwrap_or_else(|e| panic!("failed to parse {text:?}: {e}"))
    }

    fn record(items: impl IntoIterator<Item = Item>) -> Value {
        Value::Record(Record::of(items))
    }

    #[test]
    fn test_empty_document_is_absent() {
        assert_eq!(parse(""), Value::Absent);
        assert_eq!(parse("  \n # nothing here\n"), Value::Absent);
    }

    #[test]
    fn test_single_value_collapses() {
        assert_eq!(parse("42"), Value::from(42));
        assert_eq!(parse("hello"), Value::from("hello"));
        assert_eq!(parse("true"), Value::Bool(true));
        assert_eq!(parse("{}"), record([]));
    }

    #[test]
    fn test_blocks_and_separators() {
        let expected = record([Item::slot("a", 1), Item::slot("b", 2), Item::from(3)]);
        assert_eq!(parse("a:1,b:2,3"), expected);
        assert_eq!(parse("{a: 1; b: 2\n 3,}"), expected);
        assert_eq!(parse("a:1 # one\nb:2\n\n3"), expected);
    }

    #[test]
    fn test_slot_without_value_is_extant() {
        assert_eq!(
            parse("{a:, b:}"),
            record([Item::slot("a", Value::Extant), Item::slot("b", Value::Extant)])
        );
    }

    #[test]
    fn test_attributes() {
        assert_eq!(parse("@a"), record([Item::attr("a", Value::Extant)]));
        assert_eq!(parse("@a()"), record([Item::attr("a", Value::Extant)]));
        assert_eq!(parse("@a(1)"), record([Item::attr("a", 1)]));
        assert_eq!(
            parse("@a(1, 2)"),
            record([Item::attr("a", record([Item::from(1), Item::from(2)]))])
        );
        assert_eq!(
            parse("@\"a b\"(x:1)"),
            record([Item::attr("a b", record([Item::slot("x", 1)]))])
        );
    }

    #[test]
    fn test_parts_combine() {
        assert_eq!(
            parse("@a 1"),
            record([Item::attr("a", Value::Extant), Item::from(1)])
        );
        assert_eq!(
            parse("@a{b:1,2}"),
            record([Item::attr("a", Value::Extant), Item::slot("b", 1), Item::from(2)])
        );
        assert_eq!(
            parse("{x}@a @b(2)"),
            record([
                Item::from("x"),
                Item::attr("a", Value::Extant),
                Item::attr("b", 2)
            ])
        );
    }

    #[test]
    fn test_expression_cannot_follow_record_part() {
        assert!(parse_str("{a} 1").is_err());
    }

    #[test]
    fn test_markup() {
        assert_eq!(
            parse("[hello @em{world}!]"),
            record([
                Item::from("hello "),
                Item::from(record([Item::attr("em", Value::Extant), Item::from("world")])),
                Item::from("!"),
            ])
        );
        assert_eq!(parse("[a\\]b]"), record([Item::from("a]b")]));
    }

    #[test]
    fn test_numbers_and_literals() {
        assert_eq!(parse("-1"), Value::Num(Num::I32(-1)));
        assert_eq!(parse("0x10"), Value::Num(Num::U32(16)));
        assert_eq!(parse("-Infinity"), Value::Num(Num::F64(f64::NEG_INFINITY)));
        assert_eq!(parse("%AQID"), Value::Data(vec![1, 2, 3]));
        assert_eq!(parse("`a``b`"), Value::from("a`b"));
    }

    #[test]
    fn test_unterminated_record_is_error() {
        let error = parse_str("{a:1").unwrap_err();
        assert!(matches!(error, ParseError::UnexpectedEnd { .. }));
        assert_eq!(error.expected(), Some("'}'"));
    }

    #[test]
    fn test_unexpected_char_position() {
        let error = parse_str("{a:1\n  b)").unwrap_err();
        match error {
            ParseError::UnexpectedChar {
                found,
                line,
                column,
                ..
            } => {
                assert_eq!(found, ')');
                assert_eq!((line, column), (2, 4));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_stream_parser_splits_utf8() {
        let text = "{name:\"ünï\"}".as_bytes();
        let parser = StreamParser::new()
            .feed(&text[..8])
            .feed(&text[8..9])
            .feed(&text[9..])
            .end();
        assert_eq!(
            parser.bind().unwrap(),
            record([Item::slot("name", "ünï")])
        );
    }

    #[test]
    fn test_stream_parser_rejects_invalid_utf8() {
        let parser = StreamParser::new().feed(b"ab\xFFc").end();
        assert!(matches!(
            parser.bind(),
            Err(ParseError::InvalidUtf8 { .. })
        ));
        let parser = StreamParser::new().feed(b"\"\xC3").end();
        assert!(matches!(
            parser.bind(),
            Err(ParseError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_parser_states() {
        let parser = Parser::new(BlockRule::document()).feed(&mut Input::new("{a"));
        assert!(parser.is_cont());
        let parser = parser.feed(&mut Input::resume(
            "}",
            Mark {
                offset: 2,
                line: 1,
                column: 3,
            },
            true,
        ));
        assert!(parser.is_done());
        let parser = Parser::new(BlockRule::document()).feed(&mut Input::last("}"));
        assert!(parser.is_error());
    }
}
