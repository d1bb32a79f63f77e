//! Lexical rules: strings, raw strings, numbers, identifiers and data literals.
//!
//! Each rule is a small state machine over [`Input`]; see [`Parse`] for the contract.
use crate::error::ParseError;
use crate::input::{head_or_end, Input, Mark, Parse, Progress};
use crate::num::Num;
use crate::utils::{is_ident_char, is_ident_start_char};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringStep {
    Open,
    Body,
    Escape,
    Unicode { code: u32, digits: u8 },
}

/// A quoted string, `"..."` or `'...'`.
#[derive(Debug, Clone)]
pub struct StringRule {
    step: StringStep,
    quote: char,
    text: String,
}

impl Default for StringRule {
    fn default() -> Self {
        StringRule::new()
    }
}

impl StringRule {
    pub fn new() -> Self {
        StringRule {
            step: StringStep::Open,
            quote: '"',
            text: String::new(),
        }
    }

    fn expected(&self) -> &'static str {
        match self.step {
            StringStep::Open => "string",
            StringStep::Body => "closing quote",
            StringStep::Escape => "escape character",
            StringStep::Unicode { .. } => "hex digit",
        }
    }
}

impl Parse for StringRule {
    type Output = String;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<String>, ParseError> {
        loop {
            let Some(c) = head_or_end(input, self.expected())? else {
                return Ok(Progress::Pending);
            };
            match self.step {
                StringStep::Open => {
                    if c != '"' && c != '\'' {
                        return Err(input.error("string"));
                    }
                    self.quote = c;
                    input.step();
                    self.step = StringStep::Body;
                }
                StringStep::Body => {
                    input.step();
                    if c == self.quote {
                        return Ok(Progress::Done(std::mem::take(&mut self.text)));
                    } else if c == '\\' {
                        self.step = StringStep::Escape;
                    } else {
                        self.text.push(c);
                    }
                }
                StringStep::Escape => {
                    let unescaped = match c {
                        'b' => '\u{8}',
                        'f' => '\u{c}',
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '"' | '$' | '\'' | '/' | '@' | '[' | '\\' | ']' | '{' | '}' => c,
                        'u' => {
                            input.step();
                            self.step = StringStep::Unicode { code: 0, digits: 0 };
                            continue;
                        }
                        _ => return Err(input.error("escape character")),
                    };
                    input.step();
                    self.text.push(unescaped);
                    self.step = StringStep::Body;
                }
                StringStep::Unicode { code, digits } => {
                    let Some(digit) = c.to_digit(16) else {
                        return Err(input.error("hex digit"));
                    };
                    let code = code * 16 + digit;
                    if digits == 3 {
                        let Some(unescaped) = char::from_u32(code) else {
                            return Err(input.error("unicode scalar value"));
                        };
                        self.text.push(unescaped);
                        self.step = StringStep::Body;
                    } else {
                        self.step = StringStep::Unicode {
                            code,
                            digits: digits + 1,
                        };
                    }
                    input.step();
                }
            }
        }
    }
}

/// A backtick-fenced raw string.
///
/// The opening fence is one to three backticks. Inside, a run of backticks twice the
/// fence width stands for fence-width literal backticks; a run of exactly the fence
/// width (once doubled pairs are removed) closes the string.
#[derive(Debug, Clone, Default)]
pub struct RawStringRule {
    opened: bool,
    fence: usize,
    run: usize,
    text: String,
}

impl RawStringRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a finished run of backticks. Returns true if the run closed the string.
    fn resolve_run(&mut self, input: &Input<'_>) -> Result<bool, ParseError> {
        let fence = self.fence;
        let run = std::mem::take(&mut self.run);
        let pairs = run / (2 * fence);
        let rest = run % (2 * fence);
        self.text.extend(std::iter::repeat('`').take(pairs * fence));
        if rest == fence {
            Ok(true)
        } else if rest < fence {
            self.text.extend(std::iter::repeat('`').take(rest));
            Ok(false)
        } else {
            Err(input.error("closing backticks"))
        }
    }
}

impl Parse for RawStringRule {
    type Output = String;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<String>, ParseError> {
        loop {
            let head = input.head();
            if !self.opened {
                match head {
                    Some('`') if self.fence < 3 => {
                        self.fence += 1;
                        input.step();
                        continue;
                    }
                    _ if self.fence == 0 => {
                        return match head {
                            None if !input.is_done() => Ok(Progress::Pending),
                            _ => Err(input.error("backtick")),
                        };
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => self.opened = true,
                }
            }
            match head {
                Some('`') => {
                    self.run += 1;
                    input.step();
                }
                Some(c) => {
                    if self.run > 0 && self.resolve_run(input)? {
                        return Ok(Progress::Done(std::mem::take(&mut self.text)));
                    }
                    self.text.push(c);
                    input.step();
                }
                None if input.is_done() => {
                    if self.run > 0 && self.resolve_run(input)? {
                        return Ok(Progress::Done(std::mem::take(&mut self.text)));
                    }
                    return Err(input.error("closing backticks"));
                }
                None => return Ok(Progress::Pending),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberStep {
    Start,
    Zero,
    Integer,
    HexFirst,
    Hex,
    FractionFirst,
    Fraction,
    ExponentSign,
    ExponentFirst,
    Exponent,
}

/// An unsigned number literal: decimal integer, decimal fraction with optional
/// exponent, or `0x` hexadecimal. Signs are handled by the expression grammar.
#[derive(Debug, Clone)]
pub struct NumberRule {
    step: NumberStep,
    text: String,
    start: Mark,
}

impl Default for NumberRule {
    fn default() -> Self {
        NumberRule::new()
    }
}

impl NumberRule {
    pub fn new() -> Self {
        NumberRule {
            step: NumberStep::Start,
            text: String::new(),
            start: Mark::default(),
        }
    }

    fn is_complete(&self) -> bool {
        matches!(
            self.step,
            NumberStep::Zero
                | NumberStep::Integer
                | NumberStep::Hex
                | NumberStep::Fraction
                | NumberStep::Exponent
        )
    }

    fn finish(&mut self) -> Result<Num, ParseError> {
        let text = std::mem::take(&mut self.text);
        let invalid = || ParseError::InvalidNumber {
            literal: text.clone(),
            span: (self.start.offset, text.len()).into(),
        };
        match self.step {
            NumberStep::Hex => {
                let digits = &text[2..];
                if digits.len() <= 8 {
                    u32::from_str_radix(digits, 16)
                        .map(Num::U32)
                        .map_err(|_| invalid())
                } else if digits.len() <= 16 {
                    u64::from_str_radix(digits, 16)
                        .map(Num::U64)
                        .map_err(|_| invalid())
                } else {
                    Err(invalid())
                }
            }
            NumberStep::Zero | NumberStep::Integer => {
                if let Ok(v) = text.parse::<i32>() {
                    Ok(Num::I32(v))
                } else if let Ok(v) = text.parse::<i64>() {
                    Ok(Num::I64(v))
                } else {
                    text.parse::<f64>().map(Num::F64).map_err(|_| invalid())
                }
            }
            _ => text.parse::<f64>().map(Num::F64).map_err(|_| invalid()),
        }
    }

    fn expected(&self) -> &'static str {
        match self.step {
            NumberStep::Start | NumberStep::FractionFirst | NumberStep::ExponentFirst => "digit",
            NumberStep::HexFirst => "hex digit",
            NumberStep::ExponentSign => "exponent",
            _ => "number",
        }
    }
}

impl Parse for NumberRule {
    type Output = Num;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Num>, ParseError> {
        loop {
            let Some(c) = input.head() else {
                return if !input.is_done() {
                    Ok(Progress::Pending)
                } else if self.is_complete() {
                    self.finish().map(Progress::Done)
                } else {
                    Err(input.error(self.expected()))
                };
            };
            let next = match (self.step, c) {
                (NumberStep::Start, '0') => NumberStep::Zero,
                (NumberStep::Start, '1'..='9') => NumberStep::Integer,
                (NumberStep::Zero, 'x' | 'X') => NumberStep::HexFirst,
                (NumberStep::Zero | NumberStep::Integer, '0'..='9') => NumberStep::Integer,
                (NumberStep::Zero | NumberStep::Integer, '.') => NumberStep::FractionFirst,
                (NumberStep::HexFirst | NumberStep::Hex, c) if c.is_ascii_hexdigit() => {
                    NumberStep::Hex
                }
                (NumberStep::FractionFirst | NumberStep::Fraction, '0'..='9') => {
                    NumberStep::Fraction
                }
                (
                    NumberStep::Zero | NumberStep::Integer | NumberStep::Fraction,
                    'e' | 'E',
                ) => NumberStep::ExponentSign,
                (NumberStep::ExponentSign, '+' | '-') => NumberStep::ExponentFirst,
                (
                    NumberStep::ExponentSign | NumberStep::ExponentFirst | NumberStep::Exponent,
                    '0'..='9',
                ) => NumberStep::Exponent,
                _ if self.is_complete() => return self.finish().map(Progress::Done),
                _ => return Err(input.error(self.expected())),
            };
            if self.step == NumberStep::Start {
                self.start = input.mark();
            }
            self.text.push(c);
            self.step = next;
            input.step();
        }
    }
}

/// An identifier. Classifying `true`, `false`, `NaN` and `Infinity` is left to the caller.
#[derive(Debug, Clone, Default)]
pub struct IdentRule {
    text: String,
}

impl IdentRule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Parse for IdentRule {
    type Output = String;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<String>, ParseError> {
        loop {
            match input.head() {
                Some(c) if self.text.is_empty() => {
                    if !is_ident_start_char(c) {
                        return Err(input.error("identifier"));
                    }
                    self.text.push(c);
                    input.step();
                }
                Some(c) if is_ident_char(c) => {
                    self.text.push(c);
                    input.step();
                }
                Some(_) => return Ok(Progress::Done(std::mem::take(&mut self.text))),
                None if !input.is_done() => return Ok(Progress::Pending),
                None if self.text.is_empty() => return Err(input.error("identifier")),
                None => return Ok(Progress::Done(std::mem::take(&mut self.text))),
            }
        }
    }
}

/// A `%`-prefixed base64 data literal.
#[derive(Debug, Clone, Default)]
pub struct DataRule {
    opened: bool,
    start: usize,
    text: String,
}

impl DataRule {
    pub fn new() -> Self {
        Self::default()
    }

    fn finish(&mut self) -> Result<Vec<u8>, ParseError> {
        let text = std::mem::take(&mut self.text);
        BASE64.decode(text.as_bytes()).map_err(|_| ParseError::InvalidData {
            span: (self.start, text.len() + 1).into(),
        })
    }
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

impl Parse for DataRule {
    type Output = Vec<u8>;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Vec<u8>>, ParseError> {
        loop {
            match input.head() {
                Some('%') if !self.opened => {
                    self.opened = true;
                    self.start = input.mark().offset;
                    input.step();
                }
                Some(_) if !self.opened => return Err(input.error("'%'")),
                Some(c) if is_base64_char(c) => {
                    self.text.push(c);
                    input.step();
                }
                Some(_) => return self.finish().map(Progress::Done),
                None if !input.is_done() => return Ok(Progress::Pending),
                None if !self.opened => return Err(input.error("'%'")),
                None => return self.finish().map(Progress::Done),
            }
        }
    }
}

/// Parses the canonical text of a number, including a leading `-`, `NaN` and `Infinity`.
pub fn parse_num(text: &str) -> Option<Num> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let num = match body {
        "NaN" => Num::F64(f64::NAN),
        "Infinity" => Num::F64(f64::INFINITY),
        _ => {
            let mut input = Input::last(body);
            match NumberRule::new().feed(&mut input) {
                Ok(Progress::Done(num)) if !input.is_cont() => num,
                _ => return None,
            }
        }
    };
    Some(if negative { num.negative() } else { num })
}
