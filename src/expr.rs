//! Operator expressions and selector literals.
//!
//! [`ExprRule`] is a resumable shunting-yard: operands are pushed as they are parsed
//! and pending operators are reduced by precedence when the next operator arrives.
//! An expression ends at the first character that cannot continue it, including a
//! newline in operator position, which is left in the input for the enclosing block.
use crate::error::ParseError;
use crate::input::{head_or_end, Input, Parse, Progress};
use crate::lexer::{DataRule, IdentRule, NumberRule, RawStringRule, StringRule};
use crate::num::Num;
use crate::operator::{precedence, BinaryOp, Operator, UnaryOp};
use crate::parser::{BlockRule, MarkupRule};
use crate::record::{RecordBuilder, ValueBuilder};
use crate::selector::Selector;
use crate::utils::{is_ident_start_char, is_whitespace};
use crate::value::Value;

/// Characters that can begin an expression operand, or a prefix operator.
pub(crate) fn is_expr_start(c: char) -> bool {
    c.is_ascii_digit()
        || is_ident_start_char(c)
        || matches!(
            c,
            '"' | '\'' | '`' | '%' | '$' | '(' | '!' | '~' | '-' | '+' | '{' | '['
        )
}

/// Value of a bare identifier literal.
fn ident_value(name: String) -> Value {
    match name.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "NaN" => Value::Num(Num::F64(f64::NAN)),
        "Infinity" => Value::Num(Num::F64(f64::INFINITY)),
        _ => Value::Text(name),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Binary(BinaryOp),
    Unary(UnaryOp),
    /// `?` whose `:` has not been seen yet.
    Question,
    /// `?` matched by its `:`; reduces to a conditional.
    Colon,
    Lambda,
}

impl Pending {
    fn precedence(self) -> u8 {
        match self {
            Pending::Binary(op) => op.precedence(),
            Pending::Unary(_) => precedence::UNARY,
            Pending::Question | Pending::Colon => precedence::CONDITIONAL,
            Pending::Lambda => precedence::LAMBDA,
        }
    }
}

#[derive(Debug, Clone)]
enum ExprStep {
    Operand,
    Number(NumberRule),
    Str(StringRule),
    Raw(RawStringRule),
    Ident(IdentRule),
    Data(DataRule),
    Selector(Box<SelectorRule>),
    Group(Box<BlockRule<ValueBuilder>>),
    Record(Box<BlockRule<RecordBuilder>>),
    Markup(Box<MarkupRule>),
    Postfix,
    Args(Box<BlockRule<ValueBuilder>>),
    Operator,
    /// Saw `|`; `||` or `|`.
    Pipe,
    /// Saw `&`; `&&` or `&`.
    Amp,
    /// Saw `<`; `<=` or `<`.
    Less,
    /// Saw `>`; `>=` or `>`.
    Greater,
    /// Saw `=`; `==` or `=>`.
    Equal,
    /// Saw `!` after an operand; must be `!=`.
    Bang,
}

#[derive(Debug, Clone)]
pub struct ExprRule {
    step: ExprStep,
    operands: Vec<Value>,
    /// Operator levels above the leaves of each operand.
    heights: Vec<usize>,
    operators: Vec<Pending>,
}

impl Default for ExprRule {
    fn default() -> Self {
        ExprRule::new()
    }
}

impl ExprRule {
    pub fn new() -> Self {
        ExprRule {
            step: ExprStep::Operand,
            operands: Vec::new(),
            heights: Vec::new(),
            operators: Vec::new(),
        }
    }

    fn pop_operand(&mut self) -> Value {
        self.heights.pop();
        self.operands.pop().unwrap_or_default()
    }

    fn push_operand(&mut self, value: Value) {
        self.push_node(value, 0);
    }

    fn push_node(&mut self, value: Value, height: usize) {
        self.operands.push(value);
        self.heights.push(height);
        self.step = ExprStep::Postfix;
    }

    /// Height of a node joining the top `arity` operands.
    fn joined_height(&self, arity: usize) -> usize {
        let start = self.heights.len().saturating_sub(arity);
        1 + self.heights[start..].iter().copied().max().unwrap_or(0)
    }

    /// How deep the tree under construction already nests. Every pending operator
    /// will sit above the operand that follows it.
    fn nesting(&self) -> usize {
        let top = self.heights.last().copied().unwrap_or(0);
        top.max(self.operators.len())
    }

    /// Reduces the topmost pending operator into an operand.
    fn reduce(&mut self) {
        let Some(pending) = self.operators.pop() else {
            return;
        };
        let arity = match pending {
            Pending::Unary(_) => 1,
            Pending::Colon => 3,
            _ => 2,
        };
        let height = self.joined_height(arity);
        let value = match pending {
            Pending::Binary(op) => {
                let rhs = self.pop_operand();
                let lhs = self.pop_operand();
                Value::Operator(Operator::binary(op, lhs, rhs))
            }
            Pending::Unary(op) => match self.pop_operand() {
                Value::Num(num) if op == UnaryOp::Neg => Value::Num(num.negative()),
                operand => Value::Operator(Operator::unary(op, operand)),
            },
            Pending::Colon => {
                let otherwise = self.pop_operand();
                let then = self.pop_operand();
                let cond = self.pop_operand();
                Value::Operator(Operator::conditional(cond, then, otherwise))
            }
            Pending::Lambda => {
                let body = self.pop_operand();
                let bindings = self.pop_operand();
                Value::Operator(Operator::lambda(bindings, body))
            }
            Pending::Question => {
                self.operators.push(pending);
                return;
            }
        };
        self.operands.push(value);
        self.heights.push(height);
    }

    /// Reduces while the top pending operator is not an open `?` and `binds` holds
    /// for its precedence.
    fn reduce_while(&mut self, binds: impl Fn(u8) -> bool) {
        while let Some(&top) = self.operators.last() {
            if top == Pending::Question || !binds(top.precedence()) {
                break;
            }
            self.reduce();
        }
    }

    fn push_binary(&mut self, op: BinaryOp) {
        let prec = op.precedence();
        self.reduce_while(|top| top >= prec);
        self.operators.push(Pending::Binary(op));
        self.step = ExprStep::Operand;
    }

    fn push_question(&mut self) {
        self.reduce_while(|top| top > precedence::CONDITIONAL);
        self.operators.push(Pending::Question);
        self.step = ExprStep::Operand;
    }

    fn push_colon(&mut self) {
        self.reduce_while(|_| true);
        if let Some(top) = self.operators.last_mut() {
            *top = Pending::Colon;
        }
        self.step = ExprStep::Operand;
    }

    fn push_lambda(&mut self) {
        self.reduce_while(|top| top > precedence::LAMBDA);
        self.operators.push(Pending::Lambda);
        self.step = ExprStep::Operand;
    }

    fn finish(&mut self, input: &Input<'_>) -> Result<Progress<Value>, ParseError> {
        self.reduce_while(|_| true);
        if !self.operators.is_empty() {
            return Err(input.error("':'"));
        }
        input.check_depth(self.nesting())?;
        Ok(Progress::Done(self.pop_operand()))
    }

    /// Dispatches on the first character of an operand.
    fn start_operand(&mut self, c: char, input: &mut Input<'_>) -> Result<(), ParseError> {
        self.step = match c {
            '!' | '~' | '-' | '+' => {
                let op = match c {
                    '!' => UnaryOp::Not,
                    '~' => UnaryOp::BitNot,
                    '-' => UnaryOp::Neg,
                    _ => UnaryOp::Pos,
                };
                input.step();
                self.operators.push(Pending::Unary(op));
                ExprStep::Operand
            }
            '0'..='9' => ExprStep::Number(NumberRule::new()),
            '"' | '\'' => ExprStep::Str(StringRule::new()),
            '`' => ExprStep::Raw(RawStringRule::new()),
            '%' => ExprStep::Data(DataRule::new()),
            '$' => ExprStep::Selector(Box::new(SelectorRule::new())),
            '(' => {
                input.step();
                ExprStep::Group(Box::new(BlockRule::new(Some(')'))))
            }
            '{' => {
                input.step();
                ExprStep::Record(Box::new(BlockRule::new(Some('}'))))
            }
            '[' => ExprStep::Markup(Box::new(MarkupRule::new())),
            c if is_ident_start_char(c) => ExprStep::Ident(IdentRule::new()),
            _ => return Err(input.error("operand")),
        };
        Ok(())
    }

    /// Resolves a two-character operator state once the second character is known.
    fn second_char(
        &mut self,
        input: &mut Input<'_>,
        second: char,
        double: BinaryOp,
        single: BinaryOp,
    ) {
        if input.head() == Some(second) {
            input.step();
            self.push_binary(double);
        } else {
            self.push_binary(single);
        }
    }
}

impl Parse for ExprRule {
    type Output = Value;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Value>, ParseError> {
        loop {
            input.check_depth(self.nesting())?;
            let operand = match &mut self.step {
                ExprStep::Number(rule) => rule.feed(input)?.map(Value::Num),
                ExprStep::Str(rule) => rule.feed(input)?.map(Value::Text),
                ExprStep::Raw(rule) => rule.feed(input)?.map(Value::Text),
                ExprStep::Ident(rule) => rule.feed(input)?.map(ident_value),
                ExprStep::Data(rule) => rule.feed(input)?.map(Value::Data),
                ExprStep::Selector(rule) => rule.feed(input)?.map(Value::Selector),
                ExprStep::Group(rule) => rule.feed(input)?,
                ExprStep::Record(rule) => rule.feed(input)?.map(Value::Record),
                ExprStep::Markup(rule) => rule.feed(input)?.map(Value::Record),
                ExprStep::Args(rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(args) => {
                        let height = self.joined_height(1);
                        let func = self.pop_operand();
                        self.push_node(Value::Operator(Operator::invoke(func, args)), height);
                        continue;
                    }
                },
                ExprStep::Operand => {
                    let Some(c) = head_or_end(input, "operand")? else {
                        return Ok(Progress::Pending);
                    };
                    if is_whitespace(c) {
                        input.step();
                    } else {
                        self.start_operand(c, input)?;
                    }
                    continue;
                }
                ExprStep::Postfix => match input.head() {
                    Some('(') => {
                        input.step();
                        self.step = ExprStep::Args(Box::new(BlockRule::new(Some(')'))));
                        continue;
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => {
                        self.step = ExprStep::Operator;
                        continue;
                    }
                },
                ExprStep::Operator => {
                    let Some(c) = input.head() else {
                        if input.is_done() {
                            return self.finish(input);
                        }
                        return Ok(Progress::Pending);
                    };
                    let single = match c {
                        '+' => Some(BinaryOp::Plus),
                        '-' => Some(BinaryOp::Minus),
                        '*' => Some(BinaryOp::Times),
                        '/' => Some(BinaryOp::Divide),
                        '%' => Some(BinaryOp::Modulo),
                        '^' => Some(BinaryOp::BitXor),
                        _ => None,
                    };
                    if let Some(op) = single {
                        input.step();
                        self.push_binary(op);
                        continue;
                    }
                    let next = match c {
                        ' ' | '\t' => ExprStep::Operator,
                        '|' => ExprStep::Pipe,
                        '&' => ExprStep::Amp,
                        '<' => ExprStep::Less,
                        '>' => ExprStep::Greater,
                        '=' => ExprStep::Equal,
                        '!' => ExprStep::Bang,
                        '?' => {
                            input.step();
                            self.push_question();
                            continue;
                        }
                        ':' if self.operators.contains(&Pending::Question) => {
                            input.step();
                            self.push_colon();
                            continue;
                        }
                        _ => return self.finish(input),
                    };
                    input.step();
                    self.step = next;
                    continue;
                }
                ExprStep::Pipe | ExprStep::Amp | ExprStep::Less | ExprStep::Greater => {
                    if input.is_empty() {
                        return Ok(Progress::Pending);
                    }
                    match self.step {
                        ExprStep::Pipe => self.second_char(input, '|', BinaryOp::Or, BinaryOp::BitOr),
                        ExprStep::Amp => {
                            self.second_char(input, '&', BinaryOp::And, BinaryOp::BitAnd)
                        }
                        ExprStep::Less => self.second_char(input, '=', BinaryOp::Le, BinaryOp::Lt),
                        _ => self.second_char(input, '=', BinaryOp::Ge, BinaryOp::Gt),
                    }
                    continue;
                }
                ExprStep::Equal => {
                    let Some(c) = head_or_end(input, "'=' or '>'")? else {
                        return Ok(Progress::Pending);
                    };
                    match c {
                        '=' => {
                            input.step();
                            self.push_binary(BinaryOp::Eq);
                        }
                        '>' => {
                            input.step();
                            self.push_lambda();
                        }
                        _ => return Err(input.error("'=' or '>'")),
                    }
                    continue;
                }
                ExprStep::Bang => {
                    let Some(c) = head_or_end(input, "'='")? else {
                        return Ok(Progress::Pending);
                    };
                    if c != '=' {
                        return Err(input.error("'='"));
                    }
                    input.step();
                    self.push_binary(BinaryOp::Ne);
                    continue;
                }
            };
            match operand {
                Progress::Pending => return Ok(Progress::Pending),
                Progress::Done(value) => self.push_operand(value),
            }
        }
    }
}

#[derive(Debug, Clone)]
enum SelectorStep {
    Start,
    First,
    Chain,
    Dot,
    Name { rule: IdentRule, dotted: bool },
    AttrName,
    AttrIdent(IdentRule),
    AttrQuoted(StringRule),
    Index(String),
    Star,
    MethodCheck(String),
    MethodArgs(String, Box<BlockRule<ValueBuilder>>),
    Filter(Box<BlockRule<ValueBuilder>>),
}

/// `$` followed by a chain of steps:
/// `$name`, `$@attr`, `$#2`, `$*`, `$**`, `$[predicate]`, then `.name`, `.@attr`,
/// `.*`, `.**`, `#2`, `[predicate]` or method calls such as `.get(key)` and `.keys()`.
#[derive(Debug, Clone)]
pub struct SelectorRule {
    step: SelectorStep,
    selector: Selector,
    steps: usize,
}

impl Default for SelectorRule {
    fn default() -> Self {
        SelectorRule::new()
    }
}

/// Method names accepted after a `.` when directly followed by `(`.
pub(crate) fn is_method(name: &str) -> bool {
    matches!(
        name,
        "get" | "getAttr" | "getItem" | "filter" | "children" | "descendants" | "keys" | "values"
    )
}

impl SelectorRule {
    pub fn new() -> Self {
        SelectorRule {
            step: SelectorStep::Start,
            selector: Selector::Identity,
            steps: 0,
        }
    }

    fn append(&mut self, next: Selector) {
        self.selector = std::mem::take(&mut self.selector).and_then(next);
        self.steps += 1;
        self.step = SelectorStep::Chain;
    }

    fn method(
        &mut self,
        name: &str,
        arg: Value,
        input: &Input<'_>,
    ) -> Result<(), ParseError> {
        let step = match (name, arg) {
            ("get", key) => Selector::identity().get(key),
            ("getAttr", Value::Text(key)) => Selector::identity().get_attr(key),
            ("getItem", Value::Num(index)) => match index.to_usize() {
                Some(index) => Selector::identity().get_item(index),
                None => return Err(input.error("item index")),
            },
            ("filter", predicate) => Selector::identity().filter(predicate),
            ("children", Value::Absent) => Selector::identity().children(),
            ("descendants", Value::Absent) => Selector::identity().descendants(),
            ("keys", Value::Absent) => Selector::identity().keys(),
            ("values", Value::Absent) => Selector::identity().values(),
            ("getAttr", _) => return Err(input.error("attribute name argument")),
            ("getItem", _) => return Err(input.error("item index argument")),
            _ => return Err(input.error("no arguments")),
        };
        self.append(step);
        Ok(())
    }
}

impl Parse for SelectorRule {
    type Output = Selector;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Selector>, ParseError> {
        loop {
            input.check_depth(self.steps)?;
            match &mut self.step {
                SelectorStep::Name { rule, dotted } => {
                    let dotted = *dotted;
                    if let Progress::Done(name) = rule.feed(input)? {
                        if dotted && is_method(&name) {
                            self.step = SelectorStep::MethodCheck(name);
                        } else {
                            self.append(Selector::identity().get(name));
                        }
                        continue;
                    }
                    return Ok(Progress::Pending);
                }
                SelectorStep::AttrIdent(rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(name) => self.append(Selector::identity().get_attr(name)),
                },
                SelectorStep::AttrQuoted(rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(name) => self.append(Selector::identity().get_attr(name)),
                },
                SelectorStep::Filter(rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(predicate) => {
                        self.append(Selector::identity().filter(predicate))
                    }
                },
                SelectorStep::MethodArgs(name, rule) => match rule.feed(input)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(arg) => {
                        let name = std::mem::take(name);
                        self.method(&name, arg, input)?;
                    }
                },
                SelectorStep::Start => {
                    let Some(c) = head_or_end(input, "'$'")? else {
                        return Ok(Progress::Pending);
                    };
                    if c != '$' {
                        return Err(input.error("'$'"));
                    }
                    input.step();
                    self.step = SelectorStep::First;
                }
                SelectorStep::First => match input.head() {
                    Some(c) if is_ident_start_char(c) => {
                        self.step = SelectorStep::Name {
                            rule: IdentRule::new(),
                            dotted: false,
                        };
                    }
                    Some('@') => {
                        input.step();
                        self.step = SelectorStep::AttrName;
                    }
                    Some('#') => {
                        input.step();
                        self.step = SelectorStep::Index(String::new());
                    }
                    Some('*') => {
                        input.step();
                        self.step = SelectorStep::Star;
                    }
                    Some('[') => {
                        input.step();
                        self.step = SelectorStep::Filter(Box::new(BlockRule::new(Some(']'))));
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => self.step = SelectorStep::Chain,
                },
                SelectorStep::Chain => match input.head() {
                    Some('.') => {
                        input.step();
                        self.step = SelectorStep::Dot;
                    }
                    Some('#') => {
                        input.step();
                        self.step = SelectorStep::Index(String::new());
                    }
                    Some('[') => {
                        input.step();
                        self.step = SelectorStep::Filter(Box::new(BlockRule::new(Some(']'))));
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => return Ok(Progress::Done(std::mem::take(&mut self.selector))),
                },
                SelectorStep::Dot => {
                    let Some(c) = head_or_end(input, "selector step")? else {
                        return Ok(Progress::Pending);
                    };
                    match c {
                        '@' => {
                            input.step();
                            self.step = SelectorStep::AttrName;
                        }
                        '*' => {
                            input.step();
                            self.step = SelectorStep::Star;
                        }
                        c if is_ident_start_char(c) => {
                            self.step = SelectorStep::Name {
                                rule: IdentRule::new(),
                                dotted: true,
                            };
                        }
                        _ => return Err(input.error("selector step")),
                    }
                }
                SelectorStep::AttrName => {
                    let Some(c) = head_or_end(input, "attribute name")? else {
                        return Ok(Progress::Pending);
                    };
                    self.step = if is_ident_start_char(c) {
                        SelectorStep::AttrIdent(IdentRule::new())
                    } else if c == '"' || c == '\'' {
                        SelectorStep::AttrQuoted(StringRule::new())
                    } else {
                        return Err(input.error("attribute name"));
                    };
                }
                SelectorStep::Index(digits) => match input.head() {
                    Some(c) if c.is_ascii_digit() => {
                        digits.push(c);
                        input.step();
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => {
                        if digits.is_empty() {
                            return Err(input.error("item index"));
                        }
                        let Ok(index) = digits.parse::<usize>() else {
                            let len = digits.len();
                            return Err(ParseError::InvalidNumber {
                                literal: std::mem::take(digits),
                                span: (input.mark().offset - len, len).into(),
                            });
                        };
                        self.append(Selector::identity().get_item(index));
                    }
                },
                SelectorStep::Star => match input.head() {
                    Some('*') => {
                        input.step();
                        self.append(Selector::identity().descendants());
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => self.append(Selector::identity().children()),
                },
                SelectorStep::MethodCheck(name) => match input.head() {
                    Some('(') => {
                        input.step();
                        let name = std::mem::take(name);
                        self.step = SelectorStep::MethodArgs(
                            name,
                            Box::new(BlockRule::new(Some(')'))),
                        );
                    }
                    None if !input.is_done() => return Ok(Progress::Pending),
                    _ => {
                        let name = std::mem::take(name);
                        self.append(Selector::identity().get(name));
                    }
                },
            }
        }
    }
}
