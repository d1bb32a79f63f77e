//! Operator expressions and their evaluation.
use crate::error::InterpreterError;
use crate::interpreter::Interpreter;
use crate::num::Num;
use crate::record::RecordBuilder;
use crate::value::{Item, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnaryOp {
    Not,
    BitNot,
    Neg,
    Pos,
}

/// Binding strength, loosest first.
pub mod precedence {
    pub const LAMBDA: u8 = 1;
    pub const CONDITIONAL: u8 = 2;
    pub const OR: u8 = 3;
    pub const AND: u8 = 4;
    pub const BIT_OR: u8 = 5;
    pub const BIT_XOR: u8 = 6;
    pub const BIT_AND: u8 = 7;
    pub const COMPARISON: u8 = 8;
    pub const ADDITIVE: u8 = 9;
    pub const MULTIPLICATIVE: u8 = 10;
    pub const UNARY: u8 = 11;
    pub const INVOKE: u8 = 12;
    /// Anything that is not an operator.
    pub const PRIMARY: u8 = 13;
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Ge => ">=",
            BinaryOp::Gt => ">",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Times => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => precedence::OR,
            BinaryOp::And => precedence::AND,
            BinaryOp::BitOr => precedence::BIT_OR,
            BinaryOp::BitXor => precedence::BIT_XOR,
            BinaryOp::BitAnd => precedence::BIT_AND,
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Ge
            | BinaryOp::Gt => precedence::COMPARISON,
            BinaryOp::Plus | BinaryOp::Minus => precedence::ADDITIVE,
            BinaryOp::Times | BinaryOp::Divide | BinaryOp::Modulo => precedence::MULTIPLICATIVE,
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
        }
    }
}

/// An expression node. Operators are values, so they may sit anywhere in a record
/// and are only computed when an [`Interpreter`] evaluates them.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Binary {
        op: BinaryOp,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Value>,
    },
    Conditional {
        cond: Box<Value>,
        then: Box<Value>,
        otherwise: Box<Value>,
    },
    Invoke {
        func: Box<Value>,
        args: Box<Value>,
    },
    Lambda {
        bindings: Box<Value>,
        body: Box<Value>,
    },
}

impl Operator {
    pub fn binary(op: BinaryOp, lhs: impl Into<Value>, rhs: impl Into<Value>) -> Self {
        Operator::Binary {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn unary(op: UnaryOp, operand: impl Into<Value>) -> Self {
        Operator::Unary {
            op,
            operand: Box::new(operand.into()),
        }
    }

    pub fn conditional(
        cond: impl Into<Value>,
        then: impl Into<Value>,
        otherwise: impl Into<Value>,
    ) -> Self {
        Operator::Conditional {
            cond: Box::new(cond.into()),
            then: Box::new(then.into()),
            otherwise: Box::new(otherwise.into()),
        }
    }

    pub fn invoke(func: impl Into<Value>, args: impl Into<Value>) -> Self {
        Operator::Invoke {
            func: Box::new(func.into()),
            args: Box::new(args.into()),
        }
    }

    pub fn lambda(bindings: impl Into<Value>, body: impl Into<Value>) -> Self {
        Operator::Lambda {
            bindings: Box::new(bindings.into()),
            body: Box::new(body.into()),
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Binary { op, .. } => op.precedence(),
            Operator::Unary { .. } => precedence::UNARY,
            Operator::Conditional { .. } => precedence::CONDITIONAL,
            Operator::Invoke { .. } => precedence::INVOKE,
            Operator::Lambda { .. } => precedence::LAMBDA,
        }
    }

    /// Computes this operator against the interpreter's current scope.
    ///
    /// A lambda evaluates to itself; it only runs when invoked.
    pub fn evaluate(&self, interp: &mut Interpreter) -> Result<Value, InterpreterError> {
        match self {
            Operator::Binary { op, lhs, rhs } => evaluate_binary(interp, *op, lhs, rhs),
            Operator::Unary { op, operand } => {
                let operand = interp.evaluate(operand)?;
                Ok(evaluate_unary(*op, operand))
            }
            Operator::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if interp.evaluate(cond)?.is_definite() {
                    interp.evaluate(then)
                } else {
                    interp.evaluate(otherwise)
                }
            }
            Operator::Invoke { func, args } => {
                let callee = interp.evaluate(func)?;
                let args = evaluate_args(interp, args)?;
                invoke(interp, callee, args)
            }
            Operator::Lambda { .. } => Ok(Value::Operator(self.clone())),
        }
    }
}

fn evaluate_binary(
    interp: &mut Interpreter,
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, InterpreterError> {
    let lhs = interp.evaluate(lhs)?;
    match op {
        BinaryOp::Or if lhs.is_definite() => return Ok(lhs),
        BinaryOp::And if !lhs.is_definite() => return Ok(lhs),
        BinaryOp::Or | BinaryOp::And => return interp.evaluate(rhs),
        _ => {}
    }
    let rhs = interp.evaluate(rhs)?;
    Ok(match op {
        BinaryOp::Lt => Value::Bool(lhs < rhs),
        BinaryOp::Le => Value::Bool(lhs <= rhs),
        BinaryOp::Eq => Value::Bool(lhs == rhs),
        BinaryOp::Ne => Value::Bool(lhs != rhs),
        BinaryOp::Ge => Value::Bool(lhs >= rhs),
        BinaryOp::Gt => Value::Bool(lhs > rhs),
        BinaryOp::Plus => match (lhs, rhs) {
            (Value::Num(a), Value::Num(b)) => Value::Num(a.plus(b)),
            (Value::Text(a), Value::Text(b)) => Value::Text(a + &b),
            _ => Value::Absent,
        },
        BinaryOp::Minus => arithmetic(lhs, rhs, Num::minus),
        BinaryOp::Times => arithmetic(lhs, rhs, Num::times),
        BinaryOp::Divide => arithmetic(lhs, rhs, Num::divide),
        BinaryOp::Modulo => arithmetic(lhs, rhs, Num::modulo),
        BinaryOp::BitAnd => bitwise(lhs, rhs, Num::bit_and, |a, b| a & b),
        BinaryOp::BitOr => bitwise(lhs, rhs, Num::bit_or, |a, b| a | b),
        BinaryOp::BitXor => bitwise(lhs, rhs, Num::bit_xor, |a, b| a ^ b),
        BinaryOp::Or | BinaryOp::And => Value::Absent,
    })
}

fn arithmetic(lhs: Value, rhs: Value, op: fn(Num, Num) -> Num) -> Value {
    match (lhs, rhs) {
        (Value::Num(a), Value::Num(b)) => Value::Num(op(a, b)),
        _ => Value::Absent,
    }
}

fn bitwise(
    lhs: Value,
    rhs: Value,
    nums: fn(Num, Num) -> Option<Num>,
    bools: fn(bool, bool) -> bool,
) -> Value {
    match (lhs, rhs) {
        (Value::Num(a), Value::Num(b)) => nums(a, b).map_or(Value::Absent, Value::Num),
        (Value::Bool(a), Value::Bool(b)) => Value::Bool(bools(a, b)),
        _ => Value::Absent,
    }
}

fn evaluate_unary(op: UnaryOp, operand: Value) -> Value {
    match (op, operand) {
        (UnaryOp::Not, operand) => Value::Bool(!operand.is_definite()),
        (UnaryOp::BitNot, Value::Num(n)) => n.bit_not().map_or(Value::Absent, Value::Num),
        (UnaryOp::BitNot, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Neg, Value::Num(n)) => Value::Num(n.negative()),
        (UnaryOp::Pos, Value::Num(n)) => Value::Num(n),
        _ => Value::Absent,
    }
}

/// Evaluates invocation arguments: a record of arguments spreads into several,
/// `Absent` means none, anything else is a single argument.
fn evaluate_args(interp: &mut Interpreter, args: &Value) -> Result<Vec<Value>, InterpreterError> {
    match args {
        Value::Absent => Ok(Vec::new()),
        Value::Record(record) if !record.has_attrs() => record
            .iter()
            .map(|item| interp.evaluate(item.as_value()))
            .collect(),
        other => Ok(vec![interp.evaluate(other)?]),
    }
}

fn invoke(
    interp: &mut Interpreter,
    callee: Value,
    args: Vec<Value>,
) -> Result<Value, InterpreterError> {
    match callee {
        Value::Operator(Operator::Lambda { bindings, body }) => {
            let mut scope = RecordBuilder::new();
            let names: Vec<Value> = match *bindings {
                Value::Record(record) => record.iter().map(Item::to_value).collect(),
                other => vec![other],
            };
            let mut args = args.into_iter();
            for name in names {
                scope.slot(name, args.next().unwrap_or(Value::Absent));
            }
            interp.push_scope(Item::Value(Value::Record(scope.commit())))?;
            let result = interp.evaluate(&body);
            interp.pop_scope()?;
            result
        }
        Value::Text(name) => match interp.builtin(&name) {
            Some(builtin) => Ok(builtin(&args)),
            None => Err(InterpreterError::UnknownFunction { name }),
        },
        other => Err(InterpreterError::NotCallable {
            callee: other.to_recon(),
        }),
    }
}

/// Signature of a native function callable from expressions.
pub type Builtin = fn(&[Value]) -> Value;

pub(crate) fn builtin_abs(args: &[Value]) -> Value {
    unary_num(args, |n| {
        if n < Num::I32(0) {
            n.negative()
        } else {
            n
        }
    })
}

pub(crate) fn builtin_ceil(args: &[Value]) -> Value {
    unary_num(args, |n| round_with(n, f64::ceil))
}

pub(crate) fn builtin_floor(args: &[Value]) -> Value {
    unary_num(args, |n| round_with(n, f64::floor))
}

pub(crate) fn builtin_round(args: &[Value]) -> Value {
    unary_num(args, |n| round_with(n, f64::round))
}

pub(crate) fn builtin_min(args: &[Value]) -> Value {
    spread(args).into_iter().min().unwrap_or(Value::Absent)
}

pub(crate) fn builtin_max(args: &[Value]) -> Value {
    spread(args).into_iter().max().unwrap_or(Value::Absent)
}

pub(crate) fn builtin_len(args: &[Value]) -> Value {
    let len = match args {
        [Value::Text(text)] => text.chars().count(),
        [Value::Data(data)] => data.len(),
        [Value::Record(record)] => record.len(),
        _ => return Value::Absent,
    };
    match i32::try_from(len) {
        Ok(len) => Value::Num(Num::I32(len)),
        Err(_) => Value::Num(Num::I64(len as i64)),
    }
}

fn unary_num(args: &[Value], op: impl Fn(Num) -> Num) -> Value {
    match args {
        [Value::Num(n)] => Value::Num(op(*n)),
        _ => Value::Absent,
    }
}

fn round_with(n: Num, op: fn(f64) -> f64) -> Num {
    match n {
        Num::F32(v) => Num::F32(op(v as f64) as f32),
        Num::F64(v) => Num::F64(op(v)),
        integral => integral,
    }
}

/// A single record argument is treated as the argument list.
fn spread(args: &[Value]) -> Vec<Value> {
    match args {
        [Value::Record(record)] => record.values().cloned().collect(),
        _ => args.to_vec(),
    }
}

impl From<Operator> for Item {
    fn from(operator: Operator) -> Self {
        Item::Value(Value::Operator(operator))
    }
}
