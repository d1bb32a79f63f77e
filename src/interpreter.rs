//! Tree-walking evaluation of selectors and operators over a scope stack.
use crate::config::InterpreterConfig;
use crate::error::InterpreterError;
use crate::operator::{self, Builtin};
use crate::record::{Record, RecordBuilder};
use crate::value::{Field, Item, Value};
use log::{debug, trace};
use std::collections::HashMap;

pub struct Interpreter {
    scopes: Vec<Item>,
    /// Operators currently being evaluated, innermost last.
    depth: usize,
    config: InterpreterConfig,
    builtins: HashMap<String, Builtin>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        let mut interp = Interpreter {
            scopes: Vec::new(),
            depth: 0,
            config,
            builtins: HashMap::new(),
        };
        interp.register("abs", operator::builtin_abs);
        interp.register("ceil", operator::builtin_ceil);
        interp.register("floor", operator::builtin_floor);
        interp.register("round", operator::builtin_round);
        interp.register("min", operator::builtin_min);
        interp.register("max", operator::builtin_max);
        interp.register("len", operator::builtin_len);
        interp
    }

    /// Creates an interpreter whose stack already holds `scope`.
    pub fn with_scope(scope: impl Into<Value>) -> Result<Self, InterpreterError> {
        let mut interp = Interpreter::new();
        interp.push_scope(Item::Value(scope.into()))?;
        Ok(interp)
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Makes `function` callable by `name` from invoke expressions, replacing any
    /// function previously registered under that name.
    pub fn register(&mut self, name: &str, function: Builtin) {
        self.builtins.insert(name.to_string(), function);
    }

    pub fn builtin(&self, name: &str) -> Option<Builtin> {
        self.builtins.get(name).copied()
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self, scope: Item) -> Result<(), InterpreterError> {
        let max = self.config.max_scope_depth;
        if self.scopes.len() >= max {
            debug!("rejecting scope push at depth {}", self.scopes.len());
            return Err(InterpreterError::ScopeOverflow {
                depth: self.scopes.len(),
                max,
            });
        }
        self.scopes.push(scope);
        trace!("pushed scope, depth {}", self.scopes.len());
        Ok(())
    }

    pub fn pop_scope(&mut self) -> Result<Item, InterpreterError> {
        match self.scopes.pop() {
            Some(scope) => {
                trace!("popped scope, depth {}", self.scopes.len());
                Ok(scope)
            }
            None => Err(underflow("pop")),
        }
    }

    pub fn peek_scope(&self) -> Result<&Item, InterpreterError> {
        self.scopes.last().ok_or_else(|| underflow("peek"))
    }

    /// Replaces the top scope, returning the one it displaced.
    pub fn swap_scope(&mut self, scope: Item) -> Result<Item, InterpreterError> {
        match self.scopes.last_mut() {
            Some(top) => Ok(std::mem::replace(top, scope)),
            None => Err(underflow("swap")),
        }
    }

    /// Evaluates a value against the current scope.
    ///
    /// A selector that picks out a single field yields a one-field record.
    pub fn evaluate(&mut self, value: &Value) -> Result<Value, InterpreterError> {
        match value {
            Value::Record(record) => self.evaluate_record(record).map(Value::Record),
            Value::Selector(selector) => Ok(match selector.evaluate(self)? {
                Item::Value(value) => value,
                field @ Item::Field(_) => Value::Record(Record::of([field])),
            }),
            Value::Operator(operator) => {
                let max = self.config.max_scope_depth;
                if self.depth >= max {
                    debug!("rejecting operator at depth {}", self.depth);
                    return Err(InterpreterError::TooDeep { max });
                }
                self.depth += 1;
                let result = operator.evaluate(self);
                self.depth -= 1;
                result
            }
            other => Ok(other.clone()),
        }
    }

    /// Evaluates an item; `None` means it evaluated to nothing and should be dropped.
    pub fn evaluate_item(&mut self, item: &Item) -> Result<Option<Item>, InterpreterError> {
        match item {
            Item::Field(Field::Attr { key, value }) => {
                let value = self.evaluate(value)?;
                Ok(value.is_defined().then(|| Item::attr(key.clone(), value)))
            }
            Item::Field(Field::Slot { key, value }) => {
                let key = self.evaluate(key)?;
                let value = self.evaluate(value)?;
                Ok(value.is_defined().then(|| Item::slot(key, value)))
            }
            Item::Value(Value::Selector(selector)) => {
                let selected = selector.evaluate(self)?;
                Ok(selected.is_defined().then_some(selected))
            }
            Item::Value(value) => {
                let value = self.evaluate(value)?;
                Ok(value.is_defined().then_some(Item::Value(value)))
            }
        }
    }

    /// Evaluates each item of `record` with the record itself as scope.
    pub fn evaluate_record(&mut self, record: &Record) -> Result<Record, InterpreterError> {
        self.push_scope(Item::Value(Value::Record(record.clone())))?;
        let mut builder = RecordBuilder::with_capacity(record.len());
        let mut outcome = Ok(());
        for item in record {
            match self.evaluate_item(item) {
                Ok(Some(item)) => {
                    builder.push(item);
                }
                Ok(None) => {}
                Err(error) => {
                    outcome = Err(error);
                    break;
                }
            }
        }
        self.pop_scope()?;
        outcome.map(|()| builder.commit())
    }
}

fn underflow(operation: &str) -> InterpreterError {
    debug!("rejecting scope {operation} on an empty stack");
    InterpreterError::ScopeUnderflow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{BinaryOp, Operator};
    use crate::selector::Selector;

    #[test]
    fn test_scope_bounds() {
        let config = InterpreterConfig::default().with_max_scope_depth(2);
        let mut interp = Interpreter::with_config(config);
        assert_eq!(interp.pop_scope(), Err(InterpreterError::ScopeUnderflow));
        assert_eq!(interp.peek_scope(), Err(InterpreterError::ScopeUnderflow));
        interp.push_scope(Item::from(1)).unwrap();
        interp.push_scope(Item::from(2)).unwrap();
        assert_eq!(
            interp.push_scope(Item::from(3)),
            Err(InterpreterError::ScopeOverflow { depth: 2, max: 2 })
        );
        assert_eq!(interp.swap_scope(Item::from(4)), Ok(Item::from(2)));
        assert_eq!(interp.peek_scope(), Ok(&Item::from(4)));
        assert_eq!(interp.scope_depth(), 2);
    }

    #[test]
    fn test_record_is_scope_for_its_items() {
        let sum = Operator::binary(BinaryOp::Plus, Selector::identity().get("a"), 1);
        let record = Record::of([Item::slot("a", 1), Item::slot("b", sum)]);
        let evaluated = Interpreter::new()
            .evaluate(&Value::Record(record))
            .unwrap();
        assert_eq!(
            evaluated,
            Value::Record(Record::of([Item::slot("a", 1), Item::slot("b", 2)]))
        );
    }

    #[test]
    fn test_absent_fields_are_dropped() {
        let missing = Selector::identity().get("nope");
        let record = Record::of([Item::slot("a", missing), Item::from(3)]);
        let evaluated = Interpreter::new()
            .evaluate(&Value::Record(record))
            .unwrap();
        assert_eq!(evaluated, Value::Record(Record::of([Item::from(3)])));
    }

    #[test]
    fn test_deep_nesting_overflows() {
        let config = InterpreterConfig::default().with_max_scope_depth(3);
        let mut value = Value::from(1);
        for _ in 0..5 {
            value = Value::Record(Record::of([Item::Value(value)]));
        }
        let mut interp = Interpreter::with_config(config);
        assert!(matches!(
            interp.evaluate(&value),
            Err(InterpreterError::ScopeOverflow { max: 3, .. })
        ));
        assert_eq!(interp.scope_depth(), 0);
    }

    #[test]
    fn test_operator_nesting_is_bounded() {
        let config = InterpreterConfig::default().with_max_scope_depth(4);
        let mut sum = Value::from(1);
        for _ in 0..3 {
            sum = Value::Operator(Operator::binary(BinaryOp::Plus, sum, 1));
        }
        let mut interp = Interpreter::with_config(config);
        assert_eq!(interp.evaluate(&sum), Ok(Value::from(4)));

        for _ in 0..2 {
            sum = Value::Operator(Operator::binary(BinaryOp::Plus, sum, 1));
        }
        assert_eq!(
            interp.evaluate(&sum),
            Err(InterpreterError::TooDeep { max: 4 })
        );
        // the counter unwinds after a failure
        let small = Value::Operator(Operator::binary(BinaryOp::Plus, 1, 1));
        assert_eq!(interp.evaluate(&small), Ok(Value::from(2)));
    }

    #[test]
    fn test_registered_builtin() {
        fn twice(args: &[Value]) -> Value {
            match args {
                [Value::Text(text)] => Value::Text(text.repeat(2)),
                _ => Value::Absent,
            }
        }
        let mut interp = Interpreter::new();
        interp.register("twice", twice);
        let call = Operator::invoke("twice", "ab");
        assert_eq!(interp.evaluate(&Value::from(call)), Ok(Value::from("abab")));
    }
}
