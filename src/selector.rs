//! Selectors: chained traversals over a value tree.
//!
//! A selector is a linked chain of steps ending in [`Selector::Identity`]. Every step
//! resolves its candidates against the interpreter's top scope and hands each one to
//! the rest of the chain by pushing it as the new scope.
use crate::error::InterpreterError;
use crate::interpreter::Interpreter;
use crate::record::{Record, RecordBuilder};
use crate::value::{Field, Item, Value};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Selector {
    #[default]
    Identity,
    Get {
        key: Box<Value>,
        then: Box<Selector>,
    },
    GetAttr {
        key: String,
        then: Box<Selector>,
    },
    GetItem {
        index: usize,
        then: Box<Selector>,
    },
    Children {
        then: Box<Selector>,
    },
    Descendants {
        then: Box<Selector>,
    },
    Keys {
        then: Box<Selector>,
    },
    Values {
        then: Box<Selector>,
    },
    Filter {
        predicate: Box<Value>,
        then: Box<Selector>,
    },
}

/// Callback invoked with each selected candidate on top of the scope stack.
pub type SelectCallback<'a, T> =
    dyn FnMut(&mut Interpreter) -> Result<Option<T>, InterpreterError> + 'a;

/// Transform invoked with each selected candidate on top of the scope stack,
/// returning its replacement.
pub type MapTransform<'a> = dyn FnMut(&mut Interpreter) -> Result<Item, InterpreterError> + 'a;

fn identity() -> Box<Selector> {
    Box::new(Selector::Identity)
}

impl Selector {
    pub fn identity() -> Self {
        Selector::Identity
    }

    pub fn get(self, key: impl Into<Value>) -> Self {
        self.and_then(Selector::Get {
            key: Box::new(key.into()),
            then: identity(),
        })
    }

    pub fn get_attr(self, key: impl Into<String>) -> Self {
        self.and_then(Selector::GetAttr {
            key: key.into(),
            then: identity(),
        })
    }

    pub fn get_item(self, index: usize) -> Self {
        self.and_then(Selector::GetItem {
            index,
            then: identity(),
        })
    }

    pub fn children(self) -> Self {
        self.and_then(Selector::Children { then: identity() })
    }

    pub fn descendants(self) -> Self {
        self.and_then(Selector::Descendants { then: identity() })
    }

    pub fn keys(self) -> Self {
        self.and_then(Selector::Keys { then: identity() })
    }

    pub fn values(self) -> Self {
        self.and_then(Selector::Values { then: identity() })
    }

    pub fn filter(self, predicate: impl Into<Value>) -> Self {
        self.and_then(Selector::Filter {
            predicate: Box::new(predicate.into()),
            then: identity(),
        })
    }

    /// Appends `next` at the end of this chain, replacing the terminal identity.
    pub fn and_then(self, next: Selector) -> Self {
        match self {
            Selector::Identity => next,
            Selector::Get { key, then } => Selector::Get {
                key,
                then: Box::new(then.and_then(next)),
            },
            Selector::GetAttr { key, then } => Selector::GetAttr {
                key,
                then: Box::new(then.and_then(next)),
            },
            Selector::GetItem { index, then } => Selector::GetItem {
                index,
                then: Box::new(then.and_then(next)),
            },
            Selector::Children { then } => Selector::Children {
                then: Box::new(then.and_then(next)),
            },
            Selector::Descendants { then } => Selector::Descendants {
                then: Box::new(then.and_then(next)),
            },
            Selector::Keys { then } => Selector::Keys {
                then: Box::new(then.and_then(next)),
            },
            Selector::Values { then } => Selector::Values {
                then: Box::new(then.and_then(next)),
            },
            Selector::Filter { predicate, then } => Selector::Filter {
                predicate,
                then: Box::new(then.and_then(next)),
            },
        }
    }

    /// The rest of the chain after this step; `None` for identity.
    pub fn then(&self) -> Option<&Selector> {
        match self {
            Selector::Identity => None,
            Selector::Get { then, .. }
            | Selector::GetAttr { then, .. }
            | Selector::GetItem { then, .. }
            | Selector::Children { then }
            | Selector::Descendants { then }
            | Selector::Keys { then }
            | Selector::Values { then }
            | Selector::Filter { then, .. } => Some(then),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Selector::Identity)
    }

    /// Visits every selected item, stopping at the first callback result that is `Some`.
    ///
    /// The scope stack is left exactly as it was found, whether the traversal
    /// completes, short-circuits or fails.
    pub fn for_selected<T>(
        &self,
        interp: &mut Interpreter,
        callback: &mut SelectCallback<'_, T>,
    ) -> Result<Option<T>, InterpreterError> {
        if let Selector::Identity = self {
            return callback(interp);
        }
        let key = match self {
            Selector::Get { key, .. } => Some(interp.evaluate(key)?),
            _ => None,
        };
        let scope = interp.pop_scope()?;
        let selected = self.select_within(&scope, key.as_ref(), interp, callback);
        interp.push_scope(scope)?;
        selected
    }

    fn select_within<T>(
        &self,
        scope: &Item,
        key: Option<&Value>,
        interp: &mut Interpreter,
        callback: &mut SelectCallback<'_, T>,
    ) -> Result<Option<T>, InterpreterError> {
        let record = match scope.as_value() {
            Value::Record(record) => Some(record),
            _ => None,
        };
        match self {
            Selector::Identity => callback(interp),
            Selector::Get { then, .. } => {
                let field = key.and_then(|key| record.and_then(|r| r.get_field(key)));
                match field {
                    Some(field) => select_in(interp, Item::Value(field.value().clone()), then, callback),
                    None => Ok(None),
                }
            }
            Selector::GetAttr { key, then } => match record.and_then(|r| r.get_attr(key)) {
                Some(value) => select_in(interp, Item::Value(value.clone()), then, callback),
                None => Ok(None),
            },
            Selector::GetItem { index, then } => match record.and_then(|r| r.get_item(*index)) {
                Some(item) => select_in(interp, item.clone(), then, callback),
                None => Ok(None),
            },
            Selector::Children { then } => {
                for item in record.into_iter().flat_map(Record::iter) {
                    if let Some(selected) = select_in(interp, item.clone(), then, callback)? {
                        return Ok(Some(selected));
                    }
                }
                Ok(None)
            }
            Selector::Descendants { then } => {
                for item in record.into_iter().flat_map(Record::iter) {
                    if let Some(selected) = select_in(interp, item.clone(), then, callback)? {
                        return Ok(Some(selected));
                    }
                    if item.as_value().is_record() {
                        let nested = Item::Value(item.as_value().clone());
                        if let Some(selected) = select_in(interp, nested, self, callback)? {
                            return Ok(Some(selected));
                        }
                    }
                }
                Ok(None)
            }
            Selector::Keys { then } => {
                for key in record.into_iter().flat_map(Record::keys) {
                    if let Some(selected) = select_in(interp, Item::Value(key), then, callback)? {
                        return Ok(Some(selected));
                    }
                }
                Ok(None)
            }
            Selector::Values { then } => {
                let fields = record
                    .into_iter()
                    .flat_map(Record::iter)
                    .filter_map(Item::as_field);
                for field in fields {
                    let value = Item::Value(field.value().clone());
                    if let Some(selected) = select_in(interp, value, then, callback)? {
                        return Ok(Some(selected));
                    }
                }
                Ok(None)
            }
            Selector::Filter { predicate, then } => {
                if matches_predicate(interp, scope, predicate)? {
                    select_in(interp, scope.clone(), then, callback)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Rewrites every selected item with `transform` and returns the updated scope item.
    ///
    /// Each level writes its replacements into a branch of its parent record, so the
    /// original tree is never modified. A transform result of `Absent` or `Extant`
    /// deletes the selected field or item. The scope stack is left unchanged.
    pub fn map_selected(
        &self,
        interp: &mut Interpreter,
        transform: &mut MapTransform<'_>,
    ) -> Result<Item, InterpreterError> {
        if let Selector::Identity = self {
            return transform(interp);
        }
        let key = match self {
            Selector::Get { key, .. } => Some(interp.evaluate(key)?),
            _ => None,
        };
        let scope = interp.pop_scope()?;
        let mapped = self.map_within(&scope, key.as_ref(), interp, transform);
        interp.push_scope(scope)?;
        mapped
    }

    fn map_within(
        &self,
        scope: &Item,
        key: Option<&Value>,
        interp: &mut Interpreter,
        transform: &mut MapTransform<'_>,
    ) -> Result<Item, InterpreterError> {
        if let Selector::Filter { predicate, then } = self {
            return if matches_predicate(interp, scope, predicate)? {
                map_in(interp, scope.clone(), then, transform)
            } else {
                Ok(scope.clone())
            };
        }
        let record = match scope.as_value() {
            Value::Record(record) => record,
            _ => return Ok(scope.clone()),
        };
        let mut builder = RecordBuilder::with_capacity(record.len());
        match self {
            Selector::Identity | Selector::Filter { .. } => return transform(interp),
            Selector::Get { then, .. } => {
                let mut found = false;
                for item in record {
                    match (item, key) {
                        (Item::Field(field), Some(key)) if !found && field.key_equals(key) => {
                            found = true;
                            let candidate = Item::Value(field.value().clone());
                            let mapped = map_in(interp, candidate, then, transform)?;
                            push_field_value(&mut builder, field, mapped);
                        }
                        _ => {
                            builder.push(item.clone());
                        }
                    }
                }
            }
            Selector::GetAttr { key, then } => {
                let mut found = false;
                for item in record {
                    match item {
                        Item::Field(field @ Field::Attr { key: name, value }) if !found && name == key => {
                            found = true;
                            let mapped = map_in(interp, Item::Value(value.clone()), then, transform)?;
                            push_field_value(&mut builder, field, mapped);
                        }
                        _ => {
                            builder.push(item.clone());
                        }
                    }
                }
            }
            Selector::GetItem { index, then } => {
                for (position, item) in record.iter().enumerate() {
                    if position == *index {
                        let mapped = map_in(interp, item.clone(), then, transform)?;
                        push_defined(&mut builder, mapped);
                    } else {
                        builder.push(item.clone());
                    }
                }
            }
            Selector::Children { then } => {
                for item in record {
                    let mapped = map_in(interp, item.clone(), then, transform)?;
                    push_defined(&mut builder, mapped);
                }
            }
            Selector::Descendants { then } => {
                for item in record {
                    let mapped = map_in(interp, item.clone(), then, transform)?;
                    if is_deletion(&mapped) {
                        continue;
                    }
                    let mapped = if mapped.as_value().is_record() {
                        let nested = Item::Value(mapped.as_value().clone());
                        let inner = map_in(interp, nested, self, transform)?.into_value();
                        match mapped {
                            Item::Field(field) => Item::Field(field.with_value(inner)),
                            Item::Value(_) => Item::Value(inner),
                        }
                    } else {
                        mapped
                    };
                    builder.push(mapped);
                }
            }
            Selector::Keys { then } => {
                for item in record {
                    match item {
                        Item::Field(field) => {
                            let mapped = map_in(interp, Item::Value(field.key()), then, transform)?;
                            if is_deletion(&mapped) {
                                continue;
                            }
                            let value = field.value().clone();
                            match (field, mapped.into_value()) {
                                (Field::Attr { .. }, Value::Text(name)) => {
                                    builder.push(Item::attr(name, value));
                                }
                                (_, key) => {
                                    builder.push(Item::slot(key, value));
                                }
                            }
                        }
                        Item::Value(_) => {
                            builder.push(item.clone());
                        }
                    }
                }
            }
            Selector::Values { then } => {
                for item in record {
                    match item {
                        Item::Field(field) => {
                            let candidate = Item::Value(field.value().clone());
                            let mapped = map_in(interp, candidate, then, transform)?;
                            push_field_value(&mut builder, field, mapped);
                        }
                        Item::Value(_) => {
                            builder.push(item.clone());
                        }
                    }
                }
            }
        }
        let mapped = Value::Record(builder.commit());
        Ok(match scope {
            Item::Field(field) => Item::Field(field.with_value(mapped)),
            Item::Value(_) => Item::Value(mapped),
        })
    }

    /// Collects every selection: nothing is `Absent`, one item is itself,
    /// several are gathered into a record.
    pub fn evaluate(&self, interp: &mut Interpreter) -> Result<Item, InterpreterError> {
        let mut selected = Vec::new();
        self.for_selected::<()>(interp, &mut |interp| {
            selected.push(interp.peek_scope()?.clone());
            Ok(None)
        })?;
        Ok(match selected.len() {
            0 => Item::Value(Value::Absent),
            1 => selected.remove(0),
            _ => Item::Value(Value::Record(Record::from(selected))),
        })
    }
}

fn select_in<T>(
    interp: &mut Interpreter,
    candidate: Item,
    then: &Selector,
    callback: &mut SelectCallback<'_, T>,
) -> Result<Option<T>, InterpreterError> {
    interp.push_scope(candidate)?;
    let selected = then.for_selected(interp, callback);
    interp.pop_scope()?;
    selected
}

fn map_in(
    interp: &mut Interpreter,
    candidate: Item,
    then: &Selector,
    transform: &mut MapTransform<'_>,
) -> Result<Item, InterpreterError> {
    interp.push_scope(candidate)?;
    let mapped = then.map_selected(interp, transform);
    interp.pop_scope()?;
    mapped
}

fn matches_predicate(
    interp: &mut Interpreter,
    scope: &Item,
    predicate: &Value,
) -> Result<bool, InterpreterError> {
    interp.push_scope(scope.clone())?;
    let result = interp.evaluate(predicate);
    interp.pop_scope()?;
    Ok(result?.is_definite())
}

fn is_deletion(item: &Item) -> bool {
    matches!(item, Item::Value(Value::Absent | Value::Extant))
}

fn push_defined(builder: &mut RecordBuilder, item: Item) {
    if !is_deletion(&item) {
        builder.push(item);
    }
}

fn push_field_value(builder: &mut RecordBuilder, field: &Field, mapped: Item) {
    let value = mapped.into_value();
    if !value.is_unit() {
        builder.push(field.with_value(value));
    }
}
