//! Records and the builders that produce them.
//!
//! A [`Record`] is immutable and structurally shared: cloning it copies a pointer.
//! Mutation happens on a [`RecordBuilder`], which owns its storage exclusively and is
//! obtained either fresh or by [`Record::branch`]ing an existing record.
use crate::error::RecordError;
use crate::value::{Field, Item, Value};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Accepts items one at a time and finalizes them into a result.
///
/// The grammar and the interpreter both produce values through this contract, so an
/// attribute body, a block and an evaluated record all append incrementally.
pub trait Builder {
    type Output;

    fn push(&mut self, item: Item);

    fn bind(self) -> Self::Output;
}

/// An ordered, immutable sequence of items.
#[derive(Clone, Debug)]
pub struct Record {
    items: Arc<[Item]>,
}

impl Record {
    pub fn empty() -> Self {
        Record {
            items: Arc::from(Vec::new()),
        }
    }

    pub fn of(items: impl IntoIterator<Item = Item>) -> Self {
        items.into_iter().collect()
    }

    /// Opens an independent mutable copy; this record is left untouched.
    pub fn branch(&self) -> RecordBuilder {
        RecordBuilder {
            items: self.items.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get_item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn head(&self) -> Option<&Item> {
        self.items.first()
    }

    /// The value of the first field keyed by `key`.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.get_field(key).map(Field::value)
    }

    pub fn get_field(&self, key: &Value) -> Option<&Field> {
        self.items.iter().find_map(|item| match item {
            Item::Field(field) if field.key_equals(key) => Some(field),
            _ => None,
        })
    }

    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        self.items.iter().find_map(|item| match item {
            Item::Field(Field::Attr { key, value }) if key == name => Some(value),
            _ => None,
        })
    }

    pub fn get_slot(&self, key: &Value) -> Option<&Value> {
        self.items.iter().find_map(|item| match item {
            Item::Field(Field::Slot { key: own, value }) if own == key => Some(value),
            _ => None,
        })
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get_field(key).is_some()
    }

    /// The name of the leading attribute, if the record starts with one.
    pub fn tag(&self) -> Option<&str> {
        match self.head() {
            Some(Item::Field(Field::Attr { key, .. })) => Some(key),
            _ => None,
        }
    }

    /// The value of the leading attribute.
    pub fn header(&self) -> Option<&Value> {
        match self.head() {
            Some(Item::Field(Field::Attr { value, .. })) => Some(value),
            _ => None,
        }
    }

    /// Everything after the head item, flattened the way a block binds:
    /// nothing is `Absent`, a single value is that value, anything else is a record.
    pub fn body(&self) -> Value {
        let mut builder = ValueBuilder::new();
        for item in self.items.iter().skip(1) {
            builder.push(item.clone());
        }
        builder.bind()
    }

    pub fn has_attrs(&self) -> bool {
        self.items.iter().any(Item::is_attr)
    }

    pub fn field_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_field()).count()
    }

    pub fn keys(&self) -> impl Iterator<Item = Value> + '_ {
        self.items.iter().filter_map(Item::key)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.items.iter().map(Item::as_value)
    }
}

impl Default for Record {
    fn default() -> Self {
        Record::empty()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items) || self.items == other.items
    }
}

impl Eq for Record {}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.items.iter().cmp(other.items.iter())
    }
}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.len().hash(state);
        for item in self.items.iter() {
            item.hash(state);
        }
    }
}

impl FromIterator<Item> for Record {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Record {
            items: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Item>> for Record {
    fn from(items: Vec<Item>) -> Self {
        Record {
            items: Arc::from(items),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A mutable record under construction. `commit` freezes it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordBuilder {
    items: Vec<Item>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RecordBuilder {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn push(&mut self, item: impl Into<Item>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    pub fn attr(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push(Item::attr(key, value))
    }

    pub fn slot(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> &mut Self {
        self.push(Item::slot(key, value))
    }

    pub fn insert(&mut self, index: usize, item: impl Into<Item>) -> Result<(), RecordError> {
        self.check_index(index, self.items.len() + 1)?;
        self.items.insert(index, item.into());
        Ok(())
    }

    /// Replaces the value of the first field keyed by `key`, or appends a slot.
    pub fn set(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.position_of(&key) {
            Some(index) => {
                if let Item::Field(field) = &self.items[index] {
                    self.items[index] = Item::Field(field.with_value(value));
                }
            }
            None => self.items.push(Item::slot(key, value)),
        }
        self
    }

    /// Replaces the value of the first attribute named `name`, or appends one.
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        let position = self
            .items
            .iter()
            .position(|item| matches!(item, Item::Field(Field::Attr { key, .. }) if key == name));
        match position {
            Some(index) => self.items[index] = Item::attr(name, value),
            None => self.items.push(Item::attr(name, value)),
        }
        self
    }

    pub fn set_item(&mut self, index: usize, item: impl Into<Item>) -> Result<Item, RecordError> {
        self.check_index(index, self.items.len())?;
        Ok(std::mem::replace(&mut self.items[index], item.into()))
    }

    /// Removes `delete_count` items at `start` and inserts `items` in their place.
    pub fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Item>,
    ) -> Result<Vec<Item>, RecordError> {
        let len = self.items.len();
        self.check_index(start, len + 1)?;
        let end = start.saturating_add(delete_count).min(len);
        Ok(self.items.splice(start..end, items).collect())
    }

    /// Removes the first field keyed by `key`.
    pub fn delete(&mut self, key: &Value) -> Option<Item> {
        self.position_of(key).map(|index| self.items.remove(index))
    }

    pub fn remove(&mut self, index: usize) -> Result<Item, RecordError> {
        self.check_index(index, self.items.len())?;
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn retain(&mut self, f: impl FnMut(&Item) -> bool) {
        self.items.retain(f);
    }

    pub fn commit(self) -> Record {
        Record::from(self.items)
    }

    fn position_of(&self, key: &Value) -> Option<usize> {
        self.items
            .iter()
            .position(|item| matches!(item, Item::Field(field) if field.key_equals(key)))
    }

    fn check_index(&self, index: usize, bound: usize) -> Result<(), RecordError> {
        if index < bound {
            Ok(())
        } else {
            Err(RecordError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            })
        }
    }
}

impl Builder for RecordBuilder {
    type Output = Record;

    fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    fn bind(self) -> Record {
        self.commit()
    }
}

/// Builds a value, collapsing a lone value to itself.
///
/// Binds to `Absent` when nothing was pushed, to the pushed value when exactly one
/// value (and no field) was pushed, and to a record of all items otherwise.
#[derive(Clone, Debug, Default)]
pub struct ValueBuilder {
    record: Option<RecordBuilder>,
    value: Option<Value>,
}

impl ValueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_none() && self.value.is_none()
    }
}

impl Builder for ValueBuilder {
    type Output = Value;

    fn push(&mut self, item: Item) {
        if let Some(record) = self.record.as_mut() {
            record.items.push(item);
            return;
        }
        match (self.value.take(), item) {
            (None, Item::Value(value)) => self.value = Some(value),
            (previous, item) => {
                let mut record = RecordBuilder::new();
                if let Some(value) = previous {
                    record.items.push(Item::Value(value));
                }
                record.items.push(item);
                self.record = Some(record);
            }
        }
    }

    fn bind(self) -> Value {
        match (self.record, self.value) {
            (Some(record), _) => Value::Record(record.commit()),
            (None, Some(value)) => value,
            (None, None) => Value::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_is_independent() {
        let original = Record::of([Item::slot("a", 1), Item::from(2)]);
        let mut branch = original.branch();
        branch.set("a", 10).push(3);
        let changed = branch.commit();
        assert_eq!(original.get(&Value::from("a")), Some(&Value::from(1)));
        assert_eq!(original.len(), 2);
        assert_eq!(changed.get(&Value::from("a")), Some(&Value::from(10)));
        assert_eq!(changed.len(), 3);
    }

    #[test]
    fn test_clone_shares_storage() {
        let record = Record::of([Item::from(1)]);
        let copy = record.clone();
        assert!(Arc::ptr_eq(&record.items, &copy.items));
    }

    #[test]
    fn test_builder_mutations() {
        let mut builder = RecordBuilder::new();
        builder.attr("tag", Value::Extant).slot("x", 1).push(2);
        assert_eq!(builder.len(), 3);
        assert_eq!(
            builder.delete(&Value::from("x")),
            Some(Item::slot("x", 1))
        );
        let removed = builder.splice(0, 1, [Item::from(5), Item::from(6)]).unwrap();
        assert_eq!(removed, vec![Item::attr("tag", Value::Extant)]);
        assert_eq!(builder.items(), &[Item::from(5), Item::from(6), Item::from(2)]);
        assert_eq!(
            builder.set_item(7, Item::from(0)),
            Err(RecordError::IndexOutOfBounds { index: 7, len: 3 })
        );
        builder.clear();
        assert!(builder.commit().is_empty());
    }

    #[test]
    fn test_set_attr_replaces_in_place() {
        let mut builder = RecordBuilder::new();
        builder.attr("a", 1).slot("b", 2);
        builder.set_attr("a", 3);
        let record = builder.commit();
        assert_eq!(record.tag(), Some("a"));
        assert_eq!(record.header(), Some(&Value::from(3)));
    }

    #[test]
    fn test_value_builder_collapses() {
        let builder = ValueBuilder::new();
        assert_eq!(builder.bind(), Value::Absent);

        let mut builder = ValueBuilder::new();
        builder.push(Item::from(1));
        assert_eq!(builder.bind(), Value::from(1));

        let mut builder = ValueBuilder::new();
        builder.push(Item::from(1));
        builder.push(Item::from(2));
        assert_eq!(
            builder.bind(),
            Value::Record(Record::of([Item::from(1), Item::from(2)]))
        );

        let mut builder = ValueBuilder::new();
        builder.push(Item::slot("a", 1));
        assert_eq!(
            builder.bind(),
            Value::Record(Record::of([Item::slot("a", 1)]))
        );
    }

    #[test]
    fn test_body_and_tag() {
        let record = Record::of([Item::attr("event", Value::Extant), Item::from("hi")]);
        assert_eq!(record.tag(), Some("event"));
        assert_eq!(record.body(), Value::from("hi"));
    }
}
