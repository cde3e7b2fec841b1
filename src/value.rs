use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::tag::TypeTag;

/// A tree-shaped value.
///
/// Composite values are shared as `Rc<Value>`; after admission, canonical
/// identity is pointer identity (`Rc::ptr_eq`). Scalars are canonical as-is.
/// The model has no cycle support: a value owns its children outright.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar. Admission keys numbers by normalized bits: the two
    /// zeroes coalesce and all NaN payloads coalesce.
    Number(f64),
    /// String scalar, keyed by content.
    String(Rc<str>),
    /// Ordered sequence of shared children.
    Array(Vec<Rc<Value>>),
    /// Tagged key/value mapping.
    Object(ObjectValue),
    /// Opaque scalar (dates, handles, custom payloads): admitted unchanged,
    /// never coalesced, discriminated by reference identity.
    Opaque(Opaque),
}

impl Value {
    /// Builds a string value.
    pub fn string(text: impl Into<Rc<str>>) -> Self {
        Value::String(text.into())
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(Rc::from(text))
    }
}

/// Insertion-ordered key/value mapping carrying a [`TypeTag`].
///
/// Inserting an existing key replaces its value in place, so own keys are
/// unique. Insertion order is preserved but never affects admission
/// equivalence.
#[derive(Debug, Clone)]
pub struct ObjectValue {
    tag: TypeTag,
    entries: Vec<(Rc<str>, Rc<Value>)>,
}

impl ObjectValue {
    /// Creates an empty object carrying `tag`.
    pub fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            entries: Vec::new(),
        }
    }

    /// The object's type tag.
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// Inserts `key`, replacing its value if already present.
    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: Rc<Value>) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Rc<Value>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.as_ref() == key)
            .map(|(_, value)| value)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[(Rc<str>, Rc<Value>)] {
        &self.entries
    }

    /// Number of own keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the object has no own keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reference-identity wrapper around an arbitrary payload.
#[derive(Clone)]
pub struct Opaque(Rc<dyn Any>);

impl Opaque {
    /// Wraps a payload.
    pub fn new<T: Any>(payload: T) -> Self {
        Opaque(Rc::new(payload))
    }

    /// Borrows the payload if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Whether both wrappers share one payload allocation.
    pub fn same(&self, other: &Opaque) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({:p})", Rc::as_ptr(&self.0))
    }
}

/// Deep structural equality per the engine's equivalence relation.
///
/// Scalars compare by value (with the two zeroes collapsed and NaN equal to
/// NaN), arrays element-wise, objects by tag identity and key set independent
/// of insertion order, opaques by reference identity. `admit` maps values
/// equal under this relation to one shared representative.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.tag().same(y.tag())
                && x.len() == y.len()
                && x.entries()
                    .iter()
                    .all(|(key, value)| match y.get(key) {
                        Some(other) => deep_equal(value, other),
                        None => false,
                    })
        }
        (Value::Opaque(x), Value::Opaque(y)) => x.same(y),
        _ => false,
    }
}
