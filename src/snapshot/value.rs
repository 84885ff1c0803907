//! Snapshot container and the closed set of value shapes it can hold.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::codec;

/// Open interface for structured values stored by reference.
pub trait Record: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a [`Record`].
///
/// Equality is reference identity: a record read back from a snapshot is the
/// same allocation that was put in.
#[derive(Clone)]
pub struct RecordRef(Arc<dyn Record>);

impl RecordRef {
    pub fn new<R: Record>(record: R) -> Self {
        Self(Arc::new(record))
    }

    pub fn from_arc(record: Arc<dyn Record>) -> Self {
        Self(record)
    }

    /// Borrow the record as its concrete type.
    pub fn downcast_ref<R: Record>(&self) -> Option<&R> {
        self.0.as_any().downcast_ref::<R>()
    }

    /// Whether both handles point at the same record.
    pub fn ptr_eq(&self, other: &RecordRef) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Declares the value shapes in precedence order: the first listed type
/// that matches a declared type decides its category.
macro_rules! value_categories {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        /// A value held in a [`Snapshot`], tagged by shape.
        #[derive(Clone, Debug, PartialEq)]
        pub enum SnapshotValue {
            $($variant($ty),)+
        }

        /// Shape tag of a [`SnapshotValue`].
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum ValueCategory {
            $($variant,)+
        }

        impl ValueCategory {
            /// Every category, in precedence order.
            pub const ALL: &'static [ValueCategory] = &[$(ValueCategory::$variant,)+];

            /// Category used to persist values declared as `T`, if any.
            pub fn of<T: Any>() -> Option<Self> {
                let id = TypeId::of::<T>();
                $(
                    if id == TypeId::of::<$ty>() {
                        return Some(ValueCategory::$variant);
                    }
                )+
                None
            }
        }

        impl SnapshotValue {
            pub fn category(&self) -> ValueCategory {
                match self {
                    $(SnapshotValue::$variant(_) => ValueCategory::$variant,)+
                }
            }

            /// Wrap `value` as `category`. `None` if `T` is not that category's type.
            pub(crate) fn encode<T: Any>(category: ValueCategory, value: &T) -> Option<Self> {
                let value = value as &dyn Any;
                match category {
                    $(
                        ValueCategory::$variant => {
                            value.downcast_ref::<$ty>().cloned().map(SnapshotValue::$variant)
                        }
                    )+
                }
            }

            /// Unwrap into `T`. `None` if `T` is not this variant's type.
            pub(crate) fn decode<T: Any>(&self) -> Option<T> {
                match self {
                    $(
                        SnapshotValue::$variant(value) => {
                            let boxed: Box<dyn Any> = Box::new(value.clone());
                            boxed.downcast::<T>().ok().map(|value| *value)
                        }
                    )+
                }
            }
        }
    };
}

value_categories! {
    Snapshot => Snapshot,
    Record => RecordRef,
    String => String,
    CharSequence => Arc<str>,
    Byte => i8,
    Short => i16,
    Char => char,
    Int => i32,
    Long => i64,
    Float => f32,
    Double => f64,
    Boolean => bool,
    RecordArray => Box<[RecordRef]>,
    StringArray => Box<[String]>,
    CharSequenceArray => Box<[Arc<str>]>,
    ByteArray => Box<[i8]>,
    ShortArray => Box<[i16]>,
    CharArray => Box<[char]>,
    IntArray => Box<[i32]>,
    LongArray => Box<[i64]>,
    FloatArray => Box<[f32]>,
    DoubleArray => Box<[f64]>,
    BooleanArray => Box<[bool]>,
    RecordList => Vec<RecordRef>,
    IntList => Vec<i32>,
}

/// Key/value container persisted across a save/restore boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Store a tagged value, returning whatever was under `key` before.
    pub fn put(&mut self, key: impl Into<String>, value: SnapshotValue) -> Option<SnapshotValue> {
        self.entries.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&SnapshotValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<SnapshotValue> {
        self.entries.remove(key)
    }

    /// Store a value of declared type `T`, choosing its category at runtime.
    pub fn put_typed<T: Any>(&mut self, key: &str, value: &T) -> Result<()> {
        codec::put(self, key, value)
    }

    /// Read a value of declared type `T`.
    pub fn get_typed<T: Any>(&self, key: &str) -> Result<Option<T>> {
        codec::get(self, key)
    }

    pub fn put_snapshot(&mut self, key: impl Into<String>, snapshot: Snapshot) {
        self.entries
            .insert(key.into(), SnapshotValue::Snapshot(snapshot));
    }

    pub fn get_snapshot(&self, key: &str) -> Option<&Snapshot> {
        match self.entries.get(key) {
            Some(SnapshotValue::Snapshot(snapshot)) => Some(snapshot),
            _ => None,
        }
    }

    /// Remove and return the nested snapshot under `key`.
    ///
    /// Values of other shapes are left in place.
    pub fn take_snapshot(&mut self, key: &str) -> Option<Snapshot> {
        if !matches!(self.entries.get(key), Some(SnapshotValue::Snapshot(_))) {
            return None;
        }
        match self.entries.remove(key) {
            Some(SnapshotValue::Snapshot(snapshot)) => Some(snapshot),
            _ => None,
        }
    }

    /// Move every entry of `other` into this snapshot, replacing on conflict.
    pub fn extend(&mut self, other: Snapshot) {
        self.entries.extend(other.entries);
    }
}
