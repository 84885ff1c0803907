//! Typed get/put against a [`Snapshot`].
//!
//! The category is chosen from the declared type alone, so `put::<T>` and
//! `get::<T>` always agree. Types outside the closed set are rejected.
//!
//! Reads hand back clones. Shared categories (`RecordRef`, `Arc<str>` and the
//! record arrays and lists) therefore keep reference identity. Everything
//! else, nested snapshots included, is a plain value and compares by content.

use crate::error::{LifecycleError, Result};
use std::any::Any;

use super::value::{Snapshot, SnapshotValue, ValueCategory};

/// Category for the declared type `T`, or `UnsupportedValueType`.
pub fn category_of<T: Any>() -> Result<ValueCategory> {
    ValueCategory::of::<T>().ok_or_else(LifecycleError::unsupported::<T>)
}

/// Store `value` under `key`.
pub fn put<T: Any>(snapshot: &mut Snapshot, key: &str, value: &T) -> Result<()> {
    let category = category_of::<T>()?;
    let encoded =
        SnapshotValue::encode(category, value).ok_or_else(LifecycleError::unsupported::<T>)?;

    tracing::trace!(key, category = ?category, "snapshot.put");
    snapshot.put(key, encoded);
    Ok(())
}

/// Read the value under `key` as `T`.
///
/// An absent key reads as `None`. So does a value stored under a different
/// category, which is logged.
pub fn get<T: Any>(snapshot: &Snapshot, key: &str) -> Result<Option<T>> {
    let category = category_of::<T>()?;

    let Some(stored) = snapshot.get(key) else {
        return Ok(None);
    };

    if stored.category() != category {
        tracing::warn!(
            key,
            expected = ?category,
            found = ?stored.category(),
            "snapshot.get.type_mismatch"
        );
        return Ok(None);
    }

    Ok(stored.decode::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Record, RecordRef};
    use std::collections::HashMap;
    use std::fmt::Debug;
    use std::sync::Arc;

    const KEY: &str = "value";

    #[derive(Debug)]
    struct Profile {
        name: String,
    }

    impl Record for Profile {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn round_trip<T: Any + Clone + Debug + PartialEq>(value: T) {
        let mut snapshot = Snapshot::new();
        put(&mut snapshot, KEY, &value).unwrap();
        assert_eq!(get::<T>(&snapshot, KEY).unwrap(), Some(value));
    }

    #[test]
    fn test_scalars_and_strings() {
        round_trip("Test".to_string());
        round_trip::<Arc<str>>(Arc::from("seq"));
        round_trip(-3i8);
        round_trip(300i16);
        round_trip('λ');
        round_trip(42i32);
        round_trip(1i64 << 40);
        round_trip(1.5f32);
        round_trip(2.25f64);
        round_trip(true);
    }

    #[test]
    fn test_arrays_and_lists() {
        round_trip::<Box<[String]>>(vec!["a".to_string(), "b".to_string()].into());
        round_trip::<Box<[Arc<str>]>>(vec![Arc::from("x")].into());
        round_trip::<Box<[i8]>>(vec![1, -1].into());
        round_trip::<Box<[i16]>>(vec![2].into());
        round_trip::<Box<[char]>>(vec!['a', 'b'].into());
        round_trip::<Box<[i32]>>(vec![1, 2, 3].into());
        round_trip::<Box<[i64]>>(vec![4].into());
        round_trip::<Box<[f32]>>(vec![0.5].into());
        round_trip::<Box<[f64]>>(vec![0.25].into());
        round_trip::<Box<[bool]>>(vec![true, false].into());
        round_trip(vec![7i32, 8, 9]);
    }

    #[test]
    fn test_nested_snapshot() {
        let mut inner = Snapshot::new();
        put(&mut inner, "count", &5i32).unwrap();
        round_trip(inner);
    }

    #[test]
    fn test_records_keep_identity() {
        let record = RecordRef::new(Profile {
            name: "ada".to_string(),
        });

        let mut snapshot = Snapshot::new();
        put(&mut snapshot, KEY, &record).unwrap();
        put(&mut snapshot, "list", &vec![record.clone()]).unwrap();
        let array: Box<[RecordRef]> = vec![record.clone()].into();
        put(&mut snapshot, "array", &array).unwrap();

        let restored = get::<RecordRef>(&snapshot, KEY).unwrap().unwrap();
        assert!(restored.ptr_eq(&record));
        assert_eq!(
            restored.downcast_ref::<Profile>().map(|p| p.name.as_str()),
            Some("ada")
        );

        let list = get::<Vec<RecordRef>>(&snapshot, "list").unwrap().unwrap();
        assert!(list[0].ptr_eq(&record));
        let array = get::<Box<[RecordRef]>>(&snapshot, "array").unwrap().unwrap();
        assert!(array[0].ptr_eq(&record));
    }

    #[test]
    fn test_unsupported_type_rejected_both_ways() {
        let mut snapshot = Snapshot::new();

        let err = put(&mut snapshot, KEY, &7u64).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::UnsupportedValueType { type_name } if type_name == "u64"
        ));
        assert!(snapshot.is_empty());

        let err = get::<HashMap<String, i32>>(&snapshot, KEY).unwrap_err();
        assert!(matches!(err, LifecycleError::UnsupportedValueType { .. }));
    }

    #[test]
    fn test_absent_and_mismatched_read_as_none() {
        let mut snapshot = Snapshot::new();
        assert_eq!(get::<i32>(&snapshot, KEY).unwrap(), None);

        put(&mut snapshot, KEY, &"text".to_string()).unwrap();
        assert_eq!(get::<i32>(&snapshot, KEY).unwrap(), None);
        assert_eq!(get::<Arc<str>>(&snapshot, KEY).unwrap(), None);
    }

    #[test]
    fn test_typed_accessors_on_snapshot() {
        let mut snapshot = Snapshot::new();
        snapshot.put_typed("flag", &true).unwrap();
        assert_eq!(snapshot.get_typed::<bool>("flag").unwrap(), Some(true));
        assert!(snapshot.put_typed("bad", &0usize).is_err());
    }
}
