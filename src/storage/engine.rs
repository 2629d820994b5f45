use crate::error::DbResult;
use crate::sql::ast::OrderSpec;

/// The key/field store a statement executes against.
///
/// Each key owns a map of named string fields. Enumeration is cursor based:
/// `scan(0)` starts a pass and a returned cursor of `0` ends it. No snapshot
/// isolation is implied between pages.
///
/// Every method takes `&self`; implementations provide their own interior
/// mutability.
pub trait KeyValueStore {
    /// Get one field of a record
    fn get_field(&self, key: &str, field: &str) -> DbResult<Option<String>>;

    /// Get every field of a record, in store order
    fn get_all(&self, key: &str) -> DbResult<Vec<(String, String)>>;

    /// Set one field of a record, creating the record if needed
    fn set_field(&self, key: &str, field: &str, value: &str) -> DbResult<()>;

    /// Delete a record. Returns whether it existed.
    fn delete_key(&self, key: &str) -> DbResult<bool>;

    /// Check whether a record exists
    fn exists(&self, key: &str) -> DbResult<bool>;

    /// Return the next page of keys and the cursor to continue from
    fn scan(&self, cursor: u64) -> DbResult<(u64, Vec<String>)>;

    /// Add a key to a named set
    fn add_to_set(&self, set: &str, key: &str) -> DbResult<()>;

    /// Remove a named set
    fn delete_set(&self, set: &str) -> DbResult<()>;

    /// Sort the members of a set by record fields, alphabetically
    fn sort_set(&self, set: &str, specs: &[OrderSpec]) -> DbResult<Vec<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get_field(&self, key: &str, field: &str) -> DbResult<Option<String>> {
        (**self).get_field(key, field)
    }

    fn get_all(&self, key: &str) -> DbResult<Vec<(String, String)>> {
        (**self).get_all(key)
    }

    fn set_field(&self, key: &str, field: &str, value: &str) -> DbResult<()> {
        (**self).set_field(key, field, value)
    }

    fn delete_key(&self, key: &str) -> DbResult<bool> {
        (**self).delete_key(key)
    }

    fn exists(&self, key: &str) -> DbResult<bool> {
        (**self).exists(key)
    }

    fn scan(&self, cursor: u64) -> DbResult<(u64, Vec<String>)> {
        (**self).scan(cursor)
    }

    fn add_to_set(&self, set: &str, key: &str) -> DbResult<()> {
        (**self).add_to_set(set, key)
    }

    fn delete_set(&self, set: &str) -> DbResult<()> {
        (**self).delete_set(set)
    }

    fn sort_set(&self, set: &str, specs: &[OrderSpec]) -> DbResult<Vec<String>> {
        (**self).sort_set(set, specs)
    }
}
