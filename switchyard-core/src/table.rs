//! machinery shared by the interrelated table databases (roadway network,
//! transit feed): row validation, primary/foreign key checks, and content
//! hashing.
//!
//! a database owning tables of [`TableRecord`] rows publishes a replacement
//! table in three steps: validate rows against the schema (optionally rescuing
//! the input through a converter and revalidating), check foreign keys in both
//! directions, then recompute the content hash. two databases are equal when
//! their content hashes are equal.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(thiserror::Error, Debug, Clone)]
pub enum TableError {
    #[error("table '{table}' failed validation: {message}")]
    TableValidation { table: String, message: String },
    #[error("{count} value(s) referenced in {table}.{field} missing from {ref_table}.{ref_field}: {missing:?}")]
    ForeignKeyValue {
        table: String,
        field: String,
        ref_table: String,
        ref_field: String,
        count: usize,
        missing: Vec<String>,
    },
    #[error("table '{table}' has {count} duplicate value(s) for key '{key}'")]
    DuplicateKey {
        table: String,
        key: String,
        count: usize,
    },
    #[error("missing required table: {0}")]
    RequiredTable(String),
}

/// a row of a primary-keyed table.
pub trait TableRecord {
    const TABLE_NAME: &'static str;
    type Key: Eq + Hash + Clone + Debug;

    fn primary_key(&self) -> Self::Key;

    /// row-level schema check. the default accepts everything.
    fn validate(&self) -> Result<(), TableError> {
        Ok(())
    }
}

/// validate each row and the uniqueness of the primary key column(s).
pub fn validate_rows<T: TableRecord>(rows: &[T]) -> Result<(), TableError> {
    for row in rows {
        row.validate()?;
    }
    check_unique_pks(rows)
}

/// check primary key uniqueness over a table.
pub fn check_unique_pks<T: TableRecord>(rows: &[T]) -> Result<(), TableError> {
    let mut seen: HashSet<T::Key> = HashSet::with_capacity(rows.len());
    let mut duplicates = 0;
    for row in rows {
        if !seen.insert(row.primary_key()) {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        return Err(TableError::DuplicateKey {
            table: T::TABLE_NAME.to_string(),
            key: "primary key".to_string(),
            count: duplicates,
        });
    }
    Ok(())
}

/// check that every foreign key value appears in the referenced primary key
/// set. the caller is responsible for skipping (with a warning) when the
/// referenced table has not been supplied.
pub fn check_fk_values<K: Eq + Hash + Clone + Debug>(
    table: &str,
    field: &str,
    ref_table: &str,
    ref_field: &str,
    values: impl IntoIterator<Item = K>,
    referenced: &HashSet<K>,
) -> Result<(), TableError> {
    let missing: Vec<K> = values
        .into_iter()
        .filter(|v| !referenced.contains(v))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    let mut display: Vec<String> = missing
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    display.sort();
    display.truncate(10);
    Err(TableError::ForeignKeyValue {
        table: table.to_string(),
        field: field.to_string(),
        ref_table: ref_table.to_string(),
        ref_field: ref_field.to_string(),
        count: missing.len(),
        missing: display,
    })
}

/// content hash of a table: sha256 over the serialized rows, in row order.
pub fn table_hash<T: Serialize>(rows: &[T]) -> String {
    let mut hasher = Sha256::new();
    for row in rows {
        // serialization of a record cannot fail for the plain-data types used
        // in these tables
        let bytes = serde_json::to_vec(row).unwrap_or_default();
        hasher.update(&bytes);
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// content hash of a database: sha256 over the joined per-table hashes, in
/// the database's fixed table order.
pub fn db_hash<'a>(table_hashes: impl IntoIterator<Item = &'a str>) -> String {
    let joined = table_hashes.into_iter().collect::<Vec<_>>().join("-");
    hex::encode(Sha256::digest(joined.as_bytes()))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        id: i64,
        name: String,
    }

    impl TableRecord for Row {
        const TABLE_NAME: &'static str = "rows";
        type Key = i64;

        fn primary_key(&self) -> i64 {
            self.id
        }
    }

    fn row(id: i64, name: &str) -> Row {
        Row {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_duplicate_pks_rejected() {
        let rows = vec![row(1, "a"), row(2, "b"), row(1, "c")];
        assert!(matches!(
            check_unique_pks(&rows),
            Err(TableError::DuplicateKey { count: 1, .. })
        ));
        assert!(check_unique_pks(&rows[..2]).is_ok());
    }

    #[test]
    fn test_fk_check_reports_missing_values() {
        let referenced: HashSet<i64> = [1, 2, 3].into_iter().collect();
        assert!(check_fk_values("trips", "route_id", "routes", "route_id", vec![1, 2], &referenced)
            .is_ok());
        let err =
            check_fk_values("trips", "route_id", "routes", "route_id", vec![1, 9], &referenced)
                .unwrap_err();
        assert!(matches!(err, TableError::ForeignKeyValue { count: 1, .. }));
    }

    #[test]
    fn test_table_hash_is_order_sensitive() {
        let a = vec![row(1, "a"), row(2, "b")];
        let b = vec![row(2, "b"), row(1, "a")];
        assert_ne!(table_hash(&a), table_hash(&b));
        assert_eq!(table_hash(&a), table_hash(&[row(1, "a"), row(2, "b")]));
    }

    #[test]
    fn test_db_hash_composes_table_hashes() {
        let links = table_hash(&[row(1, "a")]);
        let nodes = table_hash(&[row(2, "b")]);
        let h1 = db_hash([links.as_str(), nodes.as_str()]);
        let h2 = db_hash([nodes.as_str(), links.as_str()]);
        assert_ne!(h1, h2);
    }
}
