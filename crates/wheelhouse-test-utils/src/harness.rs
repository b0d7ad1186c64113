// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database harness for integration tests.

use tempfile::TempDir;

use wheelhouse_storage::Database;

/// A migrated on-disk database in a temporary directory.
///
/// Returned together with the `TempDir` guard; dropping the guard deletes
/// the database file.
pub async fn test_database() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("wheelhouse-test.db");
    let db = Database::open(path.to_str().expect("utf-8 path"))
        .await
        .expect("open test database");
    (db, dir)
}

/// A migrated private in-memory database for tests that don't need a file.
pub async fn in_memory_database() -> Database {
    Database::open_in_memory()
        .await
        .expect("open in-memory database")
}
