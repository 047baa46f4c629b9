use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Read-only handle on a snapshot file
pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open snapshot {}", db_path.display()))?;

        Ok(Database { conn })
    }
}

/// Tables the query service reads. Used to build local snapshots and fixtures.
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tokens (
            address TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            symbol TEXT,
            pairAddress TEXT,
            reserve0 REAL,
            reserve1 REAL,
            current_price REAL,
            creator_address TEXT
        );

        CREATE TABLE IF NOT EXISTS token_balances (
            token_address TEXT NOT NULL,
            owner_address TEXT NOT NULL,
            balance REAL,
            PRIMARY KEY (token_address, owner_address)
        );

        CREATE TABLE IF NOT EXISTS pairs (
            pairAddress TEXT PRIMARY KEY,
            token0Address TEXT NOT NULL,
            token1Address TEXT NOT NULL,
            reserveToken0 REAL,
            reserveToken1 REAL,
            token0 TEXT,
            token1 TEXT
        );

        CREATE TABLE IF NOT EXISTS liquidity_providers (
            pair_address TEXT NOT NULL,
            owner_address TEXT NOT NULL,
            liquidity_tokens REAL,
            token0_added REAL,
            token1_added REAL
        );

        CREATE INDEX IF NOT EXISTS idx_tokens_name ON tokens(name);
        CREATE INDEX IF NOT EXISTS idx_pairs_token0 ON pairs(token0Address);
        CREATE INDEX IF NOT EXISTS idx_pairs_token1 ON pairs(token1Address);
        CREATE INDEX IF NOT EXISTS idx_lp_pair ON liquidity_providers(pair_address);",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_is_read_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.db");
        {
            let conn = Connection::open(&path).unwrap();
            create_schema(&conn).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let write = db.conn.execute(
            "INSERT INTO tokens (address, name) VALUES ('0x1', 'One')",
            [],
        );
        assert!(write.is_err());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(Database::open(dir.path().join("absent.db")).is_err());
    }
}
