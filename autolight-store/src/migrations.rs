use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// 按版本顺序排列，每条迁移最多执行一次。
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_catalog_entries",
        sql: include_str!("sql/001_create_catalog.sql"),
    },
    Migration {
        version: 2,
        description: "create_drawings",
        sql: include_str!("sql/002_create_drawings.sql"),
    },
    Migration {
        version: 3,
        description: "create_rooms_and_fixtures",
        sql: include_str!("sql/003_create_rooms_fixtures.sql"),
    },
    Migration {
        version: 4,
        description: "create_reports",
        sql: include_str!("sql/004_create_reports.sql"),
    },
];

pub(crate) fn run_all(conn: &Connection) -> Result<(), StoreError> {
    apply(conn, MIGRATIONS)
}

/// 每条迁移与它的 `_migrations` 记录在同一事务内提交，失败时整体回滚。
fn apply(conn: &Connection, migrations: &[Migration]) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )?;

    for migration in migrations {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            description = migration.description,
            "执行数据库迁移"
        );
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|err| StoreError::Migration {
                version: migration.version,
                reason: err.to_string(),
            })?;
        tx.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
        tx.commit()?;
    }

    Ok(())
}
