#![allow(clippy::missing_errors_doc)]

//! SQLite binding for the record gateway.
//!
//! [`Database::perform`] is the single execute-and-materialize path shared by
//! every record kind; the helpers in [`ops`] and the identifier resolver in
//! [`idmap`] are built on top of it.

use std::sync::{Mutex, MutexGuard};

use record_gateway_core::{Action, Entities, Statement, StatementError, Table};
use rusqlite::Connection;
use tracing::{debug, warn};

mod config;
mod exec;
pub mod idmap;
pub mod ops;
mod scan;
mod schema;

pub use config::{
    DbConfig, DEFAULT_BUSY_TIMEOUT, DEFAULT_IDMAP_CACHE_WINDOW, DEFAULT_STATEMENT_TIMEOUT,
};
pub use idmap::{CacheSnapshot, IdMapCache, IdMapSource, IdResolver};
pub use scan::Materialize;
pub use schema::{create_reference_schema, REFERENCE_SCHEMA};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Statement(#[from] StatementError),
    #[error("database connection lock poisoned")]
    Poisoned,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Shared handle over one SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
    config: DbConfig,
    idmap_cache: IdMapCache,
}

impl Database {
    pub fn open(config: DbConfig) -> Result<Self, DbError> {
        config.validate()?;
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(config.busy_timeout)?;
        let idmap_cache = IdMapCache::new(config.idmap_cache_window)?;
        debug!(path = %config.path.display(), "opened database");

        Ok(Self {
            conn: Mutex::new(conn),
            config,
            idmap_cache,
        })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::open(DbConfig::in_memory())
    }

    #[must_use]
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    #[must_use]
    pub fn idmap_cache(&self) -> &IdMapCache {
        &self.idmap_cache
    }

    #[must_use]
    pub fn resolver(&self) -> IdResolver<'_, Self> {
        IdResolver::new(self, &self.idmap_cache)
    }

    /// Creates the gateway tables if they are missing.
    pub fn init_schema(&self) -> Result<(), DbError> {
        self.with_connection(create_reference_schema)
    }

    /// Runs `f` with exclusive use of the connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, DbError> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    /// Executes the statement for `entities` and records the outcome in it.
    ///
    /// Reads append one record per row. Writes set `last_insert_id` (inserts
    /// only). Driver errors are returned unchanged; no rows is not an error.
    pub fn perform<R: Materialize>(&self, entities: &mut Entities<R>) -> Result<(), DbError> {
        let statement = entities.statement()?;
        debug!(
            table = %R::TABLE,
            action = %entities.action,
            sql = %statement.sql,
            args = statement.args.len(),
            "performing statement"
        );

        if entities.action.is_read() {
            self.materialize(entities, &statement)
        } else {
            entities.last_insert_id = self.write(R::TABLE, entities.action, &statement)?;
            // The connection lock is released by now; the cache lock is taken
            // before it on refresh.
            if R::TABLE == Table::IdMaps {
                self.idmap_cache.invalidate();
            }
            Ok(())
        }
    }

    fn materialize<R: Materialize>(
        &self,
        entities: &mut Entities<R>,
        statement: &Statement,
    ) -> Result<(), DbError> {
        let conn = self.lock()?;
        let _deadline = exec::Deadline::arm(&conn, self.config.statement_timeout);
        let mut prepared = conn
            .prepare(&statement.sql)
            .inspect_err(|err| warn!(table = %R::TABLE, error = %err, "prepare failed"))?;
        let mut rows = exec::query(&mut prepared, &statement.args)?;

        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let record = R::scan(row)
                        .inspect_err(|err| warn!(table = %R::TABLE, error = %err, "row scan failed"))?;
                    entities.push(record);
                }
                Ok(None) | Err(rusqlite::Error::QueryReturnedNoRows) => break,
                Err(err) => {
                    warn!(table = %R::TABLE, error = %err, "row fetch failed");
                    return Err(err.into());
                }
            }
        }

        debug!(table = %R::TABLE, count = entities.count, "materialized rows");
        Ok(())
    }

    fn write(&self, table: Table, action: Action, statement: &Statement) -> Result<i64, DbError> {
        let conn = self.lock()?;
        let _deadline = exec::Deadline::arm(&conn, self.config.statement_timeout);
        let mut prepared = conn
            .prepare(&statement.sql)
            .inspect_err(|err| warn!(table = %table, error = %err, "prepare failed"))?;

        let last_insert_id = exec::execute(&conn, &mut prepared, action, &statement.args)
            .inspect_err(|err| warn!(table = %table, action = %action, error = %err, "execute failed"))?;
        Ok(last_insert_id)
    }

    /// Builds a seeded collection, performs it and returns it.
    pub fn perform_with<R: Materialize>(
        &self,
        action: Action,
        seed: R,
    ) -> Result<Entities<R>, DbError> {
        let mut entities = Entities::with_seed(action, seed);
        self.perform(&mut entities)?;
        Ok(entities)
    }

    /// Closes the underlying connection.
    pub fn close(self) -> Result<(), DbError> {
        let conn = self.conn.into_inner().map_err(|_| DbError::Poisoned)?;
        conn.close().map_err(|(_, err)| DbError::Sqlite(err))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }
}
