use {
    std::{collections::HashMap, sync::{Arc, Mutex}, path::Path},
    thiserror::Error,
    rusqlite::{Connection, OptionalExtension},
    futures::{future::{self, BoxFuture}, FutureExt},
    visits_core::CounterRecord,
};

/// Backing store holding counter records.
///
/// `create` must leave an existing record untouched, `increment` must be atomic on the store side.
/// Nothing here links a `get` to a later `increment`.
pub trait CounterStore {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<CounterRecord>, StorageError>>;
    fn create<'a>(&'a self, record: &'a CounterRecord) -> BoxFuture<'a, Result<(), StorageError>>;
    fn increment<'a>(&'a self, name: &'a str, by: u64) -> BoxFuture<'a, Result<(), StorageError>>;
}

#[derive(Error, Debug)]
pub enum StorageError {
    /// Storage operation failed because of internal error in storage implementation.
    /// If this happens, something is very broken (similar to 503 response in http).
    #[error("internal storage error: {description}")]
    InternalError {
        description: String,
    },

    /// Store could not be reached or rejected the request because of throttling.
    #[error("storage unavailable: {description}")]
    Unavailable {
        description: String,
    },

    /// Stored value is not a non-negative integer.
    #[error("malformed value stored for counter {name:?}: {description}")]
    MalformedValue {
        name: String,
        description: String,
    },

    /// Increment would take the counter past the largest value the store can hold.
    #[error("counter {name:?} cannot be incremented by {by}, store limit reached")]
    Overflow {
        name: String,
        by: u64,
    },

    #[error("counter {name:?} not found")]
    RecordNotFound {
        name: String,
    },
}

pub struct BoxedStore {
    inner: Box<dyn CounterStore + Send + Sync>,
}

impl BoxedStore {
    pub fn new<T: CounterStore + Send + Sync + 'static>(inner: T) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl CounterStore for BoxedStore {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<CounterRecord>, StorageError>> { self.inner.get(name) }
    fn create<'a>(&'a self, record: &'a CounterRecord) -> BoxFuture<'a, Result<(), StorageError>> { self.inner.create(record) }
    fn increment<'a>(&'a self, name: &'a str, by: u64) -> BoxFuture<'a, Result<(), StorageError>> { self.inner.increment(name, by) }
}

impl<T: CounterStore> CounterStore for Arc<T> {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<CounterRecord>, StorageError>> { self.as_ref().get(name) }
    fn create<'a>(&'a self, record: &'a CounterRecord) -> BoxFuture<'a, Result<(), StorageError>> { self.as_ref().create(record) }
    fn increment<'a>(&'a self, name: &'a str, by: u64) -> BoxFuture<'a, Result<(), StorageError>> { self.as_ref().increment(name, by) }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, u64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: CounterRecord) -> Result<Self, StorageError> {
        self.lock()?.insert(record.name, record.visits);
        Ok(self)
    }

    /// Current stored value, bypassing the async interface.
    pub fn visits(&self, name: &str) -> Result<Option<u64>, StorageError> {
        Ok(self.lock()?.get(name).copied())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, u64>>, StorageError> {
        self.records.lock()
            .map_err(|err| StorageError::InternalError { description: format!("failed to lock memory store: {err:?}") })
    }
}

impl CounterStore for MemoryStore {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<CounterRecord>, StorageError>> {
        let result = self.lock()
            .map(|records| records.get(name).map(|visits| CounterRecord::new(name).with_visits(*visits)));
        future::ready(result).boxed()
    }

    fn create<'a>(&'a self, record: &'a CounterRecord) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = self.lock()
            .map(|mut records| { records.entry(record.name.clone()).or_insert(record.visits); });
        future::ready(result).boxed()
    }

    fn increment<'a>(&'a self, name: &'a str, by: u64) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = self.lock().and_then(|mut records| {
            let visits = records.get_mut(name)
                .ok_or_else(|| StorageError::RecordNotFound { name: name.to_owned() })?;
            *visits = visits.checked_add(by)
                .ok_or_else(|| StorageError::Overflow { name: name.to_owned(), by })?;
            Ok(())
        });
        future::ready(result).boxed()
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::from_connection(
            Connection::open(path)
                .map_err(|err| StorageError::InternalError { description: format!("failed to open sqlite database: {err:?}") })?
        )
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::from_connection(
            Connection::open_in_memory()
                .map_err(|err| StorageError::InternalError { description: format!("failed to open in memory sqlite: {err:?}") })?
        )
    }

    fn from_connection(connection: Connection) -> Result<Self, StorageError> {
        connection.execute("create table if not exists counters (name text primary key, visits integer not null)", ())
            .map_err(|err| StorageError::InternalError { description: format!("failed to create counters table: {err:?}") })?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.connection.lock()
            .map_err(|err| StorageError::InternalError { description: format!("failed to acquire sqlite connection: {err:?}") })
    }

    fn get_sync(&self, name: &str) -> Result<Option<CounterRecord>, StorageError> {
        let connection = self.lock()?;
        let visits = connection
            .query_row("select visits from counters where name = ?1", [name], |row| row.get::<_, i64>(0))
            .optional()
            .map_err(|err| match err {
                rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..) => StorageError::MalformedValue {
                    name: name.to_owned(),
                    description: format!("visits is not an integer: {err:?}"),
                },
                other => StorageError::InternalError { description: format!("failed to read counter from sqlite: {other:?}") },
            })?;

        match visits {
            Some(visits) => {
                let visits = u64::try_from(visits)
                    .map_err(|_| StorageError::MalformedValue { name: name.to_owned(), description: format!("visits is negative: {visits}") })?;
                Ok(Some(CounterRecord::new(name).with_visits(visits)))
            },
            None => Ok(None),
        }
    }

    fn create_sync(&self, record: &CounterRecord) -> Result<(), StorageError> {
        let visits = i64::try_from(record.visits)
            .map_err(|_| StorageError::MalformedValue { name: record.name.clone(), description: "visits does not fit into sqlite integer".to_owned() })?;
        self.lock()?
            .execute("insert or ignore into counters (name, visits) values (?1, ?2)", (&record.name, visits))
            .map_err(|err| StorageError::InternalError { description: format!("failed to execute sqlite query: {err:?}") })
            .map(|_| ())
    }

    fn increment_sync(&self, name: &str, by: u64) -> Result<(), StorageError> {
        let by_sqlite = i64::try_from(by)
            .map_err(|_| StorageError::Overflow { name: name.to_owned(), by })?;
        let connection = self.lock()?;

        // sqlite turns an overflowing integer sum into a REAL, so the limit is checked in the update itself
        let updated = connection
            .execute(
                "update counters set visits = visits + ?2 where name = ?1 and visits <= ?3",
                (name, by_sqlite, i64::MAX - by_sqlite),
            )
            .map_err(|err| StorageError::InternalError { description: format!("failed to execute sqlite query: {err:?}") })?;
        if updated > 0 {
            return Ok(());
        }

        let exists = connection
            .query_row("select 1 from counters where name = ?1", [name], |_| Ok(()))
            .optional()
            .map_err(|err| StorageError::InternalError { description: format!("failed to read counter from sqlite: {err:?}") })?
            .is_some();
        Err(if exists {
            StorageError::Overflow { name: name.to_owned(), by }
        } else {
            StorageError::RecordNotFound { name: name.to_owned() }
        })
    }
}

impl CounterStore for SqliteStore {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<CounterRecord>, StorageError>> {
        future::ready(self.get_sync(name)).boxed()
    }

    fn create<'a>(&'a self, record: &'a CounterRecord) -> BoxFuture<'a, Result<(), StorageError>> {
        future::ready(self.create_sync(record)).boxed()
    }

    fn increment<'a>(&'a self, name: &'a str, by: u64) -> BoxFuture<'a, Result<(), StorageError>> {
        future::ready(self.increment_sync(name, by)).boxed()
    }
}
