//! JSON-file implementation of the table store.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::{Result, error::Error, ports::TableStore, q_learning::ValueTable};

/// Stores each table as `{dir}/{key}.json`.
///
/// # Examples
///
/// ```no_run
/// use qtoe::adapters::JsonFileStore;
/// use qtoe::ports::TableStore;
///
/// let store = JsonFileStore::new("tables");
/// let table = store.load("q_3_3")?.unwrap_or_default();
/// store.save("q_3_3", &table)?;
/// # Ok::<(), qtoe::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the table for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl TableStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<ValueTable>> {
        let path = self.path_for(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(source) if source.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Io {
                    operation: format!("open table file {path:?}"),
                    source,
                });
            }
        };

        let table = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            Error::SerializationContext {
                operation: format!("parse table file {path:?}"),
                message: e.to_string(),
            }
        })?;
        Ok(Some(table))
    }

    fn save(&self, key: &str, table: &ValueTable) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| Error::Io {
            operation: format!("create table directory {:?}", self.dir),
            source,
        })?;

        let path = self.path_for(key);
        let file = File::create(&path).map_err(|source| Error::Io {
            operation: format!("create table file {path:?}"),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, table).map_err(|e| Error::SerializationContext {
            operation: format!("write table file {path:?}"),
            message: e.to_string(),
        })?;
        writer.flush().map_err(|source| Error::Io {
            operation: format!("flush table file {path:?}"),
            source,
        })
    }
}
