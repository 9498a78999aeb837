//! Bulk loading of records from JSON sources.
//!
//! A source is a JSON array of records. Each element is handed, in order, to
//! an insertion entry point; by default that is [`Store::try_set`], so the
//! store's [`IdPolicy`](crate::IdPolicy) applies and listeners fire once per
//! record.

use crate::error::Result;
use crate::store::Store;
use crate::types::Record;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

/// Load every record in a JSON file into `store`.
///
/// Returns the number of records inserted.
pub fn load_json_file<T>(path: impl AsRef<Path>, store: &Store<T>) -> Result<usize>
where
    T: Record + DeserializeOwned + 'static,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let count = load_json_reader(BufReader::new(file), store)?;
    info!(path = %path.display(), count, store = %store.config().name, "loaded records");
    Ok(count)
}

/// Load every record in a JSON array read from `reader` into `store`.
pub fn load_json_reader<T, R>(reader: R, store: &Store<T>) -> Result<usize>
where
    T: Record + DeserializeOwned + 'static,
    R: Read,
{
    load_json_reader_with(reader, |record: T| store.try_set(record).map(|_| ()))
}

/// Parse a JSON array from `reader` and call `insert` once per element.
///
/// The whole array is parsed before anything is inserted, so a malformed
/// source inserts nothing. An error from `insert` stops the load; records
/// before it stay inserted.
pub fn load_json_reader_with<T, R, F>(reader: R, mut insert: F) -> Result<usize>
where
    T: DeserializeOwned,
    R: Read,
    F: FnMut(T) -> Result<()>,
{
    let records: Vec<T> = serde_json::from_reader(reader)?;
    let count = records.len();

    for record in records {
        insert(record)?;
    }

    Ok(count)
}
