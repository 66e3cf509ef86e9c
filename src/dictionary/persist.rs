//! Reading and publishing dictionaries through a [`Storage`].
//!
//! Writes go to a temporary file that is renamed into place only after every
//! line was written and the output closed, so a failed write never leaves a
//! truncated block or dictionary under its final name.

use std::io::{BufReader, Write};

use crate::dictionary::Dictionary;
use crate::dictionary::format::{DictionaryReader, read_dictionary, write_dictionary};
use crate::error::Result;
use crate::storage::{Storage, StorageInput, StorageOutput};

/// Streaming reader over a stored dictionary file.
pub type StoredDictionaryReader = DictionaryReader<BufReader<Box<dyn StorageInput>>>;

/// Open `name` for streaming entry by entry.
pub fn open_reader(storage: &dyn Storage, name: &str) -> Result<StoredDictionaryReader> {
    let input = storage.open_input(name)?;
    Ok(DictionaryReader::new(BufReader::new(input), name))
}

/// Load the whole dictionary stored as `name`.
pub fn load(storage: &dyn Storage, name: &str) -> Result<Dictionary> {
    let input = storage.open_input(name)?;
    read_dictionary(BufReader::new(input), name)
}

/// Run `write` against a temporary output and publish it as `name`.
///
/// Returns whatever `write` returned together with the number of bytes
/// published. On any failure the temporary file is removed and `name` is left
/// untouched.
pub fn publish<T, F>(storage: &dyn Storage, name: &str, write: F) -> Result<(T, u64)>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    let (temp_name, mut output) = storage.create_temp_output(name)?;

    let result = write_and_close(&mut output, write)
        .and_then(|written| storage.rename_file(&temp_name, name).map(|_| written));

    if result.is_err() {
        drop(output);
        let _ = storage.delete_file(&temp_name);
    }
    result
}

fn write_and_close<T, F>(output: &mut Box<dyn StorageOutput>, write: F) -> Result<(T, u64)>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    let value = write(&mut *output)?;
    output.close()?;
    Ok((value, output.position()?))
}

/// Publish `dictionary` as `name`. Returns `(lines, bytes)`.
pub fn store(storage: &dyn Storage, name: &str, dictionary: &Dictionary) -> Result<(usize, u64)> {
    publish(storage, name, |out| write_dictionary(dictionary, out))
}
