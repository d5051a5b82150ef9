use std::fs;
use std::io::{Read as _, Write as _};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

/// Write a value as pretty JSON under an exclusive file lock.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    fs2::FileExt::lock_exclusive(&file).map_err(CoreError::Io)?;
    (&file).write_all(json.as_bytes())?;
    (&file).flush()?;
    fs2::FileExt::unlock(&file).map_err(CoreError::Io)?;
    Ok(())
}

/// Read a JSON value under a shared file lock. Returns `None` if the file
/// does not exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CoreError> {
    let file = match fs::OpenOptions::new().read(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    fs2::FileExt::lock_shared(&file).map_err(CoreError::Io)?;
    let mut data = String::new();
    let read = (&file).read_to_string(&mut data);
    fs2::FileExt::unlock(&file).map_err(CoreError::Io)?;
    read?;
    Ok(Some(serde_json::from_str(&data)?))
}
