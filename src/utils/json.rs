use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::JsonError;

pub fn load_json<T, P>(path: P) -> Result<T, JsonError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn save_json<T, P>(data: &T, path: P) -> Result<(), JsonError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let serialized = serde_json::to_string_pretty(data)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(serialized.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{load_json, save_json};
    use crate::error::JsonError;

    #[test]
    fn round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("canonform-json-{}.json", std::process::id()));
        let data = BTreeMap::from([("a".to_owned(), 1), ("b".to_owned(), 2)]);
        save_json(&data, &path).unwrap();
        let loaded: BTreeMap<String, i32> = load_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result: Result<i32, _> = load_json("/nonexistent/canonform.json");
        assert!(matches!(result, Err(JsonError::Io(_))));
    }
}
