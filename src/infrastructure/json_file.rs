use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Reads a JSON document, treating a missing, empty or corrupt file as
/// `T::default()`.
pub async fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!("⚠️  Could not read {}: {}", path.display(), e);
            return T::default();
        }
    };

    let raw = strip_bom(&raw);
    if raw.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }

    match serde_json::from_slice::<Option<T>>(raw) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            warn!("⚠️  Ignoring corrupt JSON in {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Reads a JSON array entry by entry. Entries that do not fit `T` are
/// logged and skipped; the rest survive.
pub async fn read_json_list<T>(path: &Path) -> Vec<T>
where
    T: DeserializeOwned,
{
    let raw: Vec<serde_json::Value> = read_json_or_default(path).await;
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| decode_entry(path, &index.to_string(), value))
        .collect()
}

/// Reads a JSON object entry by entry, like `read_json_list`.
pub async fn read_json_map<T>(path: &Path) -> BTreeMap<String, T>
where
    T: DeserializeOwned,
{
    let raw: BTreeMap<String, serde_json::Value> = read_json_or_default(path).await;
    raw.into_iter()
        .filter_map(|(key, value)| decode_entry(path, &key, value).map(|entry| (key, entry)))
        .collect()
}

fn decode_entry<T>(path: &Path, label: &str, value: serde_json::Value) -> Option<T>
where
    T: DeserializeOwned,
{
    match serde_json::from_value(value) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("⚠️  Skipping unreadable entry {} in {}: {}", label, path.display(), e);
            None
        }
    }
}

/// Writes `value` pretty-printed, replacing the whole file.
pub async fn write_json_pretty<T>(path: &Path, value: &T) -> std::io::Result<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, body).await
}

/// Creates the file with `initial` contents when it does not exist yet.
pub async fn ensure_json_file<T>(path: &Path, initial: &T) -> std::io::Result<()>
where
    T: Serialize + ?Sized,
{
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    write_json_pretty(path, initial).await
}

pub fn strip_bom(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(raw)
}
