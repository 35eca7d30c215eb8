//! Single JSON document on disk.
//!
//! Writes go to `<file>.tmp` first and are renamed over the target, so a
//! crash mid-write leaves the previous document intact.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{EdgeError, Result};

pub struct JsonDocument<T> {
    path: PathBuf,
    label: &'static str,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>, label: &'static str) -> Self {
        Self {
            path: path.into(),
            label,
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document. `Ok(None)` when the file does not exist.
    pub async fn read(&self) -> Result<Option<T>> {
        let s = match tokio::fs::read_to_string(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EdgeError::Io(e)),
        };
        serde_json::from_str(&s).map(Some).map_err(EdgeError::from)
    }

    /// Load the document, falling back to `T::default()` when it is missing,
    /// unreadable or unparseable.
    pub async fn load_or_default(&self) -> T {
        match self.read().await {
            Ok(Some(doc)) => {
                debug!(document = self.label, path = %self.path.display(), "loaded document");
                doc
            }
            Ok(None) => {
                debug!(
                    document = self.label,
                    path = %self.path.display(),
                    "no document on disk, starting empty"
                );
                T::default()
            }
            Err(e) => {
                warn!(
                    document = self.label,
                    path = %self.path.display(),
                    error = %e,
                    "failed to load document, starting empty"
                );
                T::default()
            }
        }
    }

    pub async fn save(&self, value: &T) -> Result<()> {
        let Some(parent) = self.path.parent() else {
            return Err(EdgeError::Internal(format!(
                "invalid {} path: {}",
                self.label,
                self.path.display()
            )));
        };
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = render(value)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(document = self.label, path = %self.path.display(), "saved document");
        Ok(())
    }
}

/// Pretty JSON text exactly as written to disk.
pub fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        count: u32,
        ratio: f64,
    }

    fn temp_path(tag: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "patternedge_json_store_{}_{}",
            tag,
            Utc::now().timestamp_nanos_opt().unwrap_or(0)
        ));
        p.push("doc.json");
        p
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let doc = JsonDocument::<Doc>::new(temp_path("missing"), "test");
        assert!(doc.read().await.unwrap().is_none());
        assert_eq!(doc.load_or_default().await, Doc::default());
    }

    #[tokio::test]
    async fn save_then_read_roundtrip() {
        let path = temp_path("roundtrip");
        let doc = JsonDocument::<Doc>::new(&path, "test");
        let value = Doc {
            count: 3,
            ratio: 0.1 + 0.2,
        };
        doc.save(&value).await.unwrap();
        assert_eq!(doc.read().await.unwrap(), Some(value));
        assert!(!path.with_extension("json.tmp").exists());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_default() {
        let path = temp_path("corrupt");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "{not json").await.unwrap();

        let doc = JsonDocument::<Doc>::new(&path, "test");
        assert!(doc.read().await.is_err());
        assert_eq!(doc.load_or_default().await, Doc::default());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
