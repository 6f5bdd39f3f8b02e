use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use crew_core::api::{ContextSource, Role, ServiceError};

const MAX_SOURCE_BYTES: u64 = 2 * 1024 * 1024;

/// Reads per-role source material from `<root>/<TICKER>/<role>.md`.
///
/// A missing file means the role starts without source material.
pub struct FileContextSource {
    root: PathBuf,
}

impl FileContextSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, ticker: &str, role: Role) -> PathBuf {
        self.root.join(ticker).join(format!("{}.md", role.as_str()))
    }
}

#[async_trait]
impl ContextSource for FileContextSource {
    fn name(&self) -> &str {
        "files"
    }

    async fn fetch(&self, ticker: &str, role: Role) -> Result<Option<String>, ServiceError> {
        let path = self.path_for(ticker, role);

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ServiceError::fatal(format!(
                    "stat {} failed: {e}",
                    path.display()
                )))
            }
        };
        if !meta.is_file() {
            return Ok(None);
        }
        if meta.len() > MAX_SOURCE_BYTES {
            return Err(ServiceError::fatal(format!(
                "{} is {} bytes (limit {MAX_SOURCE_BYTES})",
                path.display(),
                meta.len()
            )));
        }

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ServiceError::fatal(format!("read {} failed: {e}", path.display())))?;

        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}
