use std::path::PathBuf;

use anyhow::Result;
use tokio::fs;
use tracing::info;

/// On-disk blob storage: one flat file per blob at `{dir}/{container}/{name}`.
///
/// Name components must pass [`valid_component`] before they reach the
/// filesystem; handlers validate at the boundary so a bad name is a 400
/// rather than a path traversal.
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Write a blob, overwriting any existing blob of the same name.
    pub async fn put(&self, container: &str, name: &str, bytes: &[u8]) -> Result<()> {
        let container_dir = self.dir.join(container);
        fs::create_dir_all(&container_dir).await?;
        fs::write(container_dir.join(name), bytes).await?;
        Ok(())
    }

    pub async fn get(&self, container: &str, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.dir.join(container).join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// A container or blob name must be a single plain path component.
pub fn valid_component(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}
