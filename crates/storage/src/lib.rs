pub mod jar;

pub use jar::{MemoryCookieJar, StoredCookie};

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Persists a visitor's cookie jar between page loads.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load_jar(&self) -> Result<MemoryCookieJar>;
    async fn save_jar(&self, jar: &MemoryCookieJar) -> Result<()>;
}

pub struct JsonFileStorage {
    pub folder: String,
}

impl JsonFileStorage {
    pub const FILE_NAME: &'static str = "cookies.json";

    pub fn new(folder: &str) -> Self {
        std::fs::create_dir_all(folder).ok(); // ensure folder exists
        Self { folder: folder.to_string() }
    }

    pub fn path(&self) -> PathBuf {
        Path::new(&self.folder).join(Self::FILE_NAME)
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn load_jar(&self) -> Result<MemoryCookieJar> {
        let path = self.path();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored jar, starting empty");
                return Ok(MemoryCookieJar::new());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let jar = serde_json::from_str(&data)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(jar)
    }

    async fn save_jar(&self, jar: &MemoryCookieJar) -> Result<()> {
        let path = self.path();
        let data = serde_json::to_string_pretty(jar)?;
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "jar saved");
        Ok(())
    }
}

/// Keeps the last saved jar in memory.
#[derive(Default)]
pub struct MemoryStorage {
    jar: Mutex<Option<MemoryCookieJar>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<MemoryCookieJar> {
        self.jar.lock().ok().and_then(|jar| jar.clone())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_jar(&self) -> Result<MemoryCookieJar> {
        Ok(self.saved().unwrap_or_default())
    }

    async fn save_jar(&self, jar: &MemoryCookieJar) -> Result<()> {
        let mut slot = self
            .jar
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?;
        *slot = Some(jar.clone());
        Ok(())
    }
}
