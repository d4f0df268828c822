use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::state::ActingUser;
use crate::state::Manuscript;

pub const REFEREE_DECISIONS_KEY: &str = "refereeDecisions";
pub const USER_DATA_KEY: &str = "userData";
pub const USER_KEY: &str = "user";

/// Process-wide string store with fixed key names and no expiry.
pub trait LocalCache {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> std::io::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: BTreeMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl LocalCache for MemoryCache {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A single JSON object of key -> string on disk.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCache {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries = load_entries(path.as_path())?;
        Ok(Self { path, entries })
    }

    fn flush(&self) -> std::io::Result<()> {
        let encoded = serde_json::to_vec_pretty(&self.entries)
            .map_err(|err| std::io::Error::other(format!("serialize cache: {err}")))?;
        let tmp = self.path.with_extension("json.tmp");
        write_private(tmp.as_path(), &encoded)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl LocalCache for FileCache {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

fn load_entries(path: &Path) -> std::io::Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let bytes = std::fs::read(path)?;
    match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
        Ok(entries) => Ok(entries),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cache file unreadable, starting empty");
            Ok(BTreeMap::new())
        }
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(())
}

pub fn load_acting_user(cache: &impl LocalCache) -> Option<ActingUser> {
    let raw = cache.read(USER_KEY)?;
    match serde_json::from_str::<ActingUser>(&raw) {
        Ok(user) => Some(user),
        Err(err) => {
            tracing::warn!(error = %err, "stored identity unreadable, ignoring");
            None
        }
    }
}

pub fn save_acting_user(cache: &mut impl LocalCache, user: &ActingUser) -> std::io::Result<()> {
    let encoded = serde_json::to_string(user)
        .map_err(|err| std::io::Error::other(format!("serialize identity: {err}")))?;
    cache.write(USER_KEY, &encoded)
}

/// Last fetched manuscript list, for rendering without the network.
pub fn load_manuscripts(cache: &impl LocalCache) -> Vec<Manuscript> {
    let Some(raw) = cache.read(USER_DATA_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Manuscript>>(&raw) {
        Ok(manuscripts) => manuscripts,
        Err(err) => {
            tracing::warn!(error = %err, "cached manuscripts unreadable, ignoring");
            Vec::new()
        }
    }
}

pub fn save_manuscripts(
    cache: &mut impl LocalCache,
    manuscripts: &[Manuscript],
) -> std::io::Result<()> {
    let encoded = serde_json::to_string(manuscripts)
        .map_err(|err| std::io::Error::other(format!("serialize manuscripts: {err}")))?;
    cache.write(USER_DATA_KEY, &encoded)
}
