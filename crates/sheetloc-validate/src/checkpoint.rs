//! Processed-key checkpoint, persisted after every batch.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};

#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
    processed: BTreeSet<String>,
}

impl Checkpoint {
    /// Load `path`, or start empty when it does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        let processed = if path.is_file() {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading checkpoint {}", path.display()))?;
            serde_json::from_str(&text).wrap_err_with(|| format!("parsing checkpoint {}", path.display()))?
        } else {
            BTreeSet::new()
        };
        tracing::debug!(event = "checkpoint_loaded", path = %path.display(), processed = processed.len());
        Ok(Self {
            path: path.to_path_buf(),
            processed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.processed.contains(key)
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, keys: I) {
        self.processed.extend(keys);
    }

    /// Write through a temporary sibling and rename, so a crash never leaves half a file.
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(&self.processed)?;
        std::fs::write(&tmp, text).wrap_err_with(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .wrap_err_with(|| format!("replacing checkpoint {}", self.path.display()))?;
        tracing::debug!(event = "checkpoint_saved", path = %self.path.display(), processed = self.processed.len());
        Ok(())
    }

    /// Forget everything, on disk too.
    pub fn clear(&mut self) -> Result<()> {
        self.processed.clear();
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .wrap_err_with(|| format!("removing checkpoint {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_a_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("state/processed.json");
        let mut cp = Checkpoint::load(&path)?;
        assert!(cp.is_empty());
        cp.extend(["b".to_string(), "a".to_string()]);
        cp.save()?;

        let reloaded = Checkpoint::load(&path)?;
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("a"));
        assert!(!dir.path().join("state/processed.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn clear_removes_the_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("processed.json");
        let mut cp = Checkpoint::load(&path)?;
        cp.extend(["a".to_string()]);
        cp.save()?;
        cp.clear()?;
        assert!(!path.exists());
        assert!(Checkpoint::load(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_checkpoint_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("processed.json");
        std::fs::write(&path, "{ not json")?;
        let err = Checkpoint::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing checkpoint"));
        Ok(())
    }
}
