//! Filesystem repository for the persisted model.
//!
//! Saves go to a sibling temp file which is fsynced and renamed over the
//! target, so readers find either the previous model or the new one.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::common::config::AppCfg;
use crate::common::error::MemResult;

use super::domain::{Model, ModelFile, ModelRepo};

/// Persist the model as a small JSON record.
pub struct FsModelRepo {
    path: PathBuf,
}

impl FsModelRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(cfg: &AppCfg) -> Self {
        Self::new(&cfg.model_file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "model.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ModelRepo for FsModelRepo {
    fn save(&self, model: &Model) -> MemResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(&ModelFile::from(model))?;
        let tmp = self.temp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        info!(ev = "model_saved", path = %self.path.display(), samples = model.trained_on());
        Ok(())
    }

    fn load(&self) -> MemResult<Option<Model>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(ev = "model_absent", path = %self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let record: ModelFile = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!(ev = "model_corrupt", path = %self.path.display(), error = %e);
                return Ok(None);
            }
        };
        let model = record.into_model();
        if model.is_none() {
            warn!(ev = "model_corrupt", path = %self.path.display(), error = "bad weights");
        }
        Ok(model)
    }
}
