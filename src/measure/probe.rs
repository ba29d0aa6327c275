//! Resident-set probe backed by `/proc/self/status`.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::domain::UsageProbe;

/// Reads `VmRSS` of the current process. Reports 0 where the file is missing.
#[derive(Clone, Debug)]
pub struct ProcessRssProbe {
    status_path: PathBuf,
}

impl Default for ProcessRssProbe {
    fn default() -> Self {
        Self {
            status_path: PathBuf::from("/proc/self/status"),
        }
    }
}

impl ProcessRssProbe {
    pub fn with_status_path(path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: path.into(),
        }
    }
}

impl UsageProbe for ProcessRssProbe {
    fn used_bytes(&self) -> u64 {
        match fs::read_to_string(&self.status_path) {
            Ok(contents) => parse_vm_rss_bytes(&contents).unwrap_or(0),
            Err(e) => {
                debug!(ev = "rss_probe_unavailable", error = %e);
                0
            }
        }
    }
}

/// Extract `VmRSS:  <n> kB` as bytes.
fn parse_vm_rss_bytes(contents: &str) -> Option<u64> {
    let line = contents.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    kb.checked_mul(1024)
}
