use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use crate::engine::claims::DEFAULT_STALE_CLAIM;
use crate::errors::EngineError;

const TMP_SUFFIX: &str = "tmp";

/// Engine tunables. All values have conservative defaults so a bare
/// `EngineConfig::default()` is a working production configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minutes after which an in-flight processing claim counts as
    /// abandoned and may be taken over.
    pub stale_claim_minutes: i64,
    /// Job execution history entries retained in memory.
    pub history_capacity: usize,
    /// Upper bound on occurrences generated for a single backfilled rule
    /// within one sweep.
    pub max_catchup_per_rule: u32,
    /// ISO 4217 code applied to rules created without an explicit one.
    pub default_currency: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stale_claim_minutes: DEFAULT_STALE_CLAIM.num_minutes(),
            history_capacity: 100,
            max_catchup_per_rule: 64,
            default_currency: "USD".into(),
        }
    }
}

impl EngineConfig {
    pub fn stale_claim_after(&self) -> Duration {
        Duration::minutes(self.stale_claim_minutes)
    }

    /// Loads configuration from a JSON file, falling back to defaults
    /// when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if path.exists() {
            let data = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Writes configuration atomically by staging to a temporary file.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = tmp_path(path);
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}
