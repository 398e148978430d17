use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{errors::PersistError, export::DEFAULT_BATCH_SIZE, naming::SnakeCaseNaming};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Compared with the stored version at startup and with the version
    /// document of an interchange file set on import.
    pub data_version: String,
    pub export_batch_size: usize,
    /// Prepended to every physical table name.
    pub table_prefix: Option<String>,
    /// PRAGMA settings applied right after the connection opens.
    pub pragma_settings: HashMap<String, String>,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            data_version: "1".to_string(),
            export_batch_size: DEFAULT_BATCH_SIZE,
            table_prefix: None,
            pragma_settings: HashMap::new(),
        }
    }
}

impl PersistConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| PersistError::io(format!("{}: {e}", path.display())))?;
        let config: PersistConfig = serde_json::from_str(&raw).map_err(|e| {
            PersistError::configuration(format!("invalid config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PersistError> {
        if self.data_version.trim().is_empty() {
            return Err(PersistError::configuration("data_version must not be empty"));
        }
        if self.export_batch_size == 0 {
            return Err(PersistError::configuration(
                "export_batch_size must be positive",
            ));
        }
        Ok(())
    }

    pub fn naming(&self) -> SnakeCaseNaming {
        SnakeCaseNaming {
            table_prefix: self.table_prefix.clone(),
        }
    }
}
