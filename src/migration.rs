use std::path::Path;

use tracing::info;

use crate::errors::{MismatchScope, PersistError};

pub trait Migrator: Send + Sync {
    /// Data-format version this application reads and writes.
    fn data_version(&self) -> &str;

    /// Upgrades the documents in `data_dir` from `from_version`.
    ///
    /// Returns `false` when the file set is already at [`Migrator::data_version`].
    fn migrate(&self, from_version: &str, data_dir: &Path) -> Result<bool, PersistError>;
}

pub type MigrationFn = fn(&Path) -> Result<(), PersistError>;

pub struct MigrationStep {
    pub from_version: String,
    pub to_version: String,
    pub apply: MigrationFn,
}

pub struct StepMigrator {
    base_version: String,
    steps: Vec<MigrationStep>,
}

impl StepMigrator {
    pub fn new<T: Into<String>>(base_version: T) -> Self {
        Self {
            base_version: base_version.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step; it must start at the current data version.
    pub fn step<F: Into<String>, T: Into<String>>(
        mut self,
        from_version: F,
        to_version: T,
        apply: MigrationFn,
    ) -> Result<Self, PersistError> {
        let from_version = from_version.into();
        if from_version != self.data_version() {
            return Err(PersistError::configuration(format!(
                "migration step from {from_version} does not continue from {}",
                self.data_version()
            )));
        }
        self.steps.push(MigrationStep {
            from_version,
            to_version: to_version.into(),
            apply,
        });
        Ok(self)
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }
}

impl Migrator for StepMigrator {
    fn data_version(&self) -> &str {
        self.steps
            .last()
            .map(|s| s.to_version.as_str())
            .unwrap_or(&self.base_version)
    }

    fn migrate(&self, from_version: &str, data_dir: &Path) -> Result<bool, PersistError> {
        if from_version == self.data_version() {
            return Ok(false);
        }
        let Some(start) = self.steps.iter().position(|s| s.from_version == from_version) else {
            return Err(PersistError::version_mismatch(
                MismatchScope::Interchange,
                from_version,
                self.data_version(),
            ));
        };
        for step in &self.steps[start..] {
            info!(from = %step.from_version, to = %step.to_version, "migrating data");
            (step.apply)(data_dir)?;
        }
        Ok(true)
    }
}
