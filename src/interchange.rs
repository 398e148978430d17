//! The interchange file set written by export and read by import.
//!
//! Each entity type is stored as one or more JSON batch documents. The first
//! batch of `Build` is `Builds.json`, the following ones `Builds.json.2`,
//! `Builds.json.3`, ... The version record travels as the `DataVersions.json`
//! document. These names are the stable contract between releases.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::PersistError,
    registry::{VERSION_ENTITY, VERSION_FIELD},
    store::EntityRecord,
};

const DOCUMENT_SUFFIX: &str = "s.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportBatch {
    pub entity_type: String,
    #[serde(default = "first_batch")]
    pub batch: usize,
    pub rows: Vec<EntityRecord>,
}

fn first_batch() -> usize {
    1
}

pub fn batch_file_name(entity: &str, batch: usize) -> String {
    if batch <= 1 {
        format!("{entity}{DOCUMENT_SUFFIX}")
    } else {
        format!("{entity}{DOCUMENT_SUFFIX}.{batch}")
    }
}

/// Batch number encoded in `file_name` if it belongs to `entity`.
pub fn parse_batch_number(entity: &str, file_name: &str) -> Option<usize> {
    let rest = file_name.strip_prefix(entity)?.strip_prefix(DOCUMENT_SUFFIX)?;
    if rest.is_empty() {
        return Some(1);
    }
    let number: usize = rest.strip_prefix('.')?.parse().ok()?;
    (number >= 2).then_some(number)
}

/// Batch documents of one entity type, in batch order.
pub fn list_batch_files(dir: &Path, entity: &str) -> Result<Vec<(usize, PathBuf)>, PersistError> {
    let entries =
        fs::read_dir(dir).map_err(|e| PersistError::io(format!("{}: {e}", dir.display())))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PersistError::io(format!("{}: {e}", dir.display())))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(batch) = parse_batch_number(entity, name) {
            files.push((batch, entry.path()));
        }
    }
    files.sort_by_key(|(batch, _)| *batch);
    Ok(files)
}

pub fn write_batch(dir: &Path, batch: &ExportBatch) -> Result<PathBuf, PersistError> {
    let path = dir.join(batch_file_name(&batch.entity_type, batch.batch));
    let file =
        File::create(&path).map_err(|e| PersistError::io(format!("{}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, batch)
        .map_err(|e| PersistError::io(format!("{}: {e}", path.display())))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| PersistError::io(format!("{}: {e}", path.display())))?;
    Ok(path)
}

pub fn read_batch(path: &Path) -> Result<ExportBatch, PersistError> {
    let file =
        File::open(path).map_err(|e| PersistError::io(format!("{}: {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PersistError::data_format(format!("{}: {e}", path.display())))
}

pub fn version_file(dir: &Path) -> PathBuf {
    dir.join(batch_file_name(VERSION_ENTITY, 1))
}

/// Data version recorded in an interchange file set.
pub fn read_version(dir: &Path) -> Result<String, PersistError> {
    let path = version_file(dir);
    if !path.is_file() {
        return Err(PersistError::data_format(format!(
            "no data version document at {}",
            path.display()
        )));
    }
    let document = read_batch(&path)?;
    let [record] = document.rows.as_slice() else {
        return Err(PersistError::data_format("illegal data version"));
    };
    match record.fields.get(VERSION_FIELD) {
        Some(Value::String(version)) => Ok(version.clone()),
        _ => Err(PersistError::data_format("no data version")),
    }
}

/// Rewrites the version document in place, keeping its row id.
pub fn write_version(dir: &Path, version: &str) -> Result<(), PersistError> {
    let mut document = read_batch(&version_file(dir))?;
    let [record] = document.rows.as_mut_slice() else {
        return Err(PersistError::data_format("illegal data version"));
    };
    record
        .fields
        .insert(VERSION_FIELD.to_string(), Value::String(version.to_string()));
    write_batch(dir, &document)?;
    Ok(())
}
