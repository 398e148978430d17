use std::{fs, path::Path};

use serde::Serialize;
use tracing::info;

use crate::{
    context::PersistContext,
    errors::PersistError,
    interchange::{ExportBatch, list_batch_files, write_batch},
    ordering::dependency_order,
    store::EntityStore,
};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportedEntity {
    pub entity_type: String,
    pub rows: usize,
    pub documents: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub entities: Vec<ExportedEntity>,
}

impl ExportSummary {
    pub fn total_rows(&self) -> usize {
        self.entities.iter().map(|e| e.rows).sum()
    }

    pub fn total_documents(&self) -> usize {
        self.entities.iter().map(|e| e.documents).sum()
    }
}

/// Only one batch of rows is held in memory at a time. On error the
/// documents already written are left in place.
pub fn export_data(
    ctx: &PersistContext<'_>,
    dir: &Path,
    batch_size: usize,
) -> Result<ExportSummary, PersistError> {
    if batch_size == 0 {
        return Err(PersistError::configuration("export batch size must be positive"));
    }
    fs::create_dir_all(dir).map_err(|e| PersistError::io(format!("{}: {e}", dir.display())))?;

    let mut summary = ExportSummary::default();
    for entity in dependency_order(ctx.registry)? {
        info!(entity = %entity.name, "exporting table");
        let store = EntityStore::new(*ctx, entity);
        let ids = store.list_ids()?;
        info!(entity = %entity.name, rows = ids.len(), "queried table ids");

        // Stale batches of an earlier export into the same directory.
        for (_, stale) in list_batch_files(dir, &entity.name)? {
            fs::remove_file(&stale)
                .map_err(|e| PersistError::io(format!("{}: {e}", stale.display())))?;
        }

        let mut documents = 0;
        if ids.is_empty() {
            write_batch(
                dir,
                &ExportBatch {
                    entity_type: entity.name.clone(),
                    batch: 1,
                    rows: Vec::new(),
                },
            )?;
            documents = 1;
        }
        for (idx, window) in ids.chunks(batch_size).enumerate() {
            let start = idx * batch_size;
            info!(
                entity = %entity.name,
                from = start + 1,
                to = start + window.len(),
                "loading table rows"
            );
            let rows = store.load_range(window[0], window[window.len() - 1])?;
            let batch = ExportBatch {
                entity_type: entity.name.clone(),
                batch: idx + 1,
                rows,
            };
            let path = write_batch(dir, &batch)?;
            info!(file = %path.display(), rows = batch.rows.len(), "wrote export batch");
            documents += 1;
        }
        summary.entities.push(ExportedEntity {
            entity_type: entity.name.clone(),
            rows: ids.len(),
            documents,
        });
    }
    Ok(summary)
}
