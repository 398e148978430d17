use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::{
    context::PersistContext,
    errors::{MismatchScope, PersistError},
    interchange::{list_batch_files, read_batch, read_version},
    ordering::import_order,
    registry::VERSION_ENTITY,
    store::EntityStore,
    unit_of_work::UnitOfWork,
    version::write_data_version,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportedEntity {
    pub entity_type: String,
    pub rows: usize,
    pub documents: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub data_version: String,
    pub entities: Vec<ImportedEntity>,
    pub constraints_applied: usize,
}

impl ImportSummary {
    pub fn total_rows(&self) -> usize {
        self.entities.iter().map(|e| e.rows).sum()
    }
}

/// Replaces all data with the file set in `dir`.
///
/// A failing document rolls back its own unit of work and aborts the import;
/// earlier documents stay committed. The version row is written only once the
/// constraints are back, so an interrupted import leaves the version table
/// empty.
pub fn import_data(
    ctx: &PersistContext<'_>,
    dir: &Path,
    app_version: &str,
) -> Result<ImportSummary, PersistError> {
    let data_version = read_version(dir)?;
    if data_version != app_version {
        return Err(PersistError::version_mismatch(
            MismatchScope::Interchange,
            data_version,
            app_version,
        ));
    }
    let order = import_order(ctx.registry)?;

    info!("clearing database");
    ctx.drop_all()?;

    info!("creating tables");
    ctx.create_tables()?;

    let mut summary = ImportSummary {
        data_version,
        ..ImportSummary::default()
    };
    for entity in order {
        if entity.name == VERSION_ENTITY {
            continue;
        }
        let store = EntityStore::new(*ctx, entity);
        let mut imported = ImportedEntity {
            entity_type: entity.name.clone(),
            rows: 0,
            documents: 0,
        };
        for (_, path) in list_batch_files(dir, &entity.name)? {
            info!(file = %path.display(), "importing data file");
            let rows = UnitOfWork::begin(ctx.conn)?.run(|_| {
                let document = read_batch(&path)?;
                if document.entity_type != entity.name {
                    return Err(PersistError::data_format(format!(
                        "{} holds {} rows, expected {}",
                        path.display(),
                        document.entity_type,
                        entity.name
                    )));
                }
                for record in &document.rows {
                    store.replicate(record)?;
                }
                Ok(document.rows.len())
            })?;
            imported.rows += rows;
            imported.documents += 1;
        }
        summary.entities.push(imported);
    }

    info!("applying foreign key constraints");
    summary.constraints_applied = ctx.apply_foreign_key_constraints()?.executed;

    write_data_version(ctx, &summary.data_version)?;
    info!(version = %summary.data_version, "recorded data version");
    summary.entities.push(ImportedEntity {
        entity_type: VERSION_ENTITY.to_string(),
        rows: 1,
        documents: 1,
    });
    Ok(summary)
}
