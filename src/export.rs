//! CSV export of a collection

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::models::{Record, Resource};

/// Write records with the resource's columns; returns the number of rows
pub fn write_csv<W: Write>(writer: W, resource: Resource, records: &[&Record]) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["ID"];
    header.extend(resource.columns().iter().map(|(_, title)| *title));
    csv_writer.write_record(&header)?;

    for record in records {
        let mut row = vec![record.id.to_string()];
        row.extend(resource.columns().iter().map(|(field, _)| record.text(field)));
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(records.len())
}

pub fn export_to_path(path: &Path, resource: Resource, records: &[&Record]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory {}", parent.display()))?;
        }
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let count = write_csv(file, resource, records)?;
    info!("Exported {} {} to {}", count, resource, path.display());
    Ok(count)
}
