// CSV file I/O: header management, full scans, appends and atomic rewrites

use crate::error::{CsvOrmError, Result};
use crate::record::Record;
use crate::schema::ModelSchema;
use crate::value::Value;
use csv::StringRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A scanned row: the decoded record plus the cells exactly as they were read.
#[derive(Debug, Clone)]
pub(crate) struct StoredRow {
    pub record: Record,
    pub raw: StringRecord,
}

/// Create the storage file with its header if it is absent or empty.
/// Returns whether a header was written.
pub fn ensure(schema: &ModelSchema) -> Result<bool> {
    let path = schema.storage_path();
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    create_parent_dir(path)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().from_writer(file);
    writer.write_record(schema.header())?;
    writer.flush()?;

    log::info!(
        "Created storage file for model '{}' at {}",
        schema.name(),
        path.display()
    );
    Ok(true)
}

/// Read every record in on-disk order. A missing file reads as empty.
pub fn read_records(schema: &ModelSchema) -> Result<Vec<Record>> {
    Ok(read_rows(schema)?.into_iter().map(|row| row.record).collect())
}

pub(crate) fn read_rows(schema: &ModelSchema) -> Result<Vec<StoredRow>> {
    let path = schema.storage_path();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let expected = schema.header();
    if !headers.iter().eq(expected.iter().copied()) {
        return Err(corrupt(
            path,
            format!(
                "header [{}] does not match model '{}' [{}]",
                headers.iter().collect::<Vec<_>>().join(", "),
                schema.name(),
                expected.join(", ")
            ),
        ));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let raw = result?;
        let line = raw.position().map(|p| p.line()).unwrap_or_default();
        let id = raw
            .get(0)
            .and_then(|cell| Uuid::parse_str(cell).ok())
            .ok_or_else(|| corrupt(path, format!("line {line}: invalid id")))?;

        let values = schema
            .fields()
            .iter()
            .map(|field| {
                let cell = raw.get(field.position() + 1).unwrap_or_default();
                Value::decode(cell, field.field_type(), field.name())
            })
            .collect();

        rows.push(StoredRow {
            record: Record::new(id, values),
            raw,
        });
    }

    log::debug!("Scanned {} row(s) from {}", rows.len(), path.display());
    Ok(rows)
}

/// Append one record to an existing storage file.
pub fn append(schema: &ModelSchema, record: &Record) -> Result<()> {
    let path = schema.storage_path();
    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    if !ends_with_newline(&mut file)? {
        file.write_all(b"\n")?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(&encode(record))?;
    writer.flush()?;

    log::debug!("Appended {} to {}", record.id(), path.display());
    Ok(())
}

/// Replace the storage file with the header followed by `rows`.
///
/// The content is written and synced to a temporary file in the same
/// directory, which is then renamed over the storage path. Readers see either
/// the old file or the complete new one.
///
/// Every row is serialized again by the csv writer. Rows passed with their raw
/// cells keep the same cell text, but quoting that the format does not need
/// is dropped and line endings become `\n`.
pub(crate) fn rewrite<I>(schema: &ModelSchema, rows: I) -> Result<()>
where
    I: IntoIterator<Item = StringRecord>,
{
    let path = schema.storage_path();
    let dir = create_parent_dir(path)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    let mut count = 0usize;
    {
        let mut writer = csv::WriterBuilder::new().from_writer(tmp.as_file_mut());
        writer.write_record(schema.header())?;
        for row in rows {
            writer.write_record(&row)?;
            count += 1;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    log::info!("Rewrote {} with {count} row(s)", path.display());
    Ok(())
}

/// Cells for a record: the id in hyphenated lowercase form, then each value.
pub(crate) fn encode(record: &Record) -> StringRecord {
    let mut row = StringRecord::with_capacity(64, record.values().len() + 1);
    row.push_field(&record.id().hyphenated().to_string());
    for value in record.values() {
        row.push_field(&value.render());
    }
    row
}

fn create_parent_dir(path: &Path) -> Result<&Path> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    Ok(dir)
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn corrupt(path: &Path, reason: String) -> CsvOrmError {
    CsvOrmError::Corrupt {
        path: path.display().to_string(),
        reason,
    }
}
