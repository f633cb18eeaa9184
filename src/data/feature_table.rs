//! Persisted training feature table
//!
//! The header is part of the contract: a table is only read back when its
//! columns match the current layout exactly, in order.

use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::features::matchup::MatchupFeatureRow;
use crate::{HoopsError, Result};

pub fn write_feature_table<P: AsRef<Path>>(path: P, rows: &[MatchupFeatureRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_feature_table_to(File::create(path)?, rows)?;
    log::info!("Wrote {} feature rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_feature_table_to<W: Write>(writer: W, rows: &[MatchupFeatureRow]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(MatchupFeatureRow::columns(true))?;
    for row in rows {
        writer.write_record(row.to_record(true))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_feature_table<P: AsRef<Path>>(path: P) -> Result<Vec<MatchupFeatureRow>> {
    read_feature_table_from(File::open(path)?)
}

pub fn read_feature_table_from<R: Read>(reader: R) -> Result<Vec<MatchupFeatureRow>> {
    let mut reader = ReaderBuilder::new().from_reader(reader);
    let expected = MatchupFeatureRow::columns(true);
    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if found != expected {
        return Err(HoopsError::ColumnMismatch { expected, found });
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2);
        rows.push(MatchupFeatureRow::from_record(&record, true, line)?);
    }
    Ok(rows)
}
