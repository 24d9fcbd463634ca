//! Wide CSV table adapter.
//!
//! The first column holds dates, every other column one series. Empty cells
//! and `NaN` are missing values.

use crate::domain::error::SeerError;
use crate::domain::frame::Frame;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::path::PathBuf;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn table_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string())
    }

    fn read(&self) -> Result<csv::Reader<File>, SeerError> {
        csv::Reader::from_path(&self.path).map_err(|e| SeerError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_value(raw: &str) -> Result<f64, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("na") {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|e| format!("invalid value '{raw}': {e}"))
}

impl DataPort for CsvAdapter {
    fn load_table(&self) -> Result<Frame, SeerError> {
        let mut rdr = self.read()?;
        let columns: Vec<String> = rdr
            .headers()?
            .iter()
            .skip(1)
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let date_str = record.get(0).unwrap_or_default();
            let date = parse_date(date_str).ok_or_else(|| SeerError::Data {
                reason: format!("row {}: invalid date '{}'", line + 1, date_str),
            })?;

            let mut values = Vec::with_capacity(columns.len());
            for j in 0..columns.len() {
                let value = parse_value(record.get(j + 1).unwrap_or_default()).map_err(|reason| {
                    SeerError::Data {
                        reason: format!("row {}, column {}: {}", line + 1, columns[j], reason),
                    }
                })?;
                values.push(value);
            }
            rows.push((date, values));
        }

        rows.sort_by_key(|(date, _)| *date);
        let index = rows.iter().map(|(d, _)| *d).collect();
        let data = (0..columns.len())
            .map(|j| rows.iter().map(|(_, values)| values[j]).collect())
            .collect();
        Frame::new(self.table_name(), index, columns, data)
    }

    fn list_columns(&self) -> Result<Vec<String>, SeerError> {
        let mut rdr = self.read()?;
        Ok(rdr
            .headers()?
            .iter()
            .skip(1)
            .map(|h| h.trim().to_string())
            .collect())
    }
}
