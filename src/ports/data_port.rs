//! Data access port trait.

use crate::domain::error::SeerError;
use crate::domain::frame::Frame;
use chrono::NaiveDate;

/// A source of one date-indexed table (prices or a prepared feature set).
pub trait DataPort {
    fn load_table(&self) -> Result<Frame, SeerError>;

    fn list_columns(&self) -> Result<Vec<String>, SeerError>;

    /// First and last date with a value in `column`, and the number of valid rows.
    fn get_data_range(
        &self,
        column: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SeerError> {
        let table = self.load_table()?;
        let values = table.column(column).ok_or_else(|| SeerError::MissingColumn {
            table: table.name().to_string(),
            column: column.to_string(),
        })?;
        let valid: Vec<NaiveDate> = table
            .index()
            .iter()
            .zip(values)
            .filter(|(_, v)| !v.is_nan())
            .map(|(d, _)| *d)
            .collect();
        Ok(match (valid.first(), valid.last()) {
            (Some(&first), Some(&last)) => Some((first, last, valid.len())),
            _ => None,
        })
    }
}
