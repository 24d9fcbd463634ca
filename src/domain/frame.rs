//! Date-indexed tables and series.
//!
//! A [`Frame`] stores named `f64` columns over a strictly increasing date axis.
//! Missing observations are `NaN`. Price tables, prediction matrices and
//! feature datasets all share this representation.

use crate::domain::error::SeerError;
use chrono::NaiveDate;
use std::collections::HashMap;

pub type PriceTable = Frame;
pub type PredictionMatrix = Frame;
pub type ReturnSeries = Series;
pub type TurnoverSeries = Series;

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    name: String,
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    data: Vec<Vec<f64>>,
}

impl Frame {
    /// Builds a frame from column-major data, validating the date axis and shape.
    pub fn new(
        name: impl Into<String>,
        index: Vec<NaiveDate>,
        columns: Vec<String>,
        data: Vec<Vec<f64>>,
    ) -> Result<Self, SeerError> {
        let name = name.into();
        validate_index(&name, &index)?;

        if columns.len() != data.len() {
            return Err(SeerError::Shape {
                table: name,
                reason: format!("{} column names for {} columns", columns.len(), data.len()),
            });
        }
        for (column, values) in columns.iter().zip(&data) {
            if values.len() != index.len() {
                return Err(SeerError::Shape {
                    table: name,
                    reason: format!(
                        "column {} has {} values for {} dates",
                        column,
                        values.len(),
                        index.len()
                    ),
                });
            }
        }
        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SeerError::Shape {
                    table: name,
                    reason: format!("duplicate column {column}"),
                });
            }
        }

        Ok(Self {
            name,
            index,
            columns,
            data,
        })
    }

    /// A frame over `index` with every column filled with `value`.
    pub fn filled(
        name: impl Into<String>,
        index: Vec<NaiveDate>,
        columns: Vec<String>,
        value: f64,
    ) -> Result<Self, SeerError> {
        let data = vec![vec![value; index.len()]; columns.len()];
        Self::new(name, index, columns, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn column(&self, column: &str) -> Option<&[f64]> {
        self.position(column).map(|j| self.data[j].as_slice())
    }

    pub fn column_at(&self, j: usize) -> &[f64] {
        &self.data[j]
    }

    pub fn value(&self, row: usize, column: usize) -> f64 {
        self.data[column][row]
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.iter().map(|col| col[row]).collect()
    }

    pub fn series(&self, column: &str) -> Option<Series> {
        self.column(column).map(|values| Series {
            index: self.index.clone(),
            values: values.to_vec(),
        })
    }

    /// Restricts the frame to `columns`, in the given order.
    pub fn select(&self, columns: &[String]) -> Result<Frame, SeerError> {
        let mut data = Vec::with_capacity(columns.len());
        for column in columns {
            let values = self.column(column).ok_or_else(|| SeerError::MissingColumn {
                table: self.name.clone(),
                column: column.clone(),
            })?;
            data.push(values.to_vec());
        }
        Ok(Frame {
            name: self.name.clone(),
            index: self.index.clone(),
            columns: columns.to_vec(),
            data,
        })
    }

    /// Drops the named columns; unknown names are ignored.
    pub fn without(&self, columns: &[String]) -> Frame {
        let keep: Vec<usize> = (0..self.width())
            .filter(|&j| !columns.contains(&self.columns[j]))
            .collect();
        Frame {
            name: self.name.clone(),
            index: self.index.clone(),
            columns: keep.iter().map(|&j| self.columns[j].clone()).collect(),
            data: keep.iter().map(|&j| self.data[j].clone()).collect(),
        }
    }

    /// Appends columns from `other`, which must share this frame's date axis.
    pub fn join(&self, other: &Frame) -> Result<Frame, SeerError> {
        if self.index != other.index {
            return Err(SeerError::Shape {
                table: other.name.clone(),
                reason: format!("date axis differs from {}", self.name),
            });
        }
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        let mut data = self.data.clone();
        data.extend(other.data.iter().cloned());
        Frame::new(self.name.clone(), self.index.clone(), columns, data)
    }

    /// Places this frame on the `target` date axis.
    ///
    /// Every date of `self` must exist on `target`; target dates the frame does
    /// not cover become missing rows.
    pub fn reindex(&self, target: &[NaiveDate]) -> Result<Frame, SeerError> {
        let positions = positions_on(&self.name, &self.index, target)?;
        let mut data = vec![vec![f64::NAN; target.len()]; self.width()];
        for (src_row, &dst_row) in positions.iter().enumerate() {
            for (j, column) in self.data.iter().enumerate() {
                data[j][dst_row] = column[src_row];
            }
        }
        Ok(Frame {
            name: self.name.clone(),
            index: target.to_vec(),
            columns: self.columns.clone(),
            data,
        })
    }

    /// Keeps only the rows whose date falls within `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Frame {
        let rows: Vec<usize> = (0..self.len())
            .filter(|&i| self.index[i] >= start && self.index[i] <= end)
            .collect();
        Frame {
            name: self.name.clone(),
            index: rows.iter().map(|&i| self.index[i]).collect(),
            columns: self.columns.clone(),
            data: self
                .data
                .iter()
                .map(|col| rows.iter().map(|&i| col[i]).collect())
                .collect(),
        }
    }

    /// Fraction of non-missing observations in `column`.
    pub fn coverage(&self, column: &str) -> Option<f64> {
        let values = self.column(column)?;
        if values.is_empty() {
            return Some(0.0);
        }
        let valid = values.iter().filter(|v| !v.is_nan()).count();
        Some(valid as f64 / values.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub index: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(index: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        Self { index, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.index.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }
}

/// Maps each date of `source` to its row on `target`.
pub fn positions_on(
    table: &str,
    source: &[NaiveDate],
    target: &[NaiveDate],
) -> Result<Vec<usize>, SeerError> {
    let lookup: HashMap<NaiveDate, usize> =
        target.iter().enumerate().map(|(i, &d)| (d, i)).collect();
    let mut positions = Vec::with_capacity(source.len());
    let mut missing = 0usize;
    let mut first_missing = None;
    for date in source {
        match lookup.get(date) {
            Some(&i) => positions.push(i),
            None => {
                missing += 1;
                first_missing.get_or_insert(*date);
            }
        }
    }
    match first_missing {
        Some(first) => Err(SeerError::IndexMismatch {
            table: table.to_string(),
            missing,
            first,
        }),
        None => Ok(positions),
    }
}

fn validate_index(table: &str, index: &[NaiveDate]) -> Result<(), SeerError> {
    for pair in index.windows(2) {
        if pair[1] == pair[0] {
            return Err(SeerError::DuplicateDate {
                table: table.to_string(),
                date: pair[1],
            });
        }
        if pair[1] < pair[0] {
            return Err(SeerError::UnsortedIndex {
                table: table.to_string(),
                date: pair[1],
            });
        }
    }
    Ok(())
}
