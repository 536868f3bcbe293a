//! Columnar record batch for the transformation pipeline
//!
//! A `Frame` is an ordered table of named, typed columns. Pipeline stages
//! mutate it in place: deriving columns, dropping consumed raw columns,
//! and (fit mode only) dropping rows through an explicit mask. Column
//! order is insertion order, so a fixed stage sequence yields an
//! identical feature schema across fit and replay.

use homeprice_common::{Error, Result};

/// Raw request schema: 17 columns, fixed order
pub const RAW_COLUMNS: [&str; 17] = [
    "status",
    "private pool",
    "propertyType",
    "street",
    "baths",
    "homeFacts",
    "fireplace",
    "city",
    "schools",
    "sqft",
    "zipcode",
    "beds",
    "state",
    "stories",
    "mls-id",
    "PrivatePool",
    "MlsId",
];

/// Name of the optional fit-time target column
pub const TARGET_COLUMN: &str = "target";

/// Client-side sentinel substituted for true missing values
pub const NAN_SENTINEL: &str = "***NaN***";

/// A single typed column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Raw or categorical text, with per-row missing markers
    Str(Vec<Option<String>>),
    /// Continuous numeric, with per-row missing markers
    F64(Vec<Option<f64>>),
    /// Binary indicator feature (0/1), never missing
    Bin(Vec<u8>),
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Column::Str(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Bin(v) => v.len(),
        }
    }

    fn retain(&mut self, mask: &[bool]) {
        let keep = |i: usize| mask[i];
        match self {
            Column::Str(v) => {
                let mut i = 0;
                v.retain(|_| {
                    let k = keep(i);
                    i += 1;
                    k
                });
            }
            Column::F64(v) => {
                let mut i = 0;
                v.retain(|_| {
                    let k = keep(i);
                    i += 1;
                    k
                });
            }
            Column::Bin(v) => {
                let mut i = 0;
                v.retain(|_| {
                    let k = keep(i);
                    i += 1;
                    k
                });
            }
        }
    }
}

/// Ordered columnar table
#[derive(Debug, Clone, Default)]
pub struct Frame {
    names: Vec<String>,
    cols: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw request payload into a frame.
    ///
    /// Each row must carry the 17 raw columns, optionally followed by a
    /// trailing target price (fit time only). The `"***NaN***"` sentinel
    /// and JSON null both decode to missing.
    pub fn from_rows(rows: &[Vec<serde_json::Value>]) -> Result<Self> {
        let with_target = match rows.first() {
            Some(first) if first.len() == RAW_COLUMNS.len() + 1 => true,
            Some(first) if first.len() == RAW_COLUMNS.len() => false,
            Some(first) => {
                return Err(Error::InvalidInput(format!(
                    "expected {} columns per row, got {}",
                    RAW_COLUMNS.len(),
                    first.len()
                )))
            }
            None => false,
        };
        let expected = RAW_COLUMNS.len() + usize::from(with_target);

        let mut columns: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(rows.len()); RAW_COLUMNS.len()];
        let mut targets: Vec<Option<f64>> = Vec::with_capacity(rows.len());

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(Error::InvalidInput(format!(
                    "row {} has {} columns, expected {}",
                    row_idx,
                    row.len(),
                    expected
                )));
            }
            for (col, cell) in columns.iter_mut().zip(row.iter()) {
                col.push(decode_cell(cell));
            }
            if with_target {
                let raw = decode_cell(&row[RAW_COLUMNS.len()]);
                targets.push(raw.as_deref().and_then(target_to_f64));
            }
        }

        let mut frame = Frame::new();
        for (name, values) in RAW_COLUMNS.iter().zip(columns) {
            frame.push(name, Column::Str(values))?;
        }
        if with_target {
            frame.push(TARGET_COLUMN, Column::F64(targets))?;
        }
        Ok(frame)
    }

    pub fn n_rows(&self) -> usize {
        self.cols.first().map(Column::len).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::Internal(format!("column '{}' not in frame", name)))
    }

    /// Append a new column, or replace an existing one in place
    /// (a replaced column keeps its position in the schema).
    pub fn push(&mut self, name: &str, col: Column) -> Result<()> {
        if !self.cols.is_empty() && col.len() != self.n_rows() {
            return Err(Error::Internal(format!(
                "column '{}' has {} rows, frame has {}",
                name,
                col.len(),
                self.n_rows()
            )));
        }
        match self.names.iter().position(|n| n == name) {
            Some(i) => self.cols[i] = col,
            None => {
                self.names.push(name.to_string());
                self.cols.push(col);
            }
        }
        Ok(())
    }

    /// Drop columns by name; names absent from the frame are ignored
    pub fn drop_columns(&mut self, names: &[&str]) {
        let mut i = 0;
        while i < self.names.len() {
            if names.contains(&self.names[i].as_str()) {
                self.names.remove(i);
                self.cols.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Remove a column and return it
    pub fn take(&mut self, name: &str) -> Result<Column> {
        let i = self.index_of(name)?;
        self.names.remove(i);
        Ok(self.cols.remove(i))
    }

    pub fn str_col(&self, name: &str) -> Result<&[Option<String>]> {
        match &self.cols[self.index_of(name)?] {
            Column::Str(v) => Ok(v),
            _ => Err(Error::Internal(format!("column '{}' is not text", name))),
        }
    }

    pub fn f64_col(&self, name: &str) -> Result<&[Option<f64>]> {
        match &self.cols[self.index_of(name)?] {
            Column::F64(v) => Ok(v),
            _ => Err(Error::Internal(format!("column '{}' is not numeric", name))),
        }
    }

    pub fn bin_col(&self, name: &str) -> Result<&[u8]> {
        match &self.cols[self.index_of(name)?] {
            Column::Bin(v) => Ok(v),
            _ => Err(Error::Internal(format!("column '{}' is not binary", name))),
        }
    }

    pub fn str_col_mut(&mut self, name: &str) -> Result<&mut Vec<Option<String>>> {
        let i = self.index_of(name)?;
        match &mut self.cols[i] {
            Column::Str(v) => Ok(v),
            _ => Err(Error::Internal(format!("column '{}' is not text", name))),
        }
    }

    pub fn f64_col_mut(&mut self, name: &str) -> Result<&mut Vec<Option<f64>>> {
        let i = self.index_of(name)?;
        match &mut self.cols[i] {
            Column::F64(v) => Ok(v),
            _ => Err(Error::Internal(format!("column '{}' is not numeric", name))),
        }
    }

    /// Keep only rows where `mask` is true (fit mode only; replay imputes)
    pub fn retain_rows(&mut self, mask: &[bool]) -> Result<()> {
        if mask.len() != self.n_rows() {
            return Err(Error::Internal(format!(
                "mask has {} entries, frame has {} rows",
                mask.len(),
                self.n_rows()
            )));
        }
        for col in &mut self.cols {
            col.retain(mask);
        }
        Ok(())
    }

    /// Produce the final numeric feature matrix, row-major.
    ///
    /// Fails if any text column or missing numeric value survived the
    /// pipeline, which indicates a stage bug rather than bad input.
    pub fn to_matrix(&self) -> Result<Vec<Vec<f64>>> {
        let mut matrix = vec![Vec::with_capacity(self.n_cols()); self.n_rows()];
        for (name, col) in self.names.iter().zip(&self.cols) {
            match col {
                Column::Str(_) => {
                    return Err(Error::Internal(format!(
                        "text column '{}' survived the pipeline",
                        name
                    )))
                }
                Column::F64(values) => {
                    for (row, v) in matrix.iter_mut().zip(values) {
                        row.push(v.ok_or_else(|| {
                            Error::Internal(format!("missing value in numeric column '{}'", name))
                        })?);
                    }
                }
                Column::Bin(values) => {
                    for (row, v) in matrix.iter_mut().zip(values) {
                        row.push(f64::from(*v));
                    }
                }
            }
        }
        Ok(matrix)
    }
}

fn decode_cell(cell: &serde_json::Value) -> Option<String> {
    match cell {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s == NAN_SENTINEL => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Convert a raw target price string to a float (strips `$` and `+`)
pub fn target_to_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim().trim_start_matches('$').trim_end_matches('+');
    crate::extract::rooms::parse_locale_f64(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_row() -> Vec<serde_json::Value> {
        vec![json!("for sale"); RAW_COLUMNS.len()]
    }

    #[test]
    fn decode_rows_with_sentinel() {
        let mut row = raw_row();
        row[2] = json!(NAN_SENTINEL);
        row[9] = json!(1200);
        let frame = Frame::from_rows(&[row]).unwrap();

        assert_eq!(frame.n_rows(), 1);
        assert_eq!(frame.n_cols(), RAW_COLUMNS.len());
        assert_eq!(frame.str_col("propertyType").unwrap()[0], None);
        assert_eq!(frame.str_col("sqft").unwrap()[0].as_deref(), Some("1200"));
    }

    #[test]
    fn decode_rows_with_target() {
        let mut row = raw_row();
        row.push(json!("$310,000"));
        let frame = Frame::from_rows(&[row]).unwrap();

        assert_eq!(frame.n_cols(), RAW_COLUMNS.len() + 1);
        assert_eq!(frame.f64_col(TARGET_COLUMN).unwrap()[0], Some(310000.0));
    }

    #[test]
    fn ragged_rows_rejected() {
        let short = vec![json!("x"); 5];
        assert!(Frame::from_rows(&[short]).is_err());
    }

    #[test]
    fn retain_rows_drops_across_all_columns() {
        let mut frame = Frame::new();
        frame
            .push(
                "a",
                Column::Str(vec![Some("x".into()), Some("y".into()), Some("z".into())]),
            )
            .unwrap();
        frame
            .push("b", Column::F64(vec![Some(1.0), Some(2.0), Some(3.0)]))
            .unwrap();
        frame.retain_rows(&[true, false, true]).unwrap();

        assert_eq!(frame.n_rows(), 2);
        assert_eq!(frame.f64_col("b").unwrap(), &[Some(1.0), Some(3.0)]);
    }

    #[test]
    fn replace_keeps_column_position() {
        let mut frame = Frame::new();
        frame.push("a", Column::Bin(vec![0])).unwrap();
        frame.push("b", Column::Bin(vec![1])).unwrap();
        frame.push("a", Column::Bin(vec![1])).unwrap();

        let names: Vec<_> = frame.column_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(frame.bin_col("a").unwrap(), &[1]);
    }

    #[test]
    fn to_matrix_preserves_column_order() {
        let mut frame = Frame::new();
        frame.push("x", Column::F64(vec![Some(0.5)])).unwrap();
        frame.push("y", Column::Bin(vec![1])).unwrap();
        let matrix = frame.to_matrix().unwrap();
        assert_eq!(matrix, vec![vec![0.5, 1.0]]);
    }

    #[test]
    fn to_matrix_rejects_text_columns() {
        let mut frame = Frame::new();
        frame.push("t", Column::Str(vec![Some("x".into())])).unwrap();
        assert!(frame.to_matrix().is_err());
    }
}
