use std::{fs::File, io, path::Path};

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::{MlErr, Result};

/// A tabular dataset of samples, each one being `x_size` features followed by a single target.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl Dataset {
    /// Creates a new `Dataset` from a flat, row-major buffer.
    ///
    /// # Arguments
    /// * `data` - The samples, `x_size + 1` values per row with the target last.
    /// * `x_size` - The amount of features per sample.
    ///
    /// # Returns
    /// A new `Dataset` or an error if the buffer can't be split in whole rows.
    pub fn new(data: Vec<f64>, x_size: usize) -> Result<Self> {
        let row_size = x_size + 1;
        if data.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        if data.len() % row_size != 0 {
            return Err(MlErr::SizeMismatch {
                what: "dataset rows",
                got: data.len() % row_size,
                expected: 0,
            });
        }

        let full = Array2::from_shape_vec((data.len() / row_size, row_size), data).map_err(
            |_| MlErr::SizeMismatch {
                what: "dataset shape",
                got: 0,
                expected: row_size,
            },
        )?;

        let x = full.slice(ndarray::s![.., ..x_size]).to_owned();
        let y = full.column(x_size).to_owned();
        Ok(Self { x, y })
    }

    /// Reads a dataset from a CSV file with a header row.
    ///
    /// Every record must have exactly `x_size + 1` numeric columns.
    pub fn from_csv<P: AsRef<Path>>(path: P, x_size: usize) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading dataset from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(file, x_size)
    }

    /// Same as [`Dataset::from_csv`] but over any reader.
    pub fn from_reader<R: io::Read>(reader: R, x_size: usize) -> Result<Self> {
        let row_size = x_size + 1;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut data = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            if record.len() != row_size {
                return Err(MlErr::Dataset {
                    line,
                    reason: format!(
                        "expected {row_size} columns ({x_size} features + 1 target), got {}",
                        record.len()
                    ),
                });
            }

            for field in record.iter() {
                let value: f64 = field.parse().map_err(|_| MlErr::Dataset {
                    line,
                    reason: format!("cannot parse '{field}' as a number"),
                })?;

                if !value.is_finite() {
                    return Err(MlErr::Dataset {
                        line,
                        reason: format!("'{field}' is not a finite number"),
                    });
                }

                data.push(value);
            }
        }

        Self::new(data, x_size)
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    /// Returns the amount of features per sample.
    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    /// The feature columns, one row per sample.
    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    /// The target column.
    pub fn targets(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_splits_features_and_target() {
        let ds = Dataset::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.x_size(), 2);
        assert_eq!(ds.features().row(1).to_vec(), vec![4.0, 5.0]);
        assert_eq!(ds.targets().to_vec(), vec![3.0, 6.0]);
    }

    #[test]
    fn dataset_rejects_partial_rows() {
        let res = Dataset::new(vec![1.0, 2.0, 3.0, 4.0], 2);
        assert!(matches!(res, Err(MlErr::SizeMismatch { .. })));
    }

    #[test]
    fn csv_reads_header_and_rows() {
        let csv = "a,b,y\n1, 2, 3\n4,5,6\n";
        let ds = Dataset::from_reader(csv.as_bytes(), 2).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.features().row(0).to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn csv_rejects_wrong_column_count() {
        let csv = "a,b\n1,2\n";
        let res = Dataset::from_reader(csv.as_bytes(), 2);
        assert!(matches!(res, Err(MlErr::Dataset { line: 2, .. })));
    }

    #[test]
    fn csv_rejects_non_numeric_cells() {
        let csv = "a,b,y\n1,x,3\n";
        let res = Dataset::from_reader(csv.as_bytes(), 2);
        assert!(matches!(res, Err(MlErr::Dataset { .. })));
    }

    #[test]
    fn csv_without_rows_is_empty() {
        let csv = "a,b,y\n";
        let res = Dataset::from_reader(csv.as_bytes(), 2);
        assert!(matches!(res, Err(MlErr::EmptyDataset)));
    }
}
