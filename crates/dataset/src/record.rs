//! Dataset records and CSV loading.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column names of the numeric measurements, in output order.
pub const MEASUREMENT_COLUMNS: [&str; 4] = [
    "sepal_length",
    "sepal_width",
    "petal_length",
    "petal_width",
];

/// Name of the categorical label column.
pub const LABEL_COLUMN: &str = "species";

/// The iris dataset bundled with the crate.
const EMBEDDED_CSV: &str = include_str!("../data/iris.csv");

/// A single dataset row: four numeric measurements and a species label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub sepal_length: f64,
    pub sepal_width: f64,
    pub petal_length: f64,
    pub petal_width: f64,
    pub species: String,
}

impl Record {
    /// Measurement values in the same order as [`MEASUREMENT_COLUMNS`].
    pub fn measurements(&self) -> [f64; 4] {
        [
            self.sepal_length,
            self.sepal_width,
            self.petal_length,
            self.petal_width,
        ]
    }
}

/// An ordered, immutable collection of records.
///
/// Loaded once at startup; record order is the insertion order of the
/// source CSV and is preserved through every operation downstream.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// The dataset shipped with the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_csv(EMBEDDED_CSV)
    }

    /// Load a dataset from a CSV file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_csv(&content)
    }

    /// Parse a dataset from CSV text with a header line.
    pub fn from_csv(csv: &str) -> Result<Self> {
        let mut lines = csv.trim().lines().enumerate();

        let (_, header) = lines.next().ok_or(Error::EmptyDataset)?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();

        let col = |name: &str| -> Result<usize> {
            columns
                .iter()
                .position(|c| *c == name)
                .ok_or_else(|| Error::MalformedCsv {
                    line: 1,
                    reason: format!("missing column '{name}'"),
                })
        };

        let idx = [
            col(MEASUREMENT_COLUMNS[0])?,
            col(MEASUREMENT_COLUMNS[1])?,
            col(MEASUREMENT_COLUMNS[2])?,
            col(MEASUREMENT_COLUMNS[3])?,
            col(LABEL_COLUMN)?,
        ];

        let mut records = Vec::new();
        for (n, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != columns.len() {
                return Err(Error::MalformedCsv {
                    line: n + 1,
                    reason: format!(
                        "expected {} fields, found {}",
                        columns.len(),
                        fields.len()
                    ),
                });
            }

            let number = |i: usize| -> Result<f64> {
                fields[idx[i]].parse().map_err(|_| Error::MalformedCsv {
                    line: n + 1,
                    reason: format!("'{}' is not a number", fields[idx[i]]),
                })
            };

            records.push(Record {
                sepal_length: number(0)?,
                sepal_width: number(1)?,
                petal_length: number(2)?,
                petal_width: number(3)?,
                species: fields[idx[4]].to_string(),
            });
        }

        if records.is_empty() {
            return Err(Error::EmptyDataset);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
