//! The restricted SELECT-only query engine.

use crate::record::{LABEL_COLUMN, MEASUREMENT_COLUMNS};
use crate::{Dataset, Error, Result};
use std::path::Path;

/// Read-only query engine over a fixed [`Dataset`].
///
/// The accepted query surface is intentionally tiny: the text must start
/// with `select` (any case), and a query mentioning `avg`, `group by`, and
/// `species` runs the grouped-mean aggregation. Every other SELECT returns
/// the whole dataset as CSV.
pub struct QueryEngine {
    dataset: Dataset,
}

impl QueryEngine {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    /// Engine over the bundled iris dataset.
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(Dataset::embedded()?))
    }

    /// Engine over a CSV file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Dataset::load(path)?))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Execute a query, returning the result as CSV text.
    ///
    /// Errors are soft conditions for the caller to report back into the
    /// conversation; they never carry partial output.
    pub fn query(&self, sql: &str) -> Result<String> {
        let lowered = sql.trim().to_lowercase();

        if !lowered.starts_with("select") {
            return Err(Error::UnsupportedStatement);
        }

        if lowered.contains("avg")
            && lowered.contains("group by")
            && lowered.contains(LABEL_COLUMN)
        {
            return Ok(self.grouped_means());
        }

        // Fallback: dump the full dataset for any other SELECT.
        Ok(self.full_dataset())
    }

    /// Mean of each measurement column per species, rounded to 2 decimals,
    /// species rows in first-seen order.
    fn grouped_means(&self) -> String {
        struct Group {
            species: String,
            count: usize,
            sums: [f64; 4],
        }

        let mut groups: Vec<Group> = Vec::new();
        for record in self.dataset.records() {
            let idx = match groups.iter().position(|g| g.species == record.species) {
                Some(i) => i,
                None => {
                    groups.push(Group {
                        species: record.species.clone(),
                        count: 0,
                        sums: [0.0; 4],
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx];
            group.count += 1;
            for (sum, value) in group.sums.iter_mut().zip(record.measurements()) {
                *sum += value;
            }
        }

        let mut header: Vec<String> = vec![LABEL_COLUMN.to_string()];
        header.extend(MEASUREMENT_COLUMNS.iter().map(|c| format!("{c}_mean")));

        let mut lines = vec![header.join(",")];
        for group in groups {
            let mut fields = vec![group.species];
            for sum in group.sums {
                fields.push(format!("{:.2}", sum / group.count as f64));
            }
            lines.push(fields.join(","));
        }

        lines.join("\n")
    }

    /// The entire dataset as CSV with a header line.
    fn full_dataset(&self) -> String {
        let mut header: Vec<&str> = MEASUREMENT_COLUMNS.to_vec();
        header.push(LABEL_COLUMN);

        let mut lines = vec![header.join(",")];
        for record in self.dataset.records() {
            let mut fields: Vec<String> = record
                .measurements()
                .iter()
                .map(|v| v.to_string())
                .collect();
            fields.push(record.species.clone());
            lines.push(fields.join(","));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_engine() -> QueryEngine {
        let csv = "sepal_length,sepal_width,petal_length,petal_width,species\n\
                   1.0,2.0,3.0,4.0,b_species\n\
                   3.0,4.0,5.0,6.0,b_species\n\
                   2.0,2.0,2.0,2.0,a_species\n";
        QueryEngine::new(Dataset::from_csv(csv).unwrap())
    }

    #[test]
    fn rejects_non_select() {
        let engine = small_engine();
        for sql in ["DROP TABLE iris", "update iris set x = 1", "  delete"] {
            assert!(matches!(
                engine.query(sql),
                Err(Error::UnsupportedStatement)
            ));
        }
    }

    #[test]
    fn select_verb_is_case_insensitive() {
        let engine = small_engine();
        assert!(engine.query("  SeLeCt * from iris").is_ok());
    }

    #[test]
    fn grouped_means_one_row_per_species() {
        let engine = small_engine();
        let out = engine
            .query("SELECT species, AVG(sepal_length) FROM iris GROUP BY species")
            .unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(
            lines[0],
            "species,sepal_length_mean,sepal_width_mean,petal_length_mean,petal_width_mean"
        );
        // First-seen order, not sorted: b_species appears before a_species.
        assert_eq!(lines[1], "b_species,2.00,3.00,4.00,5.00");
        assert_eq!(lines[2], "a_species,2.00,2.00,2.00,2.00");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn grouped_means_round_to_two_decimals() {
        let csv = "sepal_length,sepal_width,petal_length,petal_width,species\n\
                   1.0,1.0,1.0,1.0,x\n\
                   2.0,1.0,1.0,1.0,x\n\
                   2.0,1.0,1.0,1.0,x\n";
        let engine = QueryEngine::new(Dataset::from_csv(csv).unwrap());
        let out = engine
            .query("select avg(sepal_length) from iris group by species")
            .unwrap();
        // 5/3 rounds to 1.67
        assert!(out.lines().nth(1).unwrap().starts_with("x,1.67,"));
    }

    #[test]
    fn group_counts_cover_every_record() {
        let engine = QueryEngine::embedded().unwrap();
        let out = engine
            .query("select avg(petal_length) from iris group by species")
            .unwrap();
        // 3 species plus a header for the 150-record dataset.
        assert_eq!(out.lines().count(), 4);

        let full = engine.query("select * from iris").unwrap();
        assert_eq!(full.lines().count(), engine.dataset().len() + 1);
    }

    #[test]
    fn plain_select_falls_back_to_full_dataset() {
        let engine = small_engine();
        let out = engine.query("select petal_width from iris").unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(
            lines[0],
            "sepal_length,sepal_width,petal_length,petal_width,species"
        );
        assert_eq!(lines.len(), engine.dataset().len() + 1);
        assert_eq!(lines[1], "1,2,3,4,b_species");
    }

    #[test]
    fn aggregate_requires_all_three_markers() {
        let engine = small_engine();
        // Missing "group by": falls back to the full dataset.
        let out = engine.query("select avg(sepal_length) from iris").unwrap();
        assert_eq!(out.lines().count(), engine.dataset().len() + 1);
    }
}
