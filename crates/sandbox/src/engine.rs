//! The Rhai evaluation context and its injected capabilities.

use crate::chart::{Bar, ChartConfig};
use crate::{Error, Result};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Scope};
use std::cell::RefCell;
use std::rc::Rc;

/// Name of the constant holding the latest query result inside scripts.
const CSV_BINDING: &str = "csv_text";

/// Shared output buffer the capabilities append to.
type OutputBuffer = Rc<RefCell<String>>;

/// Executes scripts in a fresh, capability-scoped engine per call.
///
/// Scripts see exactly these host functions and nothing else:
///
/// - `print` / `debug` / `log`: append to the captured output buffer
///   (`log` renders maps and arrays as pretty JSON);
/// - `print_table(rows)`: aligned text table from an array of maps;
/// - `parse_csv(text)`: array of field-keyed maps with numeric coercion;
/// - `create_chart(rows, title [, filename])` and its `save_chart`
///   alias: write an SVG bar chart and confirm the path in the output;
/// - `json_encode` / `json_decode`.
///
/// The latest tabular result is bound as the `csv_text` constant.
pub struct ScriptSandbox {
    chart: ChartConfig,
}

impl ScriptSandbox {
    pub fn new(chart: ChartConfig) -> Self {
        Self { chart }
    }

    /// Run a script against the given CSV text, returning the trimmed
    /// captured output.
    pub fn run(&self, script: &str, csv_text: &str) -> Result<String> {
        let buffer: OutputBuffer = Rc::new(RefCell::new(String::new()));
        let engine = self.build_engine(buffer.clone());

        let mut scope = Scope::new();
        scope.push_constant(CSV_BINDING, csv_text.to_string());

        engine
            .run_with_scope(&mut scope, script)
            .map_err(|e| Error::Eval(e.to_string()))?;

        let output = buffer.borrow().trim().to_string();
        Ok(output)
    }

    fn build_engine(&self, buffer: OutputBuffer) -> Engine {
        let mut engine = Engine::new();

        // Runaway-script limits; generous for the analysis workloads the
        // model actually writes.
        engine.set_max_operations(1_000_000);
        engine.set_max_call_levels(64);

        // No module loading, no nested evaluation.
        engine.disable_symbol("import");
        engine.disable_symbol("eval");

        let out = buffer.clone();
        engine.on_print(move |text| append_line(&out, text));
        let out = buffer.clone();
        engine.on_debug(move |text, _source, _pos| append_line(&out, text));

        let out = buffer.clone();
        engine.register_fn("log", move |value: Dynamic| {
            append_line(&out, &render_value(&value));
        });

        let out = buffer.clone();
        engine.register_fn("print_table", move |rows: Array| {
            append_line(&out, &format_table(&rows));
        });

        engine.register_fn("parse_csv", |text: &str| -> Array { parse_csv(text) });

        engine.register_fn(
            "json_encode",
            |value: Dynamic| -> std::result::Result<String, Box<EvalAltResult>> {
                let json: serde_json::Value = rhai::serde::from_dynamic(&value)?;
                serde_json::to_string(&json).map_err(|e| e.to_string().into())
            },
        );
        engine.register_fn(
            "json_decode",
            |text: &str| -> std::result::Result<Dynamic, Box<EvalAltResult>> {
                let json: serde_json::Value = serde_json::from_str(text)
                    .map_err(|e| -> Box<EvalAltResult> { e.to_string().into() })?;
                rhai::serde::to_dynamic(json)
            },
        );

        // The chart writer answers to both names scripts tend to use.
        for name in ["create_chart", "save_chart"] {
            let config = self.chart.clone();
            let out = buffer.clone();
            engine.register_fn(
                name,
                move |rows: Array,
                      title: &str|
                      -> std::result::Result<Array, Box<EvalAltResult>> {
                    chart_call(&config, &out, &rows, title, None)
                },
            );

            let config = self.chart.clone();
            let out = buffer.clone();
            engine.register_fn(
                name,
                move |rows: Array,
                      title: &str,
                      filename: &str|
                      -> std::result::Result<Array, Box<EvalAltResult>> {
                    chart_call(&config, &out, &rows, title, Some(filename))
                },
            );
        }

        engine
    }
}

impl Default for ScriptSandbox {
    fn default() -> Self {
        Self::new(ChartConfig::default())
    }
}

fn append_line(buffer: &OutputBuffer, text: &str) {
    let mut out = buffer.borrow_mut();
    out.push_str(text);
    out.push('\n');
}

/// Strings pass through as-is; everything else renders as pretty JSON
/// where possible.
fn render_value(value: &Dynamic) -> String {
    if value.is_string() {
        return value.clone().into_string().unwrap_or_default();
    }
    match rhai::serde::from_dynamic::<serde_json::Value>(value) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

/// Parse delimited text (as produced by the query engine) into an array of
/// field-keyed maps, coercing values to floats where they parse.
fn parse_csv(text: &str) -> Array {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Array::new();
    }

    let mut lines = trimmed.lines();
    let headers: Vec<String> = match lines.next() {
        Some(header) => header.split(',').map(|h| h.trim().to_string()).collect(),
        None => return Array::new(),
    };

    let mut rows = Array::new();
    for line in lines {
        let mut map = Map::new();
        for (header, value) in headers.iter().zip(line.split(',')) {
            let value = value.trim();
            let field = match value.parse::<f64>() {
                Ok(number) => Dynamic::from_float(number),
                Err(_) => Dynamic::from(value.to_string()),
            };
            map.insert(header.as_str().into(), field);
        }
        rows.push(map.into());
    }

    rows
}

/// Render an array of maps as an aligned text table.
fn format_table(rows: &Array) -> String {
    let maps: Vec<Map> = rows
        .iter()
        .filter_map(|row| row.clone().try_cast::<Map>())
        .collect();

    let Some(first) = maps.first() else {
        return "(empty table)".to_string();
    };

    let columns: Vec<String> = first.keys().map(|k| k.to_string()).collect();
    let cells: Vec<Vec<String>> = maps
        .iter()
        .map(|map| {
            columns
                .iter()
                .map(|c| map.get(c.as_str()).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain([column.len()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |fields: &[String]| {
        fields
            .iter()
            .zip(&widths)
            .map(|(field, width)| format!("{field:<w$}", w = *width))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut lines = vec![format_row(&columns)];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(format_row(row));
    }

    lines.join("\n")
}

fn cell_text(value: &Dynamic) -> String {
    if value.is_string() {
        value.clone().into_string().unwrap_or_default()
    } else {
        value.to_string()
    }
}

/// Normalize chart input rows with a field-name fallback chain: `label`
/// then `species` for the label, `value` then `petal_length` then `y`
/// for the value, non-numeric values becoming 0.
fn normalize_rows(rows: &Array) -> Vec<Bar> {
    rows.iter()
        .enumerate()
        .map(|(index, item)| {
            let Some(map) = item.clone().try_cast::<Map>() else {
                return Bar {
                    label: format!("Row {}", index + 1),
                    value: 0.0,
                };
            };

            let label = ["label", "species"]
                .iter()
                .find_map(|key| map.get(*key))
                .map(cell_text)
                .unwrap_or_else(|| format!("Row {}", index + 1));

            let value = ["value", "petal_length", "y"]
                .iter()
                .find_map(|key| map.get(*key))
                .map(numeric_value)
                .unwrap_or(0.0);

            Bar { label, value }
        })
        .collect()
}

fn numeric_value(value: &Dynamic) -> f64 {
    let number = if value.is_float() {
        value.as_float().unwrap_or(0.0)
    } else if value.is_int() {
        value.as_int().map(|n| n as f64).unwrap_or(0.0)
    } else if value.is_string() {
        value
            .clone()
            .into_string()
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0)
    } else {
        0.0
    };

    if number.is_finite() { number } else { 0.0 }
}

fn chart_call(
    config: &ChartConfig,
    buffer: &OutputBuffer,
    rows: &Array,
    title: &str,
    filename: Option<&str>,
) -> std::result::Result<Array, Box<EvalAltResult>> {
    let bars = normalize_rows(rows);
    let path = config
        .write(&bars, title, filename)
        .map_err(|e| -> Box<EvalAltResult> { e.to_string().into() })?;

    append_line(buffer, &format!("[Saved figure to {}]", path.display()));

    Ok(bars
        .into_iter()
        .map(|bar| {
            let mut map = Map::new();
            map.insert("label".into(), Dynamic::from(bar.label));
            map.insert("value".into(), Dynamic::from_float(bar.value));
            Dynamic::from(map)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox_in(dir: &std::path::Path) -> ScriptSandbox {
        ScriptSandbox::new(ChartConfig {
            output_dir: dir.to_path_buf(),
            default_filename: "plot.svg".to_string(),
        })
    }

    const MEANS_CSV: &str = "species,petal_length_mean\nsetosa,1.46\nversicolor,4.26\n";

    #[test]
    fn print_output_is_captured_and_trimmed() {
        let sandbox = ScriptSandbox::default();
        let out = sandbox.run(r#"print("hello"); print(42);"#, "").unwrap();
        assert_eq!(out, "hello\n42");
    }

    #[test]
    fn csv_binding_is_visible_to_scripts() {
        let sandbox = ScriptSandbox::default();
        let out = sandbox
            .run(
                r#"
                let rows = parse_csv(csv_text);
                print(rows.len());
                print(rows[0].species);
                print(rows[1].petal_length_mean);
                "#,
                MEANS_CSV,
            )
            .unwrap();
        assert_eq!(out, "2\nsetosa\n4.26");
    }

    #[test]
    fn parse_csv_coerces_numeric_fields() {
        let rows = parse_csv("name,score\nalpha,1.5\nbeta,oops\n");
        assert_eq!(rows.len(), 2);

        let first = rows[0].clone().try_cast::<Map>().unwrap();
        assert!(first.get("score").unwrap().is_float());
        let second = rows[1].clone().try_cast::<Map>().unwrap();
        assert!(second.get("score").unwrap().is_string());
    }

    #[test]
    fn parse_csv_of_empty_text_is_empty() {
        assert!(parse_csv("   ").is_empty());
    }

    #[test]
    fn log_renders_maps_as_json() {
        let sandbox = ScriptSandbox::default();
        let out = sandbox.run(r#"log(#{alpha: 1});"#, "").unwrap();
        assert!(out.contains(r#""alpha": 1"#));
    }

    #[test]
    fn print_table_aligns_columns() {
        let sandbox = ScriptSandbox::default();
        let out = sandbox
            .run(r#"print_table(parse_csv(csv_text));"#, MEANS_CSV)
            .unwrap();
        assert!(out.contains("species"));
        assert!(out.contains("setosa"));
        assert!(out.contains("-+-"));
    }

    #[test]
    fn create_chart_writes_file_and_confirms() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = sandbox_in(dir.path());
        let out = sandbox
            .run(
                r#"
                let rows = [#{label: "a", value: 10.0}, #{label: "b", value: 5.0}];
                create_chart(rows, "Demo");
                "#,
                "",
            )
            .unwrap();
        assert!(out.contains("[Saved figure to"));
        assert!(dir.path().join("plot.svg").exists());
    }

    #[test]
    fn chart_filename_override_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = sandbox_in(dir.path());
        sandbox
            .run(
                r#"save_chart([#{label: "a", value: 1.0}], "Demo", "custom.svg");"#,
                "",
            )
            .unwrap();
        assert!(dir.path().join("custom.svg").exists());
        assert!(!dir.path().join("plot.svg").exists());
    }

    #[test]
    fn chart_rows_fall_back_to_species_and_petal_length() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = sandbox_in(dir.path());
        let out = sandbox
            .run(
                r#"
                let rows = parse_csv(csv_text);
                let bars = create_chart(rows, "Means");
                print(bars[0].label);
                print(bars[0].value);
                "#,
                "species,petal_length\nsetosa,1.46\n",
            )
            .unwrap();
        assert!(out.contains("setosa"));
        assert!(out.contains("1.46"));
    }

    #[test]
    fn empty_chart_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = sandbox_in(dir.path());
        let err = sandbox
            .run(r#"create_chart([], "Demo");"#, "")
            .unwrap_err();
        assert!(matches!(err, Error::Eval(ref msg) if msg.contains("Chart data is empty.")));
        assert!(!dir.path().join("plot.svg").exists());
    }

    #[test]
    fn script_failures_become_eval_errors() {
        let sandbox = ScriptSandbox::default();
        let err = sandbox.run("no_such_function();", "").unwrap_err();
        assert!(matches!(err, Error::Eval(_)));
    }

    #[test]
    fn json_round_trip() {
        let sandbox = ScriptSandbox::default();
        let out = sandbox
            .run(
                r#"
                let value = json_decode("{\"x\": 3}");
                print(json_encode(value));
                "#,
                "",
            )
            .unwrap();
        assert!(out.contains(r#"{"x":3}"#));
    }
}
