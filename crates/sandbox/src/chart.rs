//! SVG bar chart rendering.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

const WIDTH: f64 = 480.0;
const HEIGHT: f64 = 320.0;
const PADDING: f64 = 40.0;

/// One bar of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// Where chart files land and what they are called by default.
#[derive(Debug, Clone)]
pub struct ChartConfig {
    /// Directory chart files are written into.
    pub output_dir: PathBuf,
    /// Filename used when the script does not supply one.
    pub default_filename: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            default_filename: "iris_plot.svg".to_string(),
        }
    }
}

impl ChartConfig {
    /// Render a bar chart and write it to disk, overwriting any previous
    /// file of the same name. Returns the path written.
    pub fn write(&self, bars: &[Bar], title: &str, filename: Option<&str>) -> Result<PathBuf> {
        let svg = render(bars, title)?;
        let path = self
            .output_dir
            .join(filename.unwrap_or(&self.default_filename));
        std::fs::write(&path, svg)?;
        Ok(path)
    }
}

/// Render a vertical bar chart as a self-contained SVG document.
///
/// Fixed 480x320 canvas with 40px padding; bar width is the chart width
/// divided by the bar count, and bar height scales with value/max. An
/// empty bar set is an error.
pub fn render(bars: &[Bar], title: &str) -> Result<String> {
    if bars.is_empty() {
        return Err(Error::EmptyChart);
    }

    let chart_width = WIDTH - PADDING * 2.0;
    let chart_height = HEIGHT - PADDING * 2.0;
    let max_value = bars.iter().map(|b| b.value).fold(1.0_f64, f64::max);
    let bar_width = chart_width / bars.len() as f64;

    let mut parts = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        format!(r#"<svg width="{WIDTH}" height="{HEIGHT}" xmlns="http://www.w3.org/2000/svg">"#),
        format!(r##"<rect width="{WIDTH}" height="{HEIGHT}" fill="white" stroke="#ddd"/>"##),
        format!(
            r#"<text x="{}" y="24" text-anchor="middle" font-family="Arial" font-size="16">{}</text>"#,
            WIDTH / 2.0,
            escape(title)
        ),
        format!(
            r##"<line x1="{PADDING}" y1="{}" x2="{}" y2="{}" stroke="#333"/>"##,
            HEIGHT - PADDING,
            WIDTH - PADDING,
            HEIGHT - PADDING
        ),
        format!(
            r##"<line x1="{PADDING}" y1="{PADDING}" x2="{PADDING}" y2="{}" stroke="#333"/>"##,
            HEIGHT - PADDING
        ),
    ];

    for (index, bar) in bars.iter().enumerate() {
        let x = PADDING + index as f64 * bar_width + bar_width * 0.1;
        let usable_width = bar_width * 0.8;
        let scaled_height = (bar.value / max_value) * chart_height;
        let y = HEIGHT - PADDING - scaled_height;

        parts.push(format!(
            r##"<rect x="{x:.2}" y="{y:.2}" width="{usable_width:.2}" height="{scaled_height:.2}" fill="#4E79A7"/>"##
        ));
        parts.push(format!(
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-family="Arial" font-size="10">{:.2}</text>"#,
            x + usable_width / 2.0,
            y - 5.0,
            bar.value
        ));
        parts.push(format!(
            r#"<text x="{:.2}" y="{}" text-anchor="middle" font-family="Arial" font-size="12">{}</text>"#,
            x + usable_width / 2.0,
            HEIGHT - PADDING / 2.0,
            escape(&bar.label)
        ));
    }

    parts.push("</svg>".to_string());
    Ok(parts.join("\n"))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars() -> Vec<Bar> {
        vec![
            Bar {
                label: "a".to_string(),
                value: 10.0,
            },
            Bar {
                label: "b".to_string(),
                value: 5.0,
            },
        ]
    }

    #[test]
    fn empty_bars_are_rejected() {
        assert!(matches!(render(&[], "Demo"), Err(Error::EmptyChart)));
    }

    #[test]
    fn bar_heights_scale_with_values() {
        let svg = render(&bars(), "Demo").unwrap();
        // Chart height is 240; a (the max) fills it, b is exactly half.
        assert!(svg.contains(r#"height="240.00""#));
        assert!(svg.contains(r#"height="120.00""#));
        // The tallest bar starts at the top of the chart area.
        assert!(svg.contains(r#"y="40.00""#));
    }

    #[test]
    fn tallest_bar_is_the_first_label() {
        let svg = render(&bars(), "Demo").unwrap();
        let a_rect = svg.find(r#"height="240.00""#).unwrap();
        let b_rect = svg.find(r#"height="120.00""#).unwrap();
        assert!(a_rect < b_rect);
    }

    #[test]
    fn title_and_labels_are_present() {
        let svg = render(&bars(), "Petal Length").unwrap();
        assert!(svg.contains("Petal Length"));
        assert!(svg.contains(">a</text>"));
        assert!(svg.contains(">b</text>"));
    }

    #[test]
    fn title_is_escaped() {
        let svg = render(&bars(), "a < b & c").unwrap();
        assert!(svg.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChartConfig {
            output_dir: dir.path().to_path_buf(),
            default_filename: "plot.svg".to_string(),
        };

        let first = config.write(&bars(), "One", None).unwrap();
        let second = config.write(&bars(), "Two", None).unwrap();
        assert_eq!(first, second);

        let content = std::fs::read_to_string(second).unwrap();
        assert!(content.contains("Two"));
        assert!(!content.contains(">One<"));
    }
}
