//! CSV export of feature frames for labelling.

use std::io::Write;
use std::path::Path;

use super::{is_integer_column, FeatureFrame, NODE_IDX, PAGE_IDX};
use crate::error::Result;
use crate::model::Page;

/// Column holding the start of each block's first line.
pub const TEXT_SNIPPET: &str = "text_snippet";

const SNIPPET_CHARS: usize = 50;

/// Suffix of per-document feature tables written for labelling.
pub const FEATURES_SUFFIX: &str = "_blocks_unlabeled.csv";

/// File name of the feature table for `input`, e.g. `report_blocks_unlabeled.csv`.
pub fn features_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    format!("{}{}", stem, FEATURES_SUFFIX)
}

/// Counts and flags are written as integers, measurements always carry a
/// fractional part (`12.0`). Missing values are left empty.
fn format_value(name: &str, value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if is_integer_column(name) && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{:?}", value)
    }
}

/// Write `frame` as CSV: feature columns, then the join keys, then a short
/// text snippet looked up in `pages` (indexed by `page_idx - 1`).
pub fn write_csv<W: Write>(frame: &FeatureFrame, pages: &[Page], writer: W) -> Result<()> {
    let columns = frame.column_names();
    let mut csv = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = columns.clone();
    header.extend([PAGE_IDX, NODE_IDX, TEXT_SNIPPET]);
    csv.write_record(&header)?;

    for row in frame.rows() {
        let mut record: Vec<String> = columns
            .iter()
            .map(|name| row.get(name).map(|v| format_value(name, v)).unwrap_or_default())
            .collect();
        record.push(row.page_idx.to_string());
        record.push(row.node_idx.to_string());

        let snippet = pages
            .get(row.zero_based_page() as usize)
            .and_then(|p| p.blocks.get(row.node_idx))
            .map(|b| b.first_line_text().chars().take(SNIPPET_CHARS).collect())
            .unwrap_or_default();
        record.push(snippet);

        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureRow, FONT_IS_BOLD, FONT_SIZE, NODE_DEGREE, SPACE_ABOVE, UPPERCASE_RATIO};
    use crate::model::{BBox, Block, Span};

    #[test]
    fn test_csv_layout() {
        let long = "x".repeat(80);
        let page = Page::letter(1)
            .with_block(Block::from_spans(BBox::default(), vec![Span::plain("Intro, part one", 12.0)]))
            .with_block(Block::from_spans(BBox::default(), vec![Span::plain(long, 10.0)]));
        let frame = FeatureFrame::new(vec![
            FeatureRow::new(1, 0, vec![(FONT_SIZE, 12.0), (SPACE_ABOVE, 0.0)]),
            FeatureRow::new(1, 1, vec![(FONT_SIZE, 10.5), (SPACE_ABOVE, 4.0)]),
        ]);

        let mut out = Vec::new();
        write_csv(&frame, &[page], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "font_size,space_above,page_idx,node_idx,text_snippet");
        assert_eq!(lines[1], "12.0,0.0,1,0,\"Intro, part one\"");
        assert_eq!(lines[2], format!("10.5,4.0,1,1,{}", "x".repeat(50)));
    }

    #[test]
    fn test_integer_and_float_columns() {
        let page = Page::letter(1)
            .with_block(Block::from_spans(BBox::default(), vec![Span::plain("HEAD", 14.0)]));
        let frame = FeatureFrame::new(vec![FeatureRow::new(
            1,
            0,
            vec![
                (FONT_SIZE, 14.0),
                (FONT_IS_BOLD, 1.0),
                (UPPERCASE_RATIO, 1.0),
                (NODE_DEGREE, 3.0),
                (SPACE_ABOVE, f64::NAN),
            ],
        )]);

        let mut out = Vec::new();
        write_csv(&frame, &[page], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "font_size,font_is_bold,uppercase_ratio,node_degree,space_above,page_idx,node_idx,text_snippet"
        );
        assert_eq!(lines[1], "14.0,1,1.0,3,,1,0,HEAD");
    }

    #[test]
    fn test_features_file_name() {
        assert_eq!(
            features_file_name(Path::new("data/samples/sample1.pdf")),
            "sample1_blocks_unlabeled.csv"
        );
        assert_eq!(features_file_name(Path::new("dump.v2.json")), "dump.v2_blocks_unlabeled.csv");
    }
}
