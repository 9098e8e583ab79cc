//! Feature extraction over page graphs.
//!
//! Every block becomes one [`FeatureRow`]: nine node-level features computed
//! from the block alone, six relational features computed against its graph
//! neighbours, and the `(page_idx, node_idx)` join keys. Rows are ordered by
//! page, then by node.

mod export;
mod node;
mod relational;

pub use export::{features_file_name, write_csv, FEATURES_SUFFIX, TEXT_SNIPPET};
pub use node::NodeFeatures;
pub use relational::{IndentationReference, RelationalFeatures};

use rayon::prelude::*;

use crate::graph::PageGraph;
use crate::numbering::NumberingPatterns;

pub const FONT_SIZE: &str = "font_size";
pub const FONT_IS_BOLD: &str = "font_is_bold";
pub const NORM_X0: &str = "norm_x0";
pub const NORM_Y0: &str = "norm_y0";
pub const WORD_COUNT: &str = "word_count";
pub const CHAR_COUNT: &str = "char_count";
pub const UPPERCASE_RATIO: &str = "uppercase_ratio";
pub const ENDS_WITH_PUNCTUATION: &str = "ends_with_punctuation";
pub const NUMBERING_PATTERN: &str = "numbering_pattern";
pub const NODE_DEGREE: &str = "node_degree";
pub const AVG_NEIGHBOR_DISTANCE: &str = "avg_neighbor_distance";
pub const FONT_SIZE_RATIO: &str = "font_size_ratio";
pub const BOLD_VS_NEIGHBORS: &str = "bold_vs_neighbors";
pub const SPACE_ABOVE: &str = "space_above";
pub const INDENTATION_VS_BELOW: &str = "indentation_vs_below";

/// Join key: 1-based page index.
pub const PAGE_IDX: &str = "page_idx";
/// Join key: 0-based node index within the page.
pub const NODE_IDX: &str = "node_idx";

/// Computed feature columns, in row order.
pub const FEATURE_COLUMNS: [&str; 15] = [
    FONT_SIZE,
    FONT_IS_BOLD,
    NORM_X0,
    NORM_Y0,
    WORD_COUNT,
    CHAR_COUNT,
    UPPERCASE_RATIO,
    ENDS_WITH_PUNCTUATION,
    NUMBERING_PATTERN,
    NODE_DEGREE,
    AVG_NEIGHBOR_DISTANCE,
    FONT_SIZE_RATIO,
    BOLD_VS_NEIGHBORS,
    SPACE_ABOVE,
    INDENTATION_VS_BELOW,
];

/// Columns holding counts or 0/1 flags rather than measurements.
pub const INTEGER_COLUMNS: [&str; 7] = [
    FONT_IS_BOLD,
    WORD_COUNT,
    CHAR_COUNT,
    ENDS_WITH_PUNCTUATION,
    NUMBERING_PATTERN,
    NODE_DEGREE,
    BOLD_VS_NEIGHBORS,
];

/// Whether `name` holds whole-number values.
pub fn is_integer_column(name: &str) -> bool {
    INTEGER_COLUMNS.contains(&name)
}

/// Whether `name` is a join key rather than a model input.
pub fn is_join_key(name: &str) -> bool {
    name == PAGE_IDX || name == NODE_IDX
}

/// Feature values of one block plus its join keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// 1-based page index
    pub page_idx: u32,
    /// 0-based node index on the page
    pub node_idx: usize,
    columns: Vec<(&'static str, f64)>,
}

impl FeatureRow {
    /// Create a row from explicit columns.
    pub fn new(page_idx: u32, node_idx: usize, columns: Vec<(&'static str, f64)>) -> Self {
        Self {
            page_idx,
            node_idx,
            columns,
        }
    }

    /// Assemble a row from node-level and relational features.
    pub fn from_features(
        page_idx: u32,
        node_idx: usize,
        node: &NodeFeatures,
        rel: &RelationalFeatures,
    ) -> Self {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let columns = vec![
            (FONT_SIZE, node.font_size),
            (FONT_IS_BOLD, flag(node.font_is_bold)),
            (NORM_X0, node.norm_x0),
            (NORM_Y0, node.norm_y0),
            (WORD_COUNT, node.word_count as f64),
            (CHAR_COUNT, node.char_count as f64),
            (UPPERCASE_RATIO, node.uppercase_ratio),
            (ENDS_WITH_PUNCTUATION, flag(node.ends_with_punctuation)),
            (NUMBERING_PATTERN, flag(node.numbering_pattern)),
            (NODE_DEGREE, rel.node_degree as f64),
            (AVG_NEIGHBOR_DISTANCE, rel.avg_neighbor_distance),
            (FONT_SIZE_RATIO, rel.font_size_ratio),
            (BOLD_VS_NEIGHBORS, flag(rel.bold_vs_neighbors)),
            (SPACE_ABOVE, rel.space_above),
            (INDENTATION_VS_BELOW, rel.indentation_vs_below),
        ];
        Self::new(page_idx, node_idx, columns)
    }

    /// Value of the named column, if computed.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Columns in computation order.
    pub fn columns(&self) -> &[(&'static str, f64)] {
        &self.columns
    }

    /// Zero-based page index, as used in outline entries.
    pub fn zero_based_page(&self) -> u32 {
        self.page_idx.saturating_sub(1)
    }
}

/// All feature rows of a document, page-then-node ordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct column names in first-seen order.
    pub fn column_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for row in &self.rows {
            for (name, _) in row.columns() {
                if !names.contains(name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Values of one column; rows lacking it yield `None`.
    pub fn column(&self, name: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(name)).collect()
    }
}

/// Computes feature rows from page graphs.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    patterns: NumberingPatterns,
    indentation: IndentationReference,
}

impl FeatureExtractor {
    pub fn new(patterns: NumberingPatterns, indentation: IndentationReference) -> Self {
        Self {
            patterns,
            indentation,
        }
    }

    /// Rows for one page graph, in node order.
    pub fn extract_page(&self, graph: &PageGraph<'_>, page_idx: u32) -> Vec<FeatureRow> {
        (0..graph.node_count())
            .map(|node| {
                let node_features = NodeFeatures::compute(graph.block(node), &self.patterns);
                let rel = RelationalFeatures::compute(graph, node, self.indentation);
                FeatureRow::from_features(page_idx, node, &node_features, &rel)
            })
            .collect()
    }

    /// Rows for all pages. Graphs are numbered from 1 in slice order.
    pub fn extract(&self, graphs: &[PageGraph<'_>], parallel: bool) -> FeatureFrame {
        let per_page: Vec<Vec<FeatureRow>> = if parallel {
            graphs
                .par_iter()
                .enumerate()
                .map(|(i, g)| self.extract_page(g, i as u32 + 1))
                .collect()
        } else {
            graphs
                .iter()
                .enumerate()
                .map(|(i, g)| self.extract_page(g, i as u32 + 1))
                .collect()
        };

        FeatureFrame::new(per_page.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::model::{BBox, Block, Span};

    fn page_blocks(texts: &[&str]) -> Vec<Block> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let y = i as f64 * 20.0;
                Block::from_spans(BBox::new(50.0, y, 300.0, y + 12.0), vec![Span::plain(*t, 11.0)])
                    .with_page_size(612.0, 792.0)
            })
            .collect()
    }

    #[test]
    fn test_row_order_and_join_keys() {
        let p1 = page_blocks(&["a", "b", "c"]);
        let p2 = page_blocks(&[]);
        let p3 = page_blocks(&["d", "e"]);
        let builder = GraphBuilder::default();
        let graphs = vec![builder.build(&p1), builder.build(&p2), builder.build(&p3)];

        for parallel in [false, true] {
            let frame = FeatureExtractor::default().extract(&graphs, parallel);
            let keys: Vec<(u32, usize)> =
                frame.rows().iter().map(|r| (r.page_idx, r.node_idx)).collect();
            assert_eq!(keys, vec![(1, 0), (1, 1), (1, 2), (3, 0), (3, 1)]);
        }
    }

    #[test]
    fn test_row_has_all_columns() {
        let blocks = page_blocks(&["1 Intro", "Body text."]);
        let graph = GraphBuilder::default().build(&blocks);
        let rows = FeatureExtractor::default().extract_page(&graph, 1);

        assert_eq!(rows.len(), 2);
        let names: Vec<&str> = rows[0].columns().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, FEATURE_COLUMNS.to_vec());
        assert_eq!(rows[0].get(NUMBERING_PATTERN), Some(1.0));
        assert_eq!(rows[1].get(ENDS_WITH_PUNCTUATION), Some(1.0));
        assert_eq!(rows[0].get(NODE_DEGREE), Some(1.0));
        assert_eq!(rows[0].get("missing"), None);
    }

    #[test]
    fn test_numbering_independent_of_graph() {
        let alone = page_blocks(&["2.1 Method"]);
        let crowd = page_blocks(&["2.1 Method", "x", "y", "z", "w"]);
        let builder = GraphBuilder::default();
        let extractor = FeatureExtractor::default();

        let a = extractor.extract_page(&builder.build(&alone), 1);
        let b = extractor.extract_page(&builder.build(&crowd), 1);
        assert_eq!(a[0].get(NUMBERING_PATTERN), b[0].get(NUMBERING_PATTERN));
        assert_ne!(a[0].get(NODE_DEGREE), b[0].get(NODE_DEGREE));
    }

    #[test]
    fn test_frame_columns() {
        let frame = FeatureFrame::new(vec![
            FeatureRow::new(1, 0, vec![(FONT_SIZE, 12.0)]),
            FeatureRow::new(1, 1, vec![(FONT_SIZE, 10.0), (SPACE_ABOVE, 3.0)]),
        ]);
        assert_eq!(frame.column_names(), vec![FONT_SIZE, SPACE_ABOVE]);
        assert_eq!(frame.column(SPACE_ABOVE), vec![None, Some(3.0)]);
        assert!(is_join_key(PAGE_IDX));
        assert!(!is_join_key(FONT_SIZE));
    }
}
