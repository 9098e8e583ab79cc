//! Integration tests for graph construction, features, hierarchy and the pipeline.

use std::sync::Arc;

use outline_graph::features::{FONT_SIZE, FONT_SIZE_RATIO, NODE_DEGREE, NUMBERING_PATTERN};
use outline_graph::hierarchy::TitleSource;
use outline_graph::render::{to_json, JsonFormat};
use outline_graph::{
    assign_hierarchy, BBox, Block, DeepLevelPolicy, DocumentOutline, FeatureExtractor,
    FeatureManifest, FeatureMatrix, GraphBuilder, HeadingCandidate, Label, Labeler, Level,
    NumberingPatterns, OutlineEntry, Page, PageGraph, Pipeline, PipelineOptions, Result, Span,
};

/// Labels every row with the same label.
struct ConstantLabeler {
    label: Label,
    manifest: FeatureManifest,
}

impl ConstantLabeler {
    fn new(label: Label) -> Self {
        Self {
            label,
            manifest: [FONT_SIZE].into_iter().collect(),
        }
    }
}

impl Labeler for ConstantLabeler {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>> {
        Ok(vec![self.label.clone(); matrix.n_rows()])
    }

    fn manifest(&self) -> &FeatureManifest {
        &self.manifest
    }
}

fn block(text: &str, x: f64, y: f64, size: f64) -> Block {
    Block::from_spans(BBox::new(x, y, x + 300.0, y + size), vec![Span::plain(text, size)])
}

/// A page of `n` blocks laid out down the left margin.
fn column_page(number: u32, n: usize) -> Page {
    let mut page = Page::letter(number);
    for i in 0..n {
        page.add_block(block(&format!("Line {}", i), 72.0, 60.0 + 20.0 * i as f64, 11.0));
    }
    page
}

fn body_labeler() -> Arc<dyn Labeler> {
    Arc::new(ConstantLabeler::new(Label::Other("body".into())))
}

#[test]
fn test_graph_has_no_self_edges() {
    let page = column_page(1, 12);
    for k in [1, 2, 4, 11, 20] {
        let graph = GraphBuilder::new(k).build(&page.blocks);
        assert_eq!(graph.node_count(), 12);
        for node in 0..graph.node_count() {
            assert!(!graph.has_edge(node, node), "self edge at {} for k={}", node, k);
            assert!(graph.degree(node) >= k.min(11));
        }
        for (a, b) in graph.edges() {
            assert_ne!(a, b);
            assert!(graph.has_edge(b, a));
        }
    }
}

#[test]
fn test_graph_degenerate_pages_have_no_edges() {
    let builder = GraphBuilder::default();

    let empty = builder.build(&[]);
    assert_eq!(empty.node_count(), 0);
    assert_eq!(empty.edge_count(), 0);

    let single = column_page(1, 1);
    let graph = builder.build(&single.blocks);
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
    assert!(graph.neighbors(0).is_empty());
}

#[test]
fn test_numbering_pattern_depends_only_on_text() {
    let crowded = Page::letter(1)
        .with_block(block("2.1 Methods", 72.0, 60.0, 14.0))
        .with_block(block("Body", 72.0, 90.0, 11.0))
        .with_block(block("More body", 72.0, 120.0, 11.0));
    let alone = Page::letter(2).with_block(block("2.1 Methods", 300.0, 500.0, 9.0));

    let builder = GraphBuilder::default();
    let graphs: Vec<PageGraph<'_>> = [&crowded, &alone]
        .into_iter()
        .map(|p| builder.build(&p.blocks))
        .collect();
    let frame = FeatureExtractor::default().extract(&graphs, false);

    let first = &frame.rows()[0];
    let last = &frame.rows()[3];
    assert_eq!(first.get(NUMBERING_PATTERN), Some(1.0));
    assert_eq!(first.get(NUMBERING_PATTERN), last.get(NUMBERING_PATTERN));
    assert_ne!(first.get(NODE_DEGREE), last.get(NODE_DEGREE));
}

#[test]
fn test_font_size_ratio_without_neighbors() {
    let page = Page::letter(1).with_block(block("Lonely", 72.0, 72.0, 17.0));
    let graph = GraphBuilder::default().build(&page.blocks);
    let frame = FeatureExtractor::default().extract(&[graph], false);

    assert_eq!(frame.len(), 1);
    assert_eq!(frame.rows()[0].get(NODE_DEGREE), Some(0.0));
    assert_eq!(frame.rows()[0].get(FONT_SIZE_RATIO), Some(1.0));
}

#[test]
fn test_row_order_is_page_then_node() {
    let pages = vec![column_page(1, 5), column_page(2, 0), column_page(3, 7)];
    let builder = GraphBuilder::default();
    let graphs: Vec<PageGraph<'_>> = pages.iter().map(|p| builder.build(&p.blocks)).collect();
    let frame = FeatureExtractor::default().extract(&graphs, true);

    let keys: Vec<(u32, usize)> = frame.rows().iter().map(|r| (r.page_idx, r.node_idx)).collect();
    let mut expected: Vec<(u32, usize)> = (0..5).map(|n| (1, n)).collect();
    expected.extend((0..7).map(|n| (3, n)));
    assert_eq!(keys, expected);
}

#[test]
fn test_numbering_overrides_font_size() {
    let patterns = NumberingPatterns::new();

    let same_size = [
        HeadingCandidate::new("1. Intro", 0, 12.0),
        HeadingCandidate::new("1.1 Background", 0, 12.0),
    ];
    let levels: Vec<Level> = assign_hierarchy(&same_size, &patterns, DeepLevelPolicy::Collapse)
        .iter()
        .map(|e| e.level)
        .collect();
    assert_eq!(levels, vec![Level::H1, Level::H2]);

    let inverted = [
        HeadingCandidate::new("1. Intro", 0, 9.0),
        HeadingCandidate::new("1.1 Background", 0, 20.0),
    ];
    let levels: Vec<Level> = assign_hierarchy(&inverted, &patterns, DeepLevelPolicy::Collapse)
        .iter()
        .map(|e| e.level)
        .collect();
    assert_eq!(levels, vec![Level::H1, Level::H2]);
}

#[test]
fn test_font_tiers_collapse_below_third_level() {
    let patterns = NumberingPatterns::new();
    let candidates = [
        HeadingCandidate::new("Part", 0, 18.0),
        HeadingCandidate::new("Chapter", 0, 14.0),
        HeadingCandidate::new("Section", 1, 10.0),
        HeadingCandidate::new("Aside", 1, 8.0),
    ];

    let outline = assign_hierarchy(&candidates, &patterns, DeepLevelPolicy::Collapse);
    let levels: Vec<Level> = outline.iter().map(|e| e.level).collect();
    assert_eq!(levels, vec![Level::H1, Level::H2, Level::H3, Level::H3]);

    let dropped = assign_hierarchy(&candidates, &patterns, DeepLevelPolicy::Drop);
    let texts: Vec<&str> = dropped.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Part", "Chapter", "Section"]);
}

#[test]
fn test_title_fallback_uses_largest_font() {
    let pages = vec![
        Page::letter(1)
            .with_block(block("Header", 72.0, 30.0, 12.0))
            .with_block(block("Big One", 72.0, 80.0, 20.0))
            .with_block(block("Big Two", 72.0, 120.0, 20.0)),
        Page::letter(2).with_block(block("Bigger Later", 72.0, 80.0, 30.0)),
    ];

    let pipeline = Pipeline::new(body_labeler(), PipelineOptions::default());
    let report = pipeline.run(&pages).unwrap();

    assert_eq!(report.outline.title, "Big One");
    assert_eq!(report.title_source, TitleSource::LargestFont);
    assert!(report.outline.outline.is_empty());
}

#[test]
fn test_single_block_document_end_to_end() {
    let pages = vec![Page::letter(1).with_block(block("Document Title", 72.0, 72.0, 24.0))];

    let pipeline = Pipeline::new(body_labeler(), PipelineOptions::default());
    let report = pipeline.run(&pages).unwrap();

    assert_eq!(report.outline, DocumentOutline::new("Document Title", vec![]));
    assert_eq!(
        to_json(&report.outline, JsonFormat::Compact).unwrap(),
        r#"{"title":"Document Title","outline":[]}"#
    );
}

#[test]
fn test_headings_keep_encounter_order() {
    let pages = vec![
        Page::letter(1)
            .with_block(block("Small First", 72.0, 60.0, 12.0))
            .with_block(block("Large Second", 72.0, 100.0, 18.0)),
        Page::letter(2).with_block(block("Medium Third", 72.0, 60.0, 14.0)),
    ];

    let labeler = Arc::new(ConstantLabeler::new(Label::Heading));
    let pipeline = Pipeline::new(labeler, PipelineOptions::default().sequential());
    let outline = pipeline.run(&pages).unwrap().outline;

    assert_eq!(
        outline.outline,
        vec![
            OutlineEntry::new(Level::H3, "Small First", 0),
            OutlineEntry::new(Level::H1, "Large Second", 0),
            OutlineEntry::new(Level::H2, "Medium Third", 1),
        ]
    );
}

#[test]
fn test_extreme_coordinates_fail_the_document() {
    let pages = vec![Page::letter(1)
        .with_block(block("Near", 72.0, 72.0, 12.0))
        .with_block(block("Far", 1.7e308, 0.0, 12.0))
        .with_block(block("Away", -1.7e308, 0.0, 12.0))];

    let pipeline = Pipeline::new(body_labeler(), PipelineOptions::default());
    let err = pipeline.run(&pages).unwrap_err();
    assert!(matches!(err, outline_graph::Error::InvalidGeometry { page: 1, block: 1 }));

    let graph = GraphBuilder::default().build(&pages[0].blocks);
    assert_eq!(graph.edge_count(), 0);
}
