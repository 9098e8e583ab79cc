//! Relational features: computed against a node's neighbours in its page graph.

use crate::graph::PageGraph;

/// Which below-neighbour `indentation_vs_below` is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndentationReference {
    /// The last neighbour, in adjacency order, whose top edge is below the node's.
    #[default]
    LastBelow,
    /// The below-neighbour with the nearest centroid (ties: earliest in adjacency order).
    NearestBelow,
    /// The last neighbour in adjacency order whatever its position, provided at
    /// least one neighbour lies below. Matches models trained on that quirk.
    LastNeighbor,
}

/// Graph-derived features of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationalFeatures {
    pub node_degree: usize,
    pub avg_neighbor_distance: f64,
    pub font_size_ratio: f64,
    pub bold_vs_neighbors: bool,
    pub space_above: f64,
    pub indentation_vs_below: f64,
}

impl RelationalFeatures {
    /// Compute the features of `node` in `graph`.
    pub fn compute(graph: &PageGraph<'_>, node: usize, indentation: IndentationReference) -> Self {
        let block = graph.block(node);
        let neighbors = graph.neighbors(node);
        let font_size = block.mean_font_size();

        // Size and distance statistics only count neighbours that carry spans.
        let mut size_sum = 0.0;
        let mut dist_sum = 0.0;
        let mut counted = 0usize;
        for &j in neighbors {
            let other = graph.block(j);
            if !other.has_spans() {
                continue;
            }
            size_sum += other.mean_font_size();
            dist_sum += graph.distance(node, j);
            counted += 1;
        }

        let avg_neighbor_distance = if counted > 0 {
            dist_sum / counted as f64
        } else {
            0.0
        };

        let font_size_ratio = if counted == 0 {
            1.0
        } else {
            let mean = size_sum / counted as f64;
            if mean == 0.0 {
                1.0
            } else {
                font_size / mean
            }
        };

        let bold_vs_neighbors =
            block.is_bold() && !neighbors.iter().any(|&j| graph.block(j).is_bold());

        let y0 = block.bbox.y0;
        let space_above = neighbors
            .iter()
            .map(|&j| graph.block(j).bbox.y0)
            .filter(|&other_y0| other_y0 < y0)
            .map(|other_y0| y0 - other_y0)
            .min_by(f64::total_cmp)
            .unwrap_or(0.0);

        let indentation_vs_below = indentation_offset(graph, node, indentation);

        Self {
            node_degree: neighbors.len(),
            avg_neighbor_distance,
            font_size_ratio,
            bold_vs_neighbors,
            space_above,
            indentation_vs_below,
        }
    }
}

fn indentation_offset(
    graph: &PageGraph<'_>,
    node: usize,
    reference: IndentationReference,
) -> f64 {
    let block = graph.block(node);
    let neighbors = graph.neighbors(node);
    let is_below = |j: &usize| graph.block(*j).bbox.y0 > block.bbox.y0;

    let chosen = match reference {
        IndentationReference::LastBelow => neighbors.iter().copied().filter(is_below).last(),
        IndentationReference::NearestBelow => neighbors
            .iter()
            .copied()
            .filter(is_below)
            .fold(None, |best: Option<(usize, f64)>, j| {
                let d = graph.distance(node, j);
                match best {
                    Some((_, best_d)) if best_d <= d => best,
                    _ => Some((j, d)),
                }
            })
            .map(|(j, _)| j),
        IndentationReference::LastNeighbor => {
            if neighbors.iter().any(is_below) {
                neighbors.last().copied()
            } else {
                None
            }
        }
    };

    chosen
        .map(|j| graph.block(j).bbox.x0 - block.bbox.x0)
        .unwrap_or(0.0)
}
