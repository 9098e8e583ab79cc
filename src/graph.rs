//! Per-page k-nearest-neighbour proximity graphs over block centroids.
//!
//! Nodes are block indices `0..n` on one page. Each node is linked to its
//! `k` nearest neighbours by centroid distance; the edge set is the union of
//! those links, so a node may end up with more than `k` incident edges.
//! Graphs never span pages.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::model::Block;

/// Default neighbour count per node.
pub const DEFAULT_NEIGHBORS: usize = 4;

/// Centroid entry stored in the R-tree.
#[derive(Debug, Clone, Copy)]
struct CentroidNode {
    id: usize,
    point: [f64; 2],
}

impl RTreeObject for CentroidNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for CentroidNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Undirected proximity graph for one page.
///
/// Blocks are stored as a contiguous arena; adjacency is keyed by node id.
/// Neighbour lists keep edge insertion order: nodes are processed in
/// ascending id, each linking its neighbours nearest first.
#[derive(Debug, Clone)]
pub struct PageGraph<'a> {
    blocks: &'a [Block],
    centroids: Vec<[f64; 2]>,
    adjacency: Vec<Vec<usize>>,
}

impl<'a> PageGraph<'a> {
    /// Graph over `blocks` with no edges.
    fn empty(blocks: &'a [Block]) -> Self {
        Self {
            blocks,
            centroids: blocks.iter().map(Block::centroid).collect(),
            adjacency: vec![Vec::new(); blocks.len()],
        }
    }

    /// Number of nodes (equals the page's block count).
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Neighbours of `node` in insertion order.
    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    /// Source block of `node`.
    pub fn block(&self, node: usize) -> &'a Block {
        &self.blocks[node]
    }

    pub fn blocks(&self) -> &'a [Block] {
        self.blocks
    }

    pub fn centroid(&self, node: usize) -> [f64; 2] {
        self.centroids[node]
    }

    /// Euclidean distance between two nodes' centroids.
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        let [ax, ay] = self.centroids[a];
        let [bx, by] = self.centroids[b];
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// Edges as `(low, high)` id pairs.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(a, ns)| ns.iter().filter(move |&&b| a < b).map(move |&b| (a, b)))
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency.get(a).is_some_and(|ns| ns.contains(&b))
    }

    fn add_edge(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        if !self.adjacency[a].contains(&b) {
            self.adjacency[a].push(b);
        }
        if !self.adjacency[b].contains(&a) {
            self.adjacency[b].push(a);
        }
    }
}

/// Builds [`PageGraph`]s with a fixed neighbour count.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    k: usize,
}

impl GraphBuilder {
    /// Create a builder linking each node to `k` neighbours.
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Build the proximity graph for one page's blocks.
    pub fn build<'a>(&self, blocks: &'a [Block]) -> PageGraph<'a> {
        let mut graph = PageGraph::empty(blocks);

        // Blocks with unusable coordinates stay isolated.
        let indexed: Vec<CentroidNode> = graph
            .centroids
            .iter()
            .enumerate()
            .filter(|(id, _)| blocks[*id].bbox.is_valid())
            .map(|(id, &point)| CentroidNode { id, point })
            .collect();
        let n = indexed.len();
        if n <= 1 || self.k == 0 {
            return graph;
        }

        let k = self.k.min(n - 1);
        let nodes: Vec<usize> = indexed.iter().map(|c| c.id).collect();
        let tree = RTree::bulk_load(indexed);

        for node in nodes {
            let neighbors = nearest_excluding_self(&tree, node, graph.centroids[node], k);
            for other in neighbors {
                graph.add_edge(node, other);
            }
        }

        log::debug!(
            "Built page graph: {} nodes, {} edges (k={})",
            graph.node_count(),
            graph.edge_count(),
            k
        );

        graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_NEIGHBORS)
    }
}

/// The `k` nearest ids to `point`, nearest first, skipping `node` itself.
///
/// Candidates tied with the last one taken are all collected before the cut,
/// then ordered by (distance, id) so results do not depend on tree layout.
fn nearest_excluding_self(
    tree: &RTree<CentroidNode>,
    node: usize,
    point: [f64; 2],
    k: usize,
) -> Vec<usize> {
    let mut candidates: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
    for entry in tree.nearest_neighbor_iter(&point) {
        let dist = entry.distance_2(&point);
        if candidates.len() > k {
            let boundary = candidates[candidates.len() - 1].0;
            if dist > boundary {
                break;
            }
        }
        candidates.push((dist, entry.id));
    }

    candidates.retain(|&(_, id)| id != node);
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    candidates.truncate(k);
    candidates.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Span};

    fn block_at(cx: f64, cy: f64) -> Block {
        Block::from_spans(
            BBox::new(cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0),
            vec![Span::plain("x", 10.0)],
        )
    }

    fn no_self_edges(graph: &PageGraph<'_>) -> bool {
        (0..graph.node_count()).all(|i| !graph.neighbors(i).contains(&i))
    }

    #[test]
    fn test_empty_and_single_page() {
        let builder = GraphBuilder::new(4);

        let blocks: Vec<Block> = vec![];
        let graph = builder.build(&blocks);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);

        let blocks = vec![block_at(10.0, 10.0)];
        let graph = builder.build(&blocks);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_k_clamped_to_available_nodes() {
        let blocks = vec![block_at(0.0, 0.0), block_at(0.0, 10.0), block_at(0.0, 30.0)];
        let graph = GraphBuilder::new(4).build(&blocks);

        // Every node links to both others: complete graph on three nodes.
        assert_eq!(graph.edge_count(), 3);
        assert!(no_self_edges(&graph));
        for i in 0..3 {
            assert_eq!(graph.degree(i), 2);
        }
    }

    #[test]
    fn test_union_can_exceed_k() {
        // A hub surrounded by four close points, plus far points that all pick the hub.
        let blocks = vec![
            block_at(100.0, 100.0),
            block_at(101.0, 100.0),
            block_at(1000.0, 1000.0),
            block_at(1000.0, 1010.0),
        ];
        let graph = GraphBuilder::new(1).build(&blocks);

        assert!(graph.has_edge(0, 1));
        assert!(graph.has_edge(2, 3));
        assert!(!graph.has_edge(1, 2));
        assert!(no_self_edges(&graph));

        let star = vec![
            block_at(0.0, 0.0),
            block_at(10.0, 0.0),
            block_at(-10.0, 0.0),
            block_at(0.0, 10.0),
            block_at(0.0, -10.0),
        ];
        let graph = GraphBuilder::new(1).build(&star);
        // Each spoke chooses the centre; the centre ends up with degree 4 > k.
        assert_eq!(graph.degree(0), 4);
    }

    #[test]
    fn test_adjacency_insertion_order() {
        let blocks = vec![block_at(0.0, 0.0), block_at(0.0, 10.0), block_at(0.0, 25.0)];
        let graph = GraphBuilder::new(1).build(&blocks);

        // Node 0 links to 1; node 1 links to 0 (existing); node 2 links to 1.
        assert_eq!(graph.neighbors(0), &[1]);
        assert_eq!(graph.neighbors(1), &[0, 2]);
        assert_eq!(graph.neighbors(2), &[1]);
    }

    #[test]
    fn test_duplicate_centroids_have_no_self_edges() {
        let blocks = vec![block_at(5.0, 5.0), block_at(5.0, 5.0), block_at(5.0, 5.0)];
        let graph = GraphBuilder::new(1).build(&blocks);

        assert!(no_self_edges(&graph));
        // Ties are broken by id: 0 -> 1, 1 -> 0, 2 -> 0.
        assert_eq!(graph.neighbors(0), &[1, 2]);
        assert_eq!(graph.neighbors(2), &[0]);
    }

    #[test]
    fn test_graph_is_symmetric() {
        let blocks: Vec<Block> = (0..20)
            .map(|i| block_at((i * 37 % 11) as f64 * 10.0, (i * 13 % 7) as f64 * 15.0))
            .collect();
        let graph = GraphBuilder::new(3).build(&blocks);

        for a in 0..graph.node_count() {
            assert!(graph.degree(a) >= 3);
            for &b in graph.neighbors(a) {
                assert!(graph.has_edge(b, a));
            }
        }
        assert!(no_self_edges(&graph));
    }

    #[test]
    fn test_invalid_geometry_is_isolated() {
        let mut blocks = vec![block_at(0.0, 0.0), block_at(0.0, 10.0), block_at(0.0, 20.0)];
        blocks.push(Block::from_spans(
            BBox::new(1.7e308, 0.0, 1.7e308, 10.0),
            vec![Span::plain("far", 10.0)],
        ));
        blocks.push(Block::from_spans(
            BBox::new(f64::NAN, 0.0, 5.0, 10.0),
            vec![Span::plain("nan", 10.0)],
        ));

        let graph = GraphBuilder::new(4).build(&blocks);
        assert_eq!(graph.node_count(), 5);
        assert!(graph.neighbors(3).is_empty());
        assert!(graph.neighbors(4).is_empty());
        assert_eq!(graph.degree(0), 2);
        assert!(no_self_edges(&graph));
    }

    #[test]
    fn test_distance() {
        let blocks = vec![block_at(0.0, 0.0), block_at(3.0, 4.0)];
        let graph = GraphBuilder::default().build(&blocks);
        assert!((graph.distance(0, 1) - 5.0).abs() < 1e-12);
    }
}
