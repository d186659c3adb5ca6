//! Expansion state machine over the schema graph.
//!
//! A container node is either collapsed (no children materialized) or
//! expanded (its immediate subtree is present). [`SchemaGraph::toggle`] is
//! the only transition. The set of expanded ids is kept separately from the
//! nodes, so a rebuild (new layout, re-parse of the same document) can bring
//! back exactly what the user had open.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::extractor::Endpoint;
use crate::graph::{self, Expandable, GraphEdge, GraphNode, NodeKind, ROOT_ID};
use crate::layout::LayoutConfig;
use crate::types::ApiInfo;

/// Outcome of [`SchemaGraph::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Expanded { nodes: usize, edges: usize },
    Collapsed { nodes: usize, edges: usize },
    /// Unknown id, or a node without children to show.
    NotExpandable,
}

/// Live graph for one document.
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    api: ApiInfo,
    endpoints: Vec<Endpoint>,
    layout: LayoutConfig,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    expansion: BTreeSet<String>,
    containers: HashMap<String, Expandable>,
}

impl SchemaGraph {
    /// Build the initial graph: root plus endpoints, nothing expanded.
    pub fn new(api: ApiInfo, endpoints: Vec<Endpoint>, layout: LayoutConfig) -> Self {
        Self::with_expansion(api, endpoints, layout, BTreeSet::new())
    }

    /// Build a graph and re-open every container recorded in `expansion`.
    pub fn with_expansion(
        api: ApiInfo,
        endpoints: Vec<Endpoint>,
        layout: LayoutConfig,
        expansion: BTreeSet<String>,
    ) -> Self {
        let mut graph = Self {
            api,
            endpoints,
            layout,
            nodes: Vec::new(),
            edges: Vec::new(),
            expansion,
            containers: HashMap::new(),
        };
        graph.rebuild();
        graph
    }

    /// Recompute nodes and edges from the endpoints and the expansion state.
    pub fn rebuild(&mut self) {
        let mut fragment = graph::root_fragment(&self.api, &self.endpoints);
        self.layout.place_root(&mut fragment);

        self.nodes = fragment.nodes;
        self.edges = fragment.edges;
        self.containers.clear();

        let mut reopen = Vec::new();
        for (id, what) in fragment.containers {
            if self.expansion.contains(&id) {
                reopen.push(id.clone());
            }
            self.containers.insert(id, what);
        }
        for id in reopen {
            self.materialize(&id);
        }
        let endpoints: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.kind() == NodeKind::Endpoint)
            .map(|n| n.id.clone())
            .collect();
        for endpoint in endpoints {
            self.reflow(&endpoint);
        }
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            expanded = self.expansion.len(),
            "graph rebuilt"
        );
    }

    /// Swap the layout and rebuild, keeping the expansion state.
    pub fn relayout(&mut self, layout: LayoutConfig) {
        self.layout = layout;
        self.rebuild();
    }

    /// Expand a collapsed container or collapse an expanded one.
    pub fn toggle(&mut self, node_id: &str) -> Toggle {
        if !self.containers.contains_key(node_id) {
            return Toggle::NotExpandable;
        }

        let toggle = if self.expansion.remove(node_id) {
            let (nodes, edges) = self.remove_subtree(node_id);
            debug!(%node_id, nodes, edges, "collapsed");
            Toggle::Collapsed { nodes, edges }
        } else {
            self.expansion.insert(node_id.to_string());
            let (nodes, edges) = self.materialize(node_id);
            debug!(%node_id, nodes, edges, "expanded");
            Toggle::Expanded { nodes, edges }
        };
        if let Some(endpoint) = owning_endpoint(node_id) {
            self.reflow(&endpoint);
        }
        toggle
    }

    /// Open every container, breadth first, until nothing new appears.
    pub fn expand_all(&mut self) {
        loop {
            let mut closed: Vec<String> = self
                .containers
                .keys()
                .filter(|id| !self.expansion.contains(*id))
                .cloned()
                .collect();
            if closed.is_empty() {
                break;
            }
            closed.sort();
            for id in closed {
                self.toggle(&id);
            }
        }
    }

    /// Append the subtree of `id` plus any nested containers still recorded
    /// as open. Returns how many nodes and edges were added.
    fn materialize(&mut self, id: &str) -> (usize, usize) {
        let Some(what) = self.containers.get(id).cloned() else {
            return (0, 0);
        };
        if self.node(id).is_none() {
            return (0, 0);
        }

        let fragment = graph::expand(id, &what, &self.endpoints);

        let mut added = (fragment.nodes.len(), fragment.edges.len());
        self.nodes.extend(fragment.nodes);
        self.edges.extend(fragment.edges);

        let mut reopen = Vec::new();
        for (child, what) in fragment.containers {
            if self.expansion.contains(&child) {
                reopen.push(child.clone());
            }
            self.containers.insert(child, what);
        }
        for child in reopen {
            let (nodes, edges) = self.materialize(&child);
            added.0 += nodes;
            added.1 += edges;
        }
        added
    }

    /// Re-place everything visible under `endpoint_id` as one outline.
    fn reflow(&mut self, endpoint_id: &str) {
        let Some(anchor) = self.node(endpoint_id).map(|n| n.position) else {
            return;
        };

        let order: Vec<(usize, usize)> = {
            let parent_of: HashMap<&str, &str> = self
                .edges
                .iter()
                .map(|e| (e.target_id.as_str(), e.source_id.as_str()))
                .collect();
            let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
            for (index, node) in self.nodes.iter().enumerate() {
                if let Some(parent) = parent_of.get(node.id.as_str()) {
                    children.entry(*parent).or_default().push(index);
                }
            }

            let mut order = Vec::new();
            let mut stack: Vec<(usize, usize)> = children
                .get(endpoint_id)
                .map(|kids| kids.iter().rev().map(|&i| (i, 1)).collect())
                .unwrap_or_default();
            while let Some((index, depth)) = stack.pop() {
                order.push((index, depth));
                if let Some(kids) = children.get(self.nodes[index].id.as_str()) {
                    stack.extend(kids.iter().rev().map(|&i| (i, depth + 1)));
                }
            }
            order
        };

        for (row, (index, depth)) in order.into_iter().enumerate() {
            self.nodes[index].position = self.layout.outline_position(anchor, depth, row + 1);
        }
    }

    /// Drop every node under `id-` and every edge touching one of them.
    fn remove_subtree(&mut self, id: &str) -> (usize, usize) {
        let prefix = format!("{}-", id);

        let removed: HashSet<String> = self
            .nodes
            .iter()
            .filter(|n| n.id.starts_with(&prefix))
            .map(|n| n.id.clone())
            .collect();
        self.nodes.retain(|n| !removed.contains(&n.id));

        let edges_before = self.edges.len();
        self.edges
            .retain(|e| !removed.contains(&e.source_id) && !removed.contains(&e.target_id));

        // Nested expansion records stay, so reopening restores the view.
        self.containers.retain(|k, _| !k.starts_with(&prefix));

        (removed.len(), edges_before - self.edges.len())
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Ids of open containers, including ones currently hidden under a
    /// collapsed ancestor.
    pub fn expansion_state(&self) -> &BTreeSet<String> {
        &self.expansion
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expansion.contains(id)
    }

    /// Whether `id` is a visible node that can be toggled.
    pub fn is_container(&self, id: &str) -> bool {
        self.containers.contains_key(id)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn api(&self) -> &ApiInfo {
        &self.api
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Consume the graph, keeping only the expansion state.
    pub fn into_expansion(self) -> BTreeSet<String> {
        self.expansion
    }
}

/// Endpoint node an id belongs to: `api-root-<endpoint>[-...]`.
fn owning_endpoint(id: &str) -> Option<String> {
    let rest = id.strip_prefix(ROOT_ID)?.strip_prefix('-')?;
    let segment = rest.split('-').next().filter(|s| !s.is_empty())?;
    Some(format!("{}-{}", ROOT_ID, segment))
}
