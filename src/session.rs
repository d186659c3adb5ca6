//! The currently selected document and its live graph.
//!
//! Expansion state belongs to a document: selecting a different document
//! starts from a collapsed graph, while re-processing the same one (edited
//! content, new layout) re-opens what was open before.

use std::collections::BTreeSet;

use crate::expansion::{SchemaGraph, Toggle};
use crate::layout::LayoutConfig;
use crate::pipeline::{Pipeline, PipelineOutput};
use crate::types::SpecDocument;

#[derive(Debug)]
struct Selected {
    output: PipelineOutput,
    graph: SchemaGraph,
}

/// Single-document view state on top of a [`Pipeline`].
pub struct Session {
    pipeline: Pipeline,
    layout: LayoutConfig,
    selected: Option<Selected>,
}

impl Session {
    pub fn new(pipeline: Pipeline, layout: LayoutConfig) -> Self {
        Self {
            pipeline,
            layout,
            selected: None,
        }
    }

    /// Process `doc` and make it the selected document.
    ///
    /// Returns `None`, leaving the previous selection untouched, when the
    /// cycle was superseded by a newer one on the shared pipeline.
    pub async fn select(&mut self, doc: &SpecDocument) -> Option<&PipelineOutput> {
        let output = self.pipeline.process(doc).await?;

        let expansion = match self.selected.take() {
            Some(previous) if previous.output.document_id == doc.id => {
                previous.graph.into_expansion()
            }
            Some(previous) => {
                tracing::debug!(
                    from = %previous.output.document_id,
                    to = %doc.id,
                    "document changed, resetting expansion"
                );
                BTreeSet::new()
            }
            None => BTreeSet::new(),
        };

        let graph = SchemaGraph::with_expansion(
            output.api.clone(),
            output.endpoints.clone(),
            self.layout.clone(),
            expansion,
        );
        let selected = self.selected.insert(Selected { output, graph });
        Some(&selected.output)
    }

    /// Toggle a node of the selected document's graph.
    pub fn toggle(&mut self, node_id: &str) -> Toggle {
        match &mut self.selected {
            Some(selected) => selected.graph.toggle(node_id),
            None => Toggle::NotExpandable,
        }
    }

    /// Re-place every node with a new layout; expansion is kept.
    pub fn relayout(&mut self, layout: LayoutConfig) {
        self.layout = layout.clone();
        if let Some(selected) = &mut self.selected {
            selected.graph.relayout(layout);
        }
    }

    /// Drop the selection.
    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn output(&self) -> Option<&PipelineOutput> {
        self.selected.as_ref().map(|s| &s.output)
    }

    pub fn graph(&self) -> Option<&SchemaGraph> {
        self.selected.as_ref().map(|s| &s.graph)
    }

    pub fn document_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|s| s.output.document_id.as_str())
    }
}
