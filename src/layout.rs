//! Deterministic node placement.
//!
//! Endpoints sit on a golden-angle spiral around the API root; everything
//! visible under an endpoint is laid out as one indented outline below it.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::graph::{Fragment, Position};

/// Layout tuning, read from the `[layout]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Position of the API root.
    pub origin_x: f64,
    pub origin_y: f64,
    /// Distance of the first endpoint ring from the root.
    pub base_radius: f64,
    /// Extra radius added per ring (endpoints cycle over three rings).
    pub radius_jitter: f64,
    /// Vertical distance between outline rows.
    pub row_height: f64,
    /// Horizontal offset per outline level.
    pub indent: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 400.0,
            origin_y: 100.0,
            base_radius: 300.0,
            radius_jitter: 60.0,
            row_height: 40.0,
            indent: 30.0,
        }
    }
}

impl LayoutConfig {
    pub fn origin(&self) -> Position {
        Position {
            x: self.origin_x,
            y: self.origin_y,
        }
    }

    /// Position of the `index`-th endpoint.
    pub fn endpoint_position(&self, index: usize) -> Position {
        let golden_angle = PI * (3.0 - 5f64.sqrt());
        let angle = index as f64 * golden_angle;
        let radius = self.base_radius + (index % 3) as f64 * self.radius_jitter;
        Position {
            x: self.origin_x + radius * angle.cos(),
            y: self.origin_y + radius * angle.sin(),
        }
    }

    /// Place the root fragment: the API node at the origin, endpoints on the
    /// spiral in fragment order.
    pub fn place_root(&self, fragment: &mut Fragment) {
        let mut endpoint_index = 0;
        for (node, depth) in fragment.nodes.iter_mut().zip(&fragment.depths) {
            if *depth == 0 {
                node.position = self.origin();
            } else {
                node.position = self.endpoint_position(endpoint_index);
                endpoint_index += 1;
            }
        }
    }

    /// Outline position of a visible node below its endpoint.
    ///
    /// `row` counts visible nodes in pre-order across every open container
    /// of the endpoint, starting at 1, so an open subtree pushes the nodes
    /// after it down instead of overlapping them.
    pub fn outline_position(&self, anchor: Position, depth: usize, row: usize) -> Position {
        Position {
            x: anchor.x + depth as f64 * self.indent,
            y: anchor.y + row as f64 * self.row_height,
        }
    }
}
