//! kgviz - Interactive visualizations of knowledge graphs.
//!
//! Query results from a property-graph store (nodes, relationships and
//! paths) are materialized into a deduplicated multigraph, normalized for
//! export, styled, and written out as a single interactive HTML page.

pub mod classify;
pub mod config;
pub mod error;
pub mod generators;
pub mod graph;
pub mod normalize;
pub mod pipeline;
pub mod store;
pub mod style;
pub mod value;

pub use config::KgvizConfig;
pub use error::{KgvizError, Result};
pub use generators::Generator;
pub use graph::MaterializedGraph;
pub use pipeline::{render_rows, visualize, VisualizeOptions};
pub use style::{ParallelEdges, StyleConfig};
pub use value::{AttributeValue, ElementId, GraphValue, NodeValue, PathValue, RelationshipValue};
