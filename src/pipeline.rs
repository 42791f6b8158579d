//! End-to-end visualization: fetch, materialize, normalize, style, write.

use crate::error::Result;
use crate::generators;
use crate::graph::MaterializedGraph;
use crate::normalize::normalize;
use crate::store::{with_session, GraphStore};
use crate::style::{style, StyleConfig};
use crate::value::ResultRow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_QUERY: &str = "MATCH p=()-->() RETURN p;";
pub const DEFAULT_OUTPUT_FILE: &str = "test.html";

#[derive(Debug, Clone, Default)]
pub struct VisualizeOptions {
    pub style: StyleConfig,
    /// Also write the normalized graph as `<output>.graph.json`.
    pub save_graph: bool,
}

/// Runs `query` against `store` and writes the visualization to `output`.
/// Returns the output location.
pub async fn visualize<S>(
    store: &S,
    query: &str,
    output: &Path,
    options: &VisualizeOptions,
) -> Result<PathBuf>
where
    S: GraphStore + ?Sized,
{
    let rows = with_session(store, query).await?;
    render_rows(&rows, output, options)
}

/// Renders already-fetched rows. Nothing is written if any step before the
/// final write fails.
pub fn render_rows(rows: &[ResultRow], output: &Path, options: &VisualizeOptions) -> Result<PathBuf> {
    let mut graph = MaterializedGraph::materialize(rows)?;
    normalize(&mut graph)?;
    let network = style(&graph, &options.style)?;

    let generator = generators::for_path(output, &options.style.vis_js_url);
    let artifact = generator.generate(&network)?;
    let graph_json = if options.save_graph {
        Some(serde_json::to_string_pretty(&graph.export()?)?)
    } else {
        None
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, artifact)?;

    if let Some(graph_json) = graph_json {
        let graph_path = graph_export_path(output);
        fs::write(&graph_path, graph_json)?;
        info!(path = %graph_path.display(), "saved graph export");
    }

    info!(
        path = %output.display(),
        generator = generator.name(),
        nodes = network.nodes.len(),
        edges = network.edges.len(),
        "graph visualization saved"
    );
    Ok(output.to_path_buf())
}

/// `out/test.html` -> `out/test.graph.json`
pub fn graph_export_path(output: &Path) -> PathBuf {
    output.with_extension("graph.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_export_sits_next_to_the_artifact() {
        assert_eq!(
            graph_export_path(Path::new("out/test.html")),
            PathBuf::from("out/test.graph.json")
        );
        assert_eq!(
            graph_export_path(Path::new("graph")),
            PathBuf::from("graph.graph.json")
        );
    }
}
