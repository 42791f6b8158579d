//! Artifact generators - each turns a styled network into one output format.

pub mod html;
pub mod json;

use crate::error::Result;
use crate::style::VisNetwork;
use std::path::Path;

/// Trait for all artifact generators.
pub trait Generator {
    /// Name of this generator.
    fn name(&self) -> &'static str;

    /// Render the network. Returns the artifact contents.
    fn generate(&self, network: &VisNetwork) -> Result<String>;

    /// File extension for this generator's output.
    fn extension(&self) -> &'static str;
}

/// Picks a generator from the output file's extension; HTML unless the
/// target ends in `.json`.
pub fn for_path(path: &Path, vis_js_url: &str) -> Box<dyn Generator> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Box::new(json::JsonGenerator)
    } else {
        Box::new(html::HtmlGenerator::new(vis_js_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_follows_extension() {
        assert_eq!(for_path(Path::new("out/graph.json"), "x").name(), "json");
        assert_eq!(for_path(Path::new("out/graph.JSON"), "x").extension(), "json");
        assert_eq!(for_path(Path::new("test.html"), "x").name(), "html");
        assert_eq!(for_path(Path::new("graph"), "x").extension(), "html");
    }
}
