//! Interactive HTML page backed by vis-network.
//!
//! The network payload is embedded in the page, so the artifact is a single
//! file; only the vis-network script itself is loaded from `vis_js_url`.

use crate::error::Result;
use crate::generators::Generator;
use crate::style::VisNetwork;
use serde_json::json;

const TEMPLATE: &str = include_str!("../../templates/network.html");

pub struct HtmlGenerator {
    pub vis_js_url: String,
}

impl HtmlGenerator {
    pub fn new(vis_js_url: impl Into<String>) -> Self {
        Self {
            vis_js_url: vis_js_url.into(),
        }
    }

    fn options(network: &VisNetwork) -> serde_json::Value {
        json!({
            "layout": { "randomSeed": network.seed },
            "interaction": { "hover": true, "tooltipDelay": 150 },
            "physics": {
                "stabilization": { "iterations": 250 },
                "barnesHut": { "springLength": 140 }
            },
            "edges": {
                "arrows": { "to": { "enabled": network.directed } },
                "scaling": { "min": 1, "max": 8 },
                "font": { "align": "middle", "size": 11 }
            },
            "nodes": { "shape": "dot", "size": 14 }
        })
    }
}

/// Serializes for embedding in a `<script>` block. `</` is escaped so data
/// containing `</script>` cannot close the tag.
fn script_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Replaces each `{{NAME}}` in `template` with its value in one scan.
/// Substituted text is never rescanned, so payload data that happens to
/// contain a placeholder token is emitted verbatim.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 4]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl Generator for HtmlGenerator {
    fn name(&self) -> &'static str {
        "html"
    }

    fn generate(&self, network: &VisNetwork) -> Result<String> {
        let values = [
            ("VIS_JS_URL", escape_attr(&self.vis_js_url)),
            ("HEIGHT", escape_attr(&network.height)),
            ("WIDTH", escape_attr(&network.width)),
            ("NODES_COUNT", network.nodes.len().to_string()),
            ("EDGES_COUNT", network.edges.len().to_string()),
            ("OPTIONS_JSON", script_json(&Self::options(network))?),
            ("NODES_JSON", script_json(&network.nodes)?),
            ("EDGES_JSON", script_json(&network.edges)?),
        ];
        Ok(fill_template(TEMPLATE, &values))
    }

    fn extension(&self) -> &'static str {
        "html"
    }
}
