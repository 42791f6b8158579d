//! Raw network payload, for custom frontends.

use crate::error::Result;
use crate::generators::Generator;
use crate::style::VisNetwork;

pub struct JsonGenerator;

impl Generator for JsonGenerator {
    fn name(&self) -> &'static str {
        "json"
    }

    fn generate(&self, network: &VisNetwork) -> Result<String> {
        Ok(serde_json::to_string_pretty(network)?)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
