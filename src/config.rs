//! Configuration loading for kgviz.
//!
//! Configuration is loaded from TOML files with environment variable overrides.

use crate::pipeline::{DEFAULT_OUTPUT_FILE, DEFAULT_QUERY};
use crate::style::StyleConfig;
use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "config.default.toml";
pub const NEO4J_HTTP_URL_VAR: &str = "NEO4J_HTTP_URL";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct KgvizConfig {
    #[serde(default)]
    pub neo4j: Neo4jConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub style: StyleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jConfig {
    #[serde(default = "default_neo4j_uri")]
    pub uri: String,

    #[serde(default = "default_neo4j_user")]
    pub user: String,

    #[serde(default = "default_neo4j_password")]
    pub password: String,

    #[serde(default = "default_neo4j_database")]
    pub database: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: default_neo4j_uri(),
            user: default_neo4j_user(),
            password: default_neo4j_password(),
            database: default_neo4j_database(),
        }
    }
}

fn default_neo4j_uri() -> String {
    "http://localhost:7474".to_string()
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

fn default_neo4j_password() -> String {
    "testpass".to_string()
}

fn default_neo4j_database() -> String {
    "neo4j".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_query")]
    pub default: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default: default_query(),
        }
    }
}

fn default_query() -> String {
    DEFAULT_QUERY.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_file")]
    pub file: String,

    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(default)]
    pub save_graph: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_file(),
            directory: default_directory(),
            save_graph: false,
        }
    }
}

fn default_file() -> String {
    DEFAULT_OUTPUT_FILE.to_string()
}

fn default_directory() -> String {
    "graphs".to_string()
}

impl KgvizConfig {
    /// Layers `config.default.toml`, the file at `path`, `KGVIZ_*`
    /// variables (`__` between section and key) and the `NEO4J_HTTP_URL`,
    /// `NEO4J_USER`, `NEO4J_PASSWORD` and `NEO4J_DATABASE` variables.
    ///
    /// `NEO4J_URL` is not read: it conventionally holds a Bolt address,
    /// which the HTTP store cannot use.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("KGVIZ")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("neo4j.uri", std::env::var(NEO4J_HTTP_URL_VAR).ok())?
            .set_override_option("neo4j.user", std::env::var("NEO4J_USER").ok())?
            .set_override_option("neo4j.password", std::env::var("NEO4J_PASSWORD").ok())?
            .set_override_option("neo4j.database", std::env::var("NEO4J_DATABASE").ok())?
            .build()?;

        let kgviz_config: KgvizConfig = config.try_deserialize()?;
        Ok(kgviz_config)
    }
}
