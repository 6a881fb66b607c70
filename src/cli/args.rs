//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::NodeSpec;

/// Named parameter trees with randomized root-to-leaf selection
#[derive(Parser, Debug)]
#[command(name = "paramtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Explicit config file, layered over the global one
    #[arg(short, long, global = true, env = "PARAMTREE_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add nodes to a root, creating the root if needed
    Build {
        /// Root name, e.g. geo
        root: String,

        /// Node as name[:type[:level[:parent]]], repeatable
        #[arg(short, long = "node", value_parser = parse_node_spec)]
        nodes: Vec<NodeSpec>,

        /// JSON file with an array of {name, type, level, parentName}
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Walk each named root from its entry node to a random leaf
    ///
    /// Results are cached in memory for `cache.ttl_secs`. One CLI run is one
    /// process, so repeated `select` invocations always walk afresh; the
    /// repeat-within-TTL behaviour applies to library callers that keep a
    /// service container alive.
    Select {
        /// Selectors as root=entry, e.g. geo=US
        #[arg(required = true, value_parser = parse_selector)]
        selectors: Vec<(String, String)>,
    },

    /// Export every path of every tree
    All {
        /// Render as trees instead of JSON
        #[arg(long)]
        tree: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Show config file locations
    Path,
    /// Print a commented template config
    Template,
}

/// Parse `name[:type[:level[:parent]]]`.
pub fn parse_node_spec(s: &str) -> Result<NodeSpec, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 4 {
        return Err(format!("expected name[:type[:level[:parent]]], got {s}"));
    }
    let name = parts[0].trim();
    if name.is_empty() {
        return Err("node name must not be empty".to_string());
    }
    let level = parts
        .get(2)
        .map(|l| {
            l.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid level {l}: {e}"))
        })
        .transpose()?;
    Ok(NodeSpec {
        name: name.to_string(),
        kind: parts.get(1).map(|k| k.trim().to_string()),
        level,
        parent_name: parts.get(3).map(|p| p.trim().to_string()),
    })
}

/// Parse `root=entry`.
pub fn parse_selector(s: &str) -> Result<(String, String), String> {
    let (root, entry) = s
        .split_once('=')
        .ok_or_else(|| format!("expected root=entry, got {s}"))?;
    let (root, entry) = (root.trim(), entry.trim());
    if root.is_empty() || entry.is_empty() {
        return Err(format!("expected root=entry, got {s}"));
    }
    Ok((root.to_string(), entry.to_string()))
}
