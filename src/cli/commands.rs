//! Command dispatch: turns parsed arguments into service calls.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use clap::CommandFactory;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::NodeSpec;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, run with --help for usage".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => {
            let settings = Settings::load(cli.config.as_deref())?;
            config_command(command, &settings)
        }
        Commands::Build { root, nodes, file } => {
            let container = container(cli)?;
            build(&container, root, nodes, file.as_deref())
        }
        Commands::Select { selectors } => {
            let container = container(cli)?;
            select(&container, selectors)
        }
        Commands::All { tree } => {
            let container = container(cli)?;
            if *tree {
                all_tree(&container)
            } else {
                all_json(&container)
            }
        }
    }
}

fn container(cli: &Cli) -> CliResult<ServiceContainer> {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!("settings: {:?}", settings);
    Ok(ServiceContainer::new(settings))
}

#[instrument(skip(container, nodes))]
fn build(
    container: &ServiceContainer,
    root: &str,
    nodes: &[NodeSpec],
    file: Option<&Path>,
) -> CliResult<()> {
    let mut specs = match file {
        Some(path) => read_spec_file(path)?,
        None => Vec::new(),
    };
    specs.extend(nodes.iter().cloned());

    let outcome = container.trees.build(root, &specs)?;
    output::success(&format!(
        "root {} (id {})",
        outcome.root.name, outcome.root.id
    ));
    for node in &outcome.nodes {
        output::success_detail(&format!(
            "{} [{}] level {} (id {})",
            node.name, node.kind, node.level, node.id
        ));
    }
    Ok(())
}

fn read_spec_file(path: &Path) -> CliResult<Vec<NodeSpec>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(|e| {
        CliError::InvalidArgs(format!("{} is not a JSON array of node specs: {e}", path.display()))
    })
}

#[instrument(skip(container))]
fn select(container: &ServiceContainer, selectors: &[(String, String)]) -> CliResult<()> {
    let mut map = BTreeMap::new();
    for (root, entry) in selectors {
        if map.insert(root.clone(), entry.clone()).is_some() {
            return Err(CliError::InvalidArgs(format!("root {root} selected twice")));
        }
    }

    let selection = container.selections.generate_selection(&map)?;
    if selection.groups.is_empty() {
        output::warning("no root contained the requested entry nodes");
    }
    print_json(&selection)
}

fn all_json(container: &ServiceContainer) -> CliResult<()> {
    let enumeration = container.selections.enumerate_all()?;
    print_json(&enumeration)
}

fn all_tree(container: &ServiceContainer) -> CliResult<()> {
    let hierarchy = container.selections.hierarchy()?;
    if hierarchy.is_empty() {
        output::warning("no trees stored");
        return Ok(());
    }
    for root in hierarchy {
        output::header(&root.root.name);
        for (_, tree) in &root.trees {
            if let Some(rendered) = tree.to_termtree() {
                output::info(&rendered);
            }
        }
    }
    Ok(())
}

fn config_command(command: &ConfigCommands, settings: &Settings) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}", path.display())),
                None => output::warning("no config directory on this platform"),
            }
            output::detail(&format!("store:  {}", settings.store.path.display()));
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| InfraError::io("encode output", e.into()))?;
    output::info(&json);
    Ok(())
}
