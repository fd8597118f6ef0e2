//! permaudit - permission export tool
//!
//! Signs in to the content-management service, collects permission data for
//! the selected projects and resources, and writes one CSV per content kind.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use permaudit_cli::{
    default_config_path, AppConfig, CliError, ExportOptions, Exporter, Selection,
};
use permaudit_client::RestClient;
use permaudit_core::{DirectoryFetcher, PolicyTables};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "permaudit")]
#[command(about = "Export content permissions to auditable CSV files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (defaults to ~/.permaudit/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects with their ids
    Projects,

    /// Export permissions of the selected projects and resources
    Export(ExportArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Project id, repeatable
    #[arg(long = "project", value_name = "ID")]
    projects: Vec<String>,

    /// Export every project on the site
    #[arg(long)]
    all_projects: bool,

    /// Workbook id, repeatable
    #[arg(long = "workbook", value_name = "ID")]
    workbooks: Vec<String>,

    /// Data source id, repeatable
    #[arg(long = "datasource", value_name = "ID")]
    datasources: Vec<String>,

    /// View id, repeatable
    #[arg(long = "view", value_name = "ID")]
    views: Vec<String>,

    /// Flow id, repeatable
    #[arg(long = "flow", value_name = "ID")]
    flows: Vec<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also export group memberships
    #[arg(long)]
    group_members: bool,

    /// Resources processed at once
    #[arg(long)]
    concurrency: Option<usize>,
}

impl ExportArgs {
    fn apply_to(&self, config: &mut AppConfig) -> Result<(), CliError> {
        if let Some(output) = &self.output {
            config.export.output_dir.clone_from(output);
        }
        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 {
                return Err(CliError::InvalidArgument(
                    "--concurrency must be at least 1".to_string(),
                ));
            }
            config.export.concurrency = concurrency;
        }
        if self.group_members {
            config.export.include_group_members = true;
        }
        Ok(())
    }

    async fn selection(&self, directory: &dyn DirectoryFetcher) -> Result<Selection> {
        let mut selection = Selection {
            projects: self.projects.clone(),
            workbooks: self.workbooks.clone(),
            datasources: self.datasources.clone(),
            views: self.views.clone(),
            flows: self.flows.clone(),
        };
        if self.all_projects {
            let projects = directory
                .list_projects()
                .await
                .map_err(CliError::from)
                .context("failed to list projects")?;
            for project in projects {
                if !selection.projects.contains(&project.id) {
                    selection.projects.push(project.id);
                }
            }
        }
        if selection.is_empty() {
            return Err(CliError::EmptySelection.into());
        }
        Ok(selection)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    config.apply_env();
    if let Commands::Export(args) = &cli.command {
        args.apply_to(&mut config)?;
    }
    config
        .validate()
        .map_err(CliError::from)
        .context("invalid configuration")?;

    let tables = PolicyTables::builtin().context("failed to build policy tables")?;
    let credentials = config.credentials()?;
    let mut client = RestClient::new(config.server.clone())?;
    client
        .sign_in(&credentials)
        .await
        .context("sign-in failed")?;

    let outcome = run(&cli.command, &client, &config, tables).await;
    client.sign_out().await;
    outcome
}

async fn run(
    command: &Commands,
    client: &RestClient,
    config: &AppConfig,
    tables: Arc<PolicyTables>,
) -> Result<()> {
    match command {
        Commands::Projects => {
            let mut projects = client
                .list_projects()
                .await
                .context("failed to list projects")?;
            projects.sort_by(|a, b| a.name.cmp(&b.name));
            println!("{:<38} {:<38} NAME", "ID", "PARENT");
            for project in projects {
                println!(
                    "{:<38} {:<38} {}",
                    project.id,
                    project.parent_project_id.as_deref().unwrap_or("-"),
                    project.name
                );
            }
        }

        Commands::Export(args) => {
            let selection = args.selection(client).await?;
            let options = ExportOptions::from_config(&config.export);
            let exporter = Exporter::new(client, tables, options);
            let summary = exporter.run(&selection).await.context("export failed")?;

            for warning in &summary.warnings {
                eprintln!("warning: {warning}");
            }
            println!(
                "Wrote {} file(s) to {}",
                summary.files.len(),
                exporter.options().output_dir.display()
            );
            for file in &summary.files {
                println!("  {}", file.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn export_args(argv: &[&str]) -> ExportArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Export(args) => args,
            Commands::Projects => panic!("expected export command"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let args = export_args(&[
            "permaudit",
            "export",
            "--project",
            "p-1",
            "--concurrency",
            "8",
            "--group-members",
        ]);
        let mut config = AppConfig::default();
        args.apply_to(&mut config).unwrap();
        assert_eq!(config.export.concurrency, 8);
        assert!(config.export.include_group_members);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let args = export_args(&["permaudit", "export", "--concurrency", "0"]);
        let mut config = AppConfig::default();
        assert_matches!(
            args.apply_to(&mut config),
            Err(CliError::InvalidArgument(_))
        );
        assert_eq!(config.export.concurrency, 4);
    }
}
