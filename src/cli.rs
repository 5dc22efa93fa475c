use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::extract::{collect_workspace_files, language_for_path, parse_document, SourceDocument};
use crate::load_config::load_config;
use crate::synchronise::{Destination, SessionCache, SyncOptions, SyncOutcome, SyncReport};

/// CLI for docsync: publish source-file documentation to Notion and Confluence.
#[derive(Parser)]
#[clap(
    name = "docsync",
    version,
    about = "Synchronise source-file documentation into Notion and Confluence"
)]
pub struct Cli {
    /// Path to an optional YAML config file; environment variables take precedence
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync the documentation of one source file
    Sync {
        /// Source file to document
        #[clap(long)]
        file: PathBuf,
        #[clap(long, value_enum, default_value = "both")]
        to: Target,
        /// Language identifier; detected from the file extension when omitted
        #[clap(long)]
        language: Option<String>,
        /// Confluence space key, overriding the configured one
        #[clap(long)]
        space: Option<String>,
        /// Confluence parent page id, overriding the configured one
        #[clap(long)]
        parent: Option<String>,
    },
    /// Sync every source file under a project directory
    SyncProject {
        #[clap(long)]
        root: PathBuf,
        #[clap(long, value_enum, default_value = "both")]
        to: Target,
    },
    /// Check connectivity to both platforms
    Probe,
    /// List Confluence spaces
    Spaces,
    /// List pages in a Confluence space
    Pages {
        #[clap(long)]
        space: String,
    },
    /// Print the effective configuration with secrets masked
    ShowConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Notion,
    Confluence,
    Both,
}

impl From<Target> for Destination {
    fn from(target: Target) -> Self {
        match target {
            Target::Notion => Destination::Notion,
            Target::Confluence => Destination::Confluence,
            Target::Both => Destination::Both,
        }
    }
}

fn read_document(path: &Path, language: Option<&str>) -> Result<SourceDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file {}", path.display()))?;
    let language = language.unwrap_or_else(|| language_for_path(path));
    Ok(parse_document(path, &content, language))
}

fn print_report(report: &SyncReport, destination: Destination) {
    println!("{}", report.title);
    if let Some(url) = &report.notion_url {
        println!("  Notion: {url}");
    }
    if let Some(err) = &report.notion_error {
        println!("  Notion failed: {err}");
    }
    if let Some(url) = &report.confluence_url {
        println!("  Confluence: {url}");
    }
    if let Some(err) = &report.confluence_error {
        println!("  Confluence failed: {err}");
    }
    if destination == Destination::Both {
        println!("  {}", report.outcome());
    }
}

/// Single-platform failures are errors; `both` only reports.
fn single_platform_result(report: &SyncReport, destination: Destination) -> Result<()> {
    let failure = match destination {
        Destination::Notion => report.notion_error.as_ref(),
        Destination::Confluence => report.confluence_error.as_ref(),
        Destination::Both => None,
    };
    match failure {
        Some(err) => Err(anyhow::anyhow!("Sync of {} failed: {err}", report.title)),
        None => Ok(()),
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::ShowConfig => {
            println!("{}", config.describe());
            Ok(())
        }
        Commands::Sync {
            file,
            to,
            language,
            space,
            parent,
        } => {
            let doc = read_document(&file, language.as_deref())?;
            let options = SyncOptions {
                destination: to.into(),
                space_key: space,
                parent_id: parent,
            };
            let mut sessions = SessionCache::new(config);
            let report = sessions.sync_document(&doc, &options).await;
            print_report(&report, options.destination);
            single_platform_result(&report, options.destination)
        }
        Commands::SyncProject { root, to } => {
            let files = collect_workspace_files(&root)
                .with_context(|| format!("Failed to scan project directory {}", root.display()))?;
            if files.is_empty() {
                println!("No source files found under {}", root.display());
            }
            let docs: Vec<SourceDocument> = files
                .iter()
                .filter_map(|path| match read_document(path, None) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable source file");
                        println!("Skipped {}: {e:#}", path.display());
                        None
                    }
                })
                .collect();
            let options = SyncOptions {
                destination: to.into(),
                ..Default::default()
            };
            let mut sessions = SessionCache::new(config);
            let reports = sessions.sync_documents(&docs, &options).await;
            for report in &reports {
                print_report(report, options.destination);
            }
            let synced = reports
                .iter()
                .filter(|r| r.outcome() != SyncOutcome::Neither)
                .count();
            println!("Synced {synced} of {} files.", reports.len());
            reports
                .iter()
                .try_for_each(|r| single_platform_result(r, options.destination))
        }
        Commands::Probe => {
            let mut sessions = SessionCache::new(config);
            let probe = sessions.probe().await;
            let status = |ok: bool| if ok { "connected" } else { "not connected" };
            println!("Notion: {}", status(probe.notion));
            println!("Confluence: {}", status(probe.confluence));
            Ok(())
        }
        Commands::Spaces => {
            let mut sessions = SessionCache::new(config);
            let spaces = sessions.list_spaces().await?;
            if spaces.is_empty() {
                println!("No spaces found.");
            }
            for space in spaces {
                println!("{}\t{}", space.key, space.name);
            }
            Ok(())
        }
        Commands::Pages { space } => {
            let mut sessions = SessionCache::new(config);
            let pages = sessions.list_pages(&space).await?;
            if pages.is_empty() {
                println!("No pages found in {space}.");
            }
            for page in pages {
                println!("{}\t{}", page.id, page.title);
            }
            Ok(())
        }
    };

    let exit_span = tracing::info_span!("exit");
    exit_span.in_scope(|| {
        tracing::info!(success = result.is_ok(), "Command finished");
    });

    result
}
