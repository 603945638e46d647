use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use designdiff_ai::ProviderKind;
use designdiff_core::{ComparisonId, ProjectId};

/// Compare a design mockup with a website screenshot and list the visual
/// discrepancies between them.
#[derive(Debug, Parser)]
#[command(name = "designdiff", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a comparison and print the result as JSON.
    Compare(CompareArgs),
    /// Print the fallback discrepancy library that is currently configured.
    Fallback,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Design mockup image.
    #[arg(long)]
    pub design: PathBuf,

    /// Website screenshot image.
    #[arg(long)]
    pub website: PathBuf,

    /// Project the comparison belongs to. A new id is generated when omitted.
    #[arg(long, env = "DESIGNDIFF_PROJECT_ID")]
    pub project: Option<ProjectId>,

    /// Re-run an existing comparison instead of creating a new one.
    #[arg(long)]
    pub comparison: Option<ComparisonId>,

    /// Preferred provider; overrides AI_PROVIDER.
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// Print only the discrepancy list.
    #[arg(long)]
    pub discrepancies_only: bool,
}
