//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::apply::ApplyArgs;
use crate::cli::commands::check_config::CheckConfigArgs;
use crate::cli::commands::remove::RemoveArgs;
use crate::cli::commands::resources::ResourcesArgs;
use crate::cli::commands::trust::TrustArgs;

#[derive(Parser, Debug)]
#[command(name = "meshward")]
#[command(about = "Meshward - mesh control-plane convergence engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .meshward/config.yaml and .meshward/local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply a workload's rendered objects to a tenant mesh
    Apply(ApplyArgs),

    /// Delete a workload's rendered objects from a tenant mesh
    Remove(RemoveArgs),

    /// Add a trusted subject name to a listener
    Trust(TrustArgs),

    /// Reconcile the tenant's managed resources and print them
    Resources(ResourcesArgs),

    /// Load and validate configuration
    CheckConfig(CheckConfigArgs),
}
