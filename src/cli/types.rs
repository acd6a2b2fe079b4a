//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};

use crate::cli::commands::event::EventArgs;
use crate::cli::commands::init::InitArgs;
use crate::cli::commands::reconcile::ReconcileArgs;

#[derive(Parser, Debug)]
#[command(name = "eventpulse")]
#[command(about = "EventPulse - event lifecycle reconciler", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize EventPulse configuration and database
    Init(InitArgs),

    /// Event management commands
    Event(EventArgs),

    /// Run the lifecycle reconciler
    Reconcile(ReconcileArgs),
}
