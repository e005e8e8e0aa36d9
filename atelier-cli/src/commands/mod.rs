//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod presets;
mod render;

use render::RenderArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate one image per selected variant
    Render(RenderArgs),
    /// List the built-in selection axes and their values
    Presets,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Render(args) => render::handle_render_command(args, config).await,
        Commands::Presets => {
            presets::list_presets();
            Ok(())
        }
    }
}
