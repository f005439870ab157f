//! GateFlow setup - bootstrap Supabase credentials for a GateFlow deployment.
//!
//! Run with no arguments to log in, then again with the verification code,
//! then (if the account has several projects) with the chosen project.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use setup_config_and_utils::init_logging;
use supabase_bootstrap::SetupArgs;
use tracing::debug;

/// GateFlow setup - obtain a Supabase access token and write the deploy config.
#[derive(Parser)]
#[command(name = "gateflow-setup")]
#[command(about = "Bootstrap Supabase credentials for GateFlow deployments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verification code shown by the Supabase dashboard after approval
    #[arg(long, value_name = "CODE")]
    verification_code: Option<String>,

    /// Supabase project reference to configure
    #[arg(long, value_name = "REF")]
    project_ref: Option<String>,

    /// Do not try to open the authorization URL in a browser
    #[arg(long)]
    no_browser: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which setup artifacts exist
    Status,

    /// Discard the pending login
    Reset {
        /// Also remove the stored Supabase access token
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let ctx = match commands::Context::load(cli.no_browser) {
        Ok(ctx) => ctx,
        Err(e) => {
            output::print_error(&e.to_string(), &cli.format);
            std::process::exit(1);
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| ctx.config.log_level.clone());
    init_logging("gateflow-setup", &level, Some(ctx.paths.log_file()), false);
    debug!(api_url = %ctx.config.api_url, "configuration loaded");

    let result = match cli.command {
        Some(Commands::Status) => commands::status(&ctx, &cli.format).await.map(|_| false),
        Some(Commands::Reset { all }) => {
            commands::reset(&ctx, all, &cli.format).await.map(|_| false)
        }
        None => {
            let args = SetupArgs::new(cli.verification_code, cli.project_ref);
            commands::setup(&ctx, args, &cli.format).await
        }
    };

    match result {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(e) => {
            output::print_error(&e.to_string(), &cli.format);
            std::process::exit(1);
        }
    }
}
