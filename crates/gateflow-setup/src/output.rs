//! Output formatting for the CLI.

use clap::ValueEnum;
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print output in the specified format.
pub fn print<T: Serialize + std::fmt::Display>(value: &T, format: &OutputFormat) {
    match format {
        OutputFormat::Text => print!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            } else {
                print!("{}", value);
            }
        }
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "status": "success", "message": message })
            );
        }
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => {
            eprintln!(
                "{}",
                serde_json::json!({ "status": "error", "message": message })
            );
        }
    }
}
