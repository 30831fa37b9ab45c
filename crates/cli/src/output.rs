//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use kready_lib::models::{GIB, KIB, MIB};
use kready_lib::validation::Verdict;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.2}Gi", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2}Mi", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2}Ki", bytes as f64 / KIB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

/// Color a requirement verdict
pub fn color_verdict(verdict: Verdict) -> String {
    match verdict {
        Verdict::Compatible => "compatible".green().to_string(),
        Verdict::PartiallyCompatible => "partial".yellow().to_string(),
        Verdict::Incompatible => "incompatible".red().to_string(),
    }
}
