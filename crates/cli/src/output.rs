//! Output formatting utilities

use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use colored::Colorize;
use impact_engine::WaterStress;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// JSON envelope stamped with the generation time
#[derive(Serialize)]
struct Report<'a, T: Serialize> {
    generated_at: String,
    #[serde(flatten)]
    body: &'a T,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(body: &T) -> Result<()> {
    let report = Report {
        generated_at: Utc::now().to_rfc3339(),
        body,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a mass in grams, switching to kilograms past 1000
pub fn format_grams(grams: f64) -> String {
    if grams.abs() >= 1000.0 {
        format!("{:.2} kg", grams / 1000.0)
    } else if grams.abs() >= 1.0 {
        format!("{:.2} g", grams)
    } else {
        format!("{:.4} g", grams)
    }
}

/// Format energy in Wh or kWh
pub fn format_energy(wh: f64) -> String {
    if wh.abs() >= 1000.0 {
        format!("{:.2} kWh", wh / 1000.0)
    } else {
        format!("{:.4} Wh", wh)
    }
}

pub fn format_liters(liters: f64) -> String {
    format!("{:.4} L", liters)
}

/// Format an optional dollar amount
pub fn format_cost(cost: Option<f64>) -> String {
    match cost {
        Some(amount) if amount < 0.01 && amount > 0.0 => format!("${:.6}", amount),
        Some(amount) => format!("${:.2}", amount),
        None => "n/a".to_string(),
    }
}

/// Color a water stress level
pub fn color_stress(stress: WaterStress) -> String {
    let label = stress.to_string();
    match stress {
        WaterStress::Low => label.green().to_string(),
        WaterStress::Medium => label.yellow().to_string(),
        WaterStress::High | WaterStress::VeryHigh => label.red().to_string(),
    }
}

/// Color a relative change; reductions are good
pub fn color_delta(percent: f64) -> String {
    let formatted = format!("{:+.1}%", percent);
    if percent < 0.0 {
        formatted.green().to_string()
    } else if percent > 0.0 {
        formatted.red().to_string()
    } else {
        formatted
    }
}
