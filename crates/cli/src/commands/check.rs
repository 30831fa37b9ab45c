//! Cluster readiness check

use anyhow::{Context, Result};
use colored::Colorize;
use kready_lib::tolerations::serialize_tolerations;
use kready_lib::tuning::TuningTables;
use kready_lib::validation::{CompatibilityReport, NodeRequirements};
use kready_lib::{plan_rollout, Error, FactCollector, RolloutPlan};
use tabled::Tabled;

use crate::config::Settings;
use crate::output::{
    color_verdict, format_bytes, format_cpu, print_info, print_json, print_success, print_warning,
    OutputFormat,
};

/// Row for the requirements table
#[derive(Tabled)]
struct RequirementRow {
    #[tabled(rename = "Requirement")]
    requirement: String,
    #[tabled(rename = "Passed")]
    passed: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
}

/// Check that the cluster can host the workload and print the rollout plan
///
/// Fails when no node is schedulable, even after known tolerations.
pub async fn run_check(
    collector: &dyn FactCollector,
    settings: &Settings,
    tolerate: &[String],
    format: OutputFormat,
) -> Result<()> {
    let known = settings.known_tolerations(tolerate)?;
    let nodes = collector
        .list_nodes()
        .await
        .context("Failed to collect node facts")?;

    match plan_rollout(&nodes, &NodeRequirements::default(), &known, &TuningTables::default()) {
        Ok(plan) => match format {
            OutputFormat::Json => print_json(&plan),
            OutputFormat::Table => print_plan(&plan),
        },
        Err(Error::NoCompatibleNodes { report }) => {
            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => print_report(&report),
            }
            anyhow::bail!("no schedulable nodes among {} listed", report.total_nodes())
        }
        Err(e) => Err(e).context("Failed to plan rollout"),
    }
}

fn print_report(report: &CompatibilityReport) {
    println!("{}", "Node Compatibility".bold());
    println!("{}", "=".repeat(60));

    let rows: Vec<RequirementRow> = report
        .requirements
        .iter()
        .map(|r| RequirementRow {
            requirement: r.dimension.title().to_string(),
            passed: format!("{}/{}", r.passed, r.total),
            verdict: color_verdict(r.verdict),
        })
        .collect();

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);

    if !report.incompatible_nodes.is_empty() {
        println!();
        println!("{}", "Incompatible Nodes".bold());
        println!("{}", "-".repeat(60));
        for entry in &report.incompatible_nodes {
            println!(
                "{} ({} CPU, {})",
                entry.node.name.cyan(),
                format_cpu(entry.node.cpu_millicores),
                format_bytes(entry.node.memory_bytes)
            );
            for error in &entry.errors {
                println!("  - {}", error);
            }
        }
    }
}

fn print_plan(plan: &RolloutPlan) -> Result<()> {
    print_report(&plan.report);
    println!();

    let readmitted = plan.schedulable_nodes.len() - plan.report.compatible_nodes.len();
    print_success(&format!(
        "{} schedulable nodes ({} re-admitted by tolerations)",
        plan.schedulable_nodes.len(),
        readmitted
    ));

    let untolerated = plan.report.tainted_nodes.len() - readmitted;
    if untolerated > 0 {
        print_warning(&format!(
            "{} tainted nodes are excluded; pass --tolerate to admit them",
            untolerated
        ));
    }

    if !plan.tolerations.is_empty() {
        println!();
        println!("{}", "Tolerations".bold());
        println!("{}", "-".repeat(60));
        for toleration in serialize_tolerations(&plan.tolerations)? {
            println!("  {}", toleration);
        }
    }

    let per_node = plan.resources.per_node();
    let cluster = plan.resources.cluster_wide();
    println!();
    println!("{}", "Sizing".bold());
    println!("{}", "-".repeat(60));
    println!(
        "Smallest node:  {} CPU, {}",
        format_cpu(per_node.cpu_millicores),
        format_bytes(per_node.memory_bytes)
    );
    println!(
        "Cluster total:  {} CPU, {}",
        format_cpu(cluster.cpu_millicores),
        format_bytes(cluster.memory_bytes)
    );

    if plan.presets.is_empty() {
        print_info("Cluster is large enough for the default sizing");
    } else {
        for preset in &plan.presets {
            println!("Preset:         {}", preset.as_str().cyan());
        }
        println!();
        println!("{}", "Values".bold());
        println!("{}", "-".repeat(60));
        println!("{}", serde_json::to_string_pretty(&plan.values.to_values())?);
    }

    Ok(())
}
