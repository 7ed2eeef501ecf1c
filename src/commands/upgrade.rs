//! `upgrade-ami upgrade`: pin every EC2NodeClass to a dated AMI build.
//!
//! Survey the node classes and the AMI catalog, pick a date version, show the
//! dry-run plan, apply it after confirmation, then watch NodeClaims drift
//! back into line.

use anyhow::{bail, Result};
use colored::Colorize;

use crate::aws::AwsCli;
use crate::commands::wait;
use crate::config::Config;
use crate::domain::planner::Plan;
use crate::domain::rollout::{self, ApplyOutcome, Survey};
use crate::kube::Kubectl;
use crate::select::{self, Selection};

#[derive(Debug, Default)]
pub struct UpgradeOptions {
    /// Date version to pin, skipping the interactive picker.
    pub version: Option<String>,
    pub dry_run: bool,
    pub yes: bool,
    pub no_wait: bool,
}

pub fn run(config: &Config, opts: UpgradeOptions) -> Result<()> {
    let kubectl = Kubectl::from_config(config)?;
    let aws = AwsCli::from_config(config)?;

    println!("{} Collecting EC2NodeClass objects from cluster...", ">>".blue().bold());
    let survey = Survey::collect(&kubectl, &aws, config.owner.as_deref())?;
    print_node_classes(&survey);

    println!(
        "{} Kubernetes version: {}",
        "ok".green().bold(),
        survey.platform_version.bold()
    );
    println!("{} Owner ID: {}", "ok".green().bold(), survey.owner);
    println!(
        "{} {} AMI versions available",
        "ok".green().bold(),
        survey.candidates.len()
    );
    println!();

    let selection = match &opts.version {
        Some(version) => {
            let date = version.trim_start_matches(['v', 'V']);
            if survey.candidate(date).is_none() {
                bail!(
                    "version {} is not available for Kubernetes {} (available: {})",
                    version,
                    survey.platform_version,
                    survey
                        .candidates
                        .iter()
                        .map(|c| c.label())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            Selection::Version(date.to_string())
        }
        None => select::prompt(&survey.candidates)?,
    };

    let date_version = match selection {
        Selection::Cancelled => {
            println!("Cancelled");
            return Ok(());
        }
        Selection::MonitorOnly => {
            println!();
            println!("{} Monitoring nodeclaim drift status...", ">>".blue().bold());
            println!("   Press Ctrl+C to stop monitoring");
            println!();
            return wait::watch_fleet(&kubectl, config.poll_interval());
        }
        Selection::Version(date) => date,
    };

    println!();
    println!("{} Selected version: v{}", "ok".green().bold(), date_version);
    println!();

    let plan = survey.plan(&date_version);
    print_plan(&plan, &survey);

    if opts.dry_run {
        println!("{} Dry run only, nothing applied", "::".blue().bold());
        return Ok(());
    }
    if plan.is_noop() {
        println!(
            "{} All nodeclasses already use v{}",
            "ok".green().bold(),
            date_version
        );
    } else {
        if !opts.yes && !confirm("Apply changes?")? {
            println!("Cancelled");
            return Ok(());
        }
        apply(&kubectl, &plan)?;
    }

    if opts.no_wait {
        return Ok(());
    }

    println!("{} Waiting for nodeclaims to become undrifted...", ">>".blue().bold());
    println!("   Press Ctrl+C to skip waiting");
    println!();
    wait::watch_fleet(&kubectl, config.poll_interval())
}

fn apply(kubectl: &Kubectl, plan: &Plan) -> Result<()> {
    println!();
    println!("{} Applying changes...", ">>".blue().bold());
    println!();

    let report = rollout::apply(kubectl, plan, |item, result| match result {
        Ok(ApplyOutcome::Updated) => {
            println!("{} Updated {}", "ok".green().bold(), item.node_class.bold());
            println!("   Old: {}", item.old_image_ref.dimmed());
            println!("   New: {}", item.new_image_ref);
        }
        Ok(ApplyOutcome::Unchanged) => {
            println!(
                "{} {} already up to date",
                "::".blue().bold(),
                item.node_class
            );
        }
        Err(e) => {
            eprintln!(
                "{} Failed to update {}: {:#}",
                "!!".red().bold(),
                item.node_class,
                e.source
            );
        }
    });

    println!();
    println!(
        "{} {} updated, {} unchanged, {} failed",
        if report.is_success() {
            "ok".green().bold()
        } else {
            "!!".red().bold()
        },
        report.updated.len(),
        report.unchanged.len(),
        report.failed.len()
    );
    println!();

    if !report.is_success() {
        let failed: Vec<&str> = report
            .failed
            .iter()
            .map(|e| e.node_class.as_str())
            .collect();
        bail!("failed to update {}", failed.join(", "));
    }
    Ok(())
}

fn print_node_classes(survey: &Survey) {
    println!("Found EC2NodeClass objects:");
    for record in &survey.records {
        match record.image_ref() {
            Some(image) => println!("  - {} (AMI: {})", record.name, image),
            None => println!("  - {} {}", record.name, "(no AMI name selector)".dimmed()),
        }
    }
    println!();
}

fn print_plan(plan: &Plan, survey: &Survey) {
    let unpublished = survey.unpublished(plan);

    println!("{}", "Dry Run - Changes to be made:".bold());
    println!("{}", "=".repeat(80));
    for (i, change) in plan.changes.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("NodeClass: {}", change.node_class.bold());
        println!("  Old AMI: {}", change.old_image_ref);
        if change.is_noop() {
            println!("  New AMI: {} {}", change.new_image_ref, "(unchanged)".dimmed());
        } else {
            println!("  New AMI: {}", change.new_image_ref.green());
        }
        if unpublished.iter().any(|c| c.node_class == change.node_class) {
            println!(
                "  {} no image named {} in the catalog",
                "!!".yellow().bold(),
                change.new_image_ref
            );
        }
    }
    println!("{}", "=".repeat(80));

    for skipped in &plan.skipped {
        println!(
            "{} Skipping {} ({})",
            "!!".yellow().bold(),
            skipped.node_class,
            skipped.reason
        );
    }
    println!();
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} {} [y/N] ", "??".blue().bold(), prompt);
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
