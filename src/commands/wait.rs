//! `upgrade-ami wait`: watch NodeClaims until none are drifted.

use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::domain::monitor::{self, MonitorOutcome};
use crate::domain::ports::ClaimStatusSource;
use crate::domain::types::NodeClaimStatus;
use crate::kube::Kubectl;

pub fn run(config: &Config, interval: Option<u64>) -> Result<()> {
    let kubectl = Kubectl::from_config(config)?;
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval());

    println!("{} Monitoring nodeclaim drift status...", ">>".blue().bold());
    println!("   Press Ctrl+C to stop monitoring");
    println!();
    watch_fleet(&kubectl, interval)
}

/// Redraw the drift table every `interval` until every claim has converged
/// or the user interrupts.
pub fn watch_fleet<S: ClaimStatusSource + ?Sized>(source: &S, interval: Duration) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime
        .block_on(monitor::watch(source, interval, render, interrupted()))
        .context("monitoring stopped; applied changes are unaffected")?;

    match outcome {
        MonitorOutcome::Converged => {
            println!();
            println!("{} All nodeclaims are now undrifted!", "ok".green().bold());
        }
        MonitorOutcome::Cancelled => {
            println!();
            println!("{} Stopped monitoring", "::".blue().bold());
        }
    }
    Ok(())
}

async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: only convergence or a fetch error can
        // end the loop.
        std::future::pending::<()>().await;
    }
}

fn render(statuses: &[NodeClaimStatus]) -> bool {
    // Clear screen, cursor home.
    print!("\x1b[H\x1b[2J");
    println!("{}", "NodeClaim Drift Status".bold());
    println!("{}", "=".repeat(80));

    if statuses.is_empty() {
        println!("No nodeclaims found");
        println!();
        println!("Press Ctrl+C to exit");
        return monitor::until_converged(statuses);
    }

    let mut drifted = 0;
    for status in statuses {
        let (icon, text) = if status.drifted {
            drifted += 1;
            let text = if status.reason.is_empty() {
                "Drifted".to_string()
            } else {
                format!("Drifted ({})", status.reason)
            };
            ("!!".yellow().bold(), text.yellow())
        } else {
            ("ok".green().bold(), "Undrifted".green())
        };
        println!(
            "{} {} (NodeClass: {}, Age: {})",
            icon,
            status.name.bold(),
            status.node_class,
            format_age(status.age)
        );
        println!("   Status: {}", text);
        println!();
    }

    println!("{}", "=".repeat(80));
    if drifted > 0 {
        println!(
            "{} Waiting... ({}/{} nodeclaims still drifted)",
            "::".blue().bold(),
            drifted,
            statuses.len()
        );
    } else {
        println!("{} All nodeclaims are undrifted!", "ok".green().bold());
    }
    println!("Press Ctrl+C to exit");

    monitor::until_converged(statuses)
}

/// kubectl-style age: the two coarsest units, dropping a zero remainder.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    let (major, major_unit, minor, minor_unit) = if secs < MINUTE {
        return format!("{secs}s");
    } else if secs < HOUR {
        (secs / MINUTE, "m", secs % MINUTE, "s")
    } else if secs < DAY {
        (secs / HOUR, "h", secs % HOUR / MINUTE, "m")
    } else {
        (secs / DAY, "d", secs % DAY / HOUR, "h")
    };

    if minor == 0 {
        format!("{major}{major_unit}")
    } else {
        format!("{major}{major_unit}{minor}{minor_unit}")
    }
}
