//! `upgrade-ami versions`: AMI builds available for the cluster's
//! Kubernetes version, newest first.

use std::collections::BTreeSet;

use anyhow::Result;
use colored::Colorize;

use crate::aws::AwsCli;
use crate::config::Config;
use crate::domain::image_name;
use crate::domain::rollout::Survey;
use crate::kube::Kubectl;

pub fn run(config: &Config) -> Result<()> {
    let kubectl = Kubectl::from_config(config)?;
    let aws = AwsCli::from_config(config)?;
    let survey = Survey::collect(&kubectl, &aws, config.owner.as_deref())?;

    println!(
        "{} (Kubernetes {}, owner {})",
        "Available AMI Versions".bold(),
        survey.platform_version,
        survey.owner
    );
    println!();

    let in_use: BTreeSet<String> = survey
        .records
        .iter()
        .filter_map(|r| r.image_ref())
        .filter_map(|name| image_name::parse(name).ok())
        .filter_map(|p| p.date_version().map(str::to_string))
        .collect();

    for candidate in &survey.candidates {
        let marker = if in_use.contains(&candidate.date_version) {
            " (in use)".cyan().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} - Created: {}{}",
            candidate.label().bold(),
            candidate.created_display(),
            marker
        );
    }
    println!();
    Ok(())
}
