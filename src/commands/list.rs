//! `upgrade-ami list`: node classes, their AMI references, and the group
//! each one would be pinned to at the newest available build.

use anyhow::Result;
use colored::Colorize;

use crate::aws::AwsCli;
use crate::config::Config;
use crate::domain::image_name;
use crate::domain::registry::{GroupSource, NodeClassInfo};
use crate::domain::rollout::Survey;
use crate::kube::Kubectl;

pub fn run(config: &Config) -> Result<()> {
    let kubectl = Kubectl::from_config(config)?;
    let aws = AwsCli::from_config(config)?;
    let survey = Survey::collect(&kubectl, &aws, config.owner.as_deref())?;

    // Candidates are never empty once the survey succeeded.
    let newest = &survey.candidates[0];
    let registry = survey.registry(&newest.date_version);
    let plan = survey.plan(&newest.date_version);

    println!(
        "{} (Kubernetes {}, newest build {})",
        "EC2NodeClass objects".bold(),
        survey.platform_version,
        newest.label()
    );
    println!();

    for record in &survey.records {
        println!("  {}", record.name.bold());

        let Some(image) = record.image_ref() else {
            println!("    AMI:   {}", "(no AMI name selector, not managed)".dimmed());
            continue;
        };
        println!("    AMI:   {}", image);

        match image_name::parse(image) {
            Ok(pattern) if !pattern.is_resolved() => {
                println!("    Build: {}", "(wildcard, not pinned to a build)".dimmed());
            }
            Ok(_) => {}
            Err(e) => {
                println!("    {} {}", "!!".yellow().bold(), e);
                continue;
            }
        }
        if let Some(info) = registry.get(&record.name) {
            println!("    Group: {}", describe_group(info));
        }
        if let Some(change) = plan.changes.iter().find(|c| c.node_class == record.name) {
            if change.is_noop() {
                println!("    Next:  {}", "(up to date)".green());
            } else {
                println!("    Next:  {}", change.new_image_ref);
            }
        }
    }

    if !registry.unconventional().is_empty() {
        println!();
        println!(
            "{} {} node class(es) are not named domino-eks-<group>; they keep ungrouped AMI names",
            "!!".yellow().bold(),
            registry.unconventional().len()
        );
    }
    println!();
    Ok(())
}

fn describe_group(info: &NodeClassInfo) -> String {
    match info.source {
        GroupSource::Explicit => format!("{} (from AMI name)", info.group),
        GroupSource::Inferred if info.has_group => {
            format!("{} (from node class name)", info.group)
        }
        GroupSource::Inferred => format!(
            "none ({} inferred, but no {} image is published)",
            info.group, info.group
        ),
        GroupSource::Unconventional => {
            "none (node class name does not follow the convention)".to_string()
        }
    }
}
