//! Reconcile the AMI catalog against the cluster's Kubernetes version.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;
use tracing::{debug, trace};

use super::error::ReconcileError;
use super::types::{CatalogEntry, VersionCandidate};

/// Dated-name patterns for one Kubernetes version: with a group, then without.
fn dated_patterns(platform_version: &str) -> (Regex, Regex) {
    let k8s = regex::escape(platform_version);
    let grouped = Regex::new(&format!(r"^domino-eks-.*-{k8s}-v([0-9]{{8}})$"))
        .expect("escaped version yields a valid pattern");
    let ungrouped = Regex::new(&format!(r"^domino-eks-{k8s}-v([0-9]{{8}})$"))
        .expect("escaped version yields a valid pattern");
    (grouped, ungrouped)
}

/// Collect the distinct date versions published for `platform_version`.
///
/// Each candidate carries the latest creation timestamp among the images that
/// share its date version. Candidates come back newest first. Images built for
/// other Kubernetes versions are ignored.
pub fn extract_candidates(
    catalog: &[CatalogEntry],
    platform_version: &str,
) -> Result<Vec<VersionCandidate>, ReconcileError> {
    let (grouped, ungrouped) = dated_patterns(platform_version);
    let mut latest: HashMap<&str, &str> = HashMap::new();

    for entry in catalog {
        let date = grouped
            .captures(&entry.name)
            .or_else(|| ungrouped.captures(&entry.name))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        let Some(date) = date else {
            continue;
        };
        trace!(image = %entry.name, id = %entry.id, date, "matched dated image");

        latest
            .entry(date)
            .and_modify(|seen| {
                if entry.created_at.as_str() > *seen {
                    *seen = entry.created_at.as_str();
                }
            })
            .or_insert(entry.created_at.as_str());
    }

    if latest.is_empty() {
        return Err(ReconcileError::NoMatchingVersions {
            platform_version: platform_version.to_string(),
        });
    }

    let mut candidates: Vec<VersionCandidate> = latest
        .into_iter()
        .map(|(date, created_at)| VersionCandidate {
            date_version: date.to_string(),
            created_at: created_at.to_string(),
        })
        .collect();
    candidates.sort_by(|a, b| b.date_version.cmp(&a.date_version));

    debug!(
        platform_version,
        candidates = candidates.len(),
        images = catalog.len(),
        "extracted AMI version candidates"
    );
    Ok(candidates)
}

/// Groups that have a dated image for exactly this Kubernetes version and
/// date version. Only hyphen-free groups count, so every name built from one
/// parses back through the grammar.
pub fn published_groups(
    catalog: &[CatalogEntry],
    platform_version: &str,
    date_version: &str,
) -> BTreeSet<String> {
    let pattern = Regex::new(&format!(
        r"^domino-eks-([^-]+)-{}-v{}$",
        regex::escape(platform_version),
        regex::escape(date_version)
    ))
    .expect("escaped versions yield a valid pattern");

    catalog
        .iter()
        .filter_map(|entry| pattern.captures(&entry.name))
        .map(|c| c[1].to_string())
        .collect()
}
