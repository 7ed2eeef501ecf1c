//! Rollout pipeline: survey the fleet, plan against a chosen date version,
//! and apply the plan one node class at a time.
//!
//! Everything up to `apply` is side-effect free, and `apply` skips items that
//! would not change anything, so the whole pipeline can be re-run at any
//! point.

use anyhow::{bail, Result};
use tracing::{info, warn};

use super::catalog;
use super::error::ApplyError;
use super::planner::{self, Plan};
use super::ports::{ImageCatalog, NodeClassReader, NodeClassWriter};
use super::registry::Registry;
use super::types::{CatalogEntry, ChangeItem, NodeClassRecord, VersionCandidate};

/// Snapshot of the fleet and the catalog taken once per run.
#[derive(Debug, Clone)]
pub struct Survey {
    pub records: Vec<NodeClassRecord>,
    pub platform_version: String,
    pub owner: String,
    pub catalog: Vec<CatalogEntry>,
    pub candidates: Vec<VersionCandidate>,
}

impl Survey {
    /// Read the node classes, detect the Kubernetes version and AMI owner,
    /// then query the catalog and extract the upgrade candidates.
    ///
    /// `owner_override` replaces the owner found on the first selector term.
    pub fn collect<R, C>(reader: &R, images: &C, owner_override: Option<&str>) -> Result<Self>
    where
        R: NodeClassReader + ?Sized,
        C: ImageCatalog + ?Sized,
    {
        let records = reader.list_node_classes()?;
        if records.is_empty() {
            bail!("no EC2NodeClass objects found in cluster");
        }

        let Some(platform_version) = planner::detect_platform_version(&records) else {
            bail!("could not determine Kubernetes version from AMI names");
        };
        info!(platform_version = %platform_version, "detected Kubernetes version");

        for record in planner::mismatched_platform(&records, &platform_version) {
            warn!(
                node_class = %record.name,
                image = record.image_ref().unwrap_or_default(),
                platform_version = %platform_version,
                "node class targets a different Kubernetes version"
            );
        }

        let owner = match owner_override {
            Some(owner) => owner.to_string(),
            None => match records.iter().find_map(|r| r.owner()) {
                Some(owner) => owner.to_string(),
                None => bail!("no AMI owner found on any selector term; set `owner` in config"),
            },
        };
        info!(owner = %owner, "querying AMI catalog");

        let catalog = images.list_images(&owner)?;
        let candidates = catalog::extract_candidates(&catalog, &platform_version)?;

        Ok(Self {
            records,
            platform_version,
            owner,
            catalog,
            candidates,
        })
    }

    pub fn candidate(&self, date_version: &str) -> Option<&VersionCandidate> {
        self.candidates
            .iter()
            .find(|c| c.date_version == date_version)
    }

    /// Registry as it applies to `date_version`.
    pub fn registry(&self, date_version: &str) -> Registry {
        let published =
            catalog::published_groups(&self.catalog, &self.platform_version, date_version);
        Registry::build(&self.records, &published)
    }

    pub fn plan(&self, date_version: &str) -> Plan {
        planner::plan(&self.records, &self.registry(date_version), date_version)
    }

    /// Planned changes whose new image name is absent from the catalog.
    /// Explicit groups and records on another Kubernetes version can land here.
    pub fn unpublished<'a>(&self, plan: &'a Plan) -> Vec<&'a ChangeItem> {
        plan.pending()
            .filter(|item| !self.catalog.iter().any(|e| e.name == item.new_image_ref))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Updated,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub failed: Vec<ApplyError>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write one change. No-op changes are not written.
pub fn apply_change<W>(writer: &W, item: &ChangeItem) -> Result<ApplyOutcome, ApplyError>
where
    W: NodeClassWriter + ?Sized,
{
    if item.is_noop() {
        return Ok(ApplyOutcome::Unchanged);
    }

    writer
        .apply_image_ref(&item.node_class, &item.new_image_ref)
        .map_err(|source| ApplyError {
            node_class: item.node_class.clone(),
            source,
        })?;

    info!(
        node_class = %item.node_class,
        old = %item.old_image_ref,
        new = %item.new_image_ref,
        "updated node class"
    );
    Ok(ApplyOutcome::Updated)
}

/// Apply every change in `plan`. A failed write is recorded and the rest of
/// the batch still goes through; `on_item` sees each result as it happens.
pub fn apply<W, F>(writer: &W, plan: &Plan, mut on_item: F) -> ApplyReport
where
    W: NodeClassWriter + ?Sized,
    F: FnMut(&ChangeItem, &Result<ApplyOutcome, ApplyError>),
{
    let mut report = ApplyReport::default();

    for item in &plan.changes {
        let result = apply_change(writer, item);
        on_item(item, &result);

        match result {
            Ok(ApplyOutcome::Updated) => report.updated.push(item.node_class.clone()),
            Ok(ApplyOutcome::Unchanged) => report.unchanged.push(item.node_class.clone()),
            Err(e) => {
                warn!(node_class = %e.node_class, error = %e.source, "node class update failed");
                report.failed.push(e);
            }
        }
    }

    report
}
