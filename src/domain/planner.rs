//! Dry-run planning: what every node class's AMI reference would become.

use tracing::warn;

use super::error::SkipReason;
use super::image_name;
use super::registry::Registry;
use super::synthesizer::synthesize;
use super::types::{ChangeItem, NodeClassRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub node_class: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub changes: Vec<ChangeItem>,
    pub skipped: Vec<Skipped>,
}

impl Plan {
    /// Changes that would actually rewrite a reference.
    pub fn pending(&self) -> impl Iterator<Item = &ChangeItem> {
        self.changes.iter().filter(|c| !c.is_noop())
    }

    pub fn is_noop(&self) -> bool {
        self.pending().next().is_none()
    }
}

/// Plan the rewrite of every node class to `date_version`.
///
/// Pure: reads nothing but its arguments, so it can be run as often as
/// needed. Node classes already pinned to `date_version` come out unchanged.
pub fn plan(records: &[NodeClassRecord], registry: &Registry, date_version: &str) -> Plan {
    let mut plan = Plan::default();

    for record in records {
        let Some(old_image_ref) = record.image_ref() else {
            continue;
        };

        let pattern = match image_name::parse(old_image_ref) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(node_class = %record.name, error = %e, "skipping node class");
                plan.skipped.push(Skipped {
                    node_class: record.name.clone(),
                    reason: e.into(),
                });
                continue;
            }
        };

        let Some(info) = registry.get(&record.name) else {
            warn!(node_class = %record.name, "skipping node class, no registry entry");
            plan.skipped.push(Skipped {
                node_class: record.name.clone(),
                reason: SkipReason::RegistryMiss,
            });
            continue;
        };

        plan.changes.push(ChangeItem {
            node_class: record.name.clone(),
            old_image_ref: old_image_ref.to_string(),
            new_image_ref: synthesize(&pattern, info, date_version),
        });
    }

    plan
}

/// The Kubernetes version of the first node class with a parseable AMI name.
pub fn detect_platform_version(records: &[NodeClassRecord]) -> Option<String> {
    records
        .iter()
        .filter_map(|r| r.image_ref())
        .find_map(|name| image_name::parse(name).ok())
        .map(|p| p.platform_version)
}

/// Node classes whose AMI names target a Kubernetes version other than
/// `platform_version`.
pub fn mismatched_platform<'a>(
    records: &'a [NodeClassRecord],
    platform_version: &str,
) -> Vec<&'a NodeClassRecord> {
    records
        .iter()
        .filter(|r| {
            r.image_ref()
                .and_then(|name| image_name::parse(name).ok())
                .is_some_and(|p| p.platform_version != platform_version)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::domain::error::ImageNameError;

    #[test]
    fn skips_are_reported_not_fatal() {
        let records = vec![
            NodeClassRecord::new("domino-eks-broken", "ubuntu-jammy"),
            NodeClassRecord::new("domino-eks-compute", "domino-eks-1.33-*"),
        ];
        let registry = Registry::build(&records, &BTreeSet::new());

        let plan = plan(&records, &registry, "20251001");

        assert_eq!(plan.changes.len(), 1);
        assert_eq!(
            plan.skipped,
            vec![Skipped {
                node_class: "domino-eks-broken".to_string(),
                reason: SkipReason::Unparseable(ImageNameError::InvalidFormat(
                    "ubuntu-jammy".to_string()
                )),
            }]
        );
    }

    #[test]
    fn registry_miss_is_skipped() {
        let records = vec![NodeClassRecord::new("domino-eks-gpu", "domino-eks-gpu-1.33-*")];
        let plan = plan(&records, &Registry::default(), "20251001");

        assert!(plan.changes.is_empty());
        assert_eq!(plan.skipped[0].reason, SkipReason::RegistryMiss);
    }

    #[test]
    fn selectorless_records_are_silently_excluded() {
        let records = vec![NodeClassRecord {
            name: "domino-eks-bare".to_string(),
            selector: None,
        }];
        let plan = plan(&records, &Registry::default(), "20251001");
        assert_eq!(plan, Plan::default());
    }

    #[test]
    fn pending_excludes_noops() {
        let records = vec![
            NodeClassRecord::new("domino-eks-compute", "domino-eks-1.33-v20251001"),
            NodeClassRecord::new("domino-eks-platform", "domino-eks-1.33-v20250901"),
        ];
        let registry = Registry::build(&records, &BTreeSet::new());
        let plan = plan(&records, &registry, "20251001");

        let pending: Vec<&str> = plan.pending().map(|c| c.node_class.as_str()).collect();
        assert_eq!(pending, vec!["domino-eks-platform"]);
        assert!(!plan.is_noop());
    }

    #[test]
    fn platform_version_from_first_parseable_record() {
        let records = vec![
            NodeClassRecord {
                name: "domino-eks-bare".to_string(),
                selector: None,
            },
            NodeClassRecord::new("domino-eks-broken", "ubuntu-jammy"),
            NodeClassRecord::new("domino-eks-gpu", "domino-eks-gpu-1.33-*"),
            NodeClassRecord::new("domino-eks-old", "domino-eks-1.32-v20250101"),
        ];

        assert_eq!(detect_platform_version(&records).as_deref(), Some("1.33"));
        let mismatched: Vec<&str> = mismatched_platform(&records, "1.33")
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(mismatched, vec!["domino-eks-old"]);
        assert_eq!(detect_platform_version(&records[..2]), None);
    }
}
