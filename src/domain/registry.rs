//! Node class registry: which nodegroup each node class belongs to.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use super::image_name::{self, IMAGE_PREFIX};
use super::types::NodeClassRecord;

/// Where a node class's group came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSource {
    /// Named in the AMI reference itself.
    Explicit,
    /// Derived from the node class name.
    Inferred,
    /// The node class name does not follow `domino-eks-<group>`.
    Unconventional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeClassInfo {
    /// Whether new AMI names for this node class carry a group segment.
    pub has_group: bool,
    pub group: String,
    pub source: GroupSource,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, NodeClassInfo>,
    unconventional: Vec<String>,
}

impl Registry {
    /// Build the registry from the declared node classes.
    ///
    /// A group named in the AMI reference is always used. Otherwise the group
    /// is inferred from the node class name, and it only becomes part of the
    /// new AMI name when `published_groups` shows the catalog has a grouped
    /// image for it. Records with no selector term or an unparseable AMI name
    /// are left out.
    ///
    /// `published_groups` is needed because a name such as `domino-eks-compute`
    /// does not say whether `compute` images exist; inferring a group the
    /// catalog never publishes would pin the node class to a missing AMI.
    pub fn build(records: &[NodeClassRecord], published_groups: &BTreeSet<String>) -> Self {
        let mut registry = Registry::default();

        for record in records {
            let Some(image_ref) = record.image_ref() else {
                continue;
            };
            let Ok(pattern) = image_name::parse(image_ref) else {
                continue;
            };

            let info = match pattern.group {
                Some(group) => NodeClassInfo {
                    has_group: true,
                    group,
                    source: GroupSource::Explicit,
                },
                None => match infer_group(&record.name) {
                    Some(group) => NodeClassInfo {
                        has_group: published_groups.contains(&group),
                        group,
                        source: GroupSource::Inferred,
                    },
                    None => {
                        warn!(
                            node_class = %record.name,
                            "node class name does not follow domino-eks-<group>, keeping ungrouped AMI name"
                        );
                        registry.unconventional.push(record.name.clone());
                        NodeClassInfo {
                            has_group: false,
                            group: String::new(),
                            source: GroupSource::Unconventional,
                        }
                    }
                },
            };

            registry.entries.insert(record.name.clone(), info);
        }

        registry
    }

    pub fn get(&self, node_class: &str) -> Option<&NodeClassInfo> {
        self.entries.get(node_class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Node classes whose names could not yield a group.
    pub fn unconventional(&self) -> &[String] {
        &self.unconventional
    }
}

/// `domino-eks-compute` → `compute`, `domino-eks-gpu-a100` → `gpu-a100`.
pub fn infer_group(node_class_name: &str) -> Option<String> {
    node_class_name
        .strip_prefix(IMAGE_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn explicit_group_wins_over_name() {
        let records = vec![NodeClassRecord::new("domino-eks-compute", "domino-eks-gpu-1.33-*")];
        let registry = Registry::build(&records, &BTreeSet::new());

        let info = registry.get("domino-eks-compute").unwrap();
        assert!(info.has_group);
        assert_eq!(info.group, "gpu");
        assert_eq!(info.source, GroupSource::Explicit);
    }

    #[test]
    fn inferred_group_applies_when_published() {
        let records = vec![NodeClassRecord::new("domino-eks-gpu", "domino-eks-1.33-*")];
        let registry = Registry::build(&records, &groups(&["gpu"]));

        let info = registry.get("domino-eks-gpu").unwrap();
        assert!(info.has_group);
        assert_eq!(info.group, "gpu");
        assert_eq!(info.source, GroupSource::Inferred);
    }

    #[test]
    fn inferred_group_unpublished_stays_ungrouped() {
        let records = vec![NodeClassRecord::new("domino-eks-compute", "domino-eks-1.33-*")];
        let registry = Registry::build(&records, &groups(&["gpu"]));

        let info = registry.get("domino-eks-compute").unwrap();
        assert!(!info.has_group);
        assert_eq!(info.group, "compute");
    }

    #[test]
    fn unconventional_names_are_flagged() {
        let records = vec![
            NodeClassRecord::new("default", "domino-eks-1.33-*"),
            NodeClassRecord::new("domino-eks-", "domino-eks-1.33-*"),
            NodeClassRecord::new("eks-domino-gpu", "domino-eks-1.33-v20251001"),
        ];
        let registry = Registry::build(&records, &groups(&["gpu"]));

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.unconventional(),
            &["default", "domino-eks-", "eks-domino-gpu"]
        );
        let info = registry.get("eks-domino-gpu").unwrap();
        assert!(!info.has_group);
        assert_eq!(info.group, "");
        assert_eq!(info.source, GroupSource::Unconventional);
    }

    #[test]
    fn unparseable_and_selectorless_records_are_excluded() {
        let records = vec![
            NodeClassRecord::new("domino-eks-broken", "ubuntu-jammy"),
            NodeClassRecord {
                name: "domino-eks-bare".to_string(),
                selector: None,
            },
        ];
        let registry = Registry::build(&records, &BTreeSet::new());
        assert!(registry.is_empty());
    }

    #[test]
    fn infer_group_keeps_hyphenated_remainder() {
        assert_eq!(infer_group("domino-eks-gpu-a100").as_deref(), Some("gpu-a100"));
        assert_eq!(infer_group("domino-eks"), None);
        assert_eq!(infer_group("karpenter-default"), None);
    }
}
