use std::time::Duration;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// The first AMI selector term of a node class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorTerm {
    pub name: String,
    pub owner: Option<String>,
}

/// One declared EC2NodeClass. Only the first selector term is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeClassRecord {
    pub name: String,
    pub selector: Option<SelectorTerm>,
}

impl NodeClassRecord {
    pub fn new(name: impl Into<String>, image_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: Some(SelectorTerm {
                name: image_ref.into(),
                owner: None,
            }),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        if let Some(term) = self.selector.as_mut() {
            term.owner = Some(owner.into());
        }
        self
    }

    pub fn image_ref(&self) -> Option<&str> {
        self.selector.as_ref().map(|t| t.name.as_str())
    }

    pub fn owner(&self) -> Option<&str> {
        self.selector.as_ref().and_then(|t| t.owner.as_deref())
    }
}

/// One image returned by the catalog query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub id: String,
    /// Raw creation timestamp as reported by EC2 (`2025-10-01T00:00:00.000Z`).
    pub created_at: String,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            created_at: created_at.into(),
        }
    }
}

/// A distinct date version available for the target Kubernetes version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionCandidate {
    pub date_version: String,
    /// Latest creation timestamp among the images sharing this date version.
    pub created_at: String,
}

impl VersionCandidate {
    pub fn label(&self) -> String {
        format!("v{}", self.date_version)
    }

    pub fn created_display(&self) -> String {
        display_timestamp(&self.created_at)
    }
}

/// One planned rewrite of a node class's AMI reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeItem {
    pub node_class: String,
    pub old_image_ref: String,
    pub new_image_ref: String,
}

impl ChangeItem {
    pub fn is_noop(&self) -> bool {
        self.old_image_ref == self.new_image_ref
    }
}

/// Drift state of one NodeClaim at the moment it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeClaimStatus {
    pub name: String,
    pub node_class: String,
    pub age: Duration,
    pub drifted: bool,
    pub reason: String,
}

/// Format an EC2 timestamp as `YYYY-MM-DD HH:MM`, or return it untouched
/// when it does not parse.
pub fn display_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}
