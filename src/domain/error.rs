//! Error taxonomy for the AMI roll-forward pipeline.
//!
//! Per-record failures (`ImageNameError`, `SkipReason`, `ApplyError`) are
//! reported and the run continues. `ReconcileError` aborts the run and
//! `MonitorError` ends the convergence loop only.

/// An AMI name that matches none of the grammar rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageNameError {
    #[error("invalid AMI name format: {0}")]
    InvalidFormat(String),
}

/// No catalog image matches the requested Kubernetes version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("no matching AMI versions found for Kubernetes {platform_version}")]
    NoMatchingVersions { platform_version: String },
}

/// Why a node class was left out of the plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("could not parse AMI name ({0})")]
    Unparseable(#[from] ImageNameError),

    #[error("no nodeclass info found")]
    RegistryMiss,
}

/// One node class write that did not go through.
#[derive(Debug, thiserror::Error)]
#[error("failed to update {node_class}")]
pub struct ApplyError {
    pub node_class: String,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to fetch nodeclaim status")]
    Fetch(#[source] anyhow::Error),
}
