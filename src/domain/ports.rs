//! Seams to the outside world. `kube::Kubectl` and `aws::AwsCli` implement
//! these against the real CLIs; tests use in-memory stand-ins.

use anyhow::Result;

use super::types::{CatalogEntry, NodeClaimStatus, NodeClassRecord};

pub trait NodeClassReader {
    /// Every declared node class.
    fn list_node_classes(&self) -> Result<Vec<NodeClassRecord>>;
}

pub trait NodeClassWriter {
    /// Replace the first AMI selector term's name. Either the whole object is
    /// written or an error is returned.
    fn apply_image_ref(&self, node_class: &str, new_image_ref: &str) -> Result<()>;
}

pub trait ImageCatalog {
    fn list_images(&self, owner: &str) -> Result<Vec<CatalogEntry>>;
}

pub trait ClaimStatusSource {
    fn list_node_claim_statuses(&self) -> Result<Vec<NodeClaimStatus>>;
}
