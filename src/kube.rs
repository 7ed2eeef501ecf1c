//! kubectl-backed access to EC2NodeClass and NodeClaim objects.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::ports::{ClaimStatusSource, NodeClassReader, NodeClassWriter};
use crate::domain::types::{NodeClaimStatus, NodeClassRecord, SelectorTerm};
use crate::tools;

const NODE_CLASS_RESOURCE: &str = "ec2nodeclass";
const NODE_CLAIM_RESOURCE: &str = "nodeclaims";

pub struct Kubectl {
    binary: PathBuf,
    context: Option<String>,
}

impl Kubectl {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            binary: tools::require(&config.kubectl, "kubectl")?,
            context: config.kube_context.clone(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(context) = &self.context {
            cmd.args(["--context", context.as_str()]);
        }
        cmd
    }

    fn get_json(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut cmd = self.command();
        cmd.arg("get").args(args).args(["-o", "json"]);
        tools::run(&mut cmd)
    }
}

impl NodeClassReader for Kubectl {
    fn list_node_classes(&self) -> Result<Vec<NodeClassRecord>> {
        let raw = self.get_json(&[NODE_CLASS_RESOURCE])?;
        parse_node_classes(&raw)
    }
}

impl NodeClassWriter for Kubectl {
    fn apply_image_ref(&self, node_class: &str, new_image_ref: &str) -> Result<()> {
        let raw = self.get_json(&[NODE_CLASS_RESOURCE, node_class])?;
        let mut doc: Value = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing {NODE_CLASS_RESOURCE} {node_class}"))?;

        rewrite_image_ref(&mut doc, new_image_ref)
            .with_context(|| format!("updating {NODE_CLASS_RESOURCE} {node_class}"))?;
        let body = serde_json::to_vec(&doc).context("serializing updated nodeclass")?;

        let mut cmd = self.command();
        cmd.args(["apply", "-f", "-"]);
        let out = tools::run_with_input(&mut cmd, Some(body.as_slice()))?;
        debug!(
            node_class,
            output = %String::from_utf8_lossy(&out).trim(),
            "kubectl apply"
        );
        Ok(())
    }
}

impl ClaimStatusSource for Kubectl {
    fn list_node_claim_statuses(&self) -> Result<Vec<NodeClaimStatus>> {
        let raw = self.get_json(&[NODE_CLAIM_RESOURCE])?;
        parse_node_claims(&raw, Utc::now())
    }
}

#[derive(Deserialize)]
struct List<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default, rename = "creationTimestamp")]
    creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct Ec2NodeClass {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: NodeClassSpec,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NodeClassSpec {
    #[serde(default)]
    ami_selector_terms: Vec<AmiSelectorTerm>,
}

#[derive(Deserialize)]
struct AmiSelectorTerm {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    owner: Option<String>,
}

/// Parse `kubectl get ec2nodeclass -o json`. Only the first AMI selector term
/// of each node class is kept; a term without a name counts as no term.
pub fn parse_node_classes(raw: &[u8]) -> Result<Vec<NodeClassRecord>> {
    let list: List<Ec2NodeClass> =
        serde_json::from_slice(raw).context("failed to parse nodeclasses")?;

    Ok(list
        .items
        .into_iter()
        .map(|nc| {
            let terms = nc.spec.ami_selector_terms;
            if terms.len() > 1 {
                warn!(
                    node_class = %nc.metadata.name,
                    terms = terms.len(),
                    "node class has several AMI selector terms, only the first is managed"
                );
            }
            let selector = terms.into_iter().next().and_then(|t| {
                t.name.map(|name| SelectorTerm {
                    name,
                    owner: t.owner,
                })
            });
            NodeClassRecord {
                name: nc.metadata.name,
                selector,
            }
        })
        .collect())
}

/// Point `spec.amiSelectorTerms[0].name` at `new_image_ref`, leaving the rest
/// of the object untouched.
pub fn rewrite_image_ref(doc: &mut Value, new_image_ref: &str) -> Result<()> {
    let term = doc
        .pointer_mut("/spec/amiSelectorTerms/0")
        .and_then(Value::as_object_mut)
        .context("nodeclass has no spec.amiSelectorTerms[0]")?;
    term.insert("name".to_string(), Value::String(new_image_ref.to_string()));
    Ok(())
}

#[derive(Deserialize)]
struct NodeClaim {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: NodeClaimSpec,
    #[serde(default)]
    status: NodeClaimState,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NodeClaimSpec {
    #[serde(default)]
    node_class_ref: Option<NodeClassRef>,
}

#[derive(Deserialize)]
struct NodeClassRef {
    name: String,
}

#[derive(Deserialize, Default)]
struct NodeClaimState {
    #[serde(default)]
    conditions: Vec<Condition>,
}

#[derive(Deserialize)]
struct Condition {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse `kubectl get nodeclaims -o json`, computing ages against `now`.
pub fn parse_node_claims(raw: &[u8], now: DateTime<Utc>) -> Result<Vec<NodeClaimStatus>> {
    let list: List<NodeClaim> =
        serde_json::from_slice(raw).context("failed to parse nodeclaims")?;

    Ok(list
        .items
        .into_iter()
        .map(|claim| {
            let drift = claim
                .status
                .conditions
                .into_iter()
                .find(|c| c.kind == "Drifted" && c.status == "True");
            let age = claim
                .metadata
                .creation_timestamp
                .and_then(|created| (now - created).to_std().ok())
                .unwrap_or(Duration::ZERO);

            NodeClaimStatus {
                name: claim.metadata.name,
                node_class: claim
                    .spec
                    .node_class_ref
                    .map(|r| r.name)
                    .unwrap_or_default(),
                age,
                drifted: drift.is_some(),
                reason: drift
                    .and_then(|c| c.reason.or(c.message))
                    .unwrap_or_default(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_classes_keep_first_named_term() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [
                {
                    "apiVersion": "karpenter.k8s.aws/v1",
                    "kind": "EC2NodeClass",
                    "metadata": {"name": "domino-eks-gpu"},
                    "spec": {
                        "amiSelectorTerms": [
                            {"name": "domino-eks-gpu-1.33-*", "owner": "123456789012"},
                            {"name": "domino-eks-1.33-*"}
                        ]
                    }
                },
                {
                    "metadata": {"name": "domino-eks-by-id"},
                    "spec": {"amiSelectorTerms": [{"id": "ami-0123456789abcdef0"}]}
                },
                {
                    "metadata": {"name": "domino-eks-bare"},
                    "spec": {}
                }
            ]
        });

        let records = parse_node_classes(raw.to_string().as_bytes()).unwrap();

        assert_eq!(
            records,
            vec![
                NodeClassRecord::new("domino-eks-gpu", "domino-eks-gpu-1.33-*")
                    .with_owner("123456789012"),
                NodeClassRecord {
                    name: "domino-eks-by-id".to_string(),
                    selector: None,
                },
                NodeClassRecord {
                    name: "domino-eks-bare".to_string(),
                    selector: None,
                },
            ]
        );
    }

    #[test]
    fn empty_list_and_garbage() {
        assert!(parse_node_classes(br#"{"items": []}"#).unwrap().is_empty());
        assert!(parse_node_classes(br#"{}"#).unwrap().is_empty());
        let err = parse_node_classes(b"error: the server doesn't have a resource type").unwrap_err();
        assert!(err.to_string().contains("failed to parse nodeclasses"));
    }

    #[test]
    fn rewrite_replaces_only_the_first_term_name() {
        let mut doc = json!({
            "metadata": {"name": "domino-eks-gpu", "resourceVersion": "4711"},
            "spec": {
                "role": "KarpenterNodeRole",
                "amiSelectorTerms": [
                    {"name": "domino-eks-gpu-1.33-*", "owner": "123456789012"},
                    {"name": "untouched"}
                ]
            }
        });

        rewrite_image_ref(&mut doc, "domino-eks-gpu-1.33-v20251001").unwrap();

        assert_eq!(
            doc,
            json!({
                "metadata": {"name": "domino-eks-gpu", "resourceVersion": "4711"},
                "spec": {
                    "role": "KarpenterNodeRole",
                    "amiSelectorTerms": [
                        {"name": "domino-eks-gpu-1.33-v20251001", "owner": "123456789012"},
                        {"name": "untouched"}
                    ]
                }
            })
        );
    }

    #[test]
    fn rewrite_without_terms_fails() {
        let mut doc = json!({"spec": {"amiSelectorTerms": []}});
        assert!(rewrite_image_ref(&mut doc, "domino-eks-1.33-v20251001").is_err());
        let mut doc = json!({"metadata": {"name": "x"}});
        assert!(rewrite_image_ref(&mut doc, "domino-eks-1.33-v20251001").is_err());
    }

    #[test]
    fn node_claims_report_drift_and_age() {
        let now: DateTime<Utc> = "2025-10-02T12:00:00Z".parse().unwrap();
        let raw = json!({
            "items": [
                {
                    "metadata": {"name": "compute-abc12", "creationTimestamp": "2025-10-02T11:30:00Z"},
                    "spec": {"nodeClassRef": {"group": "karpenter.k8s.aws", "kind": "EC2NodeClass", "name": "domino-eks-compute"}},
                    "status": {"conditions": [
                        {"type": "Ready", "status": "True"},
                        {"type": "Drifted", "status": "True", "reason": "AMIDrift"}
                    ]}
                },
                {
                    "metadata": {"name": "gpu-x9z8y", "creationTimestamp": "2025-09-30T12:00:00Z"},
                    "spec": {"nodeClassRef": {"name": "domino-eks-gpu"}},
                    "status": {"conditions": [
                        {"type": "Drifted", "status": "False", "reason": "NotDrifted"}
                    ]}
                },
                {
                    "metadata": {"name": "pending-0", "creationTimestamp": "2025-10-02T12:00:05Z"},
                    "status": {"conditions": [
                        {"type": "Drifted", "status": "True", "message": "NodeClass hash changed"}
                    ]}
                }
            ]
        });

        let claims = parse_node_claims(raw.to_string().as_bytes(), now).unwrap();

        assert_eq!(
            claims,
            vec![
                NodeClaimStatus {
                    name: "compute-abc12".to_string(),
                    node_class: "domino-eks-compute".to_string(),
                    age: Duration::from_secs(30 * 60),
                    drifted: true,
                    reason: "AMIDrift".to_string(),
                },
                NodeClaimStatus {
                    name: "gpu-x9z8y".to_string(),
                    node_class: "domino-eks-gpu".to_string(),
                    age: Duration::from_secs(2 * 24 * 3600),
                    drifted: false,
                    reason: String::new(),
                },
                NodeClaimStatus {
                    name: "pending-0".to_string(),
                    node_class: String::new(),
                    age: Duration::ZERO,
                    drifted: true,
                    reason: "NodeClass hash changed".to_string(),
                },
            ]
        );
    }
}
