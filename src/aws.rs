//! AMI catalog backed by `aws ec2 describe-images`.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::domain::image_name::IMAGE_PREFIX;
use crate::domain::ports::ImageCatalog;
use crate::domain::types::CatalogEntry;
use crate::tools;

const IMAGE_QUERY: &str = "Images[*].{Name:Name,ImageId:ImageId,CreationDate:CreationDate}";

pub struct AwsCli {
    binary: PathBuf,
    profile: Option<String>,
    region: Option<String>,
}

impl AwsCli {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            binary: tools::require(&config.aws, "aws")?,
            profile: config.aws_profile.clone(),
            region: config.aws_region.clone(),
        })
    }

    fn describe_images(&self, owner: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(profile) = &self.profile {
            cmd.args(["--profile", profile.as_str()]);
        }
        if let Some(region) = &self.region {
            cmd.args(["--region", region.as_str()]);
        }
        cmd.args(["ec2", "describe-images", "--owners", owner])
            .arg("--filters")
            .arg(format!("Name=name,Values={IMAGE_PREFIX}*"))
            .args(["--query", IMAGE_QUERY, "--output", "json"]);
        cmd
    }
}

impl ImageCatalog for AwsCli {
    fn list_images(&self, owner: &str) -> Result<Vec<CatalogEntry>> {
        let raw = tools::run(&mut self.describe_images(owner)).context("failed to get AMIs")?;
        let images = parse_images(&raw)?;
        debug!(owner, images = images.len(), "fetched AMI catalog");
        Ok(images)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageRow {
    #[serde(default)]
    name: Option<String>,
    image_id: String,
    #[serde(default)]
    creation_date: String,
}

/// Parse the projected `describe-images` output. Unnamed images are dropped.
pub fn parse_images(raw: &[u8]) -> Result<Vec<CatalogEntry>> {
    let rows: Vec<ImageRow> =
        serde_json::from_slice(raw).context("failed to parse describe-images output")?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            row.name.map(|name| CatalogEntry {
                name,
                id: row.image_id,
                created_at: row.creation_date,
            })
        })
        .collect())
}
