//! AMI name grammar.
//!
//! Node classes reference their AMI by name in one of four shapes, tried in
//! this order (first match wins):
//!
//! 1. `domino-eks-<group>-<k8s>-v<YYYYMMDD>`
//! 2. `domino-eks-<k8s>-v<YYYYMMDD>`
//! 3. `domino-eks-<group>-<k8s>-<anything>`
//! 4. `domino-eks-<k8s>-<anything>`
//!
//! Dated forms come before their wildcard counterparts so a pinned name is
//! never read as pending. `<group>` never contains a hyphen and `<k8s>` is
//! `1.<minor>`.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::error::ImageNameError;

/// Prefix shared by every AMI name and by conventionally named node classes.
pub const IMAGE_PREFIX: &str = "domino-eks-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Pinned to a dated build.
    Resolved(String),
    /// Wildcard placeholder, no build chosen yet.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNamePattern {
    pub group: Option<String>,
    pub platform_version: String,
    pub release: Release,
}

impl ImageNamePattern {
    pub fn has_group(&self) -> bool {
        self.group.is_some()
    }

    /// The explicit group, or `""` when the name carries none.
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }

    pub fn date_version(&self) -> Option<&str> {
        match &self.release {
            Release::Resolved(date) => Some(date),
            Release::Pending => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.release, Release::Resolved(_))
    }
}

impl FromStr for ImageNamePattern {
    type Err = ImageNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

type Constructor = fn(&Captures<'_>) -> ImageNamePattern;

static GRAMMAR: LazyLock<[(Regex, Constructor); 4]> = LazyLock::new(|| {
    [
        (
            rule(r"^domino-eks-([^-]+)-(1\.[0-9]+)-v([0-9]{8})$"),
            grouped_resolved as Constructor,
        ),
        (
            rule(r"^domino-eks-(1\.[0-9]+)-v([0-9]{8})$"),
            ungrouped_resolved as Constructor,
        ),
        (
            rule(r"^domino-eks-([^-]+)-(1\.[0-9]+)-.*$"),
            grouped_pending as Constructor,
        ),
        (
            rule(r"^domino-eks-(1\.[0-9]+)-.*$"),
            ungrouped_pending as Constructor,
        ),
    ]
});

fn rule(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid AMI name grammar")
}

fn grouped_resolved(c: &Captures<'_>) -> ImageNamePattern {
    ImageNamePattern {
        group: Some(c[1].to_string()),
        platform_version: c[2].to_string(),
        release: Release::Resolved(c[3].to_string()),
    }
}

fn ungrouped_resolved(c: &Captures<'_>) -> ImageNamePattern {
    ImageNamePattern {
        group: None,
        platform_version: c[1].to_string(),
        release: Release::Resolved(c[2].to_string()),
    }
}

fn grouped_pending(c: &Captures<'_>) -> ImageNamePattern {
    ImageNamePattern {
        group: Some(c[1].to_string()),
        platform_version: c[2].to_string(),
        release: Release::Pending,
    }
}

fn ungrouped_pending(c: &Captures<'_>) -> ImageNamePattern {
    ImageNamePattern {
        group: None,
        platform_version: c[1].to_string(),
        release: Release::Pending,
    }
}

/// Parse an AMI name into its structured form.
pub fn parse(name: &str) -> Result<ImageNamePattern, ImageNameError> {
    GRAMMAR
        .iter()
        .find_map(|(re, build)| re.captures(name).map(|c| build(&c)))
        .ok_or_else(|| ImageNameError::InvalidFormat(name.to_string()))
}
