use super::image_name::{ImageNamePattern, IMAGE_PREFIX};
use super::registry::NodeClassInfo;

/// Build the dated AMI name for a node class.
///
/// The group comes from the registry rather than the parsed name, so a
/// wildcard without a group can still be pinned to its nodegroup's image.
pub fn synthesize(pattern: &ImageNamePattern, info: &NodeClassInfo, date_version: &str) -> String {
    if info.has_group {
        format!(
            "{IMAGE_PREFIX}{}-{}-v{date_version}",
            info.group, pattern.platform_version
        )
    } else {
        format!("{IMAGE_PREFIX}{}-v{date_version}", pattern.platform_version)
    }
}
