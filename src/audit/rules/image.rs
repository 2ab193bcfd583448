//! Image tag rule.

use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::OverrideResolver;
use crate::audit::params::{ImageParams, split_image};
use crate::audit::types::{AuditResult, FindingCode, Occurrence};

pub const NAME: &str = "image";

/// Checks containers running the configured image use the configured tag.
pub fn audit_image(
    _resolver: &OverrideResolver,
    target: &AuditTarget,
    image: &ImageParams,
) -> Vec<AuditResult> {
    let Some(pod_spec) = target.pod_spec() else {
        return Vec::new();
    };
    let mut result = target.new_result();

    for container in pod_spec.all_containers() {
        let Some(container_image) = container.image.as_deref() else {
            continue;
        };
        let (name, tag) = split_image(container_image);
        if name != image.name {
            continue;
        }

        let occurrence = if tag.is_empty() {
            Occurrence::error(FindingCode::ImageTagMissing, "Image tag was missing")
        } else if tag != image.tag {
            Occurrence::error(FindingCode::ImageTagIncorrect, "Image tag was incorrect")
                .with_metadata("ImageTag", tag)
        } else {
            Occurrence::info(FindingCode::ImageCorrect, "Image tag was correct")
                .with_metadata("ImageTag", tag)
        };
        result.push(
            occurrence
                .in_container(container.name.as_str())
                .with_metadata("ImageName", name),
        );
    }

    result.into_results()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::rules::test_support::targets;
    use crate::audit::types::Severity;

    const MANIFEST: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    spec:
      containers:
        - name: current
          image: nginx:1.25
        - name: stale
          image: nginx:1.19
        - name: untagged
          image: nginx
        - name: other
          image: redis:7
"#;

    #[test]
    fn test_image_tags() {
        let image = ImageParams::new("nginx:1.25");
        let results: Vec<AuditResult> = targets(MANIFEST)
            .iter()
            .flat_map(|t| audit_image(&OverrideResolver::default(), t, &image))
            .collect();
        assert_eq!(results.len(), 1);

        let found: Vec<(Option<&str>, FindingCode, Severity)> = results[0]
            .occurrences
            .iter()
            .map(|o| (o.container.as_deref(), o.code, o.severity))
            .collect();
        assert_eq!(
            found,
            vec![
                (Some("current"), FindingCode::ImageCorrect, Severity::Info),
                (Some("stale"), FindingCode::ImageTagIncorrect, Severity::Error),
                (Some("untagged"), FindingCode::ImageTagMissing, Severity::Error),
            ]
        );
    }

    #[test]
    fn test_no_matching_image() {
        let image = ImageParams::new("postgres:16");
        let results: Vec<AuditResult> = targets(MANIFEST)
            .iter()
            .flat_map(|t| audit_image(&OverrideResolver::default(), t, &image))
            .collect();
        assert!(results.is_empty());
    }
}
