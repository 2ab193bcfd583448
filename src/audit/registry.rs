//! Registry of the resource families the auditor supports.
//!
//! The normalizer consults the registry for objects it has no case for:
//! a registered kind without a case is a gap in the normalizer (fatal),
//! anything else is simply not auditable and gets skipped.

use crate::audit::context::GroupVersionKind;
use std::collections::HashSet;

/// Supported (group, version, kind) triples.
const SUPPORTED: &[(&str, &str, &str)] = &[
    ("batch", "v1beta1", "CronJob"),
    ("batch", "v1", "CronJob"),
    ("apps", "v1", "DaemonSet"),
    ("apps", "v1beta2", "DaemonSet"),
    ("extensions", "v1beta1", "DaemonSet"),
    ("apps", "v1", "Deployment"),
    ("apps", "v1beta1", "Deployment"),
    ("apps", "v1beta2", "Deployment"),
    ("extensions", "v1beta1", "Deployment"),
    ("", "v1", "Pod"),
    ("", "v1", "ReplicationController"),
    ("apps", "v1", "StatefulSet"),
    ("apps", "v1beta1", "StatefulSet"),
    ("", "v1", "Namespace"),
];

/// Answers whether a group/version/kind belongs to the supported family.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    supported: HashSet<GroupVersionKind>,
}

impl TypeRegistry {
    /// A registry with no entries.
    pub fn empty() -> Self {
        Self {
            supported: HashSet::new(),
        }
    }

    /// Register an additional group/version/kind.
    pub fn with(mut self, gvk: GroupVersionKind) -> Self {
        self.supported.insert(gvk);
        self
    }

    pub fn is_supported(&self, gvk: &GroupVersionKind) -> bool {
        self.supported.contains(gvk)
    }

    pub fn len(&self) -> usize {
        self.supported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supported.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        SUPPORTED
            .iter()
            .fold(Self::empty(), |registry, (group, version, kind)| {
                registry.with(GroupVersionKind::new(*group, *version, *kind))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = TypeRegistry::default();
        assert_eq!(registry.len(), SUPPORTED.len());
        assert!(registry.is_supported(&GroupVersionKind::new("apps", "v1", "Deployment")));
        assert!(registry.is_supported(&GroupVersionKind::new("", "v1", "Namespace")));
        assert!(!registry.is_supported(&GroupVersionKind::new("", "v1", "Service")));
        assert!(!registry.is_supported(&GroupVersionKind::new(
            "networking.k8s.io",
            "v1",
            "NetworkPolicy"
        )));
    }

    #[test]
    fn test_with_adds_entry() {
        let gvk = GroupVersionKind::new("batch", "v1", "Job");
        let registry = TypeRegistry::empty().with(gvk.clone());
        assert!(registry.is_supported(&gvk));
        assert_eq!(registry.len(), 1);
    }
}
