//! Catalog of audit rules.
//!
//! Each rule is a function over one [`AuditTarget`]; the catalog wraps
//! them into [`AuditRule`] values of the right call shape.
//!
//! [`AuditTarget`]: crate::audit::normalize::AuditTarget

pub mod capabilities;
pub mod image;
pub mod limits;
pub mod netpol;
pub mod nonroot;
pub mod privesc;
pub mod privileged;
pub mod rootfs;
pub mod sat;

use crate::audit::context::ResourceSet;
use crate::audit::dispatch::AuditRule;
use crate::audit::overrides::Override;
use crate::audit::types::{FindingCode, Occurrence, Severity};
use crate::error::{AuditError, Result};
use netpol::NetworkPolicyIndex;
use std::fmt;

/// The rules a run can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleName {
    AutomountToken,
    NonRoot,
    Privileged,
    PrivilegeEscalation,
    ReadOnlyRootFilesystem,
    Capabilities,
    Image,
    Limits,
    NetworkPolicies,
}

impl RuleName {
    /// Registration order used by `all`.
    pub const ALL: [RuleName; 9] = [
        Self::AutomountToken,
        Self::NonRoot,
        Self::Privileged,
        Self::PrivilegeEscalation,
        Self::ReadOnlyRootFilesystem,
        Self::Capabilities,
        Self::Image,
        Self::Limits,
        Self::NetworkPolicies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutomountToken => sat::NAME,
            Self::NonRoot => nonroot::NAME,
            Self::Privileged => privileged::NAME,
            Self::PrivilegeEscalation => privesc::NAME,
            Self::ReadOnlyRootFilesystem => rootfs::NAME,
            Self::Capabilities => capabilities::NAME,
            Self::Image => image::NAME,
            Self::Limits => limits::NAME,
            Self::NetworkPolicies => netpol::NAME,
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|rule| rule.as_str() == name)
            .ok_or_else(|| AuditError::UnknownRule(name.to_string()))
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds rules for one resource set.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    network_policies: NetworkPolicyIndex,
}

impl RuleCatalog {
    pub fn new(resources: &ResourceSet) -> Self {
        Self {
            network_policies: NetworkPolicyIndex::new(resources.network_policies()),
        }
    }

    pub fn rule(&self, name: RuleName) -> AuditRule {
        match name {
            RuleName::AutomountToken => AuditRule::plain(sat::NAME, sat::audit_automount_token),
            RuleName::NonRoot => AuditRule::plain(nonroot::NAME, nonroot::audit_run_as_non_root),
            RuleName::Privileged => {
                AuditRule::plain(privileged::NAME, privileged::audit_privileged)
            }
            RuleName::PrivilegeEscalation => {
                AuditRule::plain(privesc::NAME, privesc::audit_privilege_escalation)
            }
            RuleName::ReadOnlyRootFilesystem => {
                AuditRule::plain(rootfs::NAME, rootfs::audit_read_only_root_filesystem)
            }
            RuleName::Capabilities => {
                AuditRule::plain(capabilities::NAME, capabilities::audit_capabilities)
            }
            RuleName::Image => AuditRule::image(image::NAME, image::audit_image),
            RuleName::Limits => AuditRule::limits(limits::NAME, limits::audit_limits),
            RuleName::NetworkPolicies => {
                let index = self.network_policies.clone();
                AuditRule::plain(netpol::NAME, move |resolver, target| {
                    netpol::audit_network_policies(&index, resolver, target)
                })
            }
        }
    }

    /// Every rule in registration order. The image rule needs a
    /// configured image, so it is only included on request.
    pub fn all(&self, include_image: bool) -> Vec<AuditRule> {
        RuleName::ALL
            .into_iter()
            .filter(|name| include_image || *name != RuleName::Image)
            .map(|name| self.rule(name))
            .collect()
    }
}

/// Downgrade a finding to a warning when an override matched.
pub(crate) fn apply_override(
    occurrence: Occurrence,
    found: Option<Override>,
    allowed: FindingCode,
) -> Occurrence {
    match found {
        Some(found) => Occurrence {
            code: allowed,
            severity: Severity::Warning,
            ..occurrence
        }
        .with_metadata("Reason", found.display_reason())
        .with_metadata("OverrideScope", found.scope.to_string()),
        None => occurrence,
    }
}
