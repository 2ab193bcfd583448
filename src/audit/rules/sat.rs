//! Service account token automount rule.

use super::apply_override;
use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::OverrideResolver;
use crate::audit::types::{AuditResult, FindingCode, Occurrence};

pub const NAME: &str = "automount-token";

const OVERRIDE_KEY: &str = "allow-automount-service-account-token";

/// Flags pods that mount the default service account's token.
pub fn audit_automount_token(resolver: &OverrideResolver, target: &AuditTarget) -> Vec<AuditResult> {
    let mut result = target.new_result_with_service_account_info();

    if !result.dsa.is_empty() {
        let occurrence = Occurrence::error(
            FindingCode::ServiceAccountTokenDeprecated,
            "serviceAccount is a deprecated alias for serviceAccountName, use that one instead",
        )
        .with_metadata("DSA", result.dsa.clone());
        result.push(occurrence);
    }

    if result.sa.is_empty() {
        let occurrence = match result.token {
            Some(true) => Some(Occurrence::error(
                FindingCode::AutomountServiceAccountTokenTrueAndNoName,
                "Default service account with token mounted. Set automountServiceAccountToken to false or use a non-default service account",
            )),
            None => Some(Occurrence::error(
                FindingCode::AutomountServiceAccountTokenNilAndNoName,
                "Default service account with token mounted by default. Set automountServiceAccountToken to false or use a non-default service account",
            )),
            Some(false) => None,
        };
        if let Some(occurrence) = occurrence {
            let found = resolver.pod_override(&result, OVERRIDE_KEY);
            result.push(apply_override(
                occurrence,
                found,
                FindingCode::AutomountServiceAccountTokenAllowed,
            ));
        }
    }

    result.into_results()
}
