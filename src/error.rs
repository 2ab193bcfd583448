use crate::audit::context::GroupVersionKind;
use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("manifest file not found: {0}")]
    ManifestNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document {document} is not a valid Kubernetes manifest: {reason}")]
    InvalidManifest { document: usize, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("resource type {0} not supported")]
    UnsupportedResource(GroupVersionKind),

    #[error("Empty image name. Are you missing the image flag?")]
    MissingImageName,

    #[error("Empty image tag. Are you missing the image tag?")]
    MissingImageTag,

    #[error("invalid {resource} limit: {value}")]
    InvalidLimit {
        resource: &'static str,
        value: String,
    },

    #[error("unknown audit rule: {0}")]
    UnknownRule(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to infer Kubernetes config: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to decode cluster object: {0}")]
    Decode(#[from] serde_yaml::Error),

    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;
