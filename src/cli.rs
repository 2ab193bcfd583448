use crate::audit::{Auditor, ImageParams, LimitParams, RuleName, RuleSelection, Severity, Source};
use crate::config::KubeauditConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kubeaudit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Audit Kubernetes workloads for common security misconfigurations")]
#[command(long_about = "Audits a live cluster or a manifest file for security issues: containers running as root or privileged, privilege escalation, writable root filesystems, extra Linux capabilities, mounted service account tokens, missing default-deny network policies, unexpected image tags and missing resource limits. Findings can be allowed with override labels or a kubeaudit config file.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Audit a manifest file instead of the cluster
    #[arg(short = 'f', long, global = true, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Only audit objects in this namespace (default: all namespaces)
    #[arg(short, long, global = true, default_value = "", hide_default_value = true)]
    pub namespace: String,

    /// Kubeconfig context to use for cluster audits
    #[arg(long, global = true, env = "KUBEAUDIT_CONTEXT")]
    pub context: Option<String>,

    /// Path to a kubeauditConfig file with global overrides
    #[arg(short = 'k', long = "kauditconfig", global = true, value_name = "FILE")]
    pub kauditconfig: Option<PathBuf>,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Hide findings below this severity
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub min_severity: SeverityThreshold,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every audit
    All {
        /// Also check containers of this image use its tag (name:tag)
        #[arg(short, long)]
        image: Option<String>,

        /// Maximum CPU limit (e.g. 500m)
        #[arg(long)]
        cpu: Option<String>,

        /// Maximum memory limit (e.g. 256Mi)
        #[arg(long)]
        memory: Option<String>,
    },

    /// Audit automounted service account tokens
    Sat,

    /// Audit containers that may run as root
    Nonroot,

    /// Audit privileged containers
    Privileged,

    /// Audit containers allowing privilege escalation
    Privesc,

    /// Audit containers with a writable root filesystem
    Rootfs,

    /// Audit added and undropped Linux capabilities
    Caps,

    /// Audit that containers of an image use the expected tag
    Image {
        /// Expected image as name:tag
        #[arg(short, long, default_value = "")]
        image: String,
    },

    /// Audit container resource limits
    Limits {
        /// Maximum CPU limit (e.g. 500m)
        #[arg(long)]
        cpu: Option<String>,

        /// Maximum memory limit (e.g. 256Mi)
        #[arg(long)]
        memory: Option<String>,
    },

    /// Audit namespaces for default-deny network policies
    Netpols,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityThreshold {
    Info,
    Warning,
    Error,
}

impl From<SeverityThreshold> for Severity {
    fn from(threshold: SeverityThreshold) -> Self {
        match threshold {
            SeverityThreshold::Info => Severity::Info,
            SeverityThreshold::Warning => Severity::Warning,
            SeverityThreshold::Error => Severity::Error,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }

    /// Where to read objects from.
    pub fn source(&self) -> Source {
        match &self.manifest {
            Some(path) => Source::Manifest(path.clone()),
            None => Source::Cluster {
                context: self.context.clone(),
            },
        }
    }

    /// Build the auditor for the selected subcommand.
    pub fn auditor(&self, config: Option<Arc<KubeauditConfig>>) -> Auditor {
        let auditor = Auditor::new(config);
        match &self.command {
            Commands::All { image, cpu, memory } => {
                let auditor = auditor
                    .with_limits(LimitParams::new(cpu.clone(), memory.clone()))
                    .select(RuleSelection::All);
                match image {
                    Some(image) => auditor.with_image(ImageParams::new(image)),
                    None => auditor,
                }
            }
            Commands::Sat => auditor.select(RuleSelection::One(RuleName::AutomountToken)),
            Commands::Nonroot => auditor.select(RuleSelection::One(RuleName::NonRoot)),
            Commands::Privileged => auditor.select(RuleSelection::One(RuleName::Privileged)),
            Commands::Privesc => {
                auditor.select(RuleSelection::One(RuleName::PrivilegeEscalation))
            }
            Commands::Rootfs => {
                auditor.select(RuleSelection::One(RuleName::ReadOnlyRootFilesystem))
            }
            Commands::Caps => auditor.select(RuleSelection::One(RuleName::Capabilities)),
            Commands::Image { image } => auditor
                .with_image(ImageParams::new(image))
                .select(RuleSelection::One(RuleName::Image)),
            Commands::Limits { cpu, memory } => auditor
                .with_limits(LimitParams::new(cpu.clone(), memory.clone()))
                .select(RuleSelection::One(RuleName::Limits)),
            Commands::Netpols => auditor.select(RuleSelection::One(RuleName::NetworkPolicies)),
        }
    }
}
