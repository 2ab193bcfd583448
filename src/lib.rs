//! # kubeaudit
//!
//! Audits Kubernetes workloads, from a live cluster or a manifest file,
//! for common security misconfigurations.
//!
//! ## Features
//!
//! - **Versioned objects**: every supported kind and API version is
//!   normalized into one audit target
//! - **Overrides**: findings can be allowed per container, pod or namespace
//!   with labels, or globally with a kubeauditConfig file
//! - **Concurrent**: rules run over all targets in parallel
//!
//! ## Example
//!
//! ```rust,no_run
//! use kubeaudit::audit::{Auditor, parse_manifest_file};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resources = parse_manifest_file(Path::new("deployment.yaml"))?;
//! let report = Auditor::new(None).audit(&resources)?;
//! println!("{} results", report.results.len());
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;

pub use error::{AuditError, Result};

use audit::formatter::{self, OutputFormat};
use cli::Cli;
use log::debug;
use std::sync::Arc;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code when error findings remain after filtering.
pub const EXIT_FINDINGS: i32 = 2;

/// Run the command line and print the report. Returns the exit code.
pub async fn run_command(cli: &Cli) -> Result<i32> {
    let config = config::load_config(cli.kauditconfig.as_deref())?.map(Arc::new);
    let auditor = cli.auditor(config);
    let source = cli.source();
    debug!("Auditing {:?} in namespace {:?}", source, cli.namespace);

    let report = audit::run_audit(&auditor, &source, &cli.namespace).await?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };
    let min_severity = cli.min_severity.into();
    formatter::format_report(&report, format, min_severity)?;

    let visible = formatter::visible_results(&report, min_severity);
    Ok(if formatter::has_errors(&visible) {
        EXIT_FINDINGS
    } else {
        0
    })
}
