//! Concurrent execution of audit rules over a set of targets.
//!
//! Rules come in three call shapes ([`AuditFn`]). The dispatcher supplies
//! the matching parameters, validates them once per rule before any task
//! starts, then runs one task per target and gathers every result behind
//! a single lock.

use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::OverrideResolver;
use crate::audit::params::{ImageParams, LimitParams};
use crate::audit::types::AuditResult;
use crate::error::Result;
use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

pub type PlainFn = dyn Fn(&OverrideResolver, &AuditTarget) -> Vec<AuditResult> + Send + Sync;
pub type ImageFn =
    dyn Fn(&OverrideResolver, &AuditTarget, &ImageParams) -> Vec<AuditResult> + Send + Sync;
pub type LimitsFn =
    dyn Fn(&OverrideResolver, &AuditTarget, &LimitParams) -> Vec<AuditResult> + Send + Sync;

/// A rule function in one of the supported call shapes.
#[derive(Clone)]
pub enum AuditFn {
    Plain(Arc<PlainFn>),
    Image(Arc<ImageFn>),
    Limits(Arc<LimitsFn>),
}

impl AuditFn {
    fn shape(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Image(_) => "image",
            Self::Limits(_) => "limits",
        }
    }
}

/// A named rule.
#[derive(Clone)]
pub struct AuditRule {
    name: String,
    func: AuditFn,
}

impl AuditRule {
    pub fn plain<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&OverrideResolver, &AuditTarget) -> Vec<AuditResult> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: AuditFn::Plain(Arc::new(func)),
        }
    }

    pub fn image<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&OverrideResolver, &AuditTarget, &ImageParams) -> Vec<AuditResult>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            func: AuditFn::Image(Arc::new(func)),
        }
    }

    pub fn limits<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&OverrideResolver, &AuditTarget, &LimitParams) -> Vec<AuditResult>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            func: AuditFn::Limits(Arc::new(func)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn func(&self) -> &AuditFn {
        &self.func
    }
}

impl fmt::Debug for AuditRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditRule")
            .field("name", &self.name)
            .field("shape", &self.func.shape())
            .finish()
    }
}

/// Runs rules over targets with the process-wide parameters.
#[derive(Debug, Clone, Default)]
pub struct AuditDispatcher {
    resolver: OverrideResolver,
    image: ImageParams,
    limits: LimitParams,
}

impl AuditDispatcher {
    pub fn new(resolver: OverrideResolver) -> Self {
        Self {
            resolver,
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: ImageParams) -> Self {
        self.image = image;
        self
    }

    pub fn with_limits(mut self, limits: LimitParams) -> Self {
        self.limits = limits;
        self
    }

    pub fn resolver(&self) -> &OverrideResolver {
        &self.resolver
    }

    /// Validate the parameters `rule` needs. Runs once per rule, before
    /// dispatch.
    pub fn check_params(&self, rule: &AuditRule) -> Result<()> {
        match &rule.func {
            AuditFn::Plain(_) => Ok(()),
            AuditFn::Image(_) => self.image.validate(),
            AuditFn::Limits(_) => self.limits.validate(),
        }
    }

    fn invoke(&self, func: &AuditFn, target: &AuditTarget) -> Vec<AuditResult> {
        match func {
            AuditFn::Plain(f) => f(&self.resolver, target),
            AuditFn::Image(f) => f(&self.resolver, target, &self.image),
            AuditFn::Limits(f) => f(&self.resolver, target, &self.limits),
        }
    }

    /// Run `rule` over every target, one task per target.
    ///
    /// Output order follows task completion; sort downstream when it
    /// matters.
    pub fn run(&self, targets: &[AuditTarget], rule: &AuditRule) -> Vec<AuditResult> {
        debug!("Running rule {} over {} targets", rule.name, targets.len());
        let accumulator = Mutex::new(Vec::new());

        rayon::scope(|scope| {
            for target in targets {
                let accumulator = &accumulator;
                scope.spawn(move |_| {
                    let results = self.invoke(&rule.func, target);
                    if !results.is_empty() {
                        accumulator.lock().extend(results);
                    }
                });
            }
        });

        let results = accumulator.into_inner();
        debug!("Rule {} produced {} results", rule.name, results.len());
        results
    }

    /// Validate parameters, then run.
    pub fn run_checked(&self, targets: &[AuditTarget], rule: &AuditRule) -> Result<Vec<AuditResult>> {
        self.check_params(rule)?;
        Ok(self.run(targets, rule))
    }

    /// Combine rules into one that applies each in registration order and
    /// concatenates the results per target.
    pub fn merge_rules(&self, name: impl Into<String>, rules: &[AuditRule]) -> AuditRule {
        let dispatcher = self.clone();
        let rules: Vec<AuditRule> = rules.to_vec();
        AuditRule::plain(name, move |_, target| {
            rules
                .iter()
                .flat_map(|rule| dispatcher.invoke(&rule.func, target))
                .collect()
        })
    }

    /// Validate every rule, then run them all in a single pass per target.
    pub fn run_all(&self, targets: &[AuditTarget], rules: &[AuditRule]) -> Result<Vec<AuditResult>> {
        for rule in rules {
            self.check_params(rule)?;
        }
        let merged = self.merge_rules("all", rules);
        Ok(self.run(targets, &merged))
    }
}
