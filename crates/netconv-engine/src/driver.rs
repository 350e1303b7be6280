//! The reconciliation driver.
//!
//! One run validates the document, then takes each resource group through
//! fetch, plan and apply (and verify, when asked), in merge order or in
//! reverse for deletes. Per-resource failures land in the report and the
//! run carries on. A fatal error halts the run; the report collected so far
//! is still returned.

use crate::diff::Action;
use crate::family::{Context, Family};
use crate::input::{InputDocument, State};
use crate::logging::{log, Level};
use crate::network::NetworkServices;
use crate::pools::{GlobalPools, ReservedPools};
use crate::report::{Group, Outcome, RunReport, Verification};
use crate::roles::Roles;
use crate::secret::SecretManager;
use crate::users::Users;
use crate::validate::validate;
use netconv_client::Controller;
use netconv_core::client::{PaginationPolicy, DEFAULT_BATCH_SIZE};
use netconv_core::config::EngineConfig;
use netconv_core::version::{ControllerVersion, MINIMUM_SUPPORTED};
use netconv_core::{Error, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// One planned resource, as shown by check mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedResource {
    /// Resource name
    pub name: String,
    /// `create`, `update`, `delete`, `no_change` or `blocked`
    pub action: &'static str,
    /// Fields that differ, for updates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<&'static str>,
    /// Named delete whose target is absent
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub missing: bool,
    /// Why a blocked resource cannot proceed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Planned resources of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedGroup {
    /// Group
    pub group: Group,
    /// Resources in apply order
    pub resources: Vec<PlannedResource>,
}

/// Runs input documents against one controller.
pub struct Driver<'a> {
    api: &'a dyn Controller,
    secrets: &'a dyn SecretManager,
    pagination: PaginationPolicy,
    batch_size: usize,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Driver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("version", self.api.version())
            .field("pagination", &self.pagination)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl<'a> Driver<'a> {
    /// Driver with default pagination and batch size.
    #[must_use]
    pub fn new(api: &'a dyn Controller, secrets: &'a dyn SecretManager) -> Self {
        Self {
            api,
            secrets,
            pagination: PaginationPolicy::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: CancellationToken::new(),
        }
    }

    /// Driver using the pagination and batch settings of `config`.
    #[must_use]
    pub fn from_config(
        api: &'a dyn Controller,
        secrets: &'a dyn SecretManager,
        config: &EngineConfig,
    ) -> Self {
        Self::new(api, secrets)
            .with_pagination(config.pagination.policy())
            .with_batch_size(config.batch_size)
    }

    /// Set the pagination policy for list endpoints.
    #[must_use]
    pub const fn with_pagination(mut self, pagination: PaginationPolicy) -> Self {
        self.pagination = pagination;
        self
    }

    /// Set the number of pools submitted per create call.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Stop between resources once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn context(&self, state: State) -> Context<'a> {
        Context {
            api: self.api,
            pagination: self.pagination,
            batch_size: self.batch_size,
            secrets: self.secrets,
            state,
            cancel: self.cancel.clone(),
        }
    }

    fn check_version(&self) -> Result<()> {
        let actual = self.api.version();
        if actual.at_least(&ControllerVersion::minimum_supported()) {
            return Ok(());
        }
        Err(Error::UnsupportedVersion {
            method: "reconcile".to_string(),
            required: MINIMUM_SUPPORTED.to_string(),
            actual: actual.to_string(),
        })
    }

    /// Converge the controller towards `doc`.
    ///
    /// Never fails: a fatal error is recorded in the returned report
    /// ([`RunReport::fatal`]) next to everything that completed before it.
    pub async fn run(&self, doc: InputDocument) -> RunReport {
        let span = info_span!("run", state = %doc.state, verify = doc.config_verify);
        let mut report = RunReport::new();
        if let Err(error) = self.reconcile(doc, &mut report).instrument(span).await {
            log(Level::Critical, &format!("run halted: {error}"));
            report.halt(error);
        }
        report
    }

    async fn reconcile(&self, doc: InputDocument, report: &mut RunReport) -> Result<()> {
        self.check_version()?;
        let doc = validate(doc, self.secrets)?;
        if doc.config.is_empty() {
            log(Level::Warning, "input document has no entries");
            return Ok(());
        }

        let ctx = self.context(doc.state);
        let verify = doc.config_verify;
        let config = &doc.config;
        for group in order(doc.state) {
            ctx.checkpoint()?;
            match group {
                Group::GlobalPools => {
                    let family = GlobalPools::new(config.global_pools());
                    run_family(&ctx, &family, verify, report).await?;
                }
                Group::ReservedPools => {
                    let family = ReservedPools::new(&config.reserve_pool_details);
                    run_family(&ctx, &family, verify, report).await?;
                }
                Group::NetworkSettings => {
                    let family = NetworkServices::new(&config.network_management_details);
                    run_family(&ctx, &family, verify, report).await?;
                }
                Group::Roles => {
                    run_family(&ctx, &Roles::new(&config.role_details), verify, report).await?;
                }
                Group::Users => {
                    run_family(&ctx, &Users::new(&config.user_details), verify, report).await?;
                }
            }
        }

        info!(changed = report.changed(), failed = report.has_failures(), "run finished");
        Ok(())
    }

    /// Compute what a run would do without changing anything.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: invalid input, an unsupported
    /// controller, or a failed read.
    pub async fn plan(&self, doc: InputDocument) -> Result<Vec<PlannedGroup>> {
        self.check_version()?;
        let doc = validate(doc, self.secrets)?;
        let ctx = self.context(doc.state);
        let config = &doc.config;

        let mut groups = Vec::new();
        for group in order(doc.state) {
            ctx.checkpoint()?;
            let planned = match group {
                Group::GlobalPools => {
                    plan_family(&ctx, &GlobalPools::new(config.global_pools())).await?
                }
                Group::ReservedPools => {
                    plan_family(&ctx, &ReservedPools::new(&config.reserve_pool_details)).await?
                }
                Group::NetworkSettings => {
                    let family = NetworkServices::new(&config.network_management_details);
                    plan_family(&ctx, &family).await?
                }
                Group::Roles => plan_family(&ctx, &Roles::new(&config.role_details)).await?,
                Group::Users => plan_family(&ctx, &Users::new(&config.user_details)).await?,
            };
            groups.extend(planned);
        }
        Ok(groups)
    }
}

const fn order(state: State) -> [Group; 5] {
    match state {
        State::Merged => Group::MERGE_ORDER,
        State::Deleted => Group::DELETE_ORDER,
    }
}

/// Fetch, plan, apply and optionally verify one group.
async fn run_family<F: Family>(
    ctx: &Context<'_>,
    family: &F,
    verify: bool,
    report: &mut RunReport,
) -> Result<()> {
    if family.is_empty() {
        return Ok(());
    }
    let group = family.group();
    info!(%group, state = %ctx.state, "reconciling group");

    let have = match family.fetch_current(ctx).await {
        Ok(have) => have,
        Err(error) if error.is_fatal() => return Err(error),
        Err(error) => {
            log(Level::Error, &format!("{group}: reading current state failed: {error}"));
            report.record(group, group.name(), Outcome::Failed(error));
            return Ok(());
        }
    };
    let plan = family.plan(ctx, &have).await?;
    family.apply(ctx, plan, report.group_mut(group)).await?;

    if verify {
        ctx.checkpoint()?;
        let verification = verify_family(ctx, family).await?;
        if !verification.verified {
            warn!(%group, mismatched = ?verification.mismatched, "verification found differences");
        }
        report.group_mut(group).verification = Some(verification);
    }
    Ok(())
}

/// Re-fetch and re-plan; anything still planned as a change is a mismatch.
async fn verify_family<F: Family>(ctx: &Context<'_>, family: &F) -> Result<Verification> {
    let have = family.fetch_current(ctx).await?;
    let mismatched: Vec<String> = family
        .plan(ctx, &have)
        .await?
        .into_iter()
        .filter(|planned| !family.settled(planned))
        .map(|planned| planned.name)
        .collect();
    Ok(Verification {
        verified: mismatched.is_empty(),
        mismatched,
    })
}

async fn plan_family<F: Family>(ctx: &Context<'_>, family: &F) -> Result<Option<PlannedGroup>> {
    if family.is_empty() {
        return Ok(None);
    }
    let have = family.fetch_current(ctx).await?;
    let resources = family
        .plan(ctx, &have)
        .await?
        .into_iter()
        .map(|planned| PlannedResource {
            action: planned.action.label(),
            reason: match &planned.action {
                Action::Blocked(error) => Some(error.to_string()),
                _ => None,
            },
            name: planned.name,
            changed_fields: planned.changed_fields,
            missing: planned.missing,
        })
        .collect();
    Ok(Some(PlannedGroup {
        group: family.group(),
        resources,
    }))
}
