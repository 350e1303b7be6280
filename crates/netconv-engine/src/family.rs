//! The per-group reconciliation contract.
//!
//! A resource family knows how to read its group from the controller, turn
//! the input entries into planned actions, and carry those actions out. The
//! driver runs every family through the same fetch, plan, apply and verify
//! sequence.

use crate::diff::{Action, Planned};
use crate::input::State;
use crate::report::{Group, GroupSummary, Outcome};
use crate::secret::SecretManager;
use async_trait::async_trait;
use netconv_client::Controller;
use netconv_core::client::PaginationPolicy;
use netconv_core::{Error, Result};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What every family needs during a run.
pub struct Context<'a> {
    /// Controller method surface
    pub api: &'a dyn Controller,
    /// Page size and time budget for list endpoints
    pub pagination: PaginationPolicy,
    /// Pools submitted per create call
    pub batch_size: usize,
    /// Password protection
    pub secrets: &'a dyn SecretManager,
    /// Execution mode
    pub state: State,
    /// Checked between resources
    pub cancel: CancellationToken,
}

impl Context<'_> {
    /// Fail with [`Error::Cancelled`] once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the token has been cancelled.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Returns true under the `deleted` state.
    #[must_use]
    pub fn deleting(&self) -> bool {
        self.state == State::Deleted
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("version", self.api.version())
            .field("pagination", &self.pagination)
            .field("batch_size", &self.batch_size)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Planned actions for one family.
pub type Plan<F> = Vec<Planned<<F as Family>::Payload, <F as Family>::Id>>;

/// One resource family.
#[async_trait]
pub trait Family: Send + Sync {
    /// Controller state the plan is computed against
    type Have: Send + Sync;
    /// Body of a create or update
    type Payload: Send + Sync + fmt::Debug;
    /// What a delete needs
    type Id: Send + Sync + fmt::Debug;

    /// Group this family reports under.
    fn group(&self) -> Group;

    /// Returns true when the input has no entries for this family.
    fn is_empty(&self) -> bool;

    /// Read the current controller state.
    async fn fetch_current(&self, ctx: &Context<'_>) -> Result<Self::Have>;

    /// Compute desired state and diff it against `have`.
    ///
    /// Per-entry problems are planned as [`Action::Blocked`]; an `Err` is
    /// fatal to the run.
    async fn plan(&self, ctx: &Context<'_>, have: &Self::Have) -> Result<Plan<Self>>;

    /// Carry out one create, update or delete.
    async fn execute(
        &self,
        ctx: &Context<'_>,
        name: &str,
        action: Action<Self::Payload, Self::Id>,
    ) -> Result<Outcome>;

    /// Returns true if `planned`, computed after apply, shows the resource
    /// as converged.
    fn settled(&self, planned: &Planned<Self::Payload, Self::Id>) -> bool {
        !planned.action.is_change()
    }

    /// Carry out a plan in order, filing each resource in `summary`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; outcomes recorded before it stay in
    /// `summary`.
    async fn apply(
        &self,
        ctx: &Context<'_>,
        plan: Plan<Self>,
        summary: &mut GroupSummary,
    ) -> Result<()> {
        for planned in plan {
            ctx.checkpoint()?;
            let (name, outcome) = carry_out(self, ctx, planned).await?;
            record(summary, name, outcome);
        }
        Ok(())
    }
}

/// Carry out one planned action through `family`.
///
/// # Errors
///
/// Returns the action's error when it is fatal.
pub async fn carry_out<F>(
    family: &F,
    ctx: &Context<'_>,
    planned: Planned<F::Payload, F::Id>,
) -> Result<(String, Outcome)>
where
    F: Family + ?Sized,
{
    let outcome = match planned.action {
        Action::NoChange if planned.missing => Outcome::SkippedNotFound,
        Action::NoChange => Outcome::Unchanged,
        Action::Blocked(error) => settle(Err(error), false)?,
        action => {
            let deleting = matches!(action, Action::Delete(_));
            settle(family.execute(ctx, &planned.name, action).await, deleting)?
        }
    };
    Ok((planned.name, outcome))
}

/// Classify the result of one controller action.
///
/// A 404 on a delete means the resource is already gone. Fatal errors
/// propagate; everything else becomes a per-resource failure.
///
/// # Errors
///
/// Returns `result`'s error when it is fatal.
pub fn settle(result: Result<Outcome>, deleting: bool) -> Result<Outcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(Error::NotFound(_)) if deleting => Ok(Outcome::SkippedNotFound),
        Err(error) if error.is_fatal() => Err(error),
        Err(error) => Ok(Outcome::Failed(error)),
    }
}

/// File an outcome and log it.
pub fn record(summary: &mut GroupSummary, name: String, outcome: Outcome) {
    let group = summary.group;
    match &outcome {
        Outcome::Failed(error) => warn!(%group, %name, code = error.error_code(), %error, "resource failed"),
        Outcome::SkippedNotFound => info!(%group, %name, "not found, nothing to delete"),
        Outcome::Unchanged => debug!(%group, %name, "unchanged"),
        Outcome::Created => info!(%group, %name, "created"),
        Outcome::Updated => info!(%group, %name, "updated"),
        Outcome::Deleted => info!(%group, %name, "deleted"),
    }
    summary.record(name, outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_404_is_skipped() {
        let outcome = settle(Err(Error::NotFound("pool".into())), true).unwrap();
        assert_eq!(outcome, Outcome::SkippedNotFound);

        let outcome = settle(Err(Error::NotFound("pool".into())), false).unwrap();
        assert!(matches!(outcome, Outcome::Failed(Error::NotFound(_))));
    }

    #[test]
    fn fatal_errors_propagate() {
        let forbidden = Error::Forbidden {
            method: "delete_role".into(),
            message: "no".into(),
        };
        assert_eq!(settle(Err(forbidden.clone()), true), Err(forbidden));
        assert_eq!(settle(Err(Error::Cancelled), false), Err(Error::Cancelled));
    }

    #[test]
    fn semantic_errors_are_recorded() {
        let outcome = settle(Err(Error::Conflict("in use".into())), true).unwrap();
        assert_eq!(outcome, Outcome::Failed(Error::Conflict("in use".into())));
        assert_eq!(settle(Ok(Outcome::Created), false), Ok(Outcome::Created));
    }

    #[test]
    fn record_files_under_bucket() {
        let mut summary = GroupSummary::new(Group::Roles);
        record(&mut summary, "ops".into(), Outcome::Created);
        record(&mut summary, "old".into(), Outcome::Failed(Error::Conflict("x".into())));
        assert_eq!(summary.created, vec!["ops".to_string()]);
        assert_eq!(summary.failed[0].code, "CONFLICT");
    }
}
