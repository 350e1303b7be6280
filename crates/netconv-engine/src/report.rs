//! Run outcome accumulation.
//!
//! One [`RunReport`] is threaded through the driver. Each resource lands in
//! exactly one bucket of its group's [`GroupSummary`]. The report survives a
//! fatal halt and is always what the caller gets back.

use netconv_core::error::ErrorResponse;
use netconv_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource group, in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Global IP pools
    GlobalPools,
    /// Reserved sub-pools
    ReservedPools,
    /// Per-site network settings
    NetworkSettings,
    /// Roles
    Roles,
    /// Users
    Users,
}

impl Group {
    /// Order groups are applied in under `merged`.
    pub const MERGE_ORDER: [Self; 5] = [
        Self::GlobalPools,
        Self::ReservedPools,
        Self::NetworkSettings,
        Self::Roles,
        Self::Users,
    ];

    /// Order groups are applied in under `deleted`: dependents first.
    pub const DELETE_ORDER: [Self; 5] = [
        Self::Users,
        Self::Roles,
        Self::NetworkSettings,
        Self::ReservedPools,
        Self::GlobalPools,
    ];

    /// Name used in reports and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GlobalPools => "global_pools",
            Self::ReservedPools => "reserved_pools",
            Self::NetworkSettings => "network_settings",
            Self::Roles => "roles",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a single resource ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Created
    Created,
    /// Updated
    Updated,
    /// Already matched
    Unchanged,
    /// Deleted
    Deleted,
    /// Named delete whose target was absent
    SkippedNotFound,
    /// Failed with the given error
    Failed(Error),
}

/// A failed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Resource name
    pub name: String,
    /// Error code
    pub code: String,
    /// Error text
    pub reason: String,
}

/// Result of re-fetching after apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// True when every resource matched on re-fetch
    pub verified: bool,
    /// Resources that still differ
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatched: Vec<String>,
}

/// Per-group buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group
    pub group: Group,
    /// Created resources
    pub created: Vec<String>,
    /// Updated resources
    pub updated: Vec<String>,
    /// Resources that already matched
    pub unchanged: Vec<String>,
    /// Deleted resources
    pub deleted: Vec<String>,
    /// Named deletes whose target was absent
    pub skipped_not_found: Vec<String>,
    /// Failed resources
    pub failed: Vec<Failure>,
    /// Present when verification ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl GroupSummary {
    /// Empty summary for a group.
    #[must_use]
    pub const fn new(group: Group) -> Self {
        Self {
            group,
            created: Vec::new(),
            updated: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
            skipped_not_found: Vec::new(),
            failed: Vec::new(),
            verification: None,
        }
    }

    /// File a resource under its outcome.
    pub fn record(&mut self, name: impl Into<String>, outcome: Outcome) {
        let name = name.into();
        match outcome {
            Outcome::Created => self.created.push(name),
            Outcome::Updated => self.updated.push(name),
            Outcome::Unchanged => self.unchanged.push(name),
            Outcome::Deleted => self.deleted.push(name),
            Outcome::SkippedNotFound => self.skipped_not_found.push(name),
            Outcome::Failed(error) => self.failed.push(Failure {
                name,
                code: error.error_code().to_string(),
                reason: error.to_string(),
            }),
        }
    }

    /// True when something was created, updated or deleted.
    #[must_use]
    pub fn changed(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }

    /// True when any resource failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (label, count) in [
            ("created", self.created.len()),
            ("updated", self.updated.len()),
            ("deleted", self.deleted.len()),
            ("unchanged", self.unchanged.len()),
            ("not found", self.skipped_not_found.len()),
            ("failed", self.failed.len()),
        ] {
            if count > 0 {
                parts.push(format!("{count} {label}"));
            }
        }
        if parts.is_empty() {
            parts.push("nothing to do".to_string());
        }
        format!("{}: {}", self.group, parts.join(", "))
    }
}

/// Accumulated outcome of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    groups: Vec<GroupSummary>,
    fatal: Option<Error>,
}

impl RunReport {
    /// Empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            groups: Vec::new(),
            fatal: None,
        }
    }

    /// Summary for a group, created on first use.
    pub fn group_mut(&mut self, group: Group) -> &mut GroupSummary {
        let index = match self.groups.iter().position(|summary| summary.group == group) {
            Some(index) => index,
            None => {
                self.groups.push(GroupSummary::new(group));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Summary for a group, if it ran.
    #[must_use]
    pub fn group(&self, group: Group) -> Option<&GroupSummary> {
        self.groups.iter().find(|summary| summary.group == group)
    }

    /// Summaries in the order groups ran.
    #[must_use]
    pub fn groups(&self) -> &[GroupSummary] {
        &self.groups
    }

    /// File a resource under its outcome.
    pub fn record(&mut self, group: Group, name: impl Into<String>, outcome: Outcome) {
        self.group_mut(group).record(name, outcome);
    }

    /// Mark the run as halted.
    pub fn halt(&mut self, error: Error) {
        self.fatal = Some(error);
    }

    /// The error that halted the run.
    #[must_use]
    pub const fn fatal(&self) -> Option<&Error> {
        self.fatal.as_ref()
    }

    /// True iff anything was created, updated or deleted.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.groups.iter().any(GroupSummary::changed)
    }

    /// True when any resource failed or the run halted.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.fatal.is_some() || self.groups.iter().any(GroupSummary::has_failures)
    }

    /// Collapse into the caller-facing envelope.
    #[must_use]
    pub fn envelope(&self) -> ResultEnvelope {
        let mut lines: Vec<String> = self.groups.iter().map(GroupSummary::describe).collect();
        if let Some(error) = &self.fatal {
            lines.push(format!("halted: {error}"));
        }
        let msg = if lines.is_empty() {
            "nothing to do".to_string()
        } else {
            lines.join("; ")
        };

        ResultEnvelope {
            changed: self.changed(),
            failed: self.has_failures(),
            msg,
            response: self.groups.clone(),
            error: self.fatal.clone().map(Error::into_error_response),
        }
    }
}

/// `{changed, msg, response}` document returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// True iff anything was created, updated or deleted
    pub changed: bool,
    /// True when a resource failed or the run halted
    pub failed: bool,
    /// One-line summary
    pub msg: String,
    /// Per-group summaries
    pub response: Vec<GroupSummary>,
    /// The error that halted the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unchanged_and_not_found_do_not_count_as_changed() {
        let mut report = RunReport::new();
        report.record(Group::GlobalPools, "a", Outcome::Unchanged);
        report.record(Group::ReservedPools, "b", Outcome::SkippedNotFound);
        assert!(!report.changed());
        assert!(!report.has_failures());

        report.record(Group::Users, "alice", Outcome::Updated);
        assert!(report.changed());
    }

    #[test]
    fn failures_keep_code_and_reason() {
        let mut report = RunReport::new();
        report.record(
            Group::ReservedPools,
            "in-use",
            Outcome::Failed(Error::Conflict("pool has allocations".into())),
        );

        let summary = report.group(Group::ReservedPools).unwrap();
        assert_eq!(summary.failed[0].name, "in-use");
        assert_eq!(summary.failed[0].code, "CONFLICT");
        assert!(summary.failed[0].reason.contains("pool has allocations"));
        assert!(report.has_failures());
    }

    #[test]
    fn groups_keep_first_use_order() {
        let mut report = RunReport::new();
        report.record(Group::Users, "u", Outcome::Deleted);
        report.record(Group::Roles, "r", Outcome::Deleted);
        report.record(Group::Users, "v", Outcome::Deleted);

        let order: Vec<_> = report.groups().iter().map(|g| g.group).collect();
        assert_eq!(order, vec![Group::Users, Group::Roles]);
        assert_eq!(report.group(Group::Users).unwrap().deleted, vec!["u", "v"]);
    }

    #[test]
    fn envelope_shape() {
        let mut report = RunReport::new();
        report.record(Group::GlobalPools, "lab-v4", Outcome::Created);
        report.halt(Error::Cancelled);

        let envelope = report.envelope();
        assert!(envelope.changed);
        assert!(envelope.failed);
        assert_eq!(envelope.msg, "global_pools: 1 created; halted: Run cancelled");

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["response"][0]["group"], "global_pools");
        assert_eq!(json["response"][0]["created"][0], "lab-v4");
        assert_eq!(json["error"]["code"], "CANCELLED");
        assert!(json["response"][0].get("verification").is_none());
    }

    #[test]
    fn empty_run_says_nothing_to_do() {
        let envelope = RunReport::new().envelope();
        assert!(!envelope.changed);
        assert_eq!(envelope.msg, "nothing to do");
    }
}
