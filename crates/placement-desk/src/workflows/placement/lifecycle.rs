//! Application lifecycle state machine.
//!
//! `transition` is total: an action that is not available from the current status leaves the
//! status unchanged. Callers decide legality up front with `available_actions`, which is the
//! inverse lookup of the same table.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::domain::ApplicationStatus;

/// Named action that may move an application between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationAction {
    Shortlist,
    Accept,
    Reject,
    Withdraw,
}

impl ApplicationAction {
    pub const ALL: [ApplicationAction; 4] = [
        ApplicationAction::Shortlist,
        ApplicationAction::Accept,
        ApplicationAction::Reject,
        ApplicationAction::Withdraw,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.label().eq_ignore_ascii_case(value.trim()))
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationAction::Shortlist => "shortlist",
            ApplicationAction::Accept => "accept",
            ApplicationAction::Reject => "reject",
            ApplicationAction::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for ApplicationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resulting status for `action` applied to `status`.
pub const fn transition(status: ApplicationStatus, action: ApplicationAction) -> ApplicationStatus {
    use ApplicationAction::*;
    use ApplicationStatus::*;

    match (status, action) {
        (Pending, Shortlist) | (Rejected, Shortlist) => Shortlisted,
        (Pending, Accept) | (Shortlisted, Accept) => Accepted,
        (Pending, Reject) | (Shortlisted, Reject) | (Accepted, Reject) => Rejected,
        (Pending, Withdraw) | (Shortlisted, Withdraw) | (Rejected, Withdraw) => Withdrawn,
        (current, _) => current,
    }
}

/// Actions that produce a different status from `status`.
pub const fn available_actions(status: ApplicationStatus) -> &'static [ApplicationAction] {
    use ApplicationAction::*;

    match status {
        ApplicationStatus::Pending => &[Shortlist, Accept, Reject, Withdraw],
        ApplicationStatus::Shortlisted => &[Accept, Reject, Withdraw],
        ApplicationStatus::Rejected => &[Shortlist, Withdraw],
        ApplicationStatus::Accepted => &[Reject],
        ApplicationStatus::Withdrawn => &[],
    }
}

pub fn is_available(status: ApplicationStatus, action: ApplicationAction) -> bool {
    available_actions(status).contains(&action)
}
