//! Screen state for a record workflow.
//!
//! Replaces per-dialog open/closed flags with one enum so that, for example,
//! a confirmation prompt cannot be open while a create form is.

use std::future::Future;

use shared::domain::{ChildId, ChildKind};
use thiserror::Error;

use crate::error::{ErrorCategory, WorkflowError};

/// An irreversible action waiting for operator confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Sign { kind: ChildKind, child_id: ChildId },
    Fulfil { kind: ChildKind, child_id: ChildId },
    Cancel {
        kind: ChildKind,
        child_id: ChildId,
        reason: String,
    },
}

impl PendingAction {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::Sign { kind, .. } | Self::Fulfil { kind, .. } | Self::Cancel { kind, .. } => {
                *kind
            }
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            Self::Sign { kind, child_id } => {
                format!("Sign {kind} {child_id}? Signed records cannot be edited.")
            }
            Self::Fulfil { kind, child_id } => match kind.fulfilment_status() {
                Some(status) => format!("Mark {kind} {child_id} as {status}?"),
                None => format!("{kind} {child_id} has no fulfilment step."),
            },
            Self::Cancel {
                kind,
                child_id,
                reason,
            } => format!("Cancel {kind} {child_id} ({reason})?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowView {
    Idle,
    Viewing { kind: ChildKind },
    Creating { kind: ChildKind },
    Editing { kind: ChildKind, child_id: ChildId },
    Confirming {
        action: PendingAction,
        return_to: Option<ChildKind>,
    },
}

impl WorkflowView {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Viewing { .. } => "viewing",
            Self::Creating { .. } => "creating",
            Self::Editing { .. } => "editing",
            Self::Confirming { .. } => "confirming",
        }
    }

    /// List the operator lands on when leaving this view.
    fn resting_list(&self) -> Option<ChildKind> {
        match self {
            Self::Idle => None,
            Self::Viewing { kind } | Self::Creating { kind } | Self::Editing { kind, .. } => {
                Some(*kind)
            }
            Self::Confirming { return_to, .. } => *return_to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot start {to} while {from}")]
pub struct ViewTransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorMessage {
    pub category: ErrorCategory,
    pub text: String,
}

impl OperatorMessage {
    pub fn from_error(err: &WorkflowError) -> Self {
        Self {
            category: err.category(),
            text: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowScreen {
    view: WorkflowView,
    busy: bool,
    last_message: Option<OperatorMessage>,
}

impl Default for WorkflowScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowScreen {
    pub fn new() -> Self {
        Self {
            view: WorkflowView::Idle,
            busy: false,
            last_message: None,
        }
    }

    pub fn view(&self) -> &WorkflowView {
        &self.view
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_message(&self) -> Option<&OperatorMessage> {
        self.last_message.as_ref()
    }

    /// Back to a blank screen, e.g. after searching for another encounter.
    pub fn reset(&mut self) {
        self.view = WorkflowView::Idle;
        self.last_message = None;
    }

    pub fn open_list(&mut self, kind: ChildKind) -> Result<(), ViewTransitionError> {
        self.transition_from_rest(WorkflowView::Viewing { kind })
    }

    pub fn begin_create(&mut self, kind: ChildKind) -> Result<(), ViewTransitionError> {
        self.transition_from_rest(WorkflowView::Creating { kind })
    }

    /// Opens the replacement form for a signed record.
    pub fn begin_edit(
        &mut self,
        kind: ChildKind,
        child_id: ChildId,
    ) -> Result<(), ViewTransitionError> {
        self.transition_from_rest(WorkflowView::Editing { kind, child_id })
    }

    pub fn request_confirmation(
        &mut self,
        action: PendingAction,
    ) -> Result<(), ViewTransitionError> {
        let return_to = self.view.resting_list();
        self.transition_from_rest(WorkflowView::Confirming { action, return_to })
    }

    /// Accepts the pending action and returns to the list it was raised from.
    pub fn confirm(&mut self) -> Option<PendingAction> {
        let WorkflowView::Confirming { action, return_to } = &self.view else {
            return None;
        };
        let (action, return_to) = (action.clone(), *return_to);
        self.view = Self::resting_view(return_to);
        Some(action)
    }

    /// Closes the current form or prompt without acting on it.
    pub fn dismiss(&mut self) {
        self.view = match &self.view {
            WorkflowView::Idle | WorkflowView::Viewing { .. } => WorkflowView::Idle,
            other => Self::resting_view(other.resting_list()),
        };
    }

    /// Runs one backend action with the busy indicator raised.
    ///
    /// Failures are recorded as the operator message and swallowed here;
    /// the screen's view is left where it was so the form can be retried.
    pub async fn run<T, F>(&mut self, action: F) -> Option<T>
    where
        F: Future<Output = Result<T, WorkflowError>>,
    {
        self.busy = true;
        let result = action.await;
        self.busy = false;

        match result {
            Ok(value) => {
                self.last_message = None;
                Some(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, view = self.view.name(), "workflow action failed");
                self.last_message = Some(OperatorMessage::from_error(&err));
                None
            }
        }
    }

    fn resting_view(list: Option<ChildKind>) -> WorkflowView {
        match list {
            Some(kind) => WorkflowView::Viewing { kind },
            None => WorkflowView::Idle,
        }
    }

    fn transition_from_rest(&mut self, next: WorkflowView) -> Result<(), ViewTransitionError> {
        match self.view {
            WorkflowView::Idle | WorkflowView::Viewing { .. } if !self.busy => {
                self.view = next;
                Ok(())
            }
            _ => Err(ViewTransitionError {
                from: if self.busy { "busy" } else { self.view.name() },
                to: next.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_cannot_open_over_a_form() {
        let mut screen = WorkflowScreen::new();
        screen
            .begin_create(ChildKind::Prescription)
            .expect("create form");
        let err = screen
            .request_confirmation(PendingAction::Sign {
                kind: ChildKind::Prescription,
                child_id: ChildId(99),
            })
            .expect_err("must fail");
        assert_eq!(
            err,
            ViewTransitionError {
                from: "creating",
                to: "confirming"
            }
        );
    }

    #[test]
    fn confirm_returns_action_and_restores_list() {
        let mut screen = WorkflowScreen::new();
        screen.open_list(ChildKind::ClinicalNote).expect("list");
        let action = PendingAction::Sign {
            kind: ChildKind::ClinicalNote,
            child_id: ChildId(5),
        };
        screen.request_confirmation(action.clone()).expect("prompt");

        assert_eq!(screen.confirm(), Some(action));
        assert_eq!(
            screen.view(),
            &WorkflowView::Viewing {
                kind: ChildKind::ClinicalNote
            }
        );
        assert_eq!(screen.confirm(), None);
    }

    #[test]
    fn dismiss_steps_back_one_level() {
        let mut screen = WorkflowScreen::new();
        screen.open_list(ChildKind::LabOrder).expect("list");
        screen
            .begin_edit(ChildKind::LabOrder, ChildId(3))
            .expect("edit");
        screen.dismiss();
        assert_eq!(
            screen.view(),
            &WorkflowView::Viewing {
                kind: ChildKind::LabOrder
            }
        );
        screen.dismiss();
        assert_eq!(screen.view(), &WorkflowView::Idle);
    }

    #[tokio::test]
    async fn failed_action_is_reported_not_propagated() {
        let mut screen = WorkflowScreen::new();
        let outcome: Option<()> = screen
            .run(async { Err(WorkflowError::conflict("prescription 99 is SIGNED")) })
            .await;
        assert!(outcome.is_none());
        assert!(!screen.is_busy());
        let message = screen.last_message().expect("message");
        assert_eq!(message.category, ErrorCategory::Conflict);
        assert!(message.text.contains("prescription 99"));

        let outcome = screen.run(async { Ok::<_, WorkflowError>(7) }).await;
        assert_eq!(outcome, Some(7));
        assert!(screen.last_message().is_none());
    }
}
