//! Multi-step approval workflows with per-step quorums.
//!
//! State machines:
//! ```text
//! step:      pending ──► in_progress ──► completed
//!                              │
//!                              └──────► rejected
//!
//! workflow:  pending ──► in_progress ──► completed
//!               │             │
//!               │             ├──────► rejected   (any single rejection)
//!               └─────────────┴──────► cancelled | escalated
//! ```
//!
//! Only members of the current step's approver set may act. Quorum counts
//! distinct approving approvers. Rejection at any step is terminal for the
//! whole workflow. `auto_approve` and escalation rules are carried as
//! configuration for tooling; nothing here evaluates them on a clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

wire_enum! {
    /// Workflow-level state.
    pub enum WorkflowStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Rejected => "rejected",
        Cancelled => "cancelled",
        Escalated => "escalated",
    }
}

wire_enum! {
    /// Step-level state.
    pub enum StepStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Skipped => "skipped",
        Rejected => "rejected",
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("workflow {workflow_id} is {status} and accepts no further actions")]
    Closed {
        workflow_id: String,
        status: WorkflowStatus,
    },
    #[error("{approver} is not an approver for step {step}")]
    NotAnApprover { approver: String, step: usize },
    #[error("{approver} already approved step {step}")]
    DuplicateApproval { approver: String, step: usize },
    #[error("workflow has no step {0}")]
    StepOutOfRange(usize),
    #[error("step {step} requires {required} approvals but lists only {approvers} approvers")]
    UnreachableQuorum {
        step: usize,
        required: u32,
        approvers: usize,
    },
}

/// One recorded decision on a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ApprovalAction {
    #[serde(rename_all = "camelCase")]
    Approved {
        approver_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comments: Option<String>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Rejected {
        approver_id: String,
        comments: String,
        timestamp: DateTime<Utc>,
    },
}

impl ApprovalAction {
    pub fn approver_id(&self) -> &str {
        match self {
            ApprovalAction::Approved { approver_id, .. } => approver_id,
            ApprovalAction::Rejected { approver_id, .. } => approver_id,
        }
    }

    pub fn is_approval(&self) -> bool {
        matches!(self, ApprovalAction::Approved { .. })
    }
}

/// Result of an accepted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Approval recorded, quorum not reached yet.
    Recorded { step: usize },
    /// Quorum reached; `next` is now the current step.
    StepCompleted { step: usize, next: usize },
    /// Quorum reached on the last step.
    WorkflowCompleted,
    /// The step and the whole workflow were rejected.
    Rejected { step: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRule {
    pub trigger_after_hours: u32,
    pub escalate_to: Vec<String>,
    #[serde(default)]
    pub notify: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStep {
    pub id: String,
    pub name: String,
    pub approvers: Vec<String>,
    pub required_approvals: u32,
    #[serde(default)]
    pub actions: Vec<ApprovalAction>,
    pub status: StepStatus,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ApprovalStep {
    pub fn new<I, S>(name: impl Into<String>, approvers: I, required_approvals: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for approver in approvers.into_iter().map(Into::into) {
            if !unique.contains(&approver) {
                unique.push(approver);
            }
        }
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            approvers: unique,
            required_approvals,
            actions: Vec::new(),
            status: StepStatus::Pending,
            auto_approve: false,
            completed_at: None,
        }
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub fn is_approver(&self, approver_id: &str) -> bool {
        self.approvers.iter().any(|a| a == approver_id)
    }

    pub fn approval_count(&self) -> u32 {
        self.actions.iter().filter(|a| a.is_approval()).count() as u32
    }

    pub fn rejection_count(&self) -> u32 {
        self.actions.iter().filter(|a| !a.is_approval()).count() as u32
    }

    pub fn has_approved(&self, approver_id: &str) -> bool {
        self.actions
            .iter()
            .any(|a| a.is_approval() && a.approver_id() == approver_id)
    }

    fn quorum_met(&self) -> bool {
        self.approval_count() >= self.required_approvals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalWorkflow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<ApprovalStep>,
    pub current_step: usize,
    pub status: WorkflowStatus,
    /// Sum of the step quorums.
    pub required_approvals: u32,
    /// Approved actions across every step.
    pub received_approvals: u32,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default)]
    pub escalation_rules: Vec<EscalationRule>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ApprovalWorkflow {
    pub fn new(name: impl Into<String>, steps: Vec<ApprovalStep>) -> Self {
        let required_approvals = steps.iter().map(|s| s.required_approvals).sum();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            steps,
            current_step: 0,
            status: WorkflowStatus::Pending,
            required_approvals,
            received_approvals: 0,
            auto_approve: false,
            escalation_rules: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_escalation(mut self, rule: EscalationRule) -> Self {
        self.escalation_rules.push(rule);
        self
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    /// Fresh copy of a named template: new ids, no actions, `created_at = now`.
    pub fn instantiate(&self) -> Self {
        let steps = self
            .steps
            .iter()
            .map(|step| ApprovalStep {
                id: Uuid::new_v4().to_string(),
                actions: Vec::new(),
                status: StepStatus::Pending,
                completed_at: None,
                ..step.clone()
            })
            .collect();
        Self {
            id: Uuid::new_v4().to_string(),
            steps,
            current_step: 0,
            status: WorkflowStatus::Pending,
            received_approvals: 0,
            created_at: Utc::now(),
            completed_at: None,
            ..self.clone()
        }
    }

    /// Reject configurations whose quorum can never be met by normal approval.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        for (index, step) in self.steps.iter().enumerate() {
            if step.required_approvals as usize > step.approvers.len() {
                return Err(WorkflowError::UnreachableQuorum {
                    step: index,
                    required: step.required_approvals,
                    approvers: step.approvers.len(),
                });
            }
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            WorkflowStatus::Completed | WorkflowStatus::Rejected | WorkflowStatus::Cancelled
        )
    }

    /// Escalated workflows stay actionable; escalation only widens attention.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn current(&self) -> Option<&ApprovalStep> {
        self.steps.get(self.current_step)
    }

    /// Approved actions summed over steps; always equals `received_approvals`.
    pub fn approved_total(&self) -> u32 {
        self.steps.iter().map(ApprovalStep::approval_count).sum()
    }

    fn ensure_open(&self) -> Result<(), WorkflowError> {
        if self.is_terminal() {
            return Err(WorkflowError::Closed {
                workflow_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Index of the current step after checking `approver_id` may act on it.
    fn actionable_step(&self, approver_id: &str) -> Result<usize, WorkflowError> {
        self.ensure_open()?;
        let index = self.current_step;
        let step = self
            .steps
            .get(index)
            .ok_or(WorkflowError::StepOutOfRange(index))?;
        if !step.is_approver(approver_id) {
            return Err(WorkflowError::NotAnApprover {
                approver: approver_id.to_string(),
                step: index,
            });
        }
        Ok(index)
    }

    pub fn approve(
        &mut self,
        approver_id: &str,
        comments: Option<String>,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        let index = self.actionable_step(approver_id)?;
        if self.steps[index].has_approved(approver_id) {
            return Err(WorkflowError::DuplicateApproval {
                approver: approver_id.to_string(),
                step: index,
            });
        }

        let now = Utc::now();
        let last = index + 1 == self.steps.len();
        let step = &mut self.steps[index];
        step.actions.push(ApprovalAction::Approved {
            approver_id: approver_id.to_string(),
            comments,
            timestamp: now,
        });
        step.status = StepStatus::InProgress;
        self.received_approvals += 1;
        if self.status == WorkflowStatus::Pending {
            self.status = WorkflowStatus::InProgress;
        }

        if !step.quorum_met() {
            return Ok(ApprovalOutcome::Recorded { step: index });
        }

        step.status = StepStatus::Completed;
        step.completed_at = Some(now);
        if last {
            self.status = WorkflowStatus::Completed;
            self.completed_at = Some(now);
            return Ok(ApprovalOutcome::WorkflowCompleted);
        }

        self.current_step = index + 1;
        self.steps[self.current_step].status = StepStatus::InProgress;
        Ok(ApprovalOutcome::StepCompleted {
            step: index,
            next: self.current_step,
        })
    }

    pub fn reject(
        &mut self,
        approver_id: &str,
        comments: impl Into<String>,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        let index = self.actionable_step(approver_id)?;
        let now = Utc::now();
        let step = &mut self.steps[index];
        step.actions.push(ApprovalAction::Rejected {
            approver_id: approver_id.to_string(),
            comments: comments.into(),
            timestamp: now,
        });
        step.status = StepStatus::Rejected;
        step.completed_at = Some(now);
        self.status = WorkflowStatus::Rejected;
        self.completed_at = Some(now);
        Ok(ApprovalOutcome::Rejected { step: index })
    }

    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        self.ensure_open()?;
        self.status = WorkflowStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the workflow escalated. Approvers and quorum are unchanged.
    pub fn escalate(&mut self) -> Result<(), WorkflowError> {
        self.ensure_open()?;
        self.status = WorkflowStatus::Escalated;
        Ok(())
    }

    /// Escalation rules whose trigger time has passed, for ops tooling.
    ///
    /// A trigger time past the representable range is never overdue.
    pub fn overdue_escalations(&self, now: DateTime<Utc>) -> Vec<&EscalationRule> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.escalation_rules
            .iter()
            .filter(|rule| {
                self.created_at
                    .checked_add_signed(Duration::hours(i64::from(rule.trigger_after_hours)))
                    .is_some_and(|due| now >= due)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step() -> ApprovalWorkflow {
        ApprovalWorkflow::new(
            "Two step",
            vec![
                ApprovalStep::new("Legal", ["a"], 1),
                ApprovalStep::new("Finance", ["b"], 1),
            ],
        )
    }

    #[test]
    fn test_required_approvals_sums_quorums() {
        let wf = ApprovalWorkflow::new(
            "Quorum",
            vec![
                ApprovalStep::new("One", ["a", "b", "c"], 2),
                ApprovalStep::new("Two", ["d"], 1),
            ],
        );
        assert_eq!(wf.required_approvals, 3);
        assert_eq!(wf.status, WorkflowStatus::Pending);
        assert_eq!(wf.current_step, 0);
    }

    #[test]
    fn test_approvals_advance_then_complete() {
        let mut wf = two_step();
        assert_eq!(
            wf.approve("a", None).unwrap(),
            ApprovalOutcome::StepCompleted { step: 0, next: 1 }
        );
        assert_eq!(wf.steps[0].status, StepStatus::Completed);
        assert_eq!(wf.steps[1].status, StepStatus::InProgress);
        assert_eq!(wf.status, WorkflowStatus::InProgress);

        assert_eq!(wf.approve("b", Some("ok".into())).unwrap(), ApprovalOutcome::WorkflowCompleted);
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert!(wf.completed_at.is_some());
        assert_eq!(wf.received_approvals, wf.approved_total());
    }

    #[test]
    fn test_non_member_changes_nothing() {
        let mut wf = two_step();
        let before = wf.clone();
        let err = wf.approve("b", None).unwrap_err();
        assert_eq!(err, WorkflowError::NotAnApprover { approver: "b".into(), step: 0 });
        assert_eq!(wf, before);
        assert!(wf.reject("mallory", "no").is_err());
        assert_eq!(wf, before);
    }

    #[test]
    fn test_quorum_counts_distinct_approvers() {
        let mut wf = ApprovalWorkflow::new("Quorum", vec![ApprovalStep::new("Board", ["a", "b", "c"], 2)]);
        assert_eq!(wf.approve("a", None).unwrap(), ApprovalOutcome::Recorded { step: 0 });
        assert!(matches!(wf.approve("a", None), Err(WorkflowError::DuplicateApproval { .. })));
        assert_eq!(wf.steps[0].approval_count(), 1);
        assert_eq!(wf.approve("c", None).unwrap(), ApprovalOutcome::WorkflowCompleted);
        assert_eq!(wf.received_approvals, 2);
    }

    #[test]
    fn test_rejection_is_terminal() {
        let mut wf = two_step();
        wf.approve("a", None).unwrap();
        assert_eq!(wf.reject("b", "missing annex").unwrap(), ApprovalOutcome::Rejected { step: 1 });
        assert_eq!(wf.status, WorkflowStatus::Rejected);
        assert_eq!(wf.steps[1].status, StepStatus::Rejected);
        assert_eq!(wf.steps[1].rejection_count(), 1);

        let frozen = wf.clone();
        assert!(matches!(wf.approve("b", None), Err(WorkflowError::Closed { .. })));
        assert!(matches!(wf.reject("b", "again"), Err(WorkflowError::Closed { .. })));
        assert_eq!(wf, frozen);
        // Rejections never count toward approvals.
        assert_eq!(wf.received_approvals, 1);
        assert_eq!(wf.approved_total(), 1);
    }

    #[test]
    fn test_escalated_workflow_still_accepts_actions() {
        let mut wf = two_step();
        wf.escalate().unwrap();
        assert!(wf.is_active());
        wf.approve("a", None).unwrap();
        assert_eq!(wf.current_step, 1);
    }

    #[test]
    fn test_cancel_closes_workflow() {
        let mut wf = two_step();
        wf.cancel().unwrap();
        assert_eq!(wf.status, WorkflowStatus::Cancelled);
        assert!(wf.cancel().is_err());
        assert!(wf.approve("a", None).is_err());
    }

    #[test]
    fn test_validate_flags_unreachable_quorum() {
        let wf = ApprovalWorkflow::new("Broken", vec![ApprovalStep::new("Solo", ["a"], 2)]);
        assert_eq!(
            wf.validate(),
            Err(WorkflowError::UnreachableQuorum { step: 0, required: 2, approvers: 1 })
        );
        assert!(two_step().validate().is_ok());
    }

    #[test]
    fn test_instantiate_resets_state() {
        let mut template = two_step();
        template.approve("a", None).unwrap();
        let fresh = template.instantiate();
        assert_ne!(fresh.id, template.id);
        assert_eq!(fresh.current_step, 0);
        assert_eq!(fresh.received_approvals, 0);
        assert_eq!(fresh.status, WorkflowStatus::Pending);
        assert!(fresh.steps.iter().all(|s| s.actions.is_empty() && s.status == StepStatus::Pending));
        assert_eq!(fresh.name, template.name);
    }

    #[test]
    fn test_overdue_escalations() {
        let wf = two_step().with_escalation(EscalationRule {
            trigger_after_hours: 72,
            escalate_to: vec!["legal-lead".into()],
            notify: true,
        });
        assert!(wf.overdue_escalations(wf.created_at + Duration::hours(1)).is_empty());
        assert_eq!(wf.overdue_escalations(wf.created_at + Duration::hours(72)).len(), 1);
    }

    #[test]
    fn test_unreachable_escalation_is_never_overdue() {
        let wf = two_step()
            .with_escalation(EscalationRule {
                trigger_after_hours: u32::MAX,
                escalate_to: vec!["ceo".into()],
                notify: false,
            })
            .with_escalation(EscalationRule {
                trigger_after_hours: 1,
                escalate_to: vec!["legal-lead".into()],
                notify: true,
            });
        let overdue = wf.overdue_escalations(wf.created_at + Duration::hours(2));
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].trigger_after_hours, 1);
        assert!(wf.overdue_escalations(Utc::now()).is_empty());
    }

    #[test]
    fn test_actions_serialize_as_tagged_variants() {
        let mut wf = two_step();
        wf.approve("a", Some("fine".into())).unwrap();
        let json = serde_json::to_value(&wf.steps[0].actions[0]).unwrap();
        assert_eq!(json["action"], "approved");
        assert_eq!(json["approverId"], "a");
        let back: ApprovalAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, wf.steps[0].actions[0]);
    }
}
