//! Store behaviour through the public API.
//!
//! Verifies:
//! - create/get/delete consistency
//! - search pagination bounds and pre-pagination totals
//! - approval quorum, step advance and terminal rejection
//! - template generation with defaults

use std::collections::BTreeMap;

use connect_core::{
    ApprovalStep, ApprovalWorkflow, Document, DocumentCategory, DocumentStatus, DocumentTemplate,
    DocumentType, SearchQuery, StepStatus, TemplateVariable, VariableKind, WorkflowStatus,
};
use connect_docs::{DocumentStore, MemoryRepository, StoreConfig};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn seeded_store() -> DocumentStore {
    DocumentStore::open(MemoryRepository::new(), StoreConfig::default())
}

fn empty_store() -> DocumentStore {
    DocumentStore::open(MemoryRepository::new(), StoreConfig::for_testing())
}

fn two_step_workflow() -> ApprovalWorkflow {
    ApprovalWorkflow::new(
        "Two step",
        vec![
            ApprovalStep::new("First", ["a"], 1),
            ApprovalStep::new("Second", ["b"], 1),
        ],
    )
}

// ─── CRUD ────────────────────────────────────────────────────────────────────

#[test]
fn test_created_document_is_immediately_readable() {
    let mut store = seeded_store();
    let doc = Document::new("Globex NDA", DocumentType::Nda, DocumentCategory::Legal, "sarah.chen")
        .with_content("confidential");
    let created = store.create(doc.clone());
    assert_eq!(created, doc);
    assert_eq!(store.get(&doc.id), Some(&doc));
    assert_eq!(store.documents()[0].id, doc.id);
}

#[test]
fn test_delete_then_get_is_not_found() {
    let mut store = seeded_store();
    let id = store.documents()[3].id.clone();
    let before = store.len();

    assert!(store.delete(&id));
    assert!(store.get(&id).is_none());
    assert_eq!(store.len(), before - 1);

    assert!(!store.delete(&id));
    assert!(!store.delete("does-not-exist"));
    assert_eq!(store.len(), before - 1);
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[test]
fn test_pagination_bounds_and_total() {
    let store = seeded_store();
    let unpaged = store.search(&SearchQuery {
        categories: [DocumentCategory::Legal, DocumentCategory::Financial].into_iter().collect(),
        ..SearchQuery::default()
    });

    for (offset, limit) in [(0, 5), (3, 4), (10, 100), (1000, 5)] {
        let page = store.search(&SearchQuery {
            categories: [DocumentCategory::Legal, DocumentCategory::Financial].into_iter().collect(),
            offset,
            limit: Some(limit),
            ..SearchQuery::default()
        });
        assert!(page.documents.len() <= limit);
        assert_eq!(page.total, unpaged.total);
        let expected: Vec<_> = unpaged.documents.iter().skip(offset).take(limit).map(|d| &d.id).collect();
        let got: Vec<_> = page.documents.iter().map(|d| &d.id).collect();
        assert_eq!(got, expected);
    }
}

#[test]
fn test_facets_cover_whole_collection() {
    let store = seeded_store();
    let result = store.search(&SearchQuery {
        types: [DocumentType::Nda].into_iter().collect(),
        ..SearchQuery::default()
    });
    let facet_total: usize = result.facets.types.values().sum();
    assert_eq!(facet_total, store.len());
    assert!(result.documents.iter().all(|d| d.doc_type == DocumentType::Nda));
}

#[test]
fn test_search_by_partner_custom_field() {
    let mut store = empty_store();
    let doc = store.create(
        Document::new("Agreement.pdf", DocumentType::Contract, DocumentCategory::Partnership, "mike")
            .with_custom_field("partnerName", "Umbrella FX"),
    );
    let result = store.search(&SearchQuery::text("umbrella"));
    assert_eq!(result.total, 1);
    assert_eq!(result.documents[0].id, doc.id);
}

// ─── Workflow ────────────────────────────────────────────────────────────────

#[test]
fn test_two_step_scenario() {
    let mut store = empty_store();
    let doc = store.create(Document::new(
        "Partner MSA",
        DocumentType::Contract,
        DocumentCategory::Partnership,
        "mike.johnson",
    ));
    assert!(store.attach_workflow(&doc.id, two_step_workflow()));

    assert!(store.approve(&doc.id, "a", None));
    let after_a = store.get(&doc.id).unwrap();
    let workflow = after_a.approval_workflow.as_ref().unwrap();
    assert_eq!(after_a.status, DocumentStatus::PendingReview);
    assert_eq!(workflow.current_step, 1);
    assert_eq!(workflow.steps[0].status, StepStatus::Completed);

    assert!(store.approve(&doc.id, "b", Some("looks good".into())));
    let after_b = store.get(&doc.id).unwrap();
    let workflow = after_b.approval_workflow.as_ref().unwrap();
    assert_eq!(after_b.status, DocumentStatus::Approved);
    assert_eq!(workflow.status, WorkflowStatus::Completed);
    assert_eq!(workflow.received_approvals, workflow.approved_total());
}

#[test]
fn test_non_approver_changes_nothing() {
    let mut store = empty_store();
    let doc = store.create(Document::new("MSA", DocumentType::Contract, DocumentCategory::Legal, "x"));
    store.attach_workflow(&doc.id, two_step_workflow());
    let before = store.get(&doc.id).unwrap().clone();

    assert!(!store.approve(&doc.id, "b", None));
    assert!(!store.approve(&doc.id, "mallory", None));
    assert!(!store.reject(&doc.id, "mallory", "no"));

    let after = store.get(&doc.id).unwrap();
    assert_eq!(after.status, before.status);
    let (w_before, w_after) = (
        before.approval_workflow.as_ref().unwrap(),
        after.approval_workflow.as_ref().unwrap(),
    );
    assert_eq!(w_after.current_step, w_before.current_step);
    let statuses = |w: &ApprovalWorkflow| w.steps.iter().map(|s| s.status).collect::<Vec<_>>();
    assert_eq!(statuses(w_after), statuses(w_before));
}

#[test]
fn test_rejection_at_any_step_is_terminal() {
    for approvals_before_reject in [0usize, 1] {
        let mut store = empty_store();
        let doc = store.create(Document::new("MSA", DocumentType::Contract, DocumentCategory::Legal, "x"));
        store.attach_workflow(&doc.id, two_step_workflow());
        if approvals_before_reject == 1 {
            assert!(store.approve(&doc.id, "a", None));
        }
        let rejecter = if approvals_before_reject == 0 { "a" } else { "b" };
        assert!(store.reject(&doc.id, rejecter, "terms unacceptable"));

        let snapshot = store.get(&doc.id).unwrap().clone();
        assert_eq!(snapshot.status, DocumentStatus::Rejected);
        assert_eq!(snapshot.approval_workflow.as_ref().unwrap().status, WorkflowStatus::Rejected);

        assert!(!store.approve(&doc.id, "a", None));
        assert!(!store.approve(&doc.id, "b", None));
        assert!(!store.reject(&doc.id, "b", "again"));
        let after = store.get(&doc.id).unwrap();
        assert_eq!(after.approval_workflow, snapshot.approval_workflow);
        assert_eq!(after.status, DocumentStatus::Rejected);
    }
}

#[test]
fn test_approve_without_workflow_fails() {
    let mut store = empty_store();
    let doc = store.create(Document::new("Memo", DocumentType::Report, DocumentCategory::Internal, "x"));
    assert!(!store.approve(&doc.id, "a", None));
    assert!(!store.approve("missing", "a", None));
}

// ─── Templates ───────────────────────────────────────────────────────────────

#[test]
fn test_template_default_substitution() {
    let template = DocumentTemplate::new(
        "tpl-signed",
        "Signed",
        DocumentType::Contract,
        DocumentCategory::Legal,
        "Signed on {{date}}",
    )
    .with_variable(TemplateVariable::new("date", VariableKind::Date).default_value("2024-01-01"));

    assert_eq!(template.render(&BTreeMap::new()), "Signed on 2024-01-01");
    let supplied = BTreeMap::from([("date".to_string(), "2025-05-05".to_string())]);
    assert_eq!(template.render(&supplied), "Signed on 2025-05-05");
}

#[test]
fn test_generated_partnership_document_enters_review() {
    let mut store = empty_store();
    let values = BTreeMap::from([
        ("partnerName".to_string(), "Stark Fintech".to_string()),
        ("startDate".to_string(), "2025-07-01".to_string()),
    ]);
    let doc = store
        .create_from_template("template-partnership", &values, "mike.johnson")
        .unwrap();
    assert_eq!(doc.status, DocumentStatus::PendingReview);
    assert_eq!(doc.template_id.as_deref(), Some("template-partnership"));
    let content = doc.content.as_deref().unwrap();
    assert!(content.contains("Stark Fintech agree to a referral partnership"));
    assert!(content.contains("Revenue share: 10%"));
    assert_eq!(store.pending_approvals_for("lisa.park").len(), 1);
}
