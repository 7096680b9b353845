//! The document store: authoritative in-memory collection plus write-through
//! snapshot persistence.
//!
//! Every mutating call applies its change in memory first, then saves the
//! whole collection through the injected [`SnapshotRepository`]. A failed
//! save is logged and the in-memory change is kept, so memory and storage can
//! diverge until the next successful save.
//!
//! Errors never cross this boundary: not-found and refused actions come back
//! as `None`/`false` with a log line explaining why.

use std::collections::BTreeMap;

use chrono::Utc;
use connect_core::{
    search, AccessAction, ApprovalOutcome, ApprovalWorkflow, Document, DocumentCategory,
    DocumentFolder, DocumentPatch, DocumentStatus, DocumentTemplate, DocumentType, SearchQuery,
    SearchResult,
};
use serde::Serialize;

use crate::events::{ConsoleEvent, EventBus};
use crate::seed;
use crate::storage::{SnapshotRepository, StoreError};

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Seed for the synthetic dataset (default: 42)
    pub seed: u64,
    /// Documents generated when no usable snapshot exists (default: 48)
    pub seed_documents: usize,
    /// Buffer per event subscriber (default: 256)
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            seed_documents: 48,
            event_capacity: 256,
        }
    }
}

impl StoreConfig {
    /// Empty collection, small event buffer.
    pub fn for_testing() -> Self {
        Self {
            seed: 7,
            seed_documents: 0,
            event_capacity: 16,
        }
    }
}

/// Outcome of [`DocumentStore::delete_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub success: Vec<String>,
    pub failed: Vec<String>,
}

/// Aggregate numbers for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total_documents: usize,
    pub total_size: u64,
    pub by_status: BTreeMap<DocumentStatus, usize>,
    pub by_category: BTreeMap<DocumentCategory, usize>,
    pub by_type: BTreeMap<DocumentType, usize>,
    pub active_workflows: usize,
}

pub struct DocumentStore {
    /// Newest first
    documents: Vec<Document>,
    templates: Vec<DocumentTemplate>,
    workflow_templates: Vec<ApprovalWorkflow>,
    folders: Vec<DocumentFolder>,
    repository: Box<dyn SnapshotRepository>,
    events: EventBus,
    config: StoreConfig,
    /// Set when the repository could not be read; saves are skipped so the
    /// stored collection is never replaced by this session.
    detached: bool,
}

impl DocumentStore {
    /// Load the persisted collection, or generate and persist the synthetic
    /// dataset when there is none or the snapshot is corrupt.
    ///
    /// Any other read failure leaves the repository untouched: the session
    /// runs on synthetic data and never saves.
    pub fn open(repository: impl SnapshotRepository + 'static, config: StoreConfig) -> Self {
        let repository: Box<dyn SnapshotRepository> = Box::new(repository);
        let mut detached = false;
        let (documents, regenerated) = match repository.load() {
            Ok(Some(documents)) => {
                log::info!(
                    "loaded {} documents from {} repository",
                    documents.len(),
                    repository.name()
                );
                (documents, false)
            }
            Ok(None) => {
                log::info!(
                    "no snapshot in {} repository, generating {} documents",
                    repository.name(),
                    config.seed_documents
                );
                (seed::generate_documents(config.seed_documents, config.seed), true)
            }
            Err(e @ (StoreError::Malformed(_) | StoreError::Compression(_))) => {
                log::warn!("discarding unreadable snapshot ({e}), regenerating synthetic data");
                (seed::generate_documents(config.seed_documents, config.seed), true)
            }
            Err(e) => {
                // The stored collection may be intact; never overwrite it here.
                log::error!(
                    "could not read {} repository ({e}), starting from synthetic data without saving",
                    repository.name()
                );
                detached = true;
                (seed::generate_documents(config.seed_documents, config.seed), false)
            }
        };

        let store = Self {
            documents,
            templates: seed::default_templates(),
            workflow_templates: seed::default_workflow_templates(),
            folders: seed::default_folders(),
            repository,
            events: EventBus::new(config.event_capacity),
            config,
            detached,
        };
        if regenerated {
            store.persist();
        }
        store
    }

    /// Share an existing bus instead of the store's own.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Write a final snapshot and release the store.
    pub fn dispose(self) {
        self.persist();
        log::info!(
            "document store closed with {} documents ({})",
            self.documents.len(),
            self.repository.name()
        );
    }

    /// Whether saves are suspended after a failed read at open.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    fn persist(&self) {
        if self.detached {
            log::debug!("skipping save to {}, store is detached", self.repository.name());
            return;
        }
        if let Err(e) = self.repository.save(&self.documents) {
            log::warn!(
                "failed to persist {} documents to {}: {e}",
                self.documents.len(),
                self.repository.name()
            );
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }

    fn document_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    // ─── Queries ──────────────────────────────────────────────────────

    pub fn search(&self, query: &SearchQuery) -> SearchResult {
        search(&self.documents, query)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Documents whose current step lists `approver_id` and still lacks their approval.
    pub fn pending_approvals_for(&self, approver_id: &str) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|doc| {
                doc.approval_workflow
                    .as_ref()
                    .filter(|w| w.is_active())
                    .and_then(ApprovalWorkflow::current)
                    .is_some_and(|step| step.is_approver(approver_id) && !step.has_approved(approver_id))
            })
            .collect()
    }

    pub fn statistics(&self) -> DocumentStats {
        let mut stats = DocumentStats {
            total_documents: self.documents.len(),
            ..DocumentStats::default()
        };
        for doc in &self.documents {
            stats.total_size += doc.size;
            *stats.by_status.entry(doc.status).or_default() += 1;
            *stats.by_category.entry(doc.category).or_default() += 1;
            *stats.by_type.entry(doc.doc_type).or_default() += 1;
            if doc.has_active_workflow() {
                stats.active_workflows += 1;
            }
        }
        stats
    }

    // ─── CRUD ─────────────────────────────────────────────────────────

    /// Insert at the front. A document with the same id is replaced.
    pub fn create(&mut self, document: Document) -> Document {
        if let Some(index) = self.position(&document.id) {
            log::warn!("document {} already exists, replacing it", document.id);
            self.documents.remove(index);
        }
        self.documents.insert(0, document.clone());
        self.persist();
        log::debug!("created document {} ({})", document.id, document.name);
        document
    }

    pub fn update(&mut self, id: &str, patch: DocumentPatch) -> Option<Document> {
        let Some(doc) = self.document_mut(id) else {
            log::warn!("update: document {id} not found");
            return None;
        };
        if !doc.apply_patch(patch) {
            log::warn!(
                "update: kept status {} of {id}, its workflow has finished",
                doc.status
            );
        }
        let updated = doc.clone();
        self.persist();
        Some(updated)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            log::warn!("delete: document {id} not found");
            return false;
        };
        self.documents.remove(index);
        self.persist();
        true
    }

    /// Delete each id independently; one miss never aborts the batch.
    pub fn delete_many<S: AsRef<str>>(&mut self, ids: &[S]) -> BatchResult {
        let mut result = BatchResult::default();
        for id in ids {
            let id = id.as_ref();
            if self.delete(id) {
                result.success.push(id.to_string());
            } else {
                result.failed.push(id.to_string());
            }
        }
        result
    }

    // ─── Workflow actions ─────────────────────────────────────────────

    pub fn approve(&mut self, document_id: &str, approver_id: &str, comments: Option<String>) -> bool {
        let Some(doc) = self.document_mut(document_id) else {
            log::warn!("approve: document {document_id} not found");
            return false;
        };
        let Some(workflow) = doc.approval_workflow.as_mut() else {
            log::warn!("approve: document {document_id} has no workflow");
            return false;
        };
        let outcome = match workflow.approve(approver_id, comments.clone()) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("approve refused on {document_id}: {e}");
                return false;
            }
        };

        let completed = outcome == ApprovalOutcome::WorkflowCompleted;
        if completed {
            doc.status = DocumentStatus::Approved;
        }
        doc.log_access(approver_id, AccessAction::Approve, comments);
        doc.touch(approver_id);
        log::info!("{approver_id} approved {document_id}: {outcome:?}");

        let event = ConsoleEvent::DocumentApproved {
            document_id: doc.id.clone(),
            document_name: doc.name.clone(),
            approver_id: approver_id.to_string(),
            workflow_completed: completed,
            timestamp: Utc::now(),
        };
        self.persist();
        self.events.publish(event);
        true
    }

    /// A rejection is terminal for the whole workflow.
    pub fn reject(&mut self, document_id: &str, approver_id: &str, comments: &str) -> bool {
        let Some(doc) = self.document_mut(document_id) else {
            log::warn!("reject: document {document_id} not found");
            return false;
        };
        let Some(workflow) = doc.approval_workflow.as_mut() else {
            log::warn!("reject: document {document_id} has no workflow");
            return false;
        };
        if let Err(e) = workflow.reject(approver_id, comments) {
            log::warn!("reject refused on {document_id}: {e}");
            return false;
        }

        doc.status = DocumentStatus::Rejected;
        doc.log_access(approver_id, AccessAction::Reject, Some(comments.to_string()));
        doc.touch(approver_id);
        log::info!("{approver_id} rejected {document_id}");

        let event = ConsoleEvent::DocumentRejected {
            document_id: doc.id.clone(),
            document_name: doc.name.clone(),
            approver_id: approver_id.to_string(),
            comments: comments.to_string(),
            timestamp: Utc::now(),
        };
        self.persist();
        self.events.publish(event);
        true
    }

    /// Attach `workflow` and move the document to `pending_review`.
    ///
    /// Refused while another workflow is still active, or when `workflow`
    /// itself has already finished.
    pub fn attach_workflow(&mut self, document_id: &str, workflow: ApprovalWorkflow) -> bool {
        if !workflow.is_active() {
            log::warn!(
                "attach_workflow: workflow {:?} is already {}",
                workflow.name,
                workflow.status
            );
            return false;
        }
        if let Err(e) = workflow.validate() {
            log::warn!("attaching workflow {:?} anyway: {e}", workflow.name);
        }
        let Some(doc) = self.document_mut(document_id) else {
            log::warn!("attach_workflow: document {document_id} not found");
            return false;
        };
        if doc.has_active_workflow() {
            log::warn!("attach_workflow: document {document_id} already has an active workflow");
            return false;
        }
        doc.approval_workflow = Some(workflow);
        doc.status = DocumentStatus::PendingReview;
        let modified_by = doc.last_modified_by.clone();
        doc.touch(&modified_by);
        self.persist();
        true
    }

    /// Cancel the active workflow and return the document to `draft`.
    pub fn cancel_workflow(&mut self, document_id: &str) -> bool {
        let Some(doc) = self.document_mut(document_id) else {
            log::warn!("cancel_workflow: document {document_id} not found");
            return false;
        };
        let Some(workflow) = doc.approval_workflow.as_mut() else {
            log::warn!("cancel_workflow: document {document_id} has no workflow");
            return false;
        };
        if let Err(e) = workflow.cancel() {
            log::warn!("cancel_workflow refused on {document_id}: {e}");
            return false;
        }
        doc.status = DocumentStatus::Draft;
        let modified_by = doc.last_modified_by.clone();
        doc.touch(&modified_by);
        self.persist();
        true
    }

    pub fn record_access(
        &mut self,
        document_id: &str,
        user_id: &str,
        action: AccessAction,
        details: Option<String>,
    ) -> bool {
        let Some(doc) = self.document_mut(document_id) else {
            log::warn!("record_access: document {document_id} not found");
            return false;
        };
        doc.log_access(user_id, action, details);
        self.persist();
        true
    }

    // ─── Templates ────────────────────────────────────────────────────

    pub fn templates(&self) -> &[DocumentTemplate] {
        &self.templates
    }

    pub fn template(&self, id: &str) -> Option<&DocumentTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn workflow_templates(&self) -> &[ApprovalWorkflow] {
        &self.workflow_templates
    }

    pub fn workflow_template(&self, name: &str) -> Option<&ApprovalWorkflow> {
        self.workflow_templates.iter().find(|w| w.name == name)
    }

    /// Render a template into a new document.
    ///
    /// The document enters `pending_review` with a fresh copy of the
    /// template's named workflow, or `draft` when it names none.
    pub fn create_from_template(
        &mut self,
        template_id: &str,
        variables: &BTreeMap<String, String>,
        created_by: &str,
    ) -> Option<Document> {
        let Some(template) = self.templates.iter_mut().find(|t| t.id == template_id) else {
            log::warn!("create_from_template: template {template_id} not found");
            return None;
        };
        template.usage_count += 1;
        let template = template.clone();

        let content = template.render(variables);
        let name = format!("{} {}", template.name, Utc::now().format("%Y-%m-%d"));
        let mut doc = Document::new(name, template.doc_type, template.category, created_by)
            .with_content(content)
            .with_mime_type("text/plain")
            .with_tags(template.tags.iter().cloned())
            .with_custom_field("generatedFrom", template.id.as_str());
        doc.description = Some(template.description.clone()).filter(|d| !d.is_empty());
        doc.template_id = Some(template.id.clone());

        let workflow = template.workflow_name.as_deref().and_then(|name| {
            let found = self.workflow_template(name).map(ApprovalWorkflow::instantiate);
            if found.is_none() {
                log::warn!("template {template_id} names unknown workflow {name:?}");
            }
            found
        });
        if let Some(workflow) = workflow {
            doc.approval_workflow = Some(workflow);
            doc.status = DocumentStatus::PendingReview;
        }

        Some(self.create(doc))
    }

    // ─── Folders ──────────────────────────────────────────────────────

    pub fn folders(&self) -> &[DocumentFolder] {
        &self.folders
    }

    /// `None` when `parent_id` names no existing folder.
    pub fn create_folder(
        &mut self,
        name: &str,
        parent_id: Option<&str>,
        created_by: &str,
    ) -> Option<DocumentFolder> {
        if let Some(parent) = parent_id {
            if !self.folders.iter().any(|f| f.id == parent) {
                log::warn!("create_folder: parent folder {parent} not found");
                return None;
            }
        }
        let folder = DocumentFolder::new(name, parent_id.map(str::to_string), created_by);
        self.folders.push(folder.clone());
        Some(folder)
    }

    pub fn documents_in_folder(&self, folder_id: &str) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|d| d.folder_id.as_deref() == Some(folder_id))
            .collect()
    }
}
