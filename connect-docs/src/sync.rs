//! Unified sync adapter: partner onboarding uploads into the document store.
//!
//! The adapter only sees the store through [`DocumentCatalog`], so it can run
//! against any catalog (tests use the real store over a memory repository).
//!
//! ```text
//! PartnerUpload ──► resolve workflow hint ──► Document ──► catalog.create_document
//!                                                     └──► onboarding_status_update
//!                                                     └──► (delay) verify by search
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use connect_core::{
    ApprovalWorkflow, Document, DocumentCategory, DocumentStatus, DocumentType, SearchQuery,
    SearchResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::events::{ConsoleEvent, EventBus};
use crate::seed::{NDA_WORKFLOW, PARTNERSHIP_WORKFLOW};
use crate::store::DocumentStore;

/// What the adapter needs from a document store.
pub trait DocumentCatalog: Send + Sync {
    fn create_document(&mut self, document: Document) -> Document;
    fn search_documents(&self, query: &SearchQuery) -> SearchResult;
    fn workflow_templates(&self) -> &[ApprovalWorkflow];
}

impl DocumentCatalog for DocumentStore {
    fn create_document(&mut self, document: Document) -> Document {
        self.create(document)
    }

    fn search_documents(&self, query: &SearchQuery) -> SearchResult {
        self.search(query)
    }

    fn workflow_templates(&self) -> &[ApprovalWorkflow] {
        DocumentStore::workflow_templates(self)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("upload has no file name")]
    EmptyFileName,
    #[error("upload has no partner id")]
    MissingPartner,
}

/// An upload event from the partner onboarding flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerUpload {
    pub file_name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content: Option<String>,
    pub partner_id: String,
    #[serde(default)]
    pub partner_name: String,
    pub uploaded_by: String,
    /// "nda", "partnership" or an exact workflow template name
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(default)]
    pub category: Option<DocumentCategory>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay before the diagnostic re-query; `None` skips it (default: 1s)
    pub verify_delay: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            verify_delay: Some(Duration::from_secs(1)),
        }
    }
}

/// Result of a successful ingest.
#[derive(Debug)]
pub struct SyncReceipt {
    pub document: Document,
    /// Name of the attached workflow template, if any
    pub workflow: Option<String>,
    /// Resolves to whether the delayed re-query found the document
    pub verification: Option<JoinHandle<bool>>,
}

/// Map a workflow hint to a template name.
pub fn resolve_workflow_name(hint: &str) -> &str {
    if hint.eq_ignore_ascii_case("nda") {
        NDA_WORKFLOW
    } else if hint.eq_ignore_ascii_case("partnership") {
        PARTNERSHIP_WORKFLOW
    } else {
        hint
    }
}

pub struct UnifiedSyncAdapter<C> {
    catalog: Arc<RwLock<C>>,
    events: Option<EventBus>,
    config: SyncConfig,
}

impl<C: DocumentCatalog + 'static> UnifiedSyncAdapter<C> {
    pub fn new(catalog: Arc<RwLock<C>>, config: SyncConfig) -> Self {
        Self {
            catalog,
            events: None,
            config,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn catalog(&self) -> &Arc<RwLock<C>> {
        &self.catalog
    }

    fn build_document(upload: &PartnerUpload, workflow: Option<ApprovalWorkflow>) -> Document {
        let hint = upload.workflow_type.as_deref().map(resolve_workflow_name);
        let doc_type = match hint {
            Some(NDA_WORKFLOW) => DocumentType::Nda,
            Some(PARTNERSHIP_WORKFLOW) => DocumentType::Contract,
            _ => DocumentType::infer(&upload.file_name, &upload.mime_type),
        };
        let category = upload.category.unwrap_or(match hint {
            Some(NDA_WORKFLOW) => DocumentCategory::Legal,
            Some(PARTNERSHIP_WORKFLOW) => DocumentCategory::Partnership,
            _ => DocumentCategory::External,
        });
        let mime_type = if upload.mime_type.is_empty() {
            "application/octet-stream"
        } else {
            upload.mime_type.as_str()
        };

        let mut doc = Document::new(&upload.file_name, doc_type, category, &upload.uploaded_by)
            .with_mime_type(mime_type)
            .with_tags(upload.tags.iter().cloned())
            .with_tags(["onboarding"])
            .with_custom_field("partnerId", upload.partner_id.as_str())
            .with_custom_field("partnerName", upload.partner_name.as_str())
            .with_custom_field("source", "partner_onboarding");
        doc = match &upload.content {
            Some(content) => doc.with_content(content.as_str()),
            None => doc.with_size(upload.size),
        };
        if let Some(hint) = &upload.workflow_type {
            doc = doc.with_custom_field("workflowType", hint.as_str());
        }
        doc.description = Some(format!("Uploaded by {} during onboarding", upload.partner_name));

        if let Some(workflow) = workflow {
            doc.approval_workflow = Some(workflow);
            doc.status = DocumentStatus::PendingReview;
        }
        doc
    }

    /// Turn an upload into a document, attach its workflow and store it.
    pub async fn ingest(&self, upload: PartnerUpload) -> Result<SyncReceipt, SyncError> {
        if upload.file_name.trim().is_empty() {
            return Err(SyncError::EmptyFileName);
        }
        if upload.partner_id.trim().is_empty() {
            return Err(SyncError::MissingPartner);
        }

        let mut catalog = self.catalog.write().await;
        let workflow = upload.workflow_type.as_deref().and_then(|hint| {
            let name = resolve_workflow_name(hint);
            let found = catalog
                .workflow_templates()
                .iter()
                .find(|w| w.name == name)
                .map(ApprovalWorkflow::instantiate);
            if found.is_none() {
                log::warn!("no workflow template matches hint {hint:?}, storing without one");
            }
            found
        });
        let workflow_name = workflow.as_ref().map(|w| w.name.clone());

        let document = catalog.create_document(Self::build_document(&upload, workflow));
        drop(catalog);

        log::info!(
            "ingested {} for partner {} as {} ({})",
            upload.file_name,
            upload.partner_id,
            document.id,
            document.status
        );

        if let Some(events) = &self.events {
            events.publish(ConsoleEvent::OnboardingStatusUpdate {
                partner_id: upload.partner_id.clone(),
                partner_name: upload.partner_name.clone(),
                document_id: document.id.clone(),
                status: document.status.to_string(),
                workflow: workflow_name.clone(),
                timestamp: Utc::now(),
            });
        }

        let verification = self
            .config
            .verify_delay
            .map(|delay| self.spawn_verification(document.id.clone(), delay));

        Ok(SyncReceipt {
            document,
            workflow: workflow_name,
            verification,
        })
    }

    /// Re-query the catalog for `document_id`. Changes nothing.
    pub async fn verify(&self, document_id: &str) -> bool {
        verify_in(&self.catalog, document_id).await
    }

    fn spawn_verification(&self, document_id: String, delay: Duration) -> JoinHandle<bool> {
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            verify_in(&catalog, &document_id).await
        })
    }
}

async fn verify_in<C: DocumentCatalog>(catalog: &RwLock<C>, document_id: &str) -> bool {
    let catalog = catalog.read().await;
    let result = catalog.search_documents(&SearchQuery::text(document_id));
    let found = result.documents.iter().any(|d| d.id == document_id);
    if found {
        log::info!("verified synced document {document_id}");
    } else {
        log::warn!("synced document {document_id} not found on re-query");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_workflow_name() {
        assert_eq!(resolve_workflow_name("nda"), NDA_WORKFLOW);
        assert_eq!(resolve_workflow_name("NDA"), NDA_WORKFLOW);
        assert_eq!(resolve_workflow_name("partnership"), PARTNERSHIP_WORKFLOW);
        assert_eq!(resolve_workflow_name("Standard Contract Review"), "Standard Contract Review");
    }

    #[test]
    fn test_build_document_from_nda_hint() {
        let upload = PartnerUpload {
            file_name: "acme-nda.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 2048,
            content: None,
            partner_id: "p-1".into(),
            partner_name: "Acme".into(),
            uploaded_by: "acme.admin".into(),
            workflow_type: Some("nda".into()),
            category: None,
            tags: vec!["kyc".into()],
        };
        let doc = UnifiedSyncAdapter::<DocumentStore>::build_document(&upload, None);
        assert_eq!(doc.doc_type, DocumentType::Nda);
        assert_eq!(doc.category, DocumentCategory::Legal);
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.size, 2048);
        assert_eq!(doc.custom_str("partnerId"), Some("p-1"));
        assert!(doc.tags.contains("onboarding") && doc.tags.contains("kyc"));
    }

    #[test]
    fn test_upload_deserializes_from_camel_case() {
        let upload: PartnerUpload = serde_json::from_str(
            r#"{"fileName":"deck.pptx","partnerId":"p-9","uploadedBy":"u","workflowType":"partnership","category":"marketing"}"#,
        )
        .unwrap();
        assert_eq!(upload.workflow_type.as_deref(), Some("partnership"));
        assert_eq!(upload.category, Some(DocumentCategory::Marketing));
        assert!(upload.tags.is_empty());
    }
}
