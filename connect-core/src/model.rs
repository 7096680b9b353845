//! Document records and their bookkeeping.
//!
//! Field names serialize in camelCase and enum values in snake_case, which is
//! the layout of the persisted snapshot blob. Timestamps are RFC 3339 strings
//! on the wire and `DateTime<Utc>` in memory.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::workflow::{ApprovalWorkflow, WorkflowStatus};

wire_enum! {
    /// What kind of file a document is.
    pub enum DocumentType {
        Contract => "contract",
        Nda => "nda",
        Proposal => "proposal",
        Invoice => "invoice",
        Report => "report",
        Presentation => "presentation",
        Spreadsheet => "spreadsheet",
        Image => "image",
        Video => "video",
        Audio => "audio",
        Archive => "archive",
        Other => "other",
    }
}

wire_enum! {
    /// Business area a document belongs to.
    pub enum DocumentCategory {
        Legal => "legal",
        Financial => "financial",
        Technical => "technical",
        Marketing => "marketing",
        Hr => "hr",
        Compliance => "compliance",
        Partnership => "partnership",
        Internal => "internal",
        External => "external",
    }
}

wire_enum! {
    /// Lifecycle state of a document.
    pub enum DocumentStatus {
        Draft => "draft",
        PendingReview => "pending_review",
        UnderReview => "under_review",
        Approved => "approved",
        Rejected => "rejected",
        Published => "published",
        Archived => "archived",
        Expired => "expired",
        Deleted => "deleted",
    }
}

wire_enum! {
    /// What a user did with a document.
    pub enum AccessAction {
        View => "view",
        Download => "download",
        Edit => "edit",
        Share => "share",
        Approve => "approve",
        Reject => "reject",
        Comment => "comment",
    }
}

impl DocumentType {
    /// Best-effort classification from a file name and MIME type.
    pub fn infer(file_name: &str, mime_type: &str) -> Self {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "ppt" | "pptx" | "key" | "odp" => return DocumentType::Presentation,
            "xls" | "xlsx" | "csv" | "ods" | "numbers" => return DocumentType::Spreadsheet,
            "zip" | "tar" | "gz" | "7z" | "rar" => return DocumentType::Archive,
            _ => {}
        }
        let mime = mime_type.to_ascii_lowercase();
        if mime.starts_with("image/") {
            DocumentType::Image
        } else if mime.starts_with("video/") {
            DocumentType::Video
        } else if mime.starts_with("audio/") {
            DocumentType::Audio
        } else {
            DocumentType::Other
        }
    }
}

/// SHA-256 digest of `bytes`, lowercase hex.
pub fn content_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Display-only checksum for records without a content body.
///
/// Derived from identity fields, so it proves nothing about file contents.
fn record_checksum(id: &str, name: &str, size: u64) -> String {
    content_checksum(format!("{id}:{name}:{size}").as_bytes())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub id: String,
    pub user_id: String,
    pub action: AccessAction,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// One entry in a document's version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub version: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    pub size: u64,
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<String>,
}

/// Organizational container. Not consulted by the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFolder {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl DocumentFolder {
    pub fn new(name: impl Into<String>, parent_id: Option<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            parent_id,
            description: None,
            created_at: Utc::now(),
            created_by: created_by.into(),
        }
    }
}

/// A managed file or record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub category: DocumentCategory,
    pub status: DocumentStatus,
    pub version: String,
    pub size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    pub last_modified: DateTime<Utc>,
    pub last_modified_by: String,
    pub checksum: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, Value>,
    /// Newest first.
    #[serde(default)]
    pub access_log: Vec<AccessLogEntry>,
    #[serde(default)]
    pub version_history: Vec<DocumentVersion>,
    #[serde(default)]
    pub related_documents: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_workflow: Option<ApprovalWorkflow>,
}

impl Document {
    /// Create a draft document with a fresh id and no content.
    pub fn new(
        name: impl Into<String>,
        doc_type: DocumentType,
        category: DocumentCategory,
        uploaded_by: impl Into<String>,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        let name = name.into();
        let uploaded_by = uploaded_by.into();
        let now = Utc::now();
        let checksum = record_checksum(&id, &name, 0);
        Self {
            id,
            name,
            description: None,
            content: None,
            doc_type,
            category,
            status: DocumentStatus::Draft,
            version: "1.0".to_string(),
            size: 0,
            mime_type: "application/octet-stream".to_string(),
            uploaded_at: now,
            uploaded_by: uploaded_by.clone(),
            last_modified: now,
            last_modified_by: uploaded_by,
            checksum,
            tags: BTreeSet::new(),
            custom_fields: BTreeMap::new(),
            access_log: Vec::new(),
            version_history: Vec::new(),
            related_documents: BTreeSet::new(),
            folder_id: None,
            template_id: None,
            approval_workflow: None,
        }
    }

    /// Attach a text body; size and checksum follow the content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.set_content(content.into());
        self
    }

    /// Declare a size for a record whose bytes live elsewhere.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        if self.content.is_none() {
            self.checksum = record_checksum(&self.id, &self.name, size);
        }
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(key.into(), value.into());
        self
    }

    fn set_content(&mut self, content: String) {
        self.size = content.len() as u64;
        self.checksum = content_checksum(content.as_bytes());
        self.content = Some(content);
    }

    /// True while the attached workflow can still accept actions.
    pub fn has_active_workflow(&self) -> bool {
        self.approval_workflow
            .as_ref()
            .is_some_and(ApprovalWorkflow::is_active)
    }

    pub fn touch(&mut self, modified_by: &str) {
        self.last_modified = Utc::now();
        self.last_modified_by = modified_by.to_string();
    }

    /// Prepend an access log entry.
    pub fn log_access(&mut self, user_id: &str, action: AccessAction, details: Option<String>) {
        let entry = AccessLogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            action,
            timestamp: Utc::now(),
            details,
        };
        self.access_log.insert(0, entry);
    }

    /// Shallow-merge the fields present in `patch`.
    ///
    /// A status that contradicts a finished workflow is dropped: a completed
    /// workflow pins the document to `approved`, a rejected one to `rejected`.
    /// Returns `false` when such a status was dropped.
    pub fn apply_patch(&mut self, patch: DocumentPatch) -> bool {
        let mut honored = true;
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(content) = patch.content {
            self.set_content(content);
        }
        if let Some(doc_type) = patch.doc_type {
            self.doc_type = doc_type;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(status) = patch.status {
            match self.pinned_status() {
                Some(pinned) if pinned != status => honored = false,
                _ => self.status = status,
            }
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(custom_fields) = patch.custom_fields {
            self.custom_fields = custom_fields;
        }
        if let Some(related) = patch.related_documents {
            self.related_documents = related;
        }
        if let Some(folder_id) = patch.folder_id {
            self.folder_id = Some(folder_id);
        }

        let modified_by = patch
            .modified_by
            .unwrap_or_else(|| self.last_modified_by.clone());
        self.touch(&modified_by);

        if let Some(version) = patch.version {
            if version != self.version {
                self.version = version.clone();
                self.version_history.push(DocumentVersion {
                    version,
                    uploaded_at: self.last_modified,
                    uploaded_by: modified_by,
                    size: self.size,
                    checksum: self.checksum.clone(),
                    changes: patch.change_summary,
                });
            }
        }
        honored
    }

    fn pinned_status(&self) -> Option<DocumentStatus> {
        match self.approval_workflow.as_ref().map(|w| w.status) {
            Some(WorkflowStatus::Completed) => Some(DocumentStatus::Approved),
            Some(WorkflowStatus::Rejected) => Some(DocumentStatus::Rejected),
            _ => None,
        }
    }

    /// String value of a custom field, if it holds one.
    pub fn custom_str(&self, key: &str) -> Option<&str> {
        self.custom_fields.get(key).and_then(Value::as_str)
    }
}

/// Partial update for [`Document::apply_patch`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<DocumentType>,
    pub category: Option<DocumentCategory>,
    pub status: Option<DocumentStatus>,
    pub version: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub custom_fields: Option<BTreeMap<String, Value>>,
    pub related_documents: Option<BTreeSet<String>>,
    pub folder_id: Option<String>,
    pub modified_by: Option<String>,
    /// Recorded in version history when `version` changes.
    pub change_summary: Option<String>,
}
