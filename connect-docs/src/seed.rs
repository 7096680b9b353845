//! Synthetic dataset for a fresh or unreadable store.
//!
//! Everything random is drawn from a `StdRng` seeded by the caller, so the
//! same seed yields the same documents (ids included). Timestamps are offsets
//! back from the moment of generation.

use chrono::{Duration, Utc};
use connect_core::{
    AccessAction, ApprovalStep, ApprovalWorkflow, Document, DocumentCategory, DocumentFolder,
    DocumentStatus, DocumentTemplate, DocumentType, EscalationRule, TemplateVariable,
    ValidationRule, VariableKind,
};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

pub const NDA_WORKFLOW: &str = "NDA Quick Approval";
pub const PARTNERSHIP_WORKFLOW: &str = "Partnership Agreement Approval";
pub const CONTRACT_WORKFLOW: &str = "Standard Contract Review";

const PARTNERS: &[(&str, &str)] = &[
    ("partner-001", "Acme Payments"),
    ("partner-002", "Globex Remittance"),
    ("partner-003", "Initech Banking"),
    ("partner-004", "Umbrella FX"),
    ("partner-005", "Stark Fintech"),
    ("partner-006", "Wayne Transfers"),
];

const STAFF: &[&str] = &[
    "sarah.chen",
    "mike.johnson",
    "lisa.park",
    "david.kim",
    "emma.wilson",
    "legal.team",
];

/// (title, type, category, extension, mime type)
const KINDS: &[(&str, DocumentType, DocumentCategory, &str, &str)] = &[
    ("Mutual NDA", DocumentType::Nda, DocumentCategory::Legal, "pdf", "application/pdf"),
    ("Partnership Agreement", DocumentType::Contract, DocumentCategory::Partnership, "pdf", "application/pdf"),
    ("Master Services Agreement", DocumentType::Contract, DocumentCategory::Legal, "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("Integration Proposal", DocumentType::Proposal, DocumentCategory::Technical, "pdf", "application/pdf"),
    ("Quarterly Invoice", DocumentType::Invoice, DocumentCategory::Financial, "pdf", "application/pdf"),
    ("Compliance Report", DocumentType::Report, DocumentCategory::Compliance, "pdf", "application/pdf"),
    ("Pitch Deck", DocumentType::Presentation, DocumentCategory::Marketing, "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    ("Volume Forecast", DocumentType::Spreadsheet, DocumentCategory::Financial, "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("Brand Assets", DocumentType::Image, DocumentCategory::Marketing, "png", "image/png"),
    ("KYC Archive", DocumentType::Archive, DocumentCategory::Compliance, "zip", "application/zip"),
];

const TAGS: &[&str] = &[
    "urgent", "q3", "q4", "api", "payments", "remittance", "kyc", "renewal", "draft", "signed",
];

const STATUSES: &[DocumentStatus] = &[
    DocumentStatus::Draft,
    DocumentStatus::PendingReview,
    DocumentStatus::UnderReview,
    DocumentStatus::Approved,
    DocumentStatus::Published,
    DocumentStatus::Archived,
];

/// The named workflow templates cloned onto new documents.
pub fn default_workflow_templates() -> Vec<ApprovalWorkflow> {
    vec![
        ApprovalWorkflow::new(
            NDA_WORKFLOW,
            vec![ApprovalStep::new("Legal Review", ["legal.team", "sarah.chen"], 1)],
        )
        .with_description("Single legal sign-off for standard NDAs")
        .with_escalation(EscalationRule {
            trigger_after_hours: 24,
            escalate_to: vec!["legal.manager".to_string()],
            notify: true,
        }),
        ApprovalWorkflow::new(
            PARTNERSHIP_WORKFLOW,
            vec![
                ApprovalStep::new("Business Review", ["mike.johnson", "lisa.park"], 1),
                ApprovalStep::new("Legal Review", ["legal.team", "sarah.chen"], 1),
                ApprovalStep::new("Executive Sign-off", ["ceo", "cfo"], 1),
            ],
        )
        .with_description("Business, legal and executive approval for partner agreements")
        .with_escalation(EscalationRule {
            trigger_after_hours: 72,
            escalate_to: vec!["ceo".to_string()],
            notify: true,
        }),
        ApprovalWorkflow::new(
            CONTRACT_WORKFLOW,
            vec![
                ApprovalStep::new("Legal Review", ["legal.team", "sarah.chen", "david.kim"], 2),
                ApprovalStep::new("Finance Review", ["finance.team", "lisa.park"], 1),
            ],
        )
        .with_description("Two legal approvals followed by finance"),
    ]
}

/// Built-in document templates.
pub fn default_templates() -> Vec<DocumentTemplate> {
    vec![
        DocumentTemplate::new(
            "template-nda",
            "Mutual Non-Disclosure Agreement",
            DocumentType::Nda,
            DocumentCategory::Legal,
            "MUTUAL NON-DISCLOSURE AGREEMENT\n\n\
             This Agreement is entered into on {{effectiveDate}} between WorldAPI Inc. \
             and {{partyName}} ({{partyEmail}}).\n\n\
             Confidential information shall be protected for {{termYears}} years and \
             this Agreement is governed by the laws of {{jurisdiction}}.\n",
        )
        .with_variable(TemplateVariable::new("partyName", VariableKind::Text).label("Counterparty").required())
        .with_variable(TemplateVariable::new("partyEmail", VariableKind::Email).label("Counterparty email"))
        .with_variable(TemplateVariable::new("effectiveDate", VariableKind::Date).label("Effective date").required())
        .with_variable(
            TemplateVariable::new("termYears", VariableKind::Number)
                .label("Term (years)")
                .default_value("2")
                .validation(ValidationRule {
                    min: Some(1.0),
                    max: Some(10.0),
                    ..ValidationRule::default()
                }),
        )
        .with_variable(
            TemplateVariable::new("jurisdiction", VariableKind::Select)
                .label("Jurisdiction")
                .default_value("Delaware")
                .options(["Delaware", "New York", "California", "England and Wales"]),
        )
        .with_workflow(NDA_WORKFLOW)
        .with_tags(["nda", "legal"]),
        DocumentTemplate::new(
            "template-partnership",
            "Partnership Agreement",
            DocumentType::Contract,
            DocumentCategory::Partnership,
            "PARTNERSHIP AGREEMENT\n\n\
             WorldAPI Inc. and {{partnerName}} agree to a {{partnershipType}} partnership \
             starting {{startDate}}.\n\n\
             Revenue share: {{revenueShare}}% to the partner.\n",
        )
        .with_variable(TemplateVariable::new("partnerName", VariableKind::Text).label("Partner").required())
        .with_variable(
            TemplateVariable::new("partnershipType", VariableKind::Select)
                .label("Partnership type")
                .default_value("referral")
                .options(["referral", "reseller", "technology", "strategic"]),
        )
        .with_variable(TemplateVariable::new("startDate", VariableKind::Date).label("Start date").required())
        .with_variable(
            TemplateVariable::new("revenueShare", VariableKind::Number)
                .label("Revenue share (%)")
                .default_value("10")
                .validation(ValidationRule {
                    min: Some(0.0),
                    max: Some(100.0),
                    ..ValidationRule::default()
                }),
        )
        .with_workflow(PARTNERSHIP_WORKFLOW)
        .with_tags(["partnership", "contract"]),
        DocumentTemplate::new(
            "template-proposal",
            "Integration Proposal",
            DocumentType::Proposal,
            DocumentCategory::Technical,
            "INTEGRATION PROPOSAL: {{projectName}}\n\n\
             Prepared for {{clientName}}.\n\
             Estimated budget: ${{budget}}.\n\n{{summary}}\n",
        )
        .with_variable(TemplateVariable::new("clientName", VariableKind::Text).label("Client").required())
        .with_variable(
            TemplateVariable::new("projectName", VariableKind::Text)
                .label("Project")
                .required()
                .validation(ValidationRule {
                    min_length: Some(3),
                    max_length: Some(80),
                    ..ValidationRule::default()
                }),
        )
        .with_variable(TemplateVariable::new("budget", VariableKind::Number).label("Budget (USD)"))
        .with_variable(TemplateVariable::new("summary", VariableKind::Text).label("Summary"))
        .with_tags(["proposal"]),
    ]
}

/// Root folders plus a contracts folder under Legal.
pub fn default_folders() -> Vec<DocumentFolder> {
    let folder = |id: &str, name: &str, parent: Option<&str>| DocumentFolder {
        id: id.to_string(),
        parent_id: parent.map(str::to_string),
        ..DocumentFolder::new(name, None, "system")
    };
    vec![
        folder("folder-legal", "Legal", None),
        folder("folder-contracts", "Contracts", Some("folder-legal")),
        folder("folder-partnerships", "Partnerships", None),
        folder("folder-finance", "Finance", None),
        folder("folder-marketing", "Marketing", None),
    ]
}

fn folder_for(category: DocumentCategory, doc_type: DocumentType) -> Option<&'static str> {
    match (category, doc_type) {
        (_, DocumentType::Contract) if category != DocumentCategory::Partnership => Some("folder-contracts"),
        (DocumentCategory::Legal | DocumentCategory::Compliance, _) => Some("folder-legal"),
        (DocumentCategory::Partnership, _) => Some("folder-partnerships"),
        (DocumentCategory::Financial, _) => Some("folder-finance"),
        (DocumentCategory::Marketing, _) => Some("folder-marketing"),
        _ => None,
    }
}

/// Workflow template that fits a generated document, if any.
fn workflow_for(doc_type: DocumentType, category: DocumentCategory) -> Option<&'static str> {
    match (doc_type, category) {
        (DocumentType::Nda, _) => Some(NDA_WORKFLOW),
        (DocumentType::Contract, DocumentCategory::Partnership) => Some(PARTNERSHIP_WORKFLOW),
        (DocumentType::Contract, _) => Some(CONTRACT_WORKFLOW),
        _ => None,
    }
}

/// Generate `count` documents, newest first.
pub fn generate_documents(count: usize, seed: u64) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(seed);
    let workflows = default_workflow_templates();
    let now = Utc::now();

    let mut documents: Vec<Document> = (0..count)
        .map(|i| {
            let &(title, doc_type, category, ext, mime) = KINDS.choose(&mut rng).unwrap_or(&KINDS[0]);
            let &(partner_id, partner_name) = PARTNERS.choose(&mut rng).unwrap_or(&PARTNERS[0]);
            let uploader = *STAFF.choose(&mut rng).unwrap_or(&STAFF[0]);
            let editor = *STAFF.choose(&mut rng).unwrap_or(&STAFF[0]);

            let age = Duration::minutes(rng.random_range(60..180 * 24 * 60));
            let edit_after = Duration::minutes(rng.random_range(0..=age.num_minutes()));
            let uploaded_at = now - age;

            let mut doc = Document::new(
                format!("{partner_name} {title} {}.{ext}", 2024 + (i % 3)),
                doc_type,
                category,
                uploader,
            );
            doc.id = Uuid::from_u128(rng.random()).to_string();
            doc = doc
                .with_size(rng.random_range(8 * 1024..12 * 1024 * 1024))
                .with_mime_type(mime)
                .with_custom_field("partnerId", partner_id)
                .with_custom_field("partnerName", partner_name)
                .with_custom_field("source", "seed");
            doc.description = Some(format!("{title} for {partner_name}"));
            doc.uploaded_at = uploaded_at;
            doc.last_modified = uploaded_at + edit_after;
            doc.last_modified_by = editor.to_string();
            doc.folder_id = folder_for(category, doc_type).map(str::to_string);

            let tag_count = rng.random_range(1..=3);
            doc.tags = TAGS
                .choose_multiple(&mut rng, tag_count)
                .map(|t| t.to_string())
                .collect();

            doc.status = *STATUSES.choose(&mut rng).unwrap_or(&DocumentStatus::Draft);
            if doc.status == DocumentStatus::PendingReview {
                let template = workflow_for(doc_type, category)
                    .and_then(|name| workflows.iter().find(|w| w.name == name));
                match template {
                    Some(template) => doc.approval_workflow = Some(template.instantiate()),
                    None => doc.status = DocumentStatus::UnderReview,
                }
            }

            for _ in 0..rng.random_range(0..3) {
                let viewer = *STAFF.choose(&mut rng).unwrap_or(&STAFF[0]);
                doc.log_access(viewer, AccessAction::View, None);
            }
            doc
        })
        .collect();

    documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    documents
}
