//! # connect-core: Document domain for the WorldAPI Connect console
//!
//! Pure domain logic with no I/O: the document model, the multi-step approval
//! workflow state machine, the placeholder template engine and the
//! search/filter/facet engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   render    ┌──────────────┐
//! │ Template     │ ──────────► │ Document     │ ◄── search()/facets
//! │ (variables)  │             │ (model)      │
//! └──────────────┘             └──────┬───────┘
//!                                     │ owns 0..1
//!                                     ▼
//!                              ┌──────────────┐
//!                              │ Approval     │  steps × quorum
//!                              │ Workflow     │
//!                              └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`model`]: Document records, enums, access log, version history, patches
//! - [`workflow`]: Approval workflow and step state machines
//! - [`template`]: `{{name}}` placeholder expansion and caller-side validation
//! - [`search`]: Query, filter, sort, paginate and facet over a document slice

/// Implements wire names, `Display` and `FromStr` for a fieldless enum.
///
/// Wire names double as the serde representation so the persisted JSON and
/// the console arguments agree. Callers need `serde` as a dependency.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err($crate::ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod model;
pub mod search;
pub mod template;
pub mod workflow;

/// Error returned when a string does not name a variant of a domain enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

// Re-exports for convenience
pub use model::{
    content_checksum, AccessAction, AccessLogEntry, Document, DocumentCategory, DocumentFolder,
    DocumentPatch, DocumentStatus, DocumentType, DocumentVersion,
};
pub use search::{
    search, DateRange, Facets, SearchQuery, SearchResult, SortDirection, SortField,
    SEARCHABLE_CUSTOM_FIELDS,
};
pub use template::{
    DocumentTemplate, TemplateVariable, ValidationRule, VariableKind, VariableViolation,
};
pub use workflow::{
    ApprovalAction, ApprovalOutcome, ApprovalStep, ApprovalWorkflow, EscalationRule, StepStatus,
    WorkflowError, WorkflowStatus,
};
