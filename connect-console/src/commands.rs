//! Command handlers for the CLI

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use connect_core::SearchQuery;
use connect_docs::{
    DocumentStore, MemoryRepository, PartnerUpload, RocksConfig, RocksRepository,
    SnapshotRepository, StoreConfig, SyncConfig, UnifiedSyncAdapter,
};
use serde_json::json;
use tokio::sync::RwLock;

use crate::Commands;

pub struct OpenOptions {
    pub data_dir: Option<PathBuf>,
    pub namespace: String,
    pub seed: u64,
    pub seed_documents: usize,
}

fn open_store(options: &OpenOptions) -> Result<DocumentStore> {
    let config = StoreConfig {
        seed: options.seed,
        seed_documents: options.seed_documents,
        ..StoreConfig::default()
    };
    let repository: Box<dyn SnapshotRepository> = match &options.data_dir {
        Some(dir) => {
            let rocks = RocksConfig {
                namespace: options.namespace.clone(),
                ..RocksConfig::new(dir)
            };
            Box::new(
                RocksRepository::open(rocks)
                    .with_context(|| format!("opening {}", dir.display()))?,
            )
        }
        None => Box::new(MemoryRepository::with_key(options.namespace.clone())),
    };
    Ok(DocumentStore::open(repository, config))
}

fn print(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse repeated `NAME=VALUE` arguments.
fn parse_vars(vars: &[String]) -> Result<BTreeMap<String, String>> {
    vars.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("expected NAME=VALUE, got {pair:?}"))
        })
        .collect()
}

fn outcome(ok: bool, what: &str, id: &str) -> Result<()> {
    if !ok {
        bail!("{what} failed for {id} (see log)");
    }
    Ok(())
}

pub async fn run(command: Commands, options: OpenOptions) -> Result<()> {
    let mut store = open_store(&options)?;

    match command {
        Commands::Search {
            query,
            types,
            categories,
            statuses,
            tags,
            sort,
            direction,
            offset,
            limit,
            full,
        } => {
            let query = SearchQuery {
                query,
                types: types.into_iter().collect(),
                categories: categories.into_iter().collect(),
                statuses: statuses.into_iter().collect(),
                tags: tags.into_iter().collect(),
                sort_by: sort,
                sort_direction: direction,
                offset,
                limit,
                ..SearchQuery::default()
            };
            let result = store.search(&query);
            if full {
                print(&result)?;
            } else {
                let rows: Vec<_> = result
                    .documents
                    .iter()
                    .map(|d| {
                        json!({
                            "id": d.id,
                            "name": d.name,
                            "type": d.doc_type,
                            "status": d.status,
                            "lastModified": d.last_modified,
                        })
                    })
                    .collect();
                print(&json!({ "total": result.total, "documents": rows }))?;
            }
        }
        Commands::Show { id } => {
            let doc = store.get(&id).ok_or_else(|| anyhow!("document {id} not found"))?;
            print(doc)?;
        }
        Commands::Approve { id, approver, comment } => {
            outcome(store.approve(&id, &approver, comment), "approve", &id)?;
            print(&store.get(&id))?;
        }
        Commands::Reject { id, approver, comment } => {
            outcome(store.reject(&id, &approver, &comment), "reject", &id)?;
            print(&store.get(&id))?;
        }
        Commands::Attach { id, workflow } => {
            let template = store
                .workflow_template(&workflow)
                .ok_or_else(|| anyhow!("unknown workflow template {workflow:?}"))?
                .instantiate();
            outcome(store.attach_workflow(&id, template), "attach", &id)?;
            print(&store.get(&id))?;
        }
        Commands::Cancel { id } => {
            outcome(store.cancel_workflow(&id), "cancel", &id)?;
            print(&store.get(&id))?;
        }
        Commands::Delete { ids } => {
            print(&store.delete_many(ids.as_slice()))?;
        }
        Commands::Pending { approver } => {
            let pending: Vec<_> = store
                .pending_approvals_for(&approver)
                .into_iter()
                .map(|d| json!({ "id": d.id, "name": d.name, "workflow": d.approval_workflow.as_ref().map(|w| &w.name) }))
                .collect();
            print(&pending)?;
        }
        Commands::Generate {
            template_id,
            vars,
            created_by,
            force,
        } => {
            let values = parse_vars(&vars)?;
            let template = store
                .template(&template_id)
                .ok_or_else(|| anyhow!("template {template_id} not found"))?;
            if !force {
                if let Err(violations) = template.validate(&values) {
                    let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
                    bail!("invalid variables: {}", messages.join("; "));
                }
            }
            let doc = store
                .create_from_template(&template_id, &values, &created_by)
                .ok_or_else(|| anyhow!("generation from {template_id} failed"))?;
            print(&doc)?;
        }
        Commands::Ingest { file, verify_after } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let upload: PartnerUpload = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;

            let events = store.events().clone();
            let catalog = Arc::new(RwLock::new(store));
            let adapter = UnifiedSyncAdapter::new(
                Arc::clone(&catalog),
                SyncConfig {
                    verify_delay: Some(Duration::from_secs(verify_after)),
                },
            )
            .with_events(events);

            let receipt = adapter.ingest(upload).await?;
            let verified = match receipt.verification {
                Some(handle) => handle.await.unwrap_or(false),
                None => false,
            };
            print(&json!({
                "document": receipt.document,
                "workflow": receipt.workflow,
                "verified": verified,
            }))?;

            drop(adapter);
            store = Arc::try_unwrap(catalog)
                .map_err(|_| anyhow!("store still shared after ingest"))?
                .into_inner();
        }
        Commands::Stats => print(&store.statistics())?,
        Commands::Templates => {
            print(&json!({
                "templates": store.templates(),
                "workflows": store.workflow_templates(),
            }))?;
        }
        Commands::Folders => print(&store.folders())?,
    }

    store.dispose();
    Ok(())
}
