// couchview example: design documents and cached view queries
// Run against a local CouchDB (COUCHDB_* variables override the defaults)
// - synchronizes a design document
// - saves a few documents in bulk
// - queries a view and revalidates it by ETag

use anyhow::{Context, Result};
use couchview_client::{CachedQuery, CouchDatabase, DesignDocSynchronizer, ServerConfig};
use couchview_core::{DesignDocument, GenericViewResult, JsonDocument};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    info!("Using CouchDB at {}", config.base_url());
    let db = CouchDatabase::connect(&config, "computers")?;

    let mut design = DesignDocument::new("computers");
    design.add_view("by_cpumake", "function(doc) { emit(doc.CPU, doc); }");
    let outcome = DesignDocSynchronizer::new(&db)
        .synch(&mut design)
        .await
        .context("Failed to synchronize design document")?;
    info!("Design document: {:?}", outcome);

    let mut docs: Vec<JsonDocument> = ["Intel", "AMD", "Via", "Sparq"]
        .iter()
        .map(|cpu| {
            let mut doc = JsonDocument::new();
            doc.insert("CPU", *cpu);
            doc
        })
        .collect();
    db.save_documents(&mut docs).await?;
    info!("Saved {} documents", docs.len());

    let mut query = CachedQuery::new(
        db.query("computers", "by_cpumake")
            .start_key("Intel")
            .end_key("Via")
            .check_etag_using_head(),
    );
    let rows = query.get_result(&db).await?.value_documents::<JsonDocument>()?;
    for doc in &rows {
        info!("  {:?} -> {:?}", doc.id, doc.get("CPU"));
    }

    info!("Cached and valid: {}", query.is_cached_and_valid(&db).await?);
    Ok(())
}
