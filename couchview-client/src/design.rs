use crate::database::CouchDatabase;
use couchview_core::{ComparisonScope, CouchResult, DesignDocument};
use couchview_transport::CouchTransport;
use tracing::{debug, info};

/// What a synchronization did to the server copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchOutcome {
    /// No server copy existed; the local document was written.
    Created,
    /// The server copy already matched; nothing was written.
    Unchanged,
    /// The server copy differed and was replaced.
    Overwritten,
}

/// Reconciles local design documents with the server.
#[derive(Debug)]
pub struct DesignDocSynchronizer<'a, T> {
    db: &'a CouchDatabase<T>,
    scope: ComparisonScope,
}

impl<'a, T: CouchTransport> DesignDocSynchronizer<'a, T> {
    /// Compares views only.
    pub fn new(db: &'a CouchDatabase<T>) -> Self {
        Self {
            db,
            scope: ComparisonScope::VIEWS_ONLY,
        }
    }

    pub fn with_scope(mut self, scope: ComparisonScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> ComparisonScope {
        self.scope
    }

    /// Make the server copy match `local`. On return `local` carries the
    /// server's current revision. A concurrent update between read and
    /// write surfaces as `Conflict`.
    pub async fn synch(&self, local: &mut DesignDocument) -> CouchResult<SynchOutcome> {
        if !self.db.has_document(&local.id).await? {
            info!("Creating design document {}", local.id);
            self.db.write_document(local).await?;
            return Ok(SynchOutcome::Created);
        }

        let remote: DesignDocument = self.db.get_document(&local.id).await?;
        local.rev = remote.rev.clone();
        if local.matches(&remote, self.scope) {
            debug!("Design document {} is up to date", local.id);
            return Ok(SynchOutcome::Unchanged);
        }

        info!(
            "Overwriting design document {} (rev {})",
            local.id,
            local.rev.as_deref().unwrap_or("none")
        );
        self.db.write_document(local).await?;
        Ok(SynchOutcome::Overwritten)
    }

    /// [`synch`](Self::synch) each document in order, stopping at the
    /// first error.
    pub async fn synch_all(&self, docs: &mut [DesignDocument]) -> CouchResult<Vec<SynchOutcome>> {
        let mut outcomes = Vec::with_capacity(docs.len());
        for doc in docs.iter_mut() {
            outcomes.push(self.synch(doc).await?);
        }
        Ok(outcomes)
    }
}
