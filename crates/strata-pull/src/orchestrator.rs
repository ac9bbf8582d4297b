//! Drives one pull: resolve, fetch, verify, commit.

use std::sync::Arc;

use strata_refs::{validate_remote_name, CommitLock, Ref, RefStore, RefUpdate};
use strata_store::ObjectStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::{PullError, PullResult};
use crate::fetcher::ObjectFetcher;
use crate::options::PullConfig;
use crate::resolver::resolve_refs;
use crate::transaction::Transaction;
use crate::transport::RemoteTransport;
use crate::types::{PullReport, PullRequest, RefChange};
use crate::verifier::Verifier;

/// Pull engine bound to one local repository.
///
/// Cloning shares the stores and the commit lock, so concurrent pulls through
/// clones serialize their commit phase.
#[derive(Clone)]
pub struct Puller {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    commit_lock: Arc<CommitLock>,
    config: PullConfig,
}

impl Puller {
    pub fn new(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self {
            objects,
            refs,
            commit_lock: Arc::new(CommitLock::new()),
            config: PullConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PullConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a commit lock with other writers of the same repository.
    ///
    /// The default lock only serializes clones of this `Puller`.
    pub fn with_commit_lock(mut self, lock: Arc<CommitLock>) -> Self {
        self.commit_lock = lock;
        self
    }

    pub fn config(&self) -> &PullConfig {
        &self.config
    }

    /// Run `request` against `transport`.
    ///
    /// Either every resolved ref is updated together with all objects it
    /// needs, or nothing in the repository changes and the first error is
    /// returned. The `old` values planned here are only a first guess; the
    /// commit re-reads each ref under the commit lock.
    #[instrument(skip_all, fields(remote = %request.remote, source = %transport.describe()))]
    pub async fn pull(
        &self,
        transport: &dyn RemoteTransport,
        request: &PullRequest,
    ) -> PullResult<PullReport> {
        let options = request.options;
        if !options.mirror {
            validate_remote_name(&request.remote)
                .map_err(|e| PullError::InvalidRequest(e.to_string()))?;
        }

        let targets = resolve_refs(transport, &request.remote, &request.refs, &options).await?;
        if targets.is_empty() {
            info!("nothing to pull");
            return Ok(PullReport::empty(&request.remote));
        }
        info!(refs = targets.len(), "resolved refs");

        let mut updates = Vec::with_capacity(targets.len());
        for (name, commit) in &targets {
            let local = if options.mirror {
                Ref::branch(name.clone(), *commit)
            } else {
                Ref::remote(request.remote.clone(), name.clone(), *commit)
            };
            let old = self.refs.resolve(&local.canonical_name())?;
            updates.push(RefUpdate::new(local, old));
        }

        let verifier = Verifier::new(transport.source_kind(), &options);
        let mut fetcher = ObjectFetcher::new(
            transport,
            self.objects.as_ref(),
            verifier,
            options.commit_only,
            self.config.max_concurrent_fetches,
        );
        for commit in targets.values() {
            fetcher.add_commit(*commit)?;
        }

        let mut tx = Transaction::begin(self.objects.as_ref(), self.refs.as_ref())?;
        while let Some(fetched) = fetcher.next().await? {
            tx.stage(&fetched)?;
        }
        let stats = fetcher.stats();
        info!(
            fetched = stats.objects_fetched,
            bytes = stats.bytes_fetched,
            skipped = stats.objects_skipped,
            "objects staged"
        );

        for (commit, partial) in fetcher.partial_markers() {
            tx.set_partial(*commit, *partial);
        }
        for update in updates {
            tx.update_ref(update);
        }
        let outcome = tx.commit(&self.commit_lock)?;

        Ok(PullReport {
            remote: request.remote.clone(),
            refs_updated: outcome
                .refs_updated
                .iter()
                .map(|u| RefChange {
                    name: u.name(),
                    old: u.old,
                    new: u.new_commit(),
                })
                .collect(),
            stats,
            objects_written: outcome.objects_written,
        })
    }

    /// Like [`pull`](Self::pull), but abandons the pull when `cancel` fires.
    ///
    /// Cancellation is only observed between steps; the commit itself is not
    /// interruptible, so a cancelled pull leaves the repository unchanged.
    pub async fn pull_with_cancel(
        &self,
        transport: &dyn RemoteTransport,
        request: &PullRequest,
        cancel: &CancellationToken,
    ) -> PullResult<PullReport> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(remote = %request.remote, "pull cancelled");
                Err(PullError::Cancelled)
            }
            result = self.pull(transport, request) => result,
        }
    }
}

impl std::fmt::Debug for Puller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Puller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
