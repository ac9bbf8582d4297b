use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use strata_pull::{
    open_transport, PullOptions, PullReport, PullRequest, Puller, RemoteTransport,
    RetryingTransport,
};
use strata_refs::{
    validate_remote_name, CommitLock, FsRefStore, Ref, RefStore, RefUpdate, COMMIT_LOCK_FILE,
    HEADS_PREFIX, REMOTES_PREFIX,
};
use strata_store::{Commit, FsObjectStore, ObjectStore, StoreError};
use strata_types::ObjectId;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{RemoteConfig, RepoConfig};
use crate::error::{SdkError, SdkResult};
use crate::import::import_directory;

/// An on-disk Strata repository.
pub struct Repo {
    root: PathBuf,
    objects: Arc<FsObjectStore>,
    refs: Arc<FsRefStore>,
    config: RepoConfig,
    commit_lock: Arc<CommitLock>,
}

impl Repo {
    /// Create a repository at `root` (or adopt an existing one).
    pub fn init(root: impl AsRef<Path>) -> SdkResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        FsObjectStore::init(root)?;
        let config = RepoConfig::load(root)?;
        config.save(root)?;
        info!(path = %root.display(), "initialized repository");
        Self::open(root)
    }

    /// Open the repository at `root`.
    pub fn open(root: impl AsRef<Path>) -> SdkResult<Self> {
        let root = root.as_ref().to_path_buf();
        let objects = FsObjectStore::open(&root).map_err(|e| match e {
            StoreError::NotARepository(path) => SdkError::NotInitialized(path),
            other => other.into(),
        })?;
        let config = RepoConfig::load(&root)?;
        Ok(Self {
            refs: Arc::new(FsRefStore::open(&root)),
            objects: Arc::new(objects),
            config,
            commit_lock: Arc::new(CommitLock::with_file(root.join(COMMIT_LOCK_FILE))),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn objects(&self) -> &FsObjectStore {
        &self.objects
    }

    pub fn refs(&self) -> &FsRefStore {
        &self.refs
    }

    // ---- Remotes ----

    /// Register a remote and persist it to `config.toml`.
    pub fn add_remote(&mut self, name: &str, url: &str) -> SdkResult<()> {
        validate_remote_name(name)?;
        if self.config.remotes.contains_key(name) {
            return Err(SdkError::RemoteExists(name.to_string()));
        }
        self.config.remotes.insert(
            name.to_string(),
            RemoteConfig {
                url: url.to_string(),
            },
        );
        self.config.save(&self.root)?;
        info!(remote = name, url, "added remote");
        Ok(())
    }

    /// Forget a remote and delete its tracking refs.
    pub fn remove_remote(&mut self, name: &str) -> SdkResult<()> {
        if self.config.remotes.remove(name).is_none() {
            return Err(SdkError::RemoteNotFound(name.to_string()));
        }
        self.config.save(&self.root)?;
        for tracking in self.refs.remote_refs(name)? {
            self.refs.delete_ref(&tracking.canonical_name())?;
        }
        Ok(())
    }

    /// Configured remotes as `(name, url)`, sorted by name.
    pub fn remotes(&self) -> Vec<(&str, &str)> {
        self.config
            .remotes
            .iter()
            .map(|(name, remote)| (name.as_str(), remote.url.as_str()))
            .collect()
    }

    pub fn remote_url(&self, name: &str) -> SdkResult<&str> {
        self.config
            .remotes
            .get(name)
            .map(|r| r.url.as_str())
            .ok_or_else(|| SdkError::RemoteNotFound(name.to_string()))
    }

    // ---- Pull ----

    /// A pull engine bound to this repository, sharing its commit lock.
    pub fn puller(&self) -> Puller {
        Puller::new(self.objects.clone(), self.refs.clone())
            .with_config(self.config.pull.clone())
            .with_commit_lock(self.commit_lock.clone())
    }

    /// Transport for a configured remote, with retries.
    pub fn transport(&self, remote: &str) -> SdkResult<Box<dyn RemoteTransport>> {
        let inner = open_transport(self.remote_url(remote)?)?;
        Ok(Box::new(RetryingTransport::new(
            inner,
            self.config.pull.retry.clone(),
        )))
    }

    /// Pull `refs` from a configured remote.
    ///
    /// An empty `refs` pulls every advertised ref under `options.mirror` and
    /// does nothing otherwise.
    pub async fn pull(
        &self,
        remote: &str,
        refs: &[String],
        options: PullOptions,
    ) -> SdkResult<PullReport> {
        let transport = self.transport(remote)?;
        let request = PullRequest::new(remote, refs, options);
        Ok(self.puller().pull(transport.as_ref(), &request).await?)
    }

    /// [`pull`](Self::pull) that stops, changing nothing, when `cancel` fires.
    pub async fn pull_with_cancel(
        &self,
        remote: &str,
        refs: &[String],
        options: PullOptions,
        cancel: &CancellationToken,
    ) -> SdkResult<PullReport> {
        let transport = self.transport(remote)?;
        let request = PullRequest::new(remote, refs, options);
        Ok(self
            .puller()
            .pull_with_cancel(transport.as_ref(), &request, cancel)
            .await?)
    }

    /// [`pull`](Self::pull) for synchronous callers, on a private runtime.
    pub fn pull_blocking(
        &self,
        remote: &str,
        refs: &[String],
        options: PullOptions,
    ) -> SdkResult<PullReport> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.pull(remote, refs, options))
    }

    // ---- Local commits ----

    /// Import `dir` as a new commit on `branch` and move the branch to it.
    pub fn commit_directory(
        &self,
        branch: &str,
        dir: impl AsRef<Path>,
        subject: &str,
    ) -> SdkResult<ObjectId> {
        let imported = import_directory(self.objects.as_ref(), dir.as_ref())?;
        let target = format!("{HEADS_PREFIX}{branch}");

        // Parent and ref swap under one lock, so concurrent commits chain.
        let _guard = self.commit_lock.acquire()?;
        let parent = self.refs.resolve(&target)?;
        let mut commit = Commit::new(imported.tree, imported.meta, subject, unix_now());
        if let Some(parent) = parent {
            commit = commit.with_parent(parent);
        }
        let id = self.objects.write(&commit.to_stored_object()?)?;
        self.refs
            .apply(&[RefUpdate::new(Ref::branch(branch, id), parent)])?;
        info!(branch, commit = %id, "committed directory");
        Ok(id)
    }

    // ---- Refs ----

    /// Every ref, sorted by canonical name.
    pub fn list_refs(&self) -> SdkResult<Vec<Ref>> {
        Ok(self.refs.list_refs("")?)
    }

    /// Resolve a canonical ref name, a branch name or `<remote>/<name>`.
    pub fn resolve_ref(&self, name: &str) -> SdkResult<Option<ObjectId>> {
        for candidate in [
            name.to_string(),
            format!("{HEADS_PREFIX}{name}"),
            format!("{REMOTES_PREFIX}{name}"),
        ] {
            if let Some(commit) = self.refs.resolve(&candidate)? {
                return Ok(Some(commit));
            }
        }
        Ok(None)
    }

    /// Read a commit from the local store.
    pub fn read_commit(&self, id: &ObjectId) -> SdkResult<Commit> {
        let object = self
            .objects
            .read(id, strata_store::ObjectKind::Commit)?
            .ok_or(StoreError::NotFound {
                id: *id,
                kind: strata_store::ObjectKind::Commit,
            })?;
        Ok(Commit::from_stored_object(&object)?)
    }
}

impl std::fmt::Debug for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repo")
            .field("root", &self.root)
            .field("remotes", &self.config.remotes.len())
            .finish()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
