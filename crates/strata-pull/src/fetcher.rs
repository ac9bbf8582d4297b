//! Breadth-first walk of the object graph, fetching what is missing locally.

use std::collections::{HashSet, VecDeque};

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use strata_store::{
    Commit, DirTree, ObjectKind, ObjectStore, StoreError, StoreResult, StoredObject,
};
use strata_types::ObjectId;
use tracing::debug;

use crate::error::{PullError, PullResult};
use crate::transport::RemoteTransport;
use crate::types::{FetchStats, FetchedObject};
use crate::verifier::Verifier;

type Key = (ObjectId, ObjectKind);

/// Lazy, restartable sequence of the objects a pull needs.
///
/// Seed it with [`add_commit`](Self::add_commit), then drain it with
/// [`next`](Self::next). Objects come out verified, in breadth-first order
/// from each commit, each checksum at most once. After a transport error,
/// calling `next` again resumes with the object that failed.
pub struct ObjectFetcher<'a> {
    transport: &'a dyn RemoteTransport,
    store: &'a dyn ObjectStore,
    verifier: Verifier,
    commit_only: bool,
    max_concurrent: usize,
    queue: VecDeque<Key>,
    seen: HashSet<Key>,
    ready: VecDeque<FetchedObject>,
    markers: Vec<(ObjectId, bool)>,
    stats: FetchStats,
}

impl<'a> ObjectFetcher<'a> {
    pub fn new(
        transport: &'a dyn RemoteTransport,
        store: &'a dyn ObjectStore,
        verifier: Verifier,
        commit_only: bool,
        max_concurrent: usize,
    ) -> Self {
        Self {
            transport,
            store,
            verifier,
            commit_only,
            max_concurrent: max_concurrent.max(1),
            queue: VecDeque::new(),
            seen: HashSet::new(),
            ready: VecDeque::new(),
            markers: Vec::new(),
            stats: FetchStats::default(),
        }
    }

    /// Add a commit to walk.
    ///
    /// A commit already stored in full is skipped. A partial one is skipped
    /// when only commits are wanted, and completed otherwise.
    pub fn add_commit(&mut self, commit: ObjectId) -> PullResult<()> {
        if !self.seen.insert((commit, ObjectKind::Commit)) {
            return Ok(());
        }
        if !self.store.exists(&commit, ObjectKind::Commit)? {
            self.queue.push_back((commit, ObjectKind::Commit));
            return Ok(());
        }
        self.stats.objects_skipped += 1;
        if self.commit_only || !self.store.is_partial(&commit)? {
            debug!(%commit, "commit already present");
            return Ok(());
        }
        debug!(%commit, "completing partial commit");
        let local = self.read_local(commit, ObjectKind::Commit)?;
        let parsed = Commit::from_stored_object(&local)?;
        for child in parsed.references() {
            self.enqueue(child);
        }
        self.markers.push((commit, false));
        Ok(())
    }

    /// Next verified object, or `None` once the walk is complete.
    pub async fn next(&mut self) -> PullResult<Option<FetchedObject>> {
        loop {
            if let Some(fetched) = self.ready.pop_front() {
                return Ok(Some(fetched));
            }
            if self.queue.is_empty() {
                return Ok(None);
            }
            self.fill().await?;
        }
    }

    /// Partial-commit marker changes the walk implies.
    pub fn partial_markers(&self) -> &[(ObjectId, bool)] {
        &self.markers
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    fn enqueue(&mut self, key: Key) {
        if self.seen.insert(key) {
            self.queue.push_back(key);
        }
    }

    fn read_local(&self, id: ObjectId, kind: ObjectKind) -> StoreResult<StoredObject> {
        self.store
            .read(&id, kind)?
            .ok_or(StoreError::NotFound { id, kind })
    }

    /// Pop up to `max_concurrent` missing objects off the queue, walking past
    /// the ones already present.
    fn take_batch(&mut self) -> PullResult<Vec<Key>> {
        let mut batch = Vec::with_capacity(self.max_concurrent);
        while batch.len() < self.max_concurrent {
            let Some((id, kind)) = self.queue.pop_front() else {
                break;
            };
            if !self.store.exists(&id, kind)? {
                batch.push((id, kind));
                continue;
            }
            self.stats.objects_skipped += 1;
            if kind.is_metadata() {
                let local = self.read_local(id, kind)?;
                for child in children(&local)? {
                    self.enqueue(child);
                }
            }
        }
        Ok(batch)
    }

    async fn fill(&mut self) -> PullResult<()> {
        let batch = self.take_batch()?;
        if batch.is_empty() {
            return Ok(());
        }
        debug!(count = batch.len(), queued = self.queue.len(), "fetching batch");

        let transport = self.transport;
        let results: Vec<PullResult<Bytes>> = stream::iter(batch.iter().copied())
            .map(|(id, kind)| async move { transport.fetch_object(&id, kind).await })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(bytes) => self.accept(batch[i], bytes)?,
                Err(e) => {
                    for key in batch[i..].iter().rev() {
                        self.queue.push_front(*key);
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn accept(&mut self, (id, kind): Key, bytes: Bytes) -> PullResult<()> {
        let object = StoredObject::new(kind, bytes.to_vec());
        self.verifier.verify(&id, &object)?;
        self.stats.objects_fetched += 1;
        self.stats.bytes_fetched += object.size;
        debug!(%id, %kind, size = object.size, "fetched object");

        let refs = children(&object).map_err(|e| {
            PullError::transport(self.transport.describe(), format!("malformed {kind} {id}: {e}"))
        })?;
        if kind == ObjectKind::Commit && self.commit_only {
            self.markers.push((id, true));
        } else {
            for child in refs {
                self.enqueue(child);
            }
        }
        self.ready.push_back(FetchedObject { id, object });
        Ok(())
    }
}

/// Objects referenced by a metadata object.
fn children(object: &StoredObject) -> StoreResult<Vec<Key>> {
    match object.kind {
        ObjectKind::Commit => Ok(Commit::from_stored_object(object)?.references()),
        ObjectKind::DirTree => Ok(DirTree::from_stored_object(object)?.references()),
        ObjectKind::DirMeta | ObjectKind::File => Ok(Vec::new()),
    }
}
