//! Sync engine: orchestrates the record store, the local cache, the
//! transport, and the network monitor.
//!
//! Every public operation is independently triggerable and idempotent:
//! bootstrap (cache-first hydration), save (with offline queueing),
//! push-channel merge, reconnect replay (through conflict detection), and
//! conflict resolution. The engine runs on one logical thread of control;
//! long-running work suspends at I/O boundaries and every state mutation
//! funnels through the store's dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::cache::CacheStore;
use crate::error::{Error, Result};
use crate::models::{Book, BookId, ConflictPair, ConflictSide, PendingWrite};
use crate::net::NetworkMonitor;
use crate::push::{PushKind, PushMessage};
use crate::store::{Action, BookStore, BooksState};
use crate::transport::{Transport, TransportError};

/// Replay attempts per pending write before the entry is dead-lettered.
pub const DEFAULT_MAX_REPLAY_ATTEMPTS: u32 = 8;

/// How a save request ended up.
///
/// Public operations never propagate transport failures; they resolve to one
/// of these tagged outcomes for the presentation layer to render.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Confirmed by the server
    Saved(Book),
    /// Unreachable while offline; queued for replay on reconnect
    Queued(BookId),
    /// A brand-new record kept locally under a placeholder id until the
    /// network returns
    KeptLocal(Book),
    /// Rejected by the server for a non-connectivity reason; not queued
    Rejected(String),
}

/// The synchronization engine.
pub struct SyncEngine<T> {
    store: BookStore,
    cache: Mutex<CacheStore>,
    transport: T,
    network: NetworkMonitor,
    token: String,
    max_replay_attempts: u32,
    closed: AtomicBool,
    shutdown: Notify,
}

impl<T: Transport> SyncEngine<T> {
    /// Create an engine over the given collaborators.
    pub fn new(
        transport: T,
        cache: CacheStore,
        network: NetworkMonitor,
        token: impl Into<String>,
    ) -> Self {
        Self {
            store: BookStore::new(),
            cache: Mutex::new(cache),
            transport,
            network,
            token: token.into(),
            max_replay_attempts: DEFAULT_MAX_REPLAY_ATTEMPTS,
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Override the replay dead-letter threshold.
    #[must_use]
    pub const fn with_max_replay_attempts(mut self, attempts: u32) -> Self {
        self.max_replay_attempts = attempts;
        self
    }

    /// The record store; presentation layers read and await snapshots here.
    pub const fn store(&self) -> &BookStore {
        &self.store
    }

    /// Convenience for `store().state()`.
    pub fn state(&self) -> std::sync::Arc<BooksState> {
        self.store.state()
    }

    /// The connectivity monitor feeding this engine.
    pub const fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// The writes currently queued for replay.
    pub fn pending_writes(&self) -> Result<Vec<PendingWrite>> {
        self.cache().pending_writes()
    }

    /// Hydrate the collection: cache first, network only when the cache
    /// holds no collection. Either way the result is mirrored back into the
    /// cache (write-through).
    pub async fn bootstrap(&self) -> Result<()> {
        self.dispatch(Action::FetchStarted);

        let cached = self.cache().load_collection()?;
        if let Some(books) = cached {
            tracing::debug!(count = books.len(), "hydrated collection from cache");
            self.dispatch(Action::FetchSucceeded { books });
            self.mirror_collection()?;
            self.rehydrate_conflicts()?;
            return Ok(());
        }

        self.fetch_from_network().await?;
        self.rehydrate_conflicts()
    }

    /// Surface conflicts persisted before a restart; a pending write turned
    /// into a conflict must not be lost with the process.
    fn rehydrate_conflicts(&self) -> Result<()> {
        for pair in self.cache().conflicts()? {
            self.dispatch(Action::ConflictDetected { pair });
        }
        Ok(())
    }

    /// Explicitly re-fetch the collection from the server, replacing the
    /// in-memory set on success and leaving it untouched on failure.
    pub async fn refresh(&self) -> Result<()> {
        self.dispatch(Action::FetchStarted);
        self.fetch_from_network().await
    }

    async fn fetch_from_network(&self) -> Result<()> {
        match self.transport.fetch_all(&self.token).await {
            Ok(books) => {
                tracing::debug!(count = books.len(), "fetched collection from server");
                self.dispatch(Action::FetchSucceeded { books });
                self.mirror_collection()?;
            }
            Err(error) => {
                // offline-first: whatever collection we hold stays visible
                tracing::warn!(%error, "collection fetch failed");
                self.dispatch(Action::FetchFailed {
                    error: error.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Save a book through the ordinary path.
    ///
    /// Books with a server id go through update; everything else (no id, or
    /// a local placeholder id) goes through create. Connectivity failures
    /// degrade per the offline policy: updates are queued for replay,
    /// creations are kept locally under a placeholder id.
    pub async fn save(&self, book: Book) -> Result<SaveOutcome> {
        self.dispatch(Action::SaveStarted);

        let server_id = book.id.clone().filter(|id| !id.is_local());
        let result = if server_id.is_some() {
            self.transport.update(&self.token, &book).await
        } else {
            // the server assigns identity and the initial version
            let mut draft = book.clone();
            draft.id = None;
            draft.version = 0;
            draft.failed = false;
            self.transport.create(&self.token, &draft).await
        };

        match result {
            Ok(saved) => {
                // a confirmed placeholder must not appear twice
                if let Some(placeholder) = book.id.clone().filter(BookId::is_local) {
                    self.dispatch(Action::RemoveDuplicate { id: placeholder });
                }
                self.dispatch(Action::SaveSucceeded {
                    book: saved.clone(),
                });
                self.mirror_collection()?;
                Ok(SaveOutcome::Saved(saved))
            }
            Err(error) => self.handle_save_failure(book, server_id, &error),
        }
    }

    fn handle_save_failure(
        &self,
        book: Book,
        server_id: Option<BookId>,
        error: &TransportError,
    ) -> Result<SaveOutcome> {
        let offline = error.is_transient() || !self.network.status().is_connected();

        if let Some(id) = server_id {
            if offline {
                // capture the payload, not the error; later writes for the
                // same id overwrite this entry
                self.cache().put_pending(&PendingWrite::new(id.clone(), book.clone()))?;
                tracing::info!(%id, "queued update for replay on reconnect");
                self.dispatch(Action::SaveFailed {
                    book,
                    error: error.to_string(),
                });
                self.mirror_collection()?;
                return Ok(SaveOutcome::Queued(id));
            }

            tracing::warn!(%id, %error, "save rejected by server");
            self.dispatch(Action::SaveFailed {
                book,
                error: error.to_string(),
            });
            self.mirror_collection()?;
            return Ok(SaveOutcome::Rejected(error.to_string()));
        }

        // brand-new record: keep it visible under a placeholder id; it is
        // resent through the create path on reconnect, not version-replayed
        let mut placeholder = book;
        if placeholder.id.is_none() {
            placeholder.id = Some(BookId::local());
        }
        placeholder.failed = true;
        if let Some(id) = &placeholder.id {
            tracing::info!(%id, "keeping unconfirmed book locally");
        }
        self.dispatch(Action::SaveFailed {
            book: placeholder.clone(),
            error: error.to_string(),
        });
        self.mirror_collection()?;

        if offline {
            Ok(SaveOutcome::KeptLocal(placeholder))
        } else {
            Ok(SaveOutcome::Rejected(error.to_string()))
        }
    }

    /// Merge an inbound push-channel message.
    ///
    /// `created`/`updated` frames upsert exactly as a save success would;
    /// the later-applied write wins by arrival order. Any other kind is
    /// ignored, not an error.
    pub fn apply_push(&self, message: PushMessage) -> Result<()> {
        match message.kind {
            PushKind::Created | PushKind::Updated => {
                self.dispatch(Action::SaveSucceeded { book: message.book });
                self.mirror_collection()
            }
            PushKind::Other(kind) => {
                tracing::debug!(kind, "ignoring push frame");
                Ok(())
            }
        }
    }

    /// Drain the pending-write queue, then resend locally kept creations.
    ///
    /// For each queued write the server's current record is fetched and the
    /// versions compared: only an exact "+1 ahead" relationship replays as a
    /// straight update; any other relationship becomes a conflict pair. A
    /// transient failure leaves the entry queued (up to the dead-letter
    /// threshold); conflicts remove the entry regardless, since the write
    /// now lives on as a conflict instead.
    pub async fn replay(&self) -> Result<()> {
        let writes = self.cache().pending_writes()?;
        if !writes.is_empty() {
            tracing::info!(count = writes.len(), "replaying queued writes");
        }
        for write in writes {
            if self.is_closed() {
                return Ok(());
            }
            self.replay_one(write).await?;
        }
        self.resend_local_only().await
    }

    async fn replay_one(&self, write: PendingWrite) -> Result<()> {
        let server = match self.transport.fetch_one(&write.book_id).await {
            Ok(book) => book,
            Err(error) if error.is_transient() => return self.requeue(write, &error),
            Err(error) => {
                // the record cannot be compared anymore; surface and drop
                tracing::warn!(id = %write.book_id, %error, "replay lookup rejected");
                self.cache().remove_pending(&write.book_id)?;
                self.dispatch(Action::SaveFailed {
                    book: write.snapshot,
                    error: error.to_string(),
                });
                self.mirror_collection()?;
                return Ok(());
            }
        };

        if server.version == write.snapshot.version + 1 {
            // no one else updated it since; resend as an ordinary update
            match self.transport.update(&self.token, &write.snapshot).await {
                Ok(saved) => {
                    tracing::info!(id = %write.book_id, "replayed queued write");
                    self.cache().remove_pending(&write.book_id)?;
                    self.dispatch(Action::SaveSucceeded { book: saved });
                    self.mirror_collection()?;
                }
                Err(error) if error.is_transient() => self.requeue(write, &error)?,
                Err(error) => {
                    tracing::warn!(id = %write.book_id, %error, "replayed write rejected");
                    self.cache().remove_pending(&write.book_id)?;
                    self.dispatch(Action::SaveFailed {
                        book: write.snapshot,
                        error: error.to_string(),
                    });
                    self.mirror_collection()?;
                }
            }
        } else {
            tracing::info!(
                id = %write.book_id,
                local = write.snapshot.version,
                server = server.version,
                "version conflict detected"
            );
            let pair = ConflictPair::new(write.book_id.clone(), write.snapshot, server);
            self.cache().put_conflict(&pair)?;
            self.dispatch(Action::ConflictDetected { pair });
            self.cache().remove_pending(&write.book_id)?;
        }
        Ok(())
    }

    /// Keep a transiently failed write queued, or dead-letter it once the
    /// attempt limit is spent.
    fn requeue(&self, write: PendingWrite, error: &TransportError) -> Result<()> {
        let write = write.retried();
        if write.attempts >= self.max_replay_attempts {
            tracing::warn!(
                id = %write.book_id,
                attempts = write.attempts,
                "dead-lettering queued write; the record stays visible as unsynced"
            );
            self.cache().remove_pending(&write.book_id)?;
            self.dispatch(Action::SaveFailed {
                book: write.snapshot,
                error: error.to_string(),
            });
            self.mirror_collection()?;
        } else {
            self.cache().put_pending(&write)?;
        }
        Ok(())
    }

    /// Resend books that only exist on this device through the create path.
    ///
    /// There is no server version to compare for these, so the conflict path
    /// does not apply; a failure simply keeps the placeholder for the next
    /// reconnect.
    async fn resend_local_only(&self) -> Result<()> {
        for book in self.store.state().local_only() {
            if self.is_closed() {
                return Ok(());
            }
            let mut draft = book.clone();
            draft.id = None;
            draft.version = 0;
            draft.failed = false;
            match self.transport.create(&self.token, &draft).await {
                Ok(saved) => {
                    if let Some(placeholder) = book.id {
                        self.dispatch(Action::RemoveDuplicate { id: placeholder });
                    }
                    self.dispatch(Action::SaveSucceeded { book: saved });
                    self.mirror_collection()?;
                }
                Err(error) => {
                    tracing::debug!(%error, "locally kept book still unconfirmed");
                }
            }
        }
        Ok(())
    }

    /// Resolve a surfaced conflict by keeping one side.
    ///
    /// The chosen snapshot gets its origin id back, moves one version past
    /// the server's, and is resubmitted through the ordinary save path; the
    /// discarded side is dropped without further action.
    pub async fn resolve_conflict(
        &self,
        origin_id: &BookId,
        side: ConflictSide,
    ) -> Result<SaveOutcome> {
        let pair = self
            .state()
            .conflict(origin_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(origin_id.to_string()))?;

        let chosen = pair.choose(side);
        self.cache().remove_conflict(origin_id)?;
        self.dispatch(Action::ConflictResolved {
            origin_id: origin_id.clone(),
        });
        self.save(chosen).await
    }

    /// React to connectivity transitions until [`SyncEngine::shutdown`].
    ///
    /// Replay only runs on a real transition to connected; the monitor
    /// deduplicates repeated statuses and subscription alone never fires.
    pub async fn run(&self) {
        let mut events = self.network.subscribe();
        loop {
            if self.is_closed() {
                return;
            }
            tokio::select! {
                () = self.shutdown.notified() => return,
                changed = events.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let status = *events.borrow_and_update();
                    if status.is_connected() && !self.is_closed() {
                        if let Err(error) = self.replay().await {
                            tracing::warn!(%error, "replay after reconnect failed");
                        }
                    }
                }
            }
        }
    }

    /// Tear the engine down: in-flight operations complete but no longer
    /// dispatch state updates, and [`SyncEngine::run`] returns.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Guarded dispatch: a torn-down engine drops state updates.
    fn dispatch(&self, action: Action) {
        if self.is_closed() {
            tracing::debug!("engine closed; dropping state update");
            return;
        }
        self.store.dispatch(action);
    }

    /// Write-through: mirror the current collection into the local cache.
    fn mirror_collection(&self) -> Result<()> {
        let state = self.store.state();
        self.cache().store_collection(&state.books)
    }

    fn cache(&self) -> MutexGuard<'_, CacheStore> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
