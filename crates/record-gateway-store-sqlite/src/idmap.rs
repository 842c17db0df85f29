//! Identifier translation between a user's local namespace and the
//! canonical one.
//!
//! Forward lookups ([`IdResolver::resolve_mapped_id`]) read a snapshot of the
//! whole `idmaps` table held by [`IdMapCache`]. The snapshot is reloaded when
//! it is missing, empty, or older than the cache window. Reverse lookups
//! ([`IdResolver::resolve_local_id`]) always query the store.
//!
//! A miss never fails: the resolver retries under [`SYSTEM_USER`] and then
//! hands the input back unchanged.

use std::sync::{Mutex, MutexGuard, PoisonError};

use record_gateway_core::{Action, IdMap, SYSTEM_USER};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{Database, DbError};

/// Where the resolver reads mapping entries from.
pub trait IdMapSource {
    /// Every entry in the mapping table.
    fn load_idmaps(&self) -> Result<Vec<IdMap>, DbError>;

    /// Entries owned by `user`.
    fn load_user_idmaps(&self, user: &str) -> Result<Vec<IdMap>, DbError>;
}

impl IdMapSource for Database {
    fn load_idmaps(&self) -> Result<Vec<IdMap>, DbError> {
        Ok(self.perform_with(Action::Select, IdMap::default())?.records)
    }

    fn load_user_idmaps(&self, user: &str) -> Result<Vec<IdMap>, DbError> {
        let seed = IdMap {
            user: user.to_string(),
            ..IdMap::default()
        };
        Ok(self.perform_with(Action::Select, seed)?.records)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub entries: Vec<IdMap>,
    pub refreshed_at: OffsetDateTime,
}

/// Time-bounded copy of the mapping table.
///
/// One lock covers the staleness check, the reload and the read, so callers
/// never observe a partially replaced snapshot.
#[derive(Debug)]
pub struct IdMapCache {
    window: time::Duration,
    snapshot: Mutex<Option<CacheSnapshot>>,
}

impl IdMapCache {
    pub fn new(window: std::time::Duration) -> Result<Self, DbError> {
        let window = time::Duration::try_from(window)
            .map_err(|err| DbError::Config(format!("idmap cache window out of range: {err}")))?;
        Ok(Self {
            window,
            snapshot: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn window(&self) -> time::Duration {
        self.window
    }

    /// Runs `f` over entries that are fresh as of `now`, reloading first if needed.
    ///
    /// When a reload fails the previous entries (possibly none) are served and
    /// the snapshot keeps its old timestamp, so the next call retries.
    pub fn with_fresh_entries<S, T>(
        &self,
        source: &S,
        now: OffsetDateTime,
        f: impl FnOnce(&[IdMap]) -> T,
    ) -> T
    where
        S: IdMapSource + ?Sized,
    {
        let mut guard = self.lock();

        if self.is_stale(guard.as_ref(), now) {
            match source.load_idmaps() {
                Ok(entries) => {
                    debug!(entries = entries.len(), "refreshed idmap cache");
                    *guard = Some(CacheSnapshot {
                        entries,
                        refreshed_at: now,
                    });
                }
                Err(err) => warn!(error = %err, "idmap cache refresh failed"),
            }
        }

        let entries = guard.as_ref().map_or(&[][..], |snapshot| &snapshot.entries[..]);
        f(entries)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<CacheSnapshot> {
        self.lock().clone()
    }

    /// Drops the snapshot; the next lookup reloads.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn is_stale(&self, snapshot: Option<&CacheSnapshot>, now: OffsetDateTime) -> bool {
        match snapshot {
            None => true,
            Some(snapshot) if snapshot.entries.is_empty() => true,
            // A window past the calendar range never expires.
            Some(snapshot) => snapshot
                .refreshed_at
                .checked_add(self.window)
                .is_some_and(|expires_at| now > expires_at),
        }
    }

    // A panic while holding the lock cannot leave a half-written snapshot:
    // it is only ever replaced whole.
    fn lock(&self) -> MutexGuard<'_, Option<CacheSnapshot>> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Translates identifiers using a source and the cache in front of it.
pub struct IdResolver<'a, S: ?Sized> {
    source: &'a S,
    cache: &'a IdMapCache,
}

impl<'a, S: IdMapSource + ?Sized> IdResolver<'a, S> {
    pub fn new(source: &'a S, cache: &'a IdMapCache) -> Self {
        Self { source, cache }
    }

    /// Local id → mapped id, through the cache. Returns `lid` when unmapped.
    #[must_use]
    pub fn resolve_mapped_id(&self, user: &str, lid: &str) -> String {
        self.resolve_mapped_id_at(user, lid, OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn resolve_mapped_id_at(&self, user: &str, lid: &str, now: OffsetDateTime) -> String {
        let user = effective_user(user);
        self.cache.with_fresh_entries(self.source, now, |entries| {
            if let Some(mid) = find_mapped(entries, user, lid) {
                return mid.to_string();
            }
            if user != SYSTEM_USER {
                if let Some(mid) = find_mapped(entries, SYSTEM_USER, lid) {
                    debug!(user, lid, "resolved through system mapping");
                    return mid.to_string();
                }
            }
            lid.to_string()
        })
    }

    /// Mapped id → local id, read fresh from the source. Returns `mid` when
    /// unmapped or when the lookup fails.
    #[must_use]
    pub fn resolve_local_id(&self, user: &str, mid: &str) -> String {
        let user = effective_user(user);
        match self.source.load_user_idmaps(user) {
            Ok(entries) => entries
                .into_iter()
                .find(|entry| entry.mid == mid)
                .map_or_else(|| mid.to_string(), |entry| entry.lid),
            Err(err) => {
                warn!(user, mid, error = %err, "local id lookup failed");
                mid.to_string()
            }
        }
    }
}

fn effective_user(user: &str) -> &str {
    if user.is_empty() {
        SYSTEM_USER
    } else {
        user
    }
}

fn find_mapped<'e>(entries: &'e [IdMap], user: &str, lid: &str) -> Option<&'e str> {
    entries
        .iter()
        .find(|entry| entry.user == user && entry.lid == lid)
        .map(|entry| entry.mid.as_str())
}
