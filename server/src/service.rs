//! Photo service: the one contract handlers talk to.
//!
//! Every operation completes against the local [`RecordStore`] first. The
//! matching remote call is then spawned in the background; its failure is
//! logged and otherwise ignored. Listing prefers a non-empty remote answer
//! but reconciles it with local state first: ids deleted locally stay
//! deleted, and a local edit newer than the remote row is kept and re-sent.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::models::{NewPhoto, Photo, PhotoUpdate, MAX_CAPTION_LEN};
use crate::remote::{RemoteError, SharedRemote};
use crate::store::{self, SharedStore, StoreError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Photo {0} not found")]
    NotFound(String),
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

/// Where a listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    Remote,
    Local,
}

/// States of the listing fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListStep {
    TryRemote,
    TryLocal,
}

pub struct PhotoService {
    store: SharedStore,
    remote: Option<SharedRemote>,
    mirrors: Mutex<JoinSet<()>>,
}

impl PhotoService {
    pub fn new(store: SharedStore, remote: Option<SharedRemote>) -> Self {
        PhotoService {
            store,
            remote,
            mirrors: Mutex::new(JoinSet::new()),
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn save(&self, new: NewPhoto) -> Result<Photo, ServiceError> {
        if new.user_id.trim().is_empty() {
            return Err(ServiceError::ValidationFailed("userId is required".into()));
        }
        if new.image.is_empty() {
            return Err(ServiceError::ValidationFailed("image is required".into()));
        }
        let caption = new.caption.unwrap_or_default();
        validate_caption(&caption)?;

        let created_at = store::now();
        let photo = Photo {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            image: new.image,
            caption,
            song: new.song.filter(|s| !s.is_empty()),
            song_name: new.song_name.filter(|s| !s.is_empty()),
            created_at,
            updated_at: created_at,
        };

        self.store.put(&photo).await?;
        tracing::info!(id = %photo.id, user_id = %photo.user_id, "Photo saved");

        if let Some(remote) = &self.remote {
            let remote = remote.clone();
            let mirrored = photo.clone();
            self.mirror("save", photo.id.clone(), async move {
                remote.save(&mirrored).await
            })
            .await;
        }
        Ok(photo)
    }

    pub async fn get(&self, id: &str) -> Result<Photo, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Photo>, ServiceError> {
        self.list_with_source(user_id).await.map(|(photos, _)| photos)
    }

    /// Run the listing fallback chain: remote first, local when the remote is
    /// absent, empty, or failing. Only a local failure is surfaced.
    pub async fn list_with_source(
        &self,
        user_id: &str,
    ) -> Result<(Vec<Photo>, ListSource), ServiceError> {
        let mut step = ListStep::TryRemote;
        loop {
            match step {
                ListStep::TryRemote => {
                    let Some(remote) = &self.remote else {
                        step = ListStep::TryLocal;
                        continue;
                    };
                    match remote.fetch(user_id).await {
                        Ok(photos) if !photos.is_empty() => {
                            let photos = self.reconcile(user_id, photos).await?;
                            if !photos.is_empty() {
                                tracing::debug!(
                                    user_id,
                                    count = photos.len(),
                                    "Listing from remote"
                                );
                                return Ok((photos, ListSource::Remote));
                            }
                            tracing::debug!(
                                user_id,
                                "Remote listing empty after reconciliation, trying local"
                            );
                        }
                        Ok(_) => {
                            tracing::debug!(user_id, "Remote listing empty, trying local");
                        }
                        Err(e) => {
                            tracing::warn!(
                                user_id,
                                error = %e,
                                "Remote listing failed, trying local"
                            );
                        }
                    }
                    step = ListStep::TryLocal;
                }
                ListStep::TryLocal => {
                    return match self.store.list_by_user(user_id).await {
                        Ok(photos) => Ok((photos, ListSource::Local)),
                        Err(e) => {
                            tracing::error!(user_id, error = %e, "Local listing failed");
                            Err(e.into())
                        }
                    };
                }
            }
        }
    }

    pub async fn update(&self, id: &str, update: PhotoUpdate) -> Result<(), ServiceError> {
        if let Some(caption) = &update.caption {
            validate_caption(caption)?;
        }
        if update.is_empty() {
            self.get(id).await?;
            tracing::debug!(id, "Empty update, nothing to change");
            return Ok(());
        }
        let Some(photo) = self.store.update(id, &update).await? else {
            return Err(ServiceError::NotFound(id.to_string()));
        };
        tracing::info!(id, "Photo updated");

        self.mirror_update(id, update, photo.updated_at).await;
        Ok(())
    }

    /// Delete locally. With a remote configured the id keeps a tombstone until
    /// the remote confirms. Deleting an absent photo succeeds.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let existed = self.store.delete(id, self.has_remote()).await?;
        if existed {
            tracing::info!(id, "Photo deleted");
        } else {
            tracing::debug!(id, "Delete of absent photo");
        }
        self.mirror_delete(id).await;
        Ok(())
    }

    /// Wait for every background mirror started so far.
    pub async fn flush(&self) {
        let mut mirrors = self.mirrors.lock().await;
        while let Some(joined) = mirrors.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Remote mirror task aborted");
            }
        }
    }

    /// Merge a remote listing into local state and return it newest first.
    ///
    /// Rows of another user and tombstoned rows are dropped. A row older than
    /// the local copy is replaced by it and the local edit is re-sent; every
    /// other row refreshes the local cache.
    async fn reconcile(
        &self,
        user_id: &str,
        photos: Vec<Photo>,
    ) -> Result<Vec<Photo>, ServiceError> {
        let (mut photos, foreign): (Vec<Photo>, Vec<Photo>) =
            photos.into_iter().partition(|p| p.user_id == user_id);
        if !foreign.is_empty() {
            tracing::warn!(
                user_id,
                count = foreign.len(),
                "Remote returned photos of another user"
            );
        }

        let ids: Vec<String> = photos.iter().map(|p| p.id.clone()).collect();
        let dead: HashSet<String> = self.store.tombstones(&ids).await?;
        if !dead.is_empty() {
            photos.retain(|p| !dead.contains(&p.id));
            for id in &dead {
                tracing::warn!(id = %id, "Remote still holds a deleted photo, re-sending delete");
                self.mirror_delete(id).await;
            }
        }

        let mut merged = Vec::with_capacity(photos.len());
        for remote_photo in photos {
            match self.store.get(&remote_photo.id).await? {
                Some(local) if local.updated_at > remote_photo.updated_at => {
                    tracing::warn!(id = %local.id, "Remote holds a stale edit, re-sending update");
                    let update = PhotoUpdate::replacing(&local);
                    self.mirror_update(&local.id, update, local.updated_at).await;
                    merged.push(local);
                }
                _ => {
                    self.store.put(&remote_photo).await?;
                    merged.push(remote_photo);
                }
            }
        }
        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(merged)
    }

    async fn mirror_update(&self, id: &str, update: PhotoUpdate, updated_at: DateTime<Utc>) {
        if let Some(remote) = &self.remote {
            let remote = remote.clone();
            let target = id.to_string();
            self.mirror("update", id.to_string(), async move {
                remote.update(&target, &update, updated_at).await
            })
            .await;
        }
    }

    async fn mirror_delete(&self, id: &str) {
        if let Some(remote) = &self.remote {
            let remote = remote.clone();
            let store = self.store.clone();
            let target = id.to_string();
            self.mirror("delete", id.to_string(), async move {
                let deleted = remote.delete(&target).await;
                if deleted.is_ok() {
                    if let Err(e) = store.clear_tombstone(&target).await {
                        tracing::warn!(id = %target, error = %e, "Failed to clear tombstone");
                    }
                }
                deleted
            })
            .await;
        }
    }

    async fn mirror<F>(&self, op: &'static str, id: String, call: F)
    where
        F: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        let mut mirrors = self.mirrors.lock().await;
        // Reap finished mirrors so the set does not grow without bound.
        while mirrors.try_join_next().is_some() {}
        mirrors.spawn(async move {
            match call.await {
                Ok(()) => tracing::debug!(op, id = %id, "Remote mirror succeeded"),
                Err(e) => tracing::warn!(op, id = %id, error = %e, "Remote mirror failed"),
            }
        });
    }
}

fn validate_caption(caption: &str) -> Result<(), ServiceError> {
    if caption.chars().count() > MAX_CAPTION_LEN {
        return Err(ServiceError::ValidationFailed(format!(
            "caption exceeds {MAX_CAPTION_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteBackend;
    use crate::store::{MemoryRecordStore, RecordStore};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex as StdMutex};

    /// In-process stand-in for the remote backend.
    #[derive(Default)]
    struct FakeRemote {
        rows: StdMutex<HashMap<String, Photo>>,
        failing: StdMutex<HashSet<&'static str>>,
        calls: StdMutex<Vec<String>>,
    }

    impl FakeRemote {
        fn fail(&self, op: &'static str) {
            self.failing.lock().unwrap().insert(op);
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn check(&self, op: &'static str, id: &str) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(format!("{op} {id}"));
            if self.failing.lock().unwrap().contains(op) {
                return Err(RemoteError::Config(format!("{op} unavailable")));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn has(&self, id: &str) -> bool {
            self.rows.lock().unwrap().contains_key(id)
        }

        fn caption_of(&self, id: &str) -> String {
            self.rows.lock().unwrap()[id].caption.clone()
        }

        fn insert(&self, photo: Photo) {
            self.rows.lock().unwrap().insert(photo.id.clone(), photo);
        }
    }

    #[async_trait]
    impl RemoteBackend for FakeRemote {
        async fn save(&self, photo: &Photo) -> Result<(), RemoteError> {
            self.check("save", &photo.id)?;
            self.rows.lock().unwrap().insert(photo.id.clone(), photo.clone());
            Ok(())
        }

        async fn fetch(&self, user_id: &str) -> Result<Vec<Photo>, RemoteError> {
            self.check("fetch", user_id)?;
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn update(
            &self,
            id: &str,
            update: &PhotoUpdate,
            updated_at: DateTime<Utc>,
        ) -> Result<(), RemoteError> {
            self.check("update", id)?;
            if let Some(photo) = self.rows.lock().unwrap().get_mut(id) {
                photo.apply(update);
                photo.updated_at = updated_at;
            }
            Ok(())
        }

        async fn delete(&self, id: &str) -> Result<(), RemoteError> {
            self.check("delete", id)?;
            self.rows.lock().unwrap().remove(id);
            Ok(())
        }
    }

    fn new_photo(user: &str, caption: &str) -> NewPhoto {
        NewPhoto {
            user_id: user.into(),
            image: "data:image/jpeg;base64,/9j/".into(),
            caption: Some(caption.into()),
            song: None,
            song_name: None,
        }
    }

    fn local_only() -> PhotoService {
        PhotoService::new(Arc::new(MemoryRecordStore::new()), None)
    }

    fn mirrored() -> (PhotoService, Arc<MemoryRecordStore>, Arc<FakeRemote>) {
        let store = Arc::new(MemoryRecordStore::new());
        let remote = Arc::new(FakeRemote::default());
        let service = PhotoService::new(store.clone(), Some(remote.clone()));
        (service, store, remote)
    }

    #[tokio::test]
    async fn save_then_list_contains_the_new_photo() {
        let service = local_only();
        let saved = service.save(new_photo("u1", "first")).await.unwrap();

        let listed = service.list("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, saved.id);
        assert_eq!(listed[0].caption, "first");
        assert_eq!(listed[0].image, "data:image/jpeg;base64,/9j/");

        let second = service.save(new_photo("u1", "second")).await.unwrap();
        assert_ne!(second.id, saved.id);
        assert_eq!(service.list("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn users_only_see_their_own_photos() {
        let service = local_only();
        let a = service.save(new_photo("u1", "A")).await.unwrap();
        let b = service.save(new_photo("u2", "B")).await.unwrap();

        let ids = |photos: Vec<Photo>| photos.into_iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(service.list("u1").await.unwrap()), vec![a.id]);
        assert_eq!(ids(service.list("u2").await.unwrap()), vec![b.id]);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let service = local_only();
        for caption in ["one", "two", "three"] {
            service.save(new_photo("u1", caption)).await.unwrap();
        }
        let listed = service.list("u1").await.unwrap();
        assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn save_validates_input() {
        let service = local_only();

        let mut missing_image = new_photo("u1", "x");
        missing_image.image.clear();
        assert!(matches!(
            service.save(missing_image).await,
            Err(ServiceError::ValidationFailed(_))
        ));

        assert!(matches!(
            service.save(new_photo("", "x")).await,
            Err(ServiceError::ValidationFailed(_))
        ));

        let long = "é".repeat(MAX_CAPTION_LEN + 1);
        assert!(matches!(
            service.save(new_photo("u1", &long)).await,
            Err(ServiceError::ValidationFailed(_))
        ));

        let exact = "é".repeat(MAX_CAPTION_LEN);
        service.save(new_photo("u1", &exact)).await.unwrap();

        let mut no_caption = new_photo("u1", "");
        no_caption.caption = None;
        let saved = service.save(no_caption).await.unwrap();
        assert_eq!(saved.caption, "");
    }

    #[tokio::test]
    async fn caption_update_keeps_song() {
        let service = local_only();
        let mut new = new_photo("u1", "before");
        new.song = Some("data:audio/mpeg;base64,SUQz".into());
        new.song_name = Some("our song".into());
        let saved = service.save(new).await.unwrap();

        service.update(&saved.id, PhotoUpdate::caption("X")).await.unwrap();

        let fetched = service.get(&saved.id).await.unwrap();
        assert_eq!(fetched.caption, "X");
        assert_eq!(fetched.song.as_deref(), Some("data:audio/mpeg;base64,SUQz"));
        assert_eq!(fetched.song_name.as_deref(), Some("our song"));
    }

    #[tokio::test]
    async fn update_of_missing_photo_is_not_found() {
        let service = local_only();
        let err = service
            .update("nope", PhotoUpdate::caption("X"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn delete_removes_from_listing_and_is_idempotent() {
        let service = local_only();
        let saved = service.save(new_photo("u1", "bye")).await.unwrap();
        service.delete(&saved.id).await.unwrap();
        service.delete(&saved.id).await.unwrap();
        assert!(service.list("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remote_failures_never_fail_local_operations() {
        let (service, _store, remote) = mirrored();
        for op in ["save", "fetch", "update", "delete"] {
            remote.fail(op);
        }

        let saved = service.save(new_photo("u1", "offline")).await.unwrap();
        service.update(&saved.id, PhotoUpdate::caption("still offline")).await.unwrap();
        service.flush().await;

        let (listed, source) = service.list_with_source("u1").await.unwrap();
        assert_eq!(source, ListSource::Local);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].caption, "still offline");

        service.delete(&saved.id).await.unwrap();
        service.flush().await;
        assert!(service.list("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mirrors_run_after_the_local_write() {
        let (service, _store, remote) = mirrored();
        let saved = service.save(new_photo("u1", "hi")).await.unwrap();
        service.update(&saved.id, PhotoUpdate::caption("edited")).await.unwrap();
        service.flush().await;

        assert!(remote.has(&saved.id));
        assert_eq!(remote.caption_of(&saved.id), "edited");
        assert!(remote.calls().contains(&format!("save {}", saved.id)));
    }

    #[tokio::test]
    async fn empty_update_checks_existence_and_skips_remote() {
        let (service, _store, remote) = mirrored();
        let saved = service.save(new_photo("u1", "same")).await.unwrap();
        service.flush().await;

        service.update(&saved.id, PhotoUpdate::default()).await.unwrap();
        service.flush().await;
        assert_eq!(service.get(&saved.id).await.unwrap(), saved);
        assert!(!remote.calls().iter().any(|c| c.starts_with("update")));

        let err = service.update("nope", PhotoUpdate::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_empty_remote_is_authoritative_and_refreshes_cache() {
        let (service, store, remote) = mirrored();
        let created_at = store::now() - Duration::hours(1);
        let remote_only = Photo {
            id: "from-another-device".into(),
            user_id: "u1".into(),
            image: "img".into(),
            caption: "synced".into(),
            song: None,
            song_name: None,
            created_at,
            updated_at: created_at,
        };
        remote.insert(remote_only.clone());

        let (listed, source) = service.list_with_source("u1").await.unwrap();
        assert_eq!(source, ListSource::Remote);
        assert_eq!(listed, vec![remote_only.clone()]);
        assert_eq!(store.get(&remote_only.id).await.unwrap(), Some(remote_only));
    }

    #[tokio::test]
    async fn empty_remote_falls_back_to_local() {
        let (service, store, remote) = mirrored();
        remote.fail("save");
        let saved = service.save(new_photo("u1", "local only")).await.unwrap();
        service.flush().await;
        remote.heal();

        assert!(store.get(&saved.id).await.unwrap().is_some());
        let (listed, source) = service.list_with_source("u1").await.unwrap();
        assert_eq!(source, ListSource::Local);
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn failed_remote_delete_does_not_resurrect_photo() {
        let (service, store, remote) = mirrored();
        let keep = service.save(new_photo("u1", "keep")).await.unwrap();
        let gone = service.save(new_photo("u1", "gone")).await.unwrap();
        service.flush().await;

        remote.fail("delete");
        service.delete(&gone.id).await.unwrap();
        service.flush().await;
        assert!(remote.has(&gone.id), "remote still holds the stale copy");

        remote.heal();
        let ids: Vec<_> = service.list("u1").await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![keep.id]);

        // The listing re-sent the delete, so the remote converges.
        service.flush().await;
        assert!(!remote.has(&gone.id));
        assert!(store.tombstones(&[gone.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_remote_update_is_not_undone_by_listing() {
        let (service, store, remote) = mirrored();
        let saved = service.save(new_photo("u1", "before")).await.unwrap();
        service.flush().await;

        remote.fail("update");
        service.update(&saved.id, PhotoUpdate::caption("after")).await.unwrap();
        service.flush().await;
        assert_eq!(remote.caption_of(&saved.id), "before");

        remote.heal();
        let (listed, source) = service.list_with_source("u1").await.unwrap();
        assert_eq!(source, ListSource::Remote);
        assert_eq!(listed[0].caption, "after");
        assert_eq!(store.get(&saved.id).await.unwrap().unwrap().caption, "after");

        // The listing re-sent the edit, so the remote converges.
        service.flush().await;
        assert_eq!(remote.caption_of(&saved.id), "after");
        assert_eq!(service.list("u1").await.unwrap()[0].caption, "after");
    }

    #[tokio::test]
    async fn late_save_mirror_does_not_undo_edit() {
        let (service, _store, remote) = mirrored();
        remote.fail("save");
        let saved = service.save(new_photo("u1", "before")).await.unwrap();
        // The update mirror reaches the remote before any row exists.
        service.update(&saved.id, PhotoUpdate::caption("after")).await.unwrap();
        service.flush().await;
        remote.heal();

        // The save then lands with the original content.
        remote.insert(saved.clone());

        let listed = service.list("u1").await.unwrap();
        assert_eq!(listed[0].caption, "after");
        service.flush().await;
        assert_eq!(remote.caption_of(&saved.id), "after");
    }

    #[tokio::test]
    async fn newer_remote_edit_wins() {
        let (service, store, remote) = mirrored();
        let saved = service.save(new_photo("u1", "mine")).await.unwrap();
        service.flush().await;

        let mut edited = saved.clone();
        edited.caption = "edited on phone".into();
        edited.updated_at = saved.updated_at + Duration::minutes(5);
        remote.insert(edited.clone());

        assert_eq!(service.list("u1").await.unwrap(), vec![edited.clone()]);
        assert_eq!(store.get(&saved.id).await.unwrap(), Some(edited));
    }

    #[tokio::test]
    async fn confirmed_remote_delete_clears_tombstone() {
        let (service, store, _remote) = mirrored();
        let saved = service.save(new_photo("u1", "bye")).await.unwrap();
        service.delete(&saved.id).await.unwrap();
        service.flush().await;
        assert!(store.tombstones(&[saved.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deletes_of_unknown_ids_do_not_fill_the_store() {
        let store = Arc::new(MemoryRecordStore::with_capacity(1));
        let remote = Arc::new(FakeRemote::default());
        remote.fail("delete");
        let service = PhotoService::new(store.clone(), Some(remote.clone()));

        let ids: Vec<String> = (0..1000).map(|i| format!("never-existed-{i}")).collect();
        for id in &ids {
            service.delete(id).await.unwrap();
        }
        service.flush().await;

        assert!(store.tombstones(&ids).await.unwrap().is_empty());
        service.save(new_photo("u1", "still fits")).await.unwrap();
    }

    #[tokio::test]
    async fn remote_rows_of_other_users_are_dropped() {
        let (service, _store, remote) = mirrored();
        let mine = service.save(new_photo("u1", "mine")).await.unwrap();
        service.flush().await;

        // A backend ignoring the user filter.
        struct Leaky(Arc<FakeRemote>);
        #[async_trait]
        impl RemoteBackend for Leaky {
            async fn save(&self, photo: &Photo) -> Result<(), RemoteError> {
                self.0.save(photo).await
            }
            async fn fetch(&self, _user_id: &str) -> Result<Vec<Photo>, RemoteError> {
                Ok(self.0.rows.lock().unwrap().values().cloned().collect())
            }
            async fn update(
                &self,
                id: &str,
                update: &PhotoUpdate,
                updated_at: DateTime<Utc>,
            ) -> Result<(), RemoteError> {
                self.0.update(id, update, updated_at).await
            }
            async fn delete(&self, id: &str) -> Result<(), RemoteError> {
                self.0.delete(id).await
            }
        }

        let now = store::now();
        remote.insert(Photo {
            id: "theirs".into(),
            user_id: "u2".into(),
            image: "img".into(),
            caption: "not yours".into(),
            song: None,
            song_name: None,
            created_at: now,
            updated_at: now,
        });
        let leaky = PhotoService::new(
            Arc::new(MemoryRecordStore::new()),
            Some(Arc::new(Leaky(remote))),
        );
        let listed = leaky.list("u1").await.unwrap();
        assert!(listed.iter().all(|p| p.user_id == "u1"));
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
    }
}
