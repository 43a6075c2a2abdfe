use super::{CatalogDocument, Subject, Unit};
use crate::error::{Outcome, PortalError, Result, Warning};
use crate::files::{allowed_file, sanitize_filename};
use crate::storage::{ObjectStore, Scope};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Loads and saves the per-scope catalog document. Saves are wholesale
/// overwrites with no version token; concurrent writers to the same scope
/// are last-writer-wins (see the lost-update regression test).
pub struct CatalogStore {
    store: Arc<dyn ObjectStore>,
}

impl CatalogStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetches the scope's document, creating and persisting defaults when it
    /// is absent or unreadable. Never fails: a broken read degrades to an
    /// empty catalog with a warning.
    pub async fn load(&self, scope: Scope) -> Outcome<CatalogDocument> {
        let key = scope.document_key();
        let mut warnings = Vec::new();

        match self.store.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<CatalogDocument>(&bytes) {
                Ok(doc) => return Outcome::clean(doc),
                Err(e) => warnings.push(Warning::DocumentLoadFailed {
                    key: key.clone(),
                    reason: e.to_string(),
                }),
            },
            Ok(None) => {}
            Err(e) => warnings.push(Warning::DocumentLoadFailed {
                key: key.clone(),
                reason: e.to_string(),
            }),
        }

        let mut doc = CatalogDocument::default();
        if let Err(e) = self.save(scope, &mut doc).await {
            warnings.push(Warning::SeedWriteFailed {
                key,
                reason: e.to_string(),
            });
        }
        Outcome::with_warnings(doc, warnings)
    }

    /// Recomputes derived stats, stamps `last_updated` and overwrites the
    /// remote document.
    pub async fn save(&self, scope: Scope, doc: &mut CatalogDocument) -> Result<()> {
        doc.recompute_stats();
        let bytes = serde_json::to_vec_pretty(doc)?;
        self.store
            .put(&scope.document_key(), bytes, "application/json")
            .await
    }
}

/// Fields of a unit supplied by the caller. The unit number is unchecked;
/// duplicates within a subject are allowed.
#[derive(Debug, Clone)]
pub struct NewUnit {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub topics: String,
    pub pages_count: u32,
}

impl NewUnit {
    fn into_unit(self, filename: Option<String>) -> Unit {
        Unit {
            id: Uuid::new_v4().to_string(),
            number: self.number,
            title: self.title,
            description: self.description,
            topics: self.topics,
            pages_count: self.pages_count,
            filename,
            icon: "fas fa-file-alt".to_string(),
            created_at: Utc::now(),
        }
    }

    fn apply_to(&self, unit: &mut Unit) {
        unit.number = self.number;
        unit.title = self.title.clone();
        unit.description = self.description.clone();
        unit.topics = self.topics.clone();
        unit.pages_count = self.pages_count;
    }
}

/// An uploaded file part, as received from the multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Subject/unit mutations over the catalog document plus the blob store.
/// Every mutation is read-modify-write against the whole document; blob
/// cleanup is best-effort and reported as warnings rather than failures.
pub struct CatalogService {
    docs: CatalogStore,
    blobs: Arc<dyn ObjectStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            docs: CatalogStore::new(store.clone()),
            blobs: store,
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.docs
    }

    /// Loads the catalog for a student visit and bumps the visit counter.
    pub async fn visit(&self, scope: Scope) -> Result<Outcome<CatalogDocument>> {
        let mut out = self.docs.load(scope).await;
        out.value.stats.total_visits += 1;
        self.docs.save(scope, &mut out.value).await?;
        Ok(out)
    }

    pub async fn add_subject(
        &self,
        scope: Scope,
        name: &str,
        icon: &str,
    ) -> Result<Outcome<Subject>> {
        let mut out = self.docs.load(scope).await;
        if out.value.has_subject_named(name) {
            return Err(PortalError::AlreadyExists("Subject"));
        }

        let subject = Subject::new(name, icon);
        out.value.subjects.push(subject.clone());
        self.docs.save(scope, &mut out.value).await?;

        info!("Added subject '{}' to {}", name, scope);
        Ok(Outcome::with_warnings(subject, out.warnings))
    }

    pub async fn edit_subject(
        &self,
        scope: Scope,
        subject_id: &str,
        name: &str,
        icon: &str,
    ) -> Result<Outcome<Subject>> {
        let mut out = self.docs.load(scope).await;
        let subject = out
            .value
            .subject_mut(subject_id)
            .ok_or(PortalError::NotFound("Subject"))?;
        subject.name = name.to_string();
        subject.icon = icon.to_string();
        let updated = subject.clone();
        self.docs.save(scope, &mut out.value).await?;
        Ok(Outcome::with_warnings(updated, out.warnings))
    }

    /// Removes a subject and best-effort deletes every stored file its units
    /// referenced. A failed blob delete leaves an orphan and a warning, never
    /// a failure.
    pub async fn delete_subject(&self, scope: Scope, subject_id: &str) -> Result<Outcome<()>> {
        let mut out = self.docs.load(scope).await;
        let idx = out
            .value
            .subjects
            .iter()
            .position(|s| s.id == subject_id)
            .ok_or(PortalError::NotFound("Subject"))?;
        let removed = out.value.subjects.remove(idx);

        let mut warnings = out.warnings;
        for unit in &removed.units {
            if let Some(filename) = &unit.filename {
                let key = scope.object_key(filename);
                if let Err(e) = self.blobs.delete(&key).await {
                    warn!("Failed to delete blob {}: {}", key, e);
                    warnings.push(Warning::BlobDeleteFailed {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.docs.save(scope, &mut out.value).await?;
        info!("Deleted subject '{}' from {}", removed.name, scope);
        Ok(Outcome::with_warnings((), warnings))
    }

    /// Creates a unit. An upload with a disallowed extension is silently
    /// ignored and the unit is created without an attachment.
    pub async fn add_unit(
        &self,
        scope: Scope,
        subject_id: &str,
        fields: NewUnit,
        upload: Option<Upload>,
    ) -> Result<Outcome<Unit>> {
        let filename = self.store_upload(scope, upload).await?;

        let mut out = self.docs.load(scope).await;
        let subject = out
            .value
            .subject_mut(subject_id)
            .ok_or(PortalError::NotFound("Subject"))?;
        let unit = fields.into_unit(filename);
        subject.units.push(unit.clone());
        self.docs.save(scope, &mut out.value).await?;

        info!("Added unit '{}' to subject {} in {}", unit.title, subject_id, scope);
        Ok(Outcome::with_warnings(unit, out.warnings))
    }

    /// Updates a unit's fields. A valid replacement upload deletes the old
    /// blob first (best-effort) and overwrites the recorded filename.
    pub async fn edit_unit(
        &self,
        scope: Scope,
        subject_id: &str,
        unit_id: &str,
        fields: NewUnit,
        upload: Option<Upload>,
    ) -> Result<Outcome<Unit>> {
        let mut out = self.docs.load(scope).await;
        let mut warnings = std::mem::take(&mut out.warnings);

        let unit = out
            .value
            .subject_mut(subject_id)
            .and_then(|s| s.unit_mut(unit_id))
            .ok_or(PortalError::NotFound("Unit"))?;
        fields.apply_to(unit);

        if let Some(upload) = upload.filter(|u| allowed_file(&u.filename)) {
            if let Some(old) = &unit.filename {
                let key = scope.object_key(old);
                if let Err(e) = self.blobs.delete(&key).await {
                    warn!("Failed to delete blob {}: {}", key, e);
                    warnings.push(Warning::BlobDeleteFailed {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
            let filename = sanitize_filename(&upload.filename);
            self.blobs
                .put(&scope.object_key(&filename), upload.bytes, "application/octet-stream")
                .await?;
            unit.filename = Some(filename);
        }

        let updated = unit.clone();
        self.docs.save(scope, &mut out.value).await?;
        Ok(Outcome::with_warnings(updated, warnings))
    }

    pub async fn delete_unit(
        &self,
        scope: Scope,
        subject_id: &str,
        unit_id: &str,
    ) -> Result<Outcome<()>> {
        let mut out = self.docs.load(scope).await;
        let mut warnings = std::mem::take(&mut out.warnings);

        let subject = out
            .value
            .subject_mut(subject_id)
            .ok_or(PortalError::NotFound("Unit"))?;
        let idx = subject
            .units
            .iter()
            .position(|u| u.id == unit_id)
            .ok_or(PortalError::NotFound("Unit"))?;
        let removed = subject.units.remove(idx);

        if let Some(filename) = &removed.filename {
            let key = scope.object_key(filename);
            if let Err(e) = self.blobs.delete(&key).await {
                warn!("Failed to delete blob {}: {}", key, e);
                warnings.push(Warning::BlobDeleteFailed {
                    key,
                    reason: e.to_string(),
                });
            }
        }

        self.docs.save(scope, &mut out.value).await?;
        Ok(Outcome::with_warnings((), warnings))
    }

    /// Fetches a stored file and bumps the download counter. A failed
    /// counter bump degrades to a warning; the download itself still
    /// succeeds.
    pub async fn download(&self, scope: Scope, filename: &str) -> Result<Outcome<Option<Vec<u8>>>> {
        let key = scope.object_key(filename);
        let Some(bytes) = self.blobs.get(&key).await? else {
            return Ok(Outcome::clean(None));
        };

        let mut out = self.docs.load(scope).await;
        let mut warnings = std::mem::take(&mut out.warnings);
        out.value.stats.total_downloads += 1;
        if let Err(e) = self.docs.save(scope, &mut out.value).await {
            warn!("Failed to bump download counter for {}: {}", scope, e);
            warnings.push(Warning::CounterBumpFailed {
                key: scope.document_key(),
                reason: e.to_string(),
            });
        }

        Ok(Outcome::with_warnings(Some(bytes), warnings))
    }

    /// Uploads an attachment if one was supplied and its extension is
    /// allowed; otherwise the unit simply gets no attachment.
    async fn store_upload(&self, scope: Scope, upload: Option<Upload>) -> Result<Option<String>> {
        let Some(upload) = upload.filter(|u| allowed_file(&u.filename)) else {
            return Ok(None);
        };
        let filename = sanitize_filename(&upload.filename);
        self.blobs
            .put(&scope.object_key(&filename), upload.bytes, "application/octet-stream")
            .await?;
        Ok(Some(filename))
    }
}
