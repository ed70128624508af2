use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::csv_store::CsvStore;
use crate::db::SqliteStore;
use crate::error::{MealError, Result};
use crate::image::{ImageRef, release_file};
use crate::models::{
    Counter, EXPORT_VERSION, ExportData, ImportSummary, MAX_COUNTER, MealRecord, NewMeal,
    format_timestamp, validate_new_meal,
};
use crate::store::{MealStore, StoreKind};

/// A read of the whole repository that never fails.
///
/// When the medium could not be read, `records` is empty and `error` says
/// why, so a feed can render empty with a warning instead of crashing.
#[derive(Debug)]
pub struct Snapshot {
    pub records: Vec<MealRecord>,
    pub error: Option<MealError>,
}

impl Snapshot {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The meal repository. Every medium gets the same contract: validation,
/// id assignment, timestamps, and image cleanup happen here, the store only
/// persists rows.
pub struct MealRepository {
    store: Box<dyn MealStore>,
    image_root: Option<PathBuf>,
}

impl MealRepository {
    pub fn new(store: Box<dyn MealStore>) -> Self {
        Self {
            store,
            image_root: None,
        }
    }

    pub fn open(kind: StoreKind, path: &Path) -> Result<Self> {
        match kind {
            StoreKind::Sqlite => Self::open_sqlite(path),
            StoreKind::Csv => Ok(Self::open_csv(path)),
        }
    }

    pub fn open_sqlite(path: &Path) -> Result<Self> {
        Ok(Self::new(Box::new(SqliteStore::open(path)?)))
    }

    #[must_use]
    pub fn open_csv(path: &Path) -> Self {
        Self::new(Box::new(CsvStore::open(path)))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Box::new(SqliteStore::open_in_memory()?)))
    }

    /// Resolve relative local image paths against `root`. Without a root,
    /// deleting a meal never touches image files.
    #[must_use]
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn image_root(&self) -> Option<&Path> {
        self.image_root.as_deref()
    }

    // --- Core contract ---

    pub fn create(&mut self, meal: NewMeal) -> Result<String> {
        let meal = meal.normalize();
        validate_new_meal(&meal)?;
        let id = Uuid::new_v4().to_string();
        let record = meal.into_record(id.clone(), Utc::now());
        if !record.calories_match_macros() {
            tracing::warn!(id = %id, calories = record.calories, "calories differ from macro total");
        }
        self.store.insert(&record)?;
        tracing::info!(id = %id, name = %record.name, category = %record.category, "created meal");
        Ok(id)
    }

    pub fn get_all(&self) -> Result<Vec<MealRecord>> {
        let records = self.store.load_all()?;
        tracing::debug!(count = records.len(), "loaded meals");
        Ok(records)
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        match self.get_all() {
            Ok(records) => Snapshot {
                records,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "meal storage unreadable, serving empty snapshot");
                Snapshot {
                    records: Vec::new(),
                    error: Some(e),
                }
            }
        }
    }

    pub fn get_by_id(&self, id: &str) -> Result<MealRecord> {
        self.store
            .find(id)?
            .ok_or_else(|| MealError::NotFound(id.to_string()))
    }

    /// Replace every field except `id` and `created_at`.
    pub fn update(&mut self, id: &str, meal: NewMeal) -> Result<MealRecord> {
        let meal = meal.normalize();
        validate_new_meal(&meal)?;
        let existing = self.get_by_id(id)?;
        let record = meal.into_record(existing.id, existing.created_at);
        if !self.store.replace(&record)? {
            return Err(MealError::NotFound(id.to_string()));
        }
        tracing::info!(id = %id, "updated meal");
        Ok(record)
    }

    /// Remove a meal. A local image file under the image root goes with it
    /// unless another meal still points at the same file.
    ///
    /// Once the row is gone the call succeeds: a failure to release the
    /// image is logged, not returned.
    pub fn delete(&mut self, id: &str) -> Result<MealRecord> {
        let removed = self
            .store
            .remove(id)?
            .ok_or_else(|| MealError::NotFound(id.to_string()))?;
        tracing::info!(id = %id, "deleted meal");

        if let Err(e) = self.release_image(&removed) {
            tracing::warn!(id = %id, error = %e, "meal deleted but its image was not released");
        }
        Ok(removed)
    }

    fn release_image(&self, removed: &MealRecord) -> Result<()> {
        let image = removed.image();
        let ImageRef::Local(_) = &image else {
            return Ok(());
        };
        let Some(root) = self.image_root() else {
            tracing::debug!(id = %removed.id, "no image root configured, keeping file");
            return Ok(());
        };
        let Some(path) = image.resolve_under(root) else {
            tracing::warn!(id = %removed.id, image = %image.display(), "image path outside the image root, keeping file");
            return Ok(());
        };
        let shared = self
            .store
            .load_all()?
            .iter()
            .any(|m| m.image().resolve_under(root).as_ref() == Some(&path));
        if shared {
            tracing::debug!(id = %removed.id, "image still referenced, keeping file");
            return Ok(());
        }
        release_file(&path)?;
        Ok(())
    }

    /// Add one to a counter and return its new value.
    pub fn increment(&mut self, id: &str, counter: Counter) -> Result<u64> {
        let mut record = self.get_by_id(id)?;
        let slot = record.counter_mut(counter);
        *slot = slot.saturating_add(1).min(MAX_COUNTER);
        let value = *slot;
        if !self.store.replace(&record)? {
            return Err(MealError::NotFound(id.to_string()));
        }
        tracing::debug!(id = %id, ?counter, value, "incremented counter");
        Ok(value)
    }

    // --- Profile, import, export ---

    /// The user's meals in storage order.
    pub fn owned_by(&self, user_id: &str) -> Result<Vec<MealRecord>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|m| m.owner_user_id.as_deref() == Some(user_id))
            .collect())
    }

    /// Insert records that already carry ids and timestamps. Records whose id
    /// is already stored are skipped. Each record is normalized the same way
    /// `create` normalizes a submission, so what is read back equals what was
    /// inserted on every medium. Nothing is written if any record fails
    /// validation.
    pub fn import_records(&mut self, records: Vec<MealRecord>) -> Result<ImportSummary> {
        let records = records
            .into_iter()
            .map(normalize_imported)
            .collect::<Result<Vec<_>>>()?;

        let mut known: HashSet<String> = self.get_all()?.into_iter().map(|m| m.id).collect();
        let mut summary = ImportSummary::default();
        for record in records {
            if known.contains(&record.id) {
                summary.skipped_existing += 1;
                continue;
            }
            self.store.insert(&record)?;
            known.insert(record.id);
            summary.imported += 1;
        }
        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped_existing,
            "imported meals"
        );
        Ok(summary)
    }

    pub fn export(&self) -> Result<ExportData> {
        Ok(ExportData {
            version: EXPORT_VERSION,
            exported_at: format_timestamp(&Utc::now()),
            meals: self.get_all()?,
        })
    }
}

/// Normalize and validate a record from outside, keeping its id and
/// timestamp.
fn normalize_imported(record: MealRecord) -> Result<MealRecord> {
    let id = record.id.trim().to_string();
    if id.is_empty() {
        return Err(MealError::validation(format!(
            "{}: imported meal has no id",
            record.name
        )));
    }
    let meal = record.to_new_meal().normalize();
    validate_new_meal(&meal).map_err(|e| match e {
        MealError::Validation(msg) => {
            MealError::Validation(format!("{} ({id}): {msg}", record.name))
        }
        other => other,
    })?;
    Ok(meal.into_record(id, record.created_at))
}
