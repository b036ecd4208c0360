// rest_api/src/storage.rs

//! Persistence for patient records.
//!
//! The HTTP layer only sees the [`PatientStore`] trait; which engine backs it
//! is decided at startup. [`InMemoryPatientStore`] is the default and the
//! test double, [`SledPatientStore`] keeps records on disk.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use models::Patient;

/// A storage-level failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("patient with id {0} was not found")]
    NotFound(i32),
    #[error("patient record has no id assigned")]
    MissingId,
    #[error("storage error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// The patient fields the list endpoint can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    FirstName,
    LastName,
    HomePhone,
    PostalCode,
    Gender,
}

impl QueryField {
    /// Exact-match comparison against the named field of a record.
    fn matches(&self, pat: &Patient, value: &str) -> bool {
        match self {
            QueryField::FirstName => pat.fname == value,
            QueryField::LastName => pat.lname == value,
            QueryField::HomePhone => pat.phone_home == value,
            QueryField::PostalCode => pat.postal_code == value,
            QueryField::Gender => pat.gender.as_str() == value,
        }
    }
}

/// Durable create/read/update/delete/query operations over patient records.
///
/// Implementations own their concurrency discipline; handlers hold the store
/// behind an `Arc<dyn PatientStore>` and never share records across requests.
#[async_trait]
pub trait PatientStore: Send + Sync + 'static {
    /// Persists a new record, assigning the next unused id. Any id already on
    /// the record is discarded.
    async fn create(&self, pat: Patient) -> Result<Patient, StorageError>;

    /// Replaces the stored record with the same id.
    async fn save(&self, pat: Patient) -> Result<Patient, StorageError>;

    /// Removes a record. Deleting an id that does not exist is a no-op.
    async fn delete(&self, pat_id: i32) -> Result<(), StorageError>;

    /// Looks up a single record by id.
    async fn find_by_id(&self, pat_id: i32) -> Result<Option<Patient>, StorageError>;

    /// Returns all records whose `field` equals `value`, in id order.
    async fn find_by_field(
        &self,
        field: QueryField,
        value: &str,
    ) -> Result<Vec<Patient>, StorageError>;

    /// Returns all records in id order.
    async fn all(&self) -> Result<Vec<Patient>, StorageError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    pats: BTreeMap<i32, Patient>,
    next_id: i32,
}

/// In-memory patient store. Ids are handed out by a counter that never goes
/// backwards, so a deleted id is not reused.
#[derive(Debug, Default)]
pub struct InMemoryPatientStore {
    inner: RwLock<MemoryInner>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn create(&self, mut pat: Patient) -> Result<Patient, StorageError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        pat.id = Some(id);
        info!("Creating {} {} with id {}", pat.fname, pat.lname, id);
        inner.pats.insert(id, pat.clone());
        Ok(pat)
    }

    async fn save(&self, pat: Patient) -> Result<Patient, StorageError> {
        let id = pat.id.ok_or(StorageError::MissingId)?;
        let mut inner = self.inner.write().await;
        if !inner.pats.contains_key(&id) {
            return Err(StorageError::NotFound(id));
        }
        info!("Saving {} {}", pat.fname, pat.lname);
        inner.pats.insert(id, pat.clone());
        Ok(pat)
    }

    async fn delete(&self, pat_id: i32) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.pats.remove(&pat_id).is_some() {
            info!("Deleted patient {}", pat_id);
        }
        Ok(())
    }

    async fn find_by_id(&self, pat_id: i32) -> Result<Option<Patient>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.pats.get(&pat_id).cloned())
    }

    async fn find_by_field(
        &self,
        field: QueryField,
        value: &str,
    ) -> Result<Vec<Patient>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .pats
            .values()
            .filter(|pat| field.matches(pat, value))
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Patient>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.pats.values().cloned().collect())
    }
}

const PATIENTS_TREE: &str = "patients";
const NEXT_ID_KEY: &[u8] = b"next_patient_id";

/// Sled-backed patient store. Records live in one tree under big-endian id
/// keys (so iteration is id order); the id counter is a meta key on the db
/// itself and survives restarts and deletes.
#[derive(Debug)]
pub struct SledPatientStore {
    db: sled::Db,
    pats: sled::Tree,
}

impl SledPatientStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let pats = db.open_tree(PATIENTS_TREE)?;
        Ok(SledPatientStore { db, pats })
    }

    fn next_id(&self) -> Result<i32, StorageError> {
        let updated = self.db.update_and_fetch(NEXT_ID_KEY, |old| {
            let next = old
                .and_then(|bytes| bytes.try_into().ok())
                .map(i32::from_be_bytes)
                .unwrap_or(0)
                + 1;
            Some(next.to_be_bytes().to_vec())
        })?;
        updated
            .as_deref()
            .and_then(|bytes| bytes.try_into().ok())
            .map(i32::from_be_bytes)
            .ok_or_else(|| StorageError::Backend("id counter is corrupt".to_string()))
    }

    fn encode_record(pat: &Patient) -> Result<Vec<u8>, StorageError> {
        Ok(serde_json::to_vec(&pat.serialize())?)
    }

    // Stored bytes are the encoded form of a record that already passed
    // validation, so a decode failure here means the tree is corrupt.
    fn decode_record(bytes: &[u8]) -> Result<Patient, StorageError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let mut pat = Patient::default();
        pat.deserialize(&value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        pat.id = value.get("id").and_then(serde_json::Value::as_i64).map(|id| id as i32);
        Ok(pat)
    }
}

#[async_trait]
impl PatientStore for SledPatientStore {
    async fn create(&self, mut pat: Patient) -> Result<Patient, StorageError> {
        let id = self.next_id()?;
        pat.id = Some(id);
        info!("Creating {} {} with id {}", pat.fname, pat.lname, id);
        self.pats.insert(id.to_be_bytes(), Self::encode_record(&pat)?)?;
        self.pats.flush_async().await?;
        Ok(pat)
    }

    async fn save(&self, pat: Patient) -> Result<Patient, StorageError> {
        let id = pat.id.ok_or(StorageError::MissingId)?;
        if self.pats.get(id.to_be_bytes())?.is_none() {
            return Err(StorageError::NotFound(id));
        }
        info!("Saving {} {}", pat.fname, pat.lname);
        self.pats.insert(id.to_be_bytes(), Self::encode_record(&pat)?)?;
        self.pats.flush_async().await?;
        Ok(pat)
    }

    async fn delete(&self, pat_id: i32) -> Result<(), StorageError> {
        if self.pats.remove(pat_id.to_be_bytes())?.is_some() {
            info!("Deleted patient {}", pat_id);
            self.pats.flush_async().await?;
        }
        Ok(())
    }

    async fn find_by_id(&self, pat_id: i32) -> Result<Option<Patient>, StorageError> {
        match self.pats.get(pat_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(Self::decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_by_field(
        &self,
        field: QueryField,
        value: &str,
    ) -> Result<Vec<Patient>, StorageError> {
        let mut pats = Vec::new();
        for entry in self.pats.iter() {
            let (_, bytes) = entry?;
            let pat = Self::decode_record(&bytes)?;
            if field.matches(&pat, value) {
                pats.push(pat);
            }
        }
        Ok(pats)
    }

    async fn all(&self) -> Result<Vec<Patient>, StorageError> {
        let mut pats = Vec::new();
        for entry in self.pats.iter() {
            let (_, bytes) = entry?;
            pats.push(Self::decode_record(&bytes)?);
        }
        Ok(pats)
    }
}
