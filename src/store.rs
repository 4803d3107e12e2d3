//! Flat JSON files holding clients, wholesalers, reports and the company
//! settings.
//!
//! Every write copies the previous file into `backups/` first and lands the
//! new contents through a temp file and rename.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Client, CompanySettings, Report, WholesalerInfo};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

const COMPANY_FILE: &str = "company_settings.json";
const BACKUP_DIR: &str = "backups";

/// A collection stored as one JSON array.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: &'static str;
    const FILE: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

impl Record for Client {
    const KIND: &'static str = "client";
    const FILE: &'static str = "clients.json";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Record for WholesalerInfo {
    const KIND: &'static str = "wholesaler";
    const FILE: &'static str = "wholesalers.json";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Record for Report {
    const KIND: &'static str = "report";
    const FILE: &'static str = "reports.json";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Opens the store in `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        let backups = dir.join(BACKUP_DIR);
        fs::create_dir_all(&backups).map_err(|source| StoreError::Io {
            path: backups.clone(),
            source,
        })?;
        info!(dir = %dir.display(), "data store opened");
        Ok(JsonStore {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ------------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------------

    pub fn list<R: Record>(&self) -> StoreResult<Vec<R>> {
        self.read_file(R::FILE)
    }

    pub fn get<R: Record>(&self, id: &str) -> StoreResult<R> {
        self.list::<R>()?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| not_found::<R>(id))
    }

    /// Stores `record` under a fresh id.
    pub fn create<R: Record>(&self, mut record: R) -> StoreResult<R> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<R> = self.read_file(R::FILE)?;
        record.set_id(Uuid::new_v4().to_string());
        records.push(record.clone());
        self.write_file(R::FILE, &records)?;
        debug!(kind = R::KIND, id = record.id(), "record created");
        Ok(record)
    }

    /// Replaces the record with `id`, keeping the id.
    pub fn update<R: Record>(&self, id: &str, mut record: R) -> StoreResult<R> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<R> = self.read_file(R::FILE)?;
        let slot = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| not_found::<R>(id))?;
        record.set_id(id.to_string());
        *slot = record.clone();
        self.write_file(R::FILE, &records)?;
        debug!(kind = R::KIND, id, "record updated");
        Ok(record)
    }

    pub fn delete<R: Record>(&self, id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<R> = self.read_file(R::FILE)?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Err(not_found::<R>(id));
        }
        self.write_file(R::FILE, &records)?;
        debug!(kind = R::KIND, id, "record deleted");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Wholesaler whose name matches `name`, ignoring case and surrounding
    /// whitespace.
    pub fn find_wholesaler_by_name(&self, name: &str) -> StoreResult<Option<WholesalerInfo>> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list::<WholesalerInfo>()?
            .into_iter()
            .find(|w| w.name.trim().to_lowercase() == wanted))
    }

    pub fn reports_for_client(&self, client_id: &str) -> StoreResult<Vec<Report>> {
        let mut reports = self.list::<Report>()?;
        reports.retain(|r| r.client_id == client_id);
        Ok(reports)
    }

    // ------------------------------------------------------------------------
    // Company settings
    // ------------------------------------------------------------------------

    pub fn company_settings(&self) -> StoreResult<CompanySettings> {
        self.read_file(COMPANY_FILE)
    }

    pub fn put_company_settings(&self, settings: &CompanySettings) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_file(COMPANY_FILE, settings)?;
        debug!("company settings saved");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    /// Missing files read as the empty value.
    fn read_file<T: DeserializeOwned + Default>(&self, file: &str) -> StoreResult<T> {
        let path = self.dir.join(file);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Json { path, source })
    }

    fn write_file<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> StoreResult<()> {
        let path = self.dir.join(file);
        if path.exists() {
            self.backup(file, &path)?;
        }

        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }

    fn backup(&self, file: &str, path: &Path) -> StoreResult<()> {
        let stem = file.trim_end_matches(".json");
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let target = self
            .dir
            .join(BACKUP_DIR)
            .join(format!("{stem}.{stamp}.json"));
        fs::copy(path, &target)
            .map(|_| ())
            .map_err(|source| StoreError::Io {
                path: target,
                source,
            })
    }
}

fn not_found<R: Record>(id: &str) -> StoreError {
    StoreError::NotFound {
        kind: R::KIND,
        id: id.to_string(),
    }
}
