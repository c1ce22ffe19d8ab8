use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::RwLock,
};

use cashbook_core::{CoreError, LedgerStore};
use cashbook_domain::LedgerData;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info};

const DATA_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;
const DEFAULT_BOOK_NAME: &str = "cashbook";

/// Where the data file and its backups live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub data_root: PathBuf,
    pub backup_root: PathBuf,
}

impl StoragePaths {
    /// `root/` for the data file and `root/backups/` for snapshots.
    pub fn under(root: &Path) -> Self {
        Self {
            data_root: root.to_path_buf(),
            backup_root: root.join("backups"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    /// File name of the backup, used as its identifier.
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub path: PathBuf,
}

/// File-backed [`LedgerStore`] keeping the whole cashbook in one JSON file.
///
/// Reads are served from an in-memory copy. Every write serializes the new
/// snapshot to a temporary file and renames it over the data file, after
/// copying the previous file into the backup directory.
pub struct JsonLedgerStore {
    name: String,
    paths: StoragePaths,
    retention: usize,
    cache: RwLock<LedgerData>,
}

impl JsonLedgerStore {
    pub fn open(paths: StoragePaths) -> Result<Self, CoreError> {
        Self::open_named(paths, DEFAULT_BOOK_NAME, DEFAULT_RETENTION)
    }

    /// Opens (or starts) the book called `name`; a missing data file yields an
    /// empty cashbook that is written on the first change.
    pub fn open_named(
        paths: StoragePaths,
        name: &str,
        retention: usize,
    ) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.data_root)?;
        fs::create_dir_all(&paths.backup_root)?;
        let name = canonical_name(name);
        let data_path = paths
            .data_root
            .join(format!("{}.{}", name, DATA_EXTENSION));
        let data = if data_path.exists() {
            load_data_from_path(&data_path)?
        } else {
            LedgerData::default()
        };
        debug!(path = %data_path.display(), "cashbook opened");
        Ok(Self {
            name,
            paths,
            retention: retention.max(1),
            cache: RwLock::new(data),
        })
    }

    pub fn data_path(&self) -> PathBuf {
        self.paths
            .data_root
            .join(format!("{}.{}", self.name, DATA_EXTENSION))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes the current snapshot to a new backup file.
    pub fn backup(&self, note: Option<&str>) -> Result<BackupInfo, CoreError> {
        let data = self.snapshot()?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut stem = format!("{}_{}", self.name, timestamp);
        if let Some(label) = sanitize_backup_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        let file_name = format!("{}.{}", stem, DATA_EXTENSION);
        let path = self.paths.backup_root.join(&file_name);
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &serialize_data(&data)?)?;
        fs::rename(&tmp, &path)?;
        self.prune_backups()?;
        info!(backup = %file_name, "cashbook backup written");
        Ok(BackupInfo {
            created_at: parse_backup_timestamp(&file_name),
            id: file_name,
            path,
        })
    }

    /// Backups of this book, newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, CoreError> {
        let dir = &self.paths.backup_root;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", self.name);
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DATA_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                if !file_name.starts_with(&prefix) {
                    continue;
                }
                entries.push(BackupInfo {
                    id: file_name.to_string(),
                    created_at: parse_backup_timestamp(file_name),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by_key(|info| Reverse(info.created_at));
        Ok(entries)
    }

    /// Replaces the data file and the in-memory copy with `backup`.
    pub fn restore_backup(&self, backup: &BackupInfo) -> Result<LedgerData, CoreError> {
        if !backup.path.exists() {
            return Err(CoreError::Storage(format!(
                "backup `{}` not found",
                backup.id
            )));
        }
        let restored = load_data_from_path(&backup.path)?;
        let mut guard = self
            .cache
            .write()
            .map_err(|_| CoreError::Storage("cashbook cache lock poisoned".into()))?;
        save_data_to_path(&restored, &self.data_path())?;
        *guard = restored.clone();
        info!(backup = %backup.id, "cashbook restored from backup");
        Ok(restored)
    }

    pub fn delete_backup(&self, backup_id: &str) -> Result<(), CoreError> {
        let path = self.paths.backup_root.join(backup_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn backup_existing_file(&self, path: &Path) -> Result<(), CoreError> {
        if !path.exists() {
            return Ok(());
        }
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let file_name = format!("{}_{}.{}", self.name, timestamp, DATA_EXTENSION);
        fs::copy(path, self.paths.backup_root.join(file_name))?;
        self.prune_backups()
    }

    fn prune_backups(&self) -> Result<(), CoreError> {
        let entries = self.list_backups()?;
        for entry in entries.into_iter().skip(self.retention) {
            debug!(backup = %entry.id, "pruning old backup");
            let _ = fs::remove_file(entry.path);
        }
        Ok(())
    }
}

impl LedgerStore for JsonLedgerStore {
    fn read(&self, view: &mut dyn FnMut(&LedgerData)) -> Result<(), CoreError> {
        let guard = self
            .cache
            .read()
            .map_err(|_| CoreError::Storage("cashbook cache lock poisoned".into()))?;
        view(&*guard);
        Ok(())
    }

    fn write(
        &self,
        change: &mut dyn FnMut(&mut LedgerData) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        let mut guard = self
            .cache
            .write()
            .map_err(|_| CoreError::Storage("cashbook cache lock poisoned".into()))?;
        let mut draft = guard.clone();
        change(&mut draft)?;
        draft.touch();

        let path = self.data_path();
        self.backup_existing_file(&path)?;
        save_data_to_path(&draft, &path)?;
        *guard = draft;
        Ok(())
    }
}

/// Saves a snapshot to an arbitrary path, replacing it atomically.
pub fn save_data_to_path(data: &LedgerData, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    write_atomic(&tmp, &serialize_data(data)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_data_from_path(path: &Path) -> Result<LedgerData, CoreError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| CoreError::Serde(err.to_string()))
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '-',
        })
        .collect();
    if sanitized.trim_matches('-').is_empty() {
        DEFAULT_BOOK_NAME.into()
    } else {
        sanitized
    }
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Reads the `YYYYMMDD_HHMM` stamp out of `<name>_<date>_<time>[_<note>].json`.
fn parse_backup_timestamp(file_name: &str) -> Option<DateTime<Utc>> {
    let stem = file_name.strip_suffix(&format!(".{}", DATA_EXTENSION))?;
    let segments = stem.split('_').collect::<Vec<_>>();
    segments.windows(2).find_map(|pair| {
        let (date, time) = (pair[0], pair[1]);
        if !is_digits(date, 8) || !is_digits(time, 4) {
            return None;
        }
        NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M")
            .ok()
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
    })
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn serialize_data(data: &LedgerData) -> Result<String, CoreError> {
    serde_json::to_string_pretty(data).map_err(|err| CoreError::Serde(err.to_string()))
}
