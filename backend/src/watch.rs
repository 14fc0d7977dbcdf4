//! Polls a directory for new replay dumps and ingests them one at a time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};

use crate::ingest::{self, IngestError, IngestSettings};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileState {
    Pending,
    Processed { at: DateTime<Utc> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchedFile {
    pub modified: SystemTime,
    pub state: FileState,
}

/// Files that appeared, were rewritten or disappeared since the previous scan.
#[derive(Debug, Default, PartialEq)]
pub struct ScanDiff {
    pub added: Vec<PathBuf>,
    pub changed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct DirectoryWatch {
    dir: PathBuf,
    extension: String,
    files: BTreeMap<PathBuf, WatchedFile>,
}

impl DirectoryWatch {
    pub fn new<P>(dir: P, extension: &str) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_owned(),
            files: BTreeMap::new(),
        }
    }

    pub fn state(&self, path: &Path) -> Option<&FileState> {
        self.files.get(path).map(|f| &f.state)
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &WatchedFile)> + '_ {
        self.files.iter().map(|(p, f)| (p.as_path(), f))
    }

    fn wanted(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case(&self.extension))
    }

    /// Diffs the directory listing against the known files. New files and files whose
    /// modification time moved are [`FileState::Pending`], removed ones are forgotten.
    #[tracing::instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn scan(&mut self) -> std::io::Result<ScanDiff> {
        let mut current = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !self.wanted(&path) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                current.insert(path, metadata.modified()?);
            }
        }

        let removed: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|path| !current.contains_key(*path))
            .cloned()
            .collect();
        for path in removed.iter() {
            self.files.remove(path);
        }

        let mut added = Vec::new();
        let mut changed = Vec::new();
        for (path, modified) in current {
            match self.files.get_mut(&path) {
                Some(known) if known.modified == modified => {}
                Some(known) => {
                    known.modified = modified;
                    known.state = FileState::Pending;
                    changed.push(path);
                }
                None => {
                    self.files.insert(
                        path.clone(),
                        WatchedFile {
                            modified,
                            state: FileState::Pending,
                        },
                    );
                    added.push(path);
                }
            }
        }

        if !added.is_empty() || !changed.is_empty() || !removed.is_empty() {
            tracing::debug!(
                added = added.len(),
                changed = changed.len(),
                removed = removed.len(),
                "Directory changed"
            );
        }

        Ok(ScanDiff {
            added,
            changed,
            removed,
        })
    }

    /// Pending files, least recently modified first.
    pub fn pending(&self) -> Vec<PathBuf> {
        let mut pending: Vec<(&SystemTime, &PathBuf)> = self
            .files
            .iter()
            .filter(|(_, f)| f.state == FileState::Pending)
            .map(|(p, f)| (&f.modified, p))
            .collect();
        pending.sort();

        pending.into_iter().map(|(_, p)| p.clone()).collect()
    }

    fn set_state(&mut self, path: &Path, state: FileState) {
        if let Some(file) = self.files.get_mut(path) {
            file.state = state;
        }
    }

    /// Scans once and ingests every pending file. Returns how many were ingested.
    pub async fn poll<S>(&mut self, store: &mut S, settings: &IngestSettings) -> Result<usize, IngestError>
    where
        S: Store + ?Sized,
    {
        self.scan().await?;

        let mut ingested = 0;
        for path in self.pending() {
            match ingest::ingest_file(store, &path, settings).await {
                Ok(_) => {
                    self.set_state(&path, FileState::Processed { at: Utc::now() });
                    ingested += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(path = %path.display(), "Failed to ingest replay: {}", e);
                    self.set_state(
                        &path,
                        FileState::Failed {
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        Ok(ingested)
    }

    /// Polls every `period` until a fatal store error occurs.
    #[tracing::instrument(skip_all, fields(dir = %self.dir.display()))]
    pub async fn run<S>(
        mut self,
        store: &mut S,
        settings: &IngestSettings,
        period: Duration,
    ) -> Result<(), IngestError>
    where
        S: Store + ?Sized,
    {
        tracing::info!(extension = %self.extension, "Watching for replays");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;

            match self.poll(store, settings).await {
                Ok(0) => {}
                Ok(ingested) => tracing::info!(ingested, "Processed new replays"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!("Polling directory: {}", e),
            }
        }
    }
}
