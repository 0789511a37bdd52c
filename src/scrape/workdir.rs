// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-request working directory with guaranteed cleanup
//!
//! A `WorkingDirectory` is allocated before any I/O and owned by exactly one
//! request. Removal happens exactly once, through an explicit `cleanup()`
//! call or when the value is dropped, so it also runs on panics and
//! cancelled futures.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Removal failure; logged, never propagated
#[derive(Debug, Error)]
#[error("Failed to remove working directory {path}: {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Scoped temporary directory for one scrape request
#[derive(Debug)]
pub struct WorkingDirectory {
    path: PathBuf,
    cleaned: AtomicBool,
}

impl WorkingDirectory {
    /// Reserve a unique path under `root` without touching the filesystem
    ///
    /// Names combine wall-clock milliseconds with a random suffix, so
    /// collisions are improbable rather than impossible.
    pub fn allocate(root: &Path) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(7)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        let name = format!(
            "scrape-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            suffix
        );
        Self::at(root.join(name))
    }

    /// Take ownership of an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cleaned: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_cleaned(&self) -> bool {
        self.cleaned.load(Ordering::Acquire)
    }

    /// Recursively remove the directory
    ///
    /// Only the first call does any work; later calls return `false`.
    /// A directory that was never created counts as cleaned.
    pub fn cleanup(&self) -> bool {
        if self.cleaned.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.report(Self::remove(&self.path));
        true
    }

    /// Same as `cleanup`, with the removal on the blocking pool
    ///
    /// Used from async code. If this future is dropped mid-way the removal
    /// still finishes on its own thread.
    pub async fn cleanup_async(&self) -> bool {
        if self.cleaned.swap(true, Ordering::AcqRel) {
            return false;
        }

        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || Self::remove(&path)).await {
            Ok(result) => self.report(result),
            Err(e) => warn!(
                "Removal task for {} did not finish: {}",
                self.path.display(),
                e
            ),
        }
        true
    }

    fn report(&self, result: Result<bool, CleanupError>) {
        match result {
            Ok(true) => info!("Removed working directory: {}", self.path.display()),
            Ok(false) => debug!("Working directory never created: {}", self.path.display()),
            Err(e) => warn!("{}", e),
        }
    }

    fn remove(path: &Path) -> Result<bool, CleanupError> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CleanupError {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        self.cleanup();
    }
}
