//! Persisting review images and naming them without collisions.

use crate::{
    error::{AnalysisError, AnalysisResult},
    plot::{figure_from_ecg, PlotBackend, PngBackend},
    signal::{RPeakSet, TimeSeries},
};
use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub const DEFAULT_IMAGE_SIZE: (u32, u32) = (1600, 400);

/// Where a rendered image ended up, and how the serving layer exposes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub file_name: String,
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    url_prefix: String,
    size: (u32, u32),
    max_points: usize,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
            size: DEFAULT_IMAGE_SIZE,
            max_points: 4000,
        }
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points.max(2);
        self
    }

    pub fn with_size(mut self, size: (u32, u32)) -> Self {
        self.size = size;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Unique within the process (atomic sequence) and across processes (pid).
    pub fn next_name(&self) -> String {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!(
            "ecg_{}_{}_{:06}.png",
            Utc::now().format("%Y%m%dT%H%M%S"),
            std::process::id(),
            seq
        )
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), file_name)
    }

    /// Render the waveform with R-peak markers and persist it under a fresh name.
    pub fn render(&self, ts: &TimeSeries, peaks: &RPeakSet) -> AnalysisResult<ArtifactRef> {
        let io_err = |what: &str, err: std::io::Error| {
            AnalysisError::Artifact(format!("{} in {}: {}", what, self.dir.display(), err))
        };
        fs::create_dir_all(&self.dir).map_err(|e| io_err("creating directory", e))?;
        let staging = tempfile::Builder::new()
            .prefix(".ecg-")
            .suffix(".png")
            .tempfile_in(&self.dir)
            .map_err(|e| io_err("creating staging file", e))?;

        let fig = figure_from_ecg(ts, peaks, self.max_points);
        PngBackend::new(staging.path(), self.size).draw(&fig)?;

        let file_name = self.next_name();
        let path = self.dir.join(&file_name);
        staging
            .persist_noclobber(&path)
            .map_err(|e| io_err("persisting artifact", e.error))?;
        debug!("wrote artifact {}", path.display());
        Ok(ArtifactRef {
            url: self.url_for(&file_name),
            file_name,
            path,
        })
    }

    /// Remove an artifact whose run failed after rendering.
    pub fn discard(&self, artifact: &ArtifactRef) {
        match fs::remove_file(&artifact.path) {
            Ok(()) => debug!("discarded artifact {}", artifact.path.display()),
            Err(err) => warn!("could not remove {}: {}", artifact.path.display(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn names_are_unique_under_contention() {
        let store = ArtifactStore::new("unused", "/static/ecg");
        let names: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..50).map(|_| store.next_name()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert!(names.iter().all(|n| n.starts_with("ecg_") && n.ends_with(".png")));
    }

    #[test]
    fn url_joins_prefix_once() {
        let store = ArtifactStore::new("x", "/static/ecg/");
        assert_eq!(store.url_for("a.png"), "/static/ecg/a.png");
    }

    #[test]
    fn render_persists_a_new_file_each_time() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("ecg"), "/static/ecg").with_size((320, 120));
        let ts = TimeSeries::new(500.0, (0..1000).map(|i| (i as f64 * 0.05).sin()).collect());
        let peaks = RPeakSet::try_new(vec![31, 157, 283], ts.len()).unwrap();
        let first = store.render(&ts, &peaks).unwrap();
        let second = store.render(&ts, &peaks).unwrap();
        assert_ne!(first.file_name, second.file_name);
        assert!(first.path.exists() && second.path.exists());
        assert_eq!(first.url, format!("/static/ecg/{}", first.file_name));
        let leftovers = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".ecg-"))
            .count();
        assert_eq!(leftovers, 0);

        store.discard(&first);
        assert!(!first.path.exists() && second.path.exists());
    }
}
