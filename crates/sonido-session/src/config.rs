//! Session-wide configuration: track/scene limits and job-pool tuning.
//!
//! Mirrors the loader pattern used by `sonido-config`'s presets — a missing
//! file is not an error (the session simply runs with defaults); a malformed
//! file is.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable limits and thresholds for a session.
///
/// Defaults mirror the numeric defaults called out in the graph processor's
/// dispatch policy (§4.6/§4.7): a parallel-dispatch threshold of 3 tasks, a
/// job pool sized to the host machine, and a thread-pool-extension recursion
/// cap of 4.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of tracks a session may host (master track not
    /// included in this count).
    pub max_tracks: usize,
    /// Maximum number of scenes (columns in the track×scene grid).
    pub max_scenes: usize,
    /// Maximum audio block size the graph is prepared for.
    pub max_frames: usize,
    /// Audio sample rate in Hz.
    pub sample_rate: f32,
    /// Minimum number of eligible synth tasks before parallel dispatch is
    /// used instead of sequential audio-thread execution.
    pub parallel_threshold: usize,
    /// Number of job-worker threads to spawn (in addition to the audio
    /// thread, which also participates in the pool).
    pub job_worker_count: usize,
    /// Maximum number of worker jobs fanned out for a plugin-requested
    /// thread-pool task batch.
    pub jobs_fanout: usize,
    /// Maximum nesting depth for thread-pool-extension requests before
    /// falling back to sequential execution on the calling thread.
    pub recursion_depth_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .saturating_sub(1)
            .clamp(1, 16);
        Self {
            max_tracks: 64,
            max_scenes: 64,
            max_frames: 4096,
            sample_rate: 48_000.0,
            parallel_threshold: 3,
            job_worker_count: workers,
            jobs_fanout: workers,
            recursion_depth_cap: 4,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file, falling back to
    /// [`SessionConfig::default`] if the file does not exist.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(toml::from_str(&text)?)
    }

    /// Reduce the parallel-dispatch threshold by one at small block sizes
    /// (≤128 frames), per §4.6 Phase 2's dispatch policy.
    pub fn effective_parallel_threshold(&self, block_size: usize) -> usize {
        if block_size <= 128 {
            self.parallel_threshold.saturating_sub(1).max(1)
        } else {
            self.parallel_threshold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = SessionConfig::load_from_path("/nonexistent/sonido-session.toml").unwrap();
        assert_eq!(cfg, SessionConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sonido-session.toml");
        std::fs::write(&path, "max_tracks = [this is not valid toml").unwrap();
        assert!(SessionConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn small_block_size_reduces_threshold() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.effective_parallel_threshold(64), cfg.parallel_threshold - 1);
        assert_eq!(cfg.effective_parallel_threshold(512), cfg.parallel_threshold);
    }
}
