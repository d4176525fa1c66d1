//! Progress reporting for long-running computations.
//!
//! # Example
//!
//! ```
//! use dtsmesh::algo::curvature::{CurvatureEngine, CurvatureOptions};
//! use dtsmesh::algo::progress::Progress;
//! use dtsmesh::mesh::{build_blueprint, generate, Mesh, MeshArrays};
//!
//! let arrays = MeshArrays::from_rows(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]],
//!     &[[0, 1, 2]],
//! );
//! let mesh: Mesh = generate(&build_blueprint(&arrays).unwrap()).unwrap();
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//! let engine = CurvatureEngine::new(CurvatureOptions::default());
//! let _curvature = engine.initialize_with_progress(&mesh, &progress);
//! ```

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step (0-based)
/// - `total`: Total number of steps
/// - `message`: Description of the current operation
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// A progress reporter that forwards every update to `log::info!`.
    pub fn logging() -> Self {
        Self::new(|current, total, message| {
            log::info!("[{}/{}] {}", current, total, message);
        })
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
