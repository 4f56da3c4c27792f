use std::sync::Mutex;

use ahash::AHashSet;

/// Paths currently opened by some driver sharing this backend.
///
/// Claiming before opening is what keeps two driver instances in one
/// process from grabbing the same hidraw node.
#[derive(Debug, Default)]
pub struct ClaimedPaths {
    paths: Mutex<AHashSet<String>>,
}

impl ClaimedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a path. True iff the path was not already claimed.
    pub fn claim(&self, path: &str) -> bool {
        let mut paths = self.paths.lock().unwrap_or_else(|e| e.into_inner());
        paths.insert(path.to_owned())
    }

    /// Release a path. Unclaimed paths are ignored.
    pub fn release(&self, path: &str) {
        let mut paths = self.paths.lock().unwrap_or_else(|e| e.into_inner());
        paths.remove(path);
    }
}
