//! Include search paths
//!
//! Two ordered directory lists: user (`-I dir`) and system (`-I -dir`).
//! A quoted include searches user directories then system directories; a
//! bracketed include searches system directories only. The search state is
//! resumable so `#include_next` can continue from just past the directory
//! that supplied the current file.

use std::path::{Path, PathBuf};

/// Resumable position within a search chain
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeSearchState {
    started: bool,
    in_user: bool,
    checked: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    user: Vec<PathBuf>,
    system: Vec<PathBuf>,
}

// system directories with a `bin` path segment hold binaries, not headers
fn has_bin_segment(path: &Path) -> bool {
    path.components().any(|c| c.as_os_str().eq_ignore_ascii_case("bin"))
}

impl SearchPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, path: PathBuf) {
        if path.is_dir() {
            self.user.push(path);
        }
    }

    pub fn add_system(&mut self, path: PathBuf) {
        if path.is_dir() && !has_bin_segment(&path) {
            self.system.push(path);
        }
    }

    fn check(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        let candidate = dir.join(name);
        candidate.is_file().then_some(candidate)
    }

    /// Search for a quoted include: user directories, then system
    pub fn find_user(
        &self,
        state: &mut IncludeSearchState,
        name: &str,
    ) -> Option<PathBuf> {
        let start = if state.started {
            if !state.in_user {
                return self.find_system(state, name);
            }
            state.checked
        } else {
            state.started = true;
            state.in_user = true;
            0
        };

        for (i, dir) in self.user.iter().enumerate().skip(start) {
            state.checked = i + 1;
            if let Some(found) = self.check(dir, name) {
                log::debug!("resolved \"{name}\" in {}", dir.display());
                return Some(found);
            }
        }

        state.checked = 0;
        state.in_user = false;
        self.find_system(state, name)
    }

    /// Search for a bracketed include: system directories only
    pub fn find_system(
        &self,
        state: &mut IncludeSearchState,
        name: &str,
    ) -> Option<PathBuf> {
        let start = if state.started {
            if state.in_user {
                return self.find_user(state, name);
            }
            state.checked
        } else {
            state.started = true;
            state.in_user = false;
            0
        };

        for (i, dir) in self.system.iter().enumerate().skip(start) {
            state.checked = i + 1;
            if let Some(found) = self.check(dir, name) {
                log::debug!("resolved <{name}> in {}", dir.display());
                return Some(found);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_user_then_system_order() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("x.h"), "").unwrap();
        fs::write(b.path().join("x.h"), "").unwrap();

        let mut paths = SearchPaths::new();
        paths.add_user(a.path().to_path_buf());
        paths.add_system(b.path().to_path_buf());

        let mut state = IncludeSearchState::default();
        let found = paths.find_user(&mut state, "x.h").unwrap();
        assert_eq!(found, a.path().join("x.h"));

        // resuming continues past the supplying directory into system
        let next = paths.find_user(&mut state, "x.h").unwrap();
        assert_eq!(next, b.path().join("x.h"));
        assert!(paths.find_user(&mut state, "x.h").is_none());
    }

    #[test]
    fn test_bracketed_skips_user() {
        let a = tempfile::tempdir().unwrap();
        fs::write(a.path().join("x.h"), "").unwrap();

        let mut paths = SearchPaths::new();
        paths.add_user(a.path().to_path_buf());

        let mut state = IncludeSearchState::default();
        assert!(paths.find_system(&mut state, "x.h").is_none());
    }

    #[test]
    fn test_bin_directories_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir(&bin).unwrap();
        fs::write(bin.join("x.h"), "").unwrap();

        let mut paths = SearchPaths::new();
        paths.add_system(bin.clone());

        let mut state = IncludeSearchState::default();
        assert!(paths.find_system(&mut state, "x.h").is_none());

        // user directories are not filtered
        let mut paths = SearchPaths::new();
        paths.add_user(bin);
        let mut state = IncludeSearchState::default();
        assert!(paths.find_user(&mut state, "x.h").is_some());
    }
}
