// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Locating external converter binaries.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Find a binary: first among `candidates`, then as any of `names` on `PATH`.
pub fn locate(candidates: &[PathBuf], names: &[&str]) -> Option<PathBuf> {
    locate_in(candidates, names, std::env::var_os("PATH").as_deref())
}

/// [`locate`] against an explicit search path.
pub fn locate_in(candidates: &[PathBuf], names: &[&str], search_path: Option<&OsStr>) -> Option<PathBuf> {
    if let Some(found) = candidates.iter().find(|path| is_executable(path)) {
        debug!(path = %found.display(), "Tool found at configured location");
        return Some(found.clone());
    }

    let dirs: Vec<PathBuf> = search_path.map(|p| std::env::split_paths(p).collect()).unwrap_or_default();
    for dir in &dirs {
        for name in names {
            for candidate in with_platform_suffix(dir, name) {
                if is_executable(&candidate) {
                    debug!(path = %candidate.display(), "Tool found on PATH");
                    return Some(candidate);
                }
            }
        }
    }
    None
}

fn with_platform_suffix(dir: &Path, name: &str) -> Vec<PathBuf> {
    let plain = dir.join(name);
    if cfg!(windows) {
        vec![dir.join(format!("{name}.exe")), plain]
    } else {
        vec![plain]
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn tool(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").expect("write tool");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).expect("chmod");
        path
    }

    #[test]
    fn configured_candidate_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let configured = tool(dir.path(), "soffice-custom", 0o755);
        let on_path = tempfile::tempdir().expect("tempdir");
        tool(on_path.path(), "soffice", 0o755);

        let found = locate_in(
            &[dir.path().join("missing"), configured.clone()],
            &["soffice"],
            Some(on_path.path().as_os_str()),
        );
        assert_eq!(found, Some(configured));
    }

    #[test]
    fn falls_back_to_search_path() {
        let on_path = tempfile::tempdir().expect("tempdir");
        let gs = tool(on_path.path(), "gs", 0o755);
        let found = locate_in(&[], &["gswin64c", "gs"], Some(on_path.path().as_os_str()));
        assert_eq!(found, Some(gs));
    }

    #[test]
    fn non_executable_files_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plain = tool(dir.path(), "gs", 0o644);
        assert_eq!(locate_in(&[plain], &["gs"], Some(dir.path().as_os_str())), None);
    }
}
