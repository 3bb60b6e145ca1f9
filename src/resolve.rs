use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};
use tracing::trace;

/// Ordered list of directories taken from `PATH`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Split a `PATH` value on `:`. Empty entries are skipped. Entries are
    /// kept as raw bytes, so directories that are not UTF-8 still resolve.
    pub fn parse(value: impl AsRef<OsStr>) -> Self {
        let dirs = value
            .as_ref()
            .as_bytes()
            .split(|&b| b == b':')
            .filter(|entry| !entry.is_empty())
            .map(|entry| PathBuf::from(OsStr::from_bytes(entry)))
            .collect();
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(PathBuf),
    NotFound,
}

/// Map a command name to an executable path.
///
/// A name that is directly executable as given (absolute or relative to the
/// working directory) is returned unchanged. Otherwise each search directory
/// is tried in order. Names containing a `/` are never searched for.
pub fn resolve(name: &str, search: &SearchPath) -> Resolution {
    if name.is_empty() {
        return Resolution::NotFound;
    }

    let direct = Path::new(name);
    if is_executable(direct) {
        return Resolution::Found(direct.to_path_buf());
    }

    if name.contains('/') {
        return Resolution::NotFound;
    }

    for dir in search.dirs() {
        let candidate = dir.join(name);
        trace!(candidate = %candidate.display(), "checking candidate");
        if is_executable(&candidate) {
            return Resolution::Found(candidate);
        }
    }

    Resolution::NotFound
}

fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn make_script(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn parse_splits_and_skips_empty_entries() {
        let search = SearchPath::parse("/usr/bin::/bin:");
        assert_eq!(
            search.dirs(),
            &[PathBuf::from("/usr/bin"), PathBuf::from("/bin")]
        );
        assert!(SearchPath::parse("").is_empty());
    }

    #[test]
    fn parse_keeps_non_utf8_directories_intact() {
        let raw = OsStr::from_bytes(b"/opt/caf\xe9/bin:/bin");
        let search = SearchPath::parse(raw);
        assert_eq!(
            search.dirs()[0].as_os_str().as_bytes(),
            b"/opt/caf\xe9/bin"
        );
        assert_eq!(search.dirs()[1], PathBuf::from("/bin"));
    }

    #[test]
    fn absolute_path_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let script = make_script(dir.path(), "tool", 0o755);
        let name = script.to_str().unwrap();
        assert_eq!(
            resolve(name, &SearchPath::default()),
            Resolution::Found(script.clone())
        );
    }

    #[test]
    fn first_matching_directory_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        make_script(second.path(), "tool", 0o755);
        let expected = make_script(first.path(), "tool", 0o755);

        let value = format!("{}:{}", first.path().display(), second.path().display());
        assert_eq!(
            resolve("tool", &SearchPath::parse(&value)),
            Resolution::Found(expected)
        );
    }

    #[test]
    fn non_executable_candidates_are_skipped() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        make_script(first.path(), "tool", 0o644);
        let expected = make_script(second.path(), "tool", 0o755);

        let value = format!("{}:{}", first.path().display(), second.path().display());
        assert_eq!(
            resolve("tool", &SearchPath::parse(&value)),
            Resolution::Found(expected)
        );
    }

    #[test]
    fn unknown_command_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let search = SearchPath::parse(&dir.path().display().to_string());
        assert_eq!(resolve("no-such-tool-here", &search), Resolution::NotFound);
        assert_eq!(resolve("", &search), Resolution::NotFound);
    }

    #[test]
    fn empty_search_path_only_checks_direct_access() {
        assert_eq!(
            resolve("definitely-not-a-command", &SearchPath::default()),
            Resolution::NotFound
        );
    }
}
