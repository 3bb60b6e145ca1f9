use std::fs::{File, OpenOptions};
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::debug;

use crate::config::OUTPUT_MODE;
use crate::error::PipexError;
use crate::heredoc::HeredocStore;

/// The pipeline's overall source and sink.
#[derive(Debug)]
pub struct Endpoints {
    pub input: OwnedFd,
    pub output: OwnedFd,
}

/// Open the named input file read-only.
pub fn open_input(path: &Path) -> Result<File, PipexError> {
    let file = File::open(path).map_err(|source| PipexError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "input opened");
    Ok(file)
}

/// Reopen a captured here_doc store as the pipeline input.
pub fn open_heredoc(store: &HeredocStore) -> Result<File, PipexError> {
    let file = store.open().map_err(PipexError::Heredoc)?;
    debug!(path = %store.path().display(), "here_doc input opened");
    Ok(file)
}

/// Open the output file write-only, creating it if needed.
///
/// `append` keeps existing content (here_doc mode); otherwise the file is
/// truncated.
pub fn open_output(path: &Path, append: bool) -> Result<File, PipexError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(OUTPUT_MODE);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }

    let file = options.open(path).map_err(|source| PipexError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), append, "output opened");
    Ok(file)
}

impl Endpoints {
    pub fn new(input: File, output: File) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn missing_input_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let err = open_input(&path).unwrap_err();
        assert!(matches!(err, PipexError::Input { .. }));
        assert!(err.to_string().ends_with("absent.txt: No such file or directory"));
    }

    #[test]
    fn output_truncates_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old content\n").unwrap();

        let mut file = open_output(&path, false).unwrap();
        file.write_all(b"new\n").unwrap();
        drop(file);

        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn output_appends_in_heredoc_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "first\n").unwrap();

        let mut file = open_output(&path, true).unwrap();
        file.write_all(b"second\n").unwrap();
        drop(file);

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn output_is_created_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.txt");
        open_output(&path, false).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn output_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.txt");
        let err = open_output(&path, false).unwrap_err();
        assert!(matches!(err, PipexError::Output { .. }));
    }
}
