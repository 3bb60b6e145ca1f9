use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::OUTPUT_MODE;

/// Copy lines from `input` to `store` until a line equal to `limiter`.
///
/// `prompt` is written to `prompt_out` before every line is read. The
/// limiter line itself is never stored. Returns the number of lines stored.
pub fn capture<R, W, P>(
    mut input: R,
    store: &mut W,
    limiter: &str,
    prompt: &str,
    prompt_out: &mut P,
) -> io::Result<usize>
where
    R: BufRead,
    W: Write,
    P: Write,
{
    let mut stored = 0;
    let mut line = Vec::new();

    loop {
        prompt_out.write_all(prompt.as_bytes())?;
        prompt_out.flush()?;

        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            warn!(limiter, "here_doc ended by end of input before limiter");
            break;
        }

        let content = line.strip_suffix(b"\n").unwrap_or(&line);
        if content == limiter.as_bytes() {
            break;
        }

        store.write_all(&line)?;
        stored += 1;
    }

    store.flush()?;
    Ok(stored)
}

/// Transient file holding captured here_doc input.
///
/// The file is removed when the store is dropped, so it never outlives the
/// orchestrating process's `run`.
#[derive(Debug)]
pub struct HeredocStore {
    path: PathBuf,
}

impl HeredocStore {
    /// Create the store at `path` and fill it from `input`.
    pub fn create<R, P>(
        path: &Path,
        limiter: &str,
        prompt: &str,
        input: R,
        prompt_out: &mut P,
    ) -> io::Result<Self>
    where
        R: BufRead,
        P: Write,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(OUTPUT_MODE)
            .open(path)?;

        // Owned from here on: any early return below removes the file.
        let store = Self {
            path: path.to_path_buf(),
        };

        let lines = capture(input, &mut file, limiter, prompt, prompt_out)?;
        debug!(path = %store.path.display(), lines, "here_doc captured");
        Ok(store)
    }

    /// Reopen the captured content read-only as pipeline input.
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HeredocStore {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "here_doc store removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove here_doc store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn run_capture(input: &str, limiter: &str) -> (String, usize, String) {
        let mut store = Vec::new();
        let mut prompts = Vec::new();
        let n = capture(
            Cursor::new(input.as_bytes()),
            &mut store,
            limiter,
            "> ",
            &mut prompts,
        )
        .unwrap();
        (
            String::from_utf8(store).unwrap(),
            n,
            String::from_utf8(prompts).unwrap(),
        )
    }

    #[test]
    fn stops_at_limiter_and_drops_it() {
        let (stored, n, prompts) = run_capture("a\nb\nEOF\nc\n", "EOF");
        assert_eq!(stored, "a\nb\n");
        assert_eq!(n, 2);
        assert_eq!(prompts, "> > > ");
    }

    #[test]
    fn limiter_must_match_exactly() {
        let (stored, _, _) = run_capture("EOFX\nEO\n EOF\nEOF\n", "EOF");
        assert_eq!(stored, "EOFX\nEO\n EOF\n");
    }

    #[test]
    fn end_of_input_keeps_partial_capture() {
        let (stored, n, _) = run_capture("a\nlast-without-newline", "EOF");
        assert_eq!(stored, "a\nlast-without-newline");
        assert_eq!(n, 2);
    }

    #[test]
    fn limiter_without_trailing_newline_still_ends_capture() {
        let (stored, _, _) = run_capture("x\nEOF", "EOF");
        assert_eq!(stored, "x\n");
    }

    #[test]
    fn store_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".heredoc.tmp");
        let mut prompts = Vec::new();

        let store = HeredocStore::create(
            &path,
            "END",
            "",
            Cursor::new(b"one\ntwo\nEND\n".to_vec()),
            &mut prompts,
        )
        .unwrap();

        let mut content = String::new();
        store.open().unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "one\ntwo\n");
        assert!(store.path().exists());

        drop(store);
        assert!(!path.exists());
    }

    #[test]
    fn store_is_removed_when_capture_fails() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("terminal went away"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".heredoc.tmp");
        let mut prompts = Vec::new();
        let result = HeredocStore::create(
            &path,
            "END",
            "",
            io::BufReader::new(Broken),
            &mut prompts,
        );
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
