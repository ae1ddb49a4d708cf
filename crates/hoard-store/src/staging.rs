//! Single-pass staging: copy content to a scratch file while hashing it.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom};
use std::path::Path;

use hoard_types::{Score, ScoreHasher};
use tempfile::NamedTempFile;

const STAGING_PREFIX: &str = "hoard-staging-";

/// Content copied to a scratch file, with its score and size.
///
/// The scratch file is deleted when this value is dropped, on every exit path.
pub struct StagedContent {
    file: NamedTempFile,
    pub score: Score,
    pub size: u64,
}

impl StagedContent {
    /// Stage `content` in `dir` (or the OS temp dir), hashing it on the way.
    pub fn stage(content: &mut dyn Read, dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_PREFIX);
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let mut hashing = ScoreHasher::new(BufWriter::new(file));
        io::copy(content, &mut hashing)?;
        let (buffered, score, size) = hashing.finish()?;
        let file = buffered.into_inner().map_err(|e| e.into_error())?;

        Ok(Self { file, score, size })
    }

    /// Rewind the scratch file and hand it out for reading.
    pub fn reader(&mut self) -> io::Result<&mut File> {
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }

    /// Path of the scratch file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl std::fmt::Debug for StagedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedContent")
            .field("score", &self.score)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_hashes_and_keeps_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedContent::stage(&mut &b"stage me"[..], Some(dir.path())).unwrap();
        assert_eq!(staged.score, Score::of(b"stage me"));
        assert_eq!(staged.size, 8);

        let mut back = Vec::new();
        staged.reader().unwrap().read_to_end(&mut back).unwrap();
        assert_eq!(back, b"stage me");

        // Reading twice rewinds.
        back.clear();
        staged.reader().unwrap().read_to_end(&mut back).unwrap();
        assert_eq!(back, b"stage me");
    }

    #[test]
    fn scratch_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedContent::stage(&mut &b"temp"[..], Some(dir.path())).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn read_failure_leaves_nothing_behind() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        assert!(StagedContent::stage(&mut Broken, Some(dir.path())).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_content() {
        let staged = StagedContent::stage(&mut io::empty(), None).unwrap();
        assert_eq!(staged.size, 0);
        assert_eq!(staged.score, Score::of(b""));
    }
}
