// ABOUTME: Job-scoped staging directories holding the program source and stdin file
// ABOUTME: Each directory is uniquely named and removed when the job ends

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

/// File name of the staged program inside the mount
pub const SOURCE_FILE: &str = "user_code.py";
/// File name of the staged stdin payload inside the mount
pub const INPUT_FILE: &str = "input.txt";

const STAGING_PREFIX: &str = "coderunner-";

/// Staged files for exactly one job
#[derive(Debug)]
pub struct StagedJob {
    dir: TempDir,
    has_stdin: bool,
}

impl StagedJob {
    /// Create a fresh directory under `base` (or the system temp dir) and write the job files
    ///
    /// The stdin file is only written when `stdin` is non-empty.
    pub fn stage(base: Option<&Path>, code: &str, stdin: &str) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_PREFIX);
        let dir = match base {
            Some(base) => builder.tempdir_in(base)?,
            None => builder.tempdir()?,
        };

        write_readable(&dir.path().join(SOURCE_FILE), code)?;

        let has_stdin = !stdin.is_empty();
        if has_stdin {
            write_readable(&dir.path().join(INPUT_FILE), stdin)?;
        }

        // The container user is not the directory owner
        set_mode(dir.path(), 0o755)?;

        debug!("Staged job files in {}", dir.path().display());
        Ok(Self { dir, has_stdin })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn has_stdin(&self) -> bool {
        self.has_stdin
    }

    /// Remove the directory and its contents, reporting failures
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("Removed staged job files in {}", path.display());
        Ok(())
    }
}

fn write_readable(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    set_mode(path, 0o644)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
