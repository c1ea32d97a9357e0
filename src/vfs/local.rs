use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::vfs::Vfs;

/// POSIX/Windows local filesystem.
///
/// Uploads go to a hidden temp file in the target directory first, then are
/// published with a hard link. Linking fails if the target exists, which
/// gives atomic non-clobbering create:
///   1. write temp file (and fsync when `sync_on_write`)
///   2. hard_link(temp, target)  → AlreadyExists if a blob is there
///   3. remove temp file
pub struct LocalFs {
    sync_on_write: bool,
}

impl LocalFs {
    pub fn new(sync_on_write: bool) -> Self {
        LocalFs { sync_on_write }
    }

    fn path(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
    }

    fn temp_path(target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!(".{}.tmp-{}", name, Uuid::new_v4().simple()))
    }
}

impl Default for LocalFs {
    fn default() -> Self {
        LocalFs::new(true)
    }
}

impl Vfs for LocalFs {
    fn create_dir(&self, uri: &str) -> Result<()> {
        fs::create_dir_all(Self::path(uri))?;
        Ok(())
    }

    fn is_dir(&self, uri: &str) -> Result<bool> {
        Ok(Self::path(uri).is_dir())
    }

    fn is_file(&self, uri: &str) -> Result<bool> {
        Ok(Self::path(uri).is_file())
    }

    fn ls(&self, uri: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(Self::path(uri))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    fn read(&self, uri: &str) -> Result<Vec<u8>> {
        Ok(fs::read(Self::path(uri))?)
    }

    fn write_new(&self, uri: &str, data: &[u8]) -> Result<()> {
        let target = Self::path(uri);
        if target.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            )
            .into());
        }

        let temp = Self::temp_path(&target);
        let file = OpenOptions::new().write(true).create_new(true).open(&temp)?;
        let published = write_and_publish(file, &temp, &target, data, self.sync_on_write);

        if let Err(e) = fs::remove_file(&temp) {
            warn!("failed to remove temp upload {}: {}", temp.display(), e);
        }
        published
    }

    fn remove_file(&self, uri: &str) -> Result<()> {
        fs::remove_file(Self::path(uri))?;
        Ok(())
    }
}

fn write_and_publish(
    file: File,
    temp: &Path,
    target: &Path,
    data: &[u8],
    sync: bool,
) -> Result<()> {
    let mut writer = BufWriter::new(file);
    writer.write_all(data)?;
    writer.flush()?;
    if sync {
        writer.get_ref().sync_all()?;
    }
    drop(writer);
    fs::hard_link(temp, target)?;
    Ok(())
}
