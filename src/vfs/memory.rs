use std::collections::{BTreeMap, BTreeSet};
use std::io;

use parking_lot::Mutex;

use crate::error::Result;
use crate::vfs::{Vfs, join};

/// In-memory filesystem. Used by tests and by callers that want a scratch
/// array without touching disk.
#[derive(Default)]
pub struct MemFs {
    state: Mutex<MemState>,
}

#[derive(Default)]
struct MemState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl MemFs {
    pub fn new() -> Self {
        MemFs::default()
    }

    /// Overwrite a blob in place, bypassing `write_new`. Lets tests simulate
    /// bit rot or a foreign writer.
    pub fn overwrite(&self, uri: &str, data: Vec<u8>) {
        self.state.lock().files.insert(normalize(uri), data);
    }
}

fn normalize(uri: &str) -> String {
    uri.trim_end_matches('/').to_string()
}

fn parent(uri: &str) -> &str {
    uri.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn not_found(uri: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{uri} not found"))
}

impl Vfs for MemFs {
    fn create_dir(&self, uri: &str) -> Result<()> {
        let mut state = self.state.lock();
        let mut dir = normalize(uri);
        // create_dir_all semantics
        while !dir.is_empty() && state.dirs.insert(dir.clone()) {
            dir = parent(&dir).to_string();
        }
        Ok(())
    }

    fn is_dir(&self, uri: &str) -> Result<bool> {
        Ok(self.state.lock().dirs.contains(&normalize(uri)))
    }

    fn is_file(&self, uri: &str) -> Result<bool> {
        Ok(self.state.lock().files.contains_key(&normalize(uri)))
    }

    fn ls(&self, uri: &str) -> Result<Vec<String>> {
        let state = self.state.lock();
        let dir = normalize(uri);
        if !state.dirs.contains(&dir) {
            return Err(not_found(&dir).into());
        }
        let prefix = join(&dir, "");
        Ok(state
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect())
    }

    fn read(&self, uri: &str) -> Result<Vec<u8>> {
        let uri = normalize(uri);
        self.state
            .lock()
            .files
            .get(&uri)
            .cloned()
            .ok_or_else(|| not_found(&uri).into())
    }

    fn write_new(&self, uri: &str, data: &[u8]) -> Result<()> {
        let uri = normalize(uri);
        let mut state = self.state.lock();
        if !state.dirs.contains(parent(&uri)) {
            return Err(not_found(parent(&uri)).into());
        }
        if state.files.contains_key(&uri) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{uri} already exists"),
            )
            .into());
        }
        state.files.insert(uri, data.to_vec());
        Ok(())
    }

    fn remove_file(&self, uri: &str) -> Result<()> {
        let uri = normalize(uri);
        match self.state.lock().files.remove(&uri) {
            Some(_) => Ok(()),
            None => Err(not_found(&uri).into()),
        }
    }
}
