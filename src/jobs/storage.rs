//! # Persistencia de Resultados
//! src/jobs/storage.rs
//!
//! Cada job escribe su resultado (JSON UTF-8) exactamente una vez, antes de
//! pasar a `Done`. Después de escrito nadie lo modifica.

use crate::error::{JobError, Result};
use crate::jobs::types::JobId;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Almacén de resultados indexado por id
pub trait ResultStore: Send + Sync {
    /// Escritura durable. Se llama una vez por id; si falla, el worker
    /// reintenta una sola vez con el payload de error.
    fn put(&self, id: JobId, payload: &str) -> Result<()>;

    /// Falla con `JobError::NotFound` si nunca se escribió ese id
    fn get(&self, id: JobId) -> Result<String>;
}

/// Un archivo `job_<id>` por resultado dentro de un directorio
pub struct FileResultStore {
    dir: PathBuf,
}

impl FileResultStore {
    /// Crea el directorio si no existe
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("job_{}", id))
    }
}

impl ResultStore for FileResultStore {
    fn put(&self, id: JobId, payload: &str) -> Result<()> {
        let path = self.path_for(id);

        // Archivo temporal + rename: un lector nunca ve un resultado a medias
        let temp_path = path.with_extension("tmp");
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(payload.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn get(&self, id: JobId) -> Result<String> {
        match fs::read_to_string(self.path_for(id)) {
            Ok(payload) => Ok(payload),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(JobError::NotFound(id)),
            Err(e) => Err(JobError::Storage(e)),
        }
    }
}

/// Resultados en memoria, útil cuando no se quiere tocar disco
#[derive(Default)]
pub struct MemoryResultStore {
    results: Mutex<HashMap<JobId, String>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn count(&self) -> usize {
        self.results.lock().expect("result store poisoned").len()
    }
}

impl ResultStore for MemoryResultStore {
    fn put(&self, id: JobId, payload: &str) -> Result<()> {
        let mut results = self.results.lock().expect("result store poisoned");
        results.insert(id, payload.to_string());
        Ok(())
    }

    fn get(&self, id: JobId) -> Result<String> {
        let results = self.results.lock().expect("result store poisoned");
        results.get(&id).cloned().ok_or(JobError::NotFound(id))
    }
}
