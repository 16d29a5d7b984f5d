//! # Registro de Jobs
//! src/jobs/registry.rs
//!
//! Mapa thread-safe de id → estado, más la asignación monotónica de ids.
//! Todo el estado vive detrás de un único Mutex: asignar un id y registrar
//! su entrada es una sola operación atómica.

use crate::jobs::types::{JobId, JobState};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Entrada del registro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub state: JobState,
}

#[derive(Debug)]
struct Entry {
    state: JobState,
    /// Un worker ya lo sacó de la cola
    picked_up: bool,
}

#[derive(Debug)]
struct RegistryInner {
    next_id: u64,
    jobs: BTreeMap<JobId, Entry>,
    /// Aceptados pero todavía no tomados por un worker
    pending: usize,
}

/// Registro autoritativo del ciclo de vida de cada job
#[derive(Debug)]
pub struct JobRegistry {
    inner: Mutex<RegistryInner>,
}

impl JobRegistry {
    /// Crea un registro vacío; el primer id asignado es 1
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_id: 1,
                jobs: BTreeMap::new(),
                pending: 0,
            }),
        }
    }

    /// Asigna un id nuevo y registra la entrada en `Running`
    pub fn allocate_id(&self) -> JobId {
        let mut inner = self.inner.lock().expect("job registry poisoned");

        let id = JobId(inner.next_id);
        inner.next_id += 1;
        inner.jobs.insert(
            id,
            Entry {
                state: JobState::Running,
                picked_up: false,
            },
        );
        inner.pending += 1;

        id
    }

    /// Un worker sacó el job de la cola
    pub fn mark_picked_up(&self, id: JobId) {
        let mut inner = self.inner.lock().expect("job registry poisoned");
        let newly_picked = match inner.jobs.get_mut(&id) {
            Some(entry) if !entry.picked_up => {
                entry.picked_up = true;
                true
            }
            _ => false,
        };
        if newly_picked {
            inner.pending -= 1;
        }
    }

    /// `Running → Done`. No-op si el id no existe o ya es terminal.
    pub fn mark_done(&self, id: JobId) {
        self.transition(id, JobState::Done);
    }

    /// `Running → Failed`. No-op si el id no existe o ya es terminal.
    pub fn mark_failed(&self, id: JobId) {
        self.transition(id, JobState::Failed);
    }

    fn transition(&self, id: JobId, to: JobState) {
        let mut inner = self.inner.lock().expect("job registry poisoned");
        if let Some(entry) = inner.jobs.get_mut(&id) {
            if entry.state == JobState::Running {
                entry.state = to;
            }
        }
    }

    /// El id fue asignado alguna vez
    pub fn is_valid(&self, id: JobId) -> bool {
        let inner = self.inner.lock().expect("job registry poisoned");
        inner.jobs.contains_key(&id)
    }

    /// El job terminó con éxito. `false` para ids desconocidos.
    pub fn is_done(&self, id: JobId) -> bool {
        self.state(id) == Some(JobState::Done)
    }

    /// Estado actual, `None` si el id es desconocido
    pub fn state(&self, id: JobId) -> Option<JobState> {
        let inner = self.inner.lock().expect("job registry poisoned");
        inner.jobs.get(&id).map(|entry| entry.state)
    }

    /// Vista puntual ordenada por id
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let inner = self.inner.lock().expect("job registry poisoned");
        inner
            .jobs
            .iter()
            .map(|(id, entry)| JobRecord {
                id: *id,
                state: entry.state,
            })
            .collect()
    }

    /// Jobs aceptados que ningún worker tomó todavía
    pub fn count_pending(&self) -> usize {
        let inner = self.inner.lock().expect("job registry poisoned");
        inner.pending
    }

    /// Total de jobs registrados
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("job registry poisoned");
        inner.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
