//! # Servicio de Jobs
//! src/jobs/service.rs
//!
//! Fachada que usa la capa HTTP: submit, status, fetch, introspección y
//! graceful shutdown. Se construye una sola vez y se comparte por `Arc`.

use crate::error::{JobError, Result};
use crate::jobs::gate::ReadinessGate;
use crate::jobs::pool::WorkerPool;
use crate::jobs::queue::{JobQueue, QueueItem};
use crate::jobs::registry::{JobRecord, JobRegistry};
use crate::jobs::storage::ResultStore;
use crate::jobs::types::{JobId, JobState, JobStatus, Task};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Motor de ejecución de jobs
pub struct JobService<T> {
    gate: Arc<ReadinessGate>,
    queue: Arc<JobQueue<T>>,
    registry: Arc<JobRegistry>,
    store: Arc<dyn ResultStore>,
    pool: WorkerPool<T>,

    /// `true` mientras se aceptan jobs. Asignar id y encolar ocurren bajo
    /// este mismo lock, así ningún job queda detrás de un poison pill.
    accepting: Mutex<bool>,
}

impl<T: Task> JobService<T> {
    /// Crea el servicio y lanza `workers` threads
    ///
    /// Los workers no ejecutan nada hasta que se libere `gate`.
    pub fn new(
        workers: usize,
        gate: Arc<ReadinessGate>,
        store: Arc<dyn ResultStore>,
    ) -> std::io::Result<Self> {
        let queue = Arc::new(JobQueue::new());
        let registry = Arc::new(JobRegistry::new());
        let pool = WorkerPool::spawn(
            workers,
            Arc::clone(&gate),
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::clone(&store),
        )?;

        Ok(Self {
            gate,
            queue,
            registry,
            store,
            pool,
            accepting: Mutex::new(true),
        })
    }

    /// Encola un job y retorna su id, o `Rejected` después del shutdown
    pub fn submit(&self, task: T) -> Result<JobId> {
        let accepting = self.accepting.lock().expect("job service poisoned");
        if !*accepting {
            warn!(task = task.name(), "rejected job submission after shutdown");
            return Err(JobError::Rejected);
        }

        let id = self.registry.allocate_id();
        debug!(job_id = %id, task = task.name(), "job queued");
        self.queue.push(QueueItem::Work { id, task });

        Ok(id)
    }
}

impl<T> JobService<T> {
    /// Estado de un job
    pub fn status(&self, id: JobId) -> JobStatus {
        self.registry
            .state(id)
            .map(JobStatus::from)
            .unwrap_or(JobStatus::NotFound)
    }

    /// Resultado persistido de un job terminal
    ///
    /// Para un job `Failed` el payload es `{"error": "..."}`.
    pub fn fetch(&self, id: JobId) -> Result<serde_json::Value> {
        match self.registry.state(id) {
            None => Err(JobError::NotFound(id)),
            Some(JobState::Running) => Err(JobError::NotReady(id)),
            Some(JobState::Done) | Some(JobState::Failed) => {
                let payload = self.store.get(id)?;
                Ok(serde_json::from_str(&payload)?)
            }
        }
    }

    /// Jobs aceptados que ningún worker tomó todavía
    pub fn num_pending(&self) -> usize {
        self.registry.count_pending()
    }

    /// Todos los jobs ordenados por id
    pub fn list_jobs(&self) -> Vec<JobRecord> {
        self.registry.snapshot()
    }

    /// Deja de aceptar jobs, drena la cola y espera a los workers
    ///
    /// Idempotente: las llamadas siguientes retornan en cuanto el drenado
    /// haya terminado.
    pub fn shutdown(&self) {
        {
            let mut accepting = self.accepting.lock().expect("job service poisoned");
            if *accepting {
                info!("graceful shutdown requested");
                *accepting = false;
            }
        }

        if !self.is_ready() {
            warn!("shutdown requested before the dataset was loaded; workers are still waiting");
        }

        self.pool.graceful_shutdown();
        info!(jobs = self.registry.len(), "job service shut down");
    }

    /// Ya no se aceptan jobs
    pub fn is_shut_down(&self) -> bool {
        !*self.accepting.lock().expect("job service poisoned")
    }

    /// Los workers ya pueden ejecutar jobs
    pub fn is_ready(&self) -> bool {
        self.gate.is_released()
    }

    /// Tamaño fijo del pool
    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Elementos en la cola, incluidos poison pills
    #[cfg(test)]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
