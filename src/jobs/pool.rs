//! # Pool de Workers
//! src/jobs/pool.rs
//!
//! N threads de larga vida, fijos durante toda la vida del proceso. Cada
//! worker espera la compuerta de disponibilidad una vez y luego consume la
//! cola hasta encontrar un poison pill.

use crate::jobs::gate::ReadinessGate;
use crate::jobs::queue::{JobQueue, QueueItem};
use crate::jobs::registry::JobRegistry;
use crate::jobs::storage::ResultStore;
use crate::jobs::types::{JobId, Task};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Recursos compartidos que recibe cada worker
struct WorkerContext<T> {
    gate: Arc<ReadinessGate>,
    queue: Arc<JobQueue<T>>,
    registry: Arc<JobRegistry>,
    store: Arc<dyn ResultStore>,
}

impl<T> Clone for WorkerContext<T> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
            queue: Arc::clone(&self.queue),
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
        }
    }
}

/// Pool de tamaño fijo
pub struct WorkerPool<T> {
    queue: Arc<JobQueue<T>>,
    size: usize,

    /// Se vacía en el primer shutdown
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Task> WorkerPool<T> {
    /// Lanza `size` workers. Nunca se crean threads adicionales después.
    pub fn spawn(
        size: usize,
        gate: Arc<ReadinessGate>,
        queue: Arc<JobQueue<T>>,
        registry: Arc<JobRegistry>,
        store: Arc<dyn ResultStore>,
    ) -> std::io::Result<Self> {
        let size = size.max(1);
        let ctx = WorkerContext {
            gate,
            queue: Arc::clone(&queue),
            registry,
            store,
        };

        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let ctx = ctx.clone();
            let name = format!("worker-{}", i);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || Self::worker_loop(name, ctx))?;
            handles.push(handle);
        }

        info!(workers = size, "worker pool started");

        Ok(Self {
            queue,
            size,
            handles: Mutex::new(handles),
        })
    }

    /// Loop principal del worker
    fn worker_loop(name: String, ctx: WorkerContext<T>) {
        debug!(worker = %name, "waiting for dataset");
        ctx.gate.await_ready();
        debug!(worker = %name, "worker ready");

        loop {
            match ctx.queue.pop() {
                QueueItem::PoisonPill => break,
                QueueItem::Work { id, task } => {
                    ctx.registry.mark_picked_up(id);
                    Self::run_job(&name, id, task, &ctx);
                }
            }
        }

        debug!(worker = %name, "worker stopped");
    }

    /// Ejecuta un job, persiste su resultado y recién entonces cambia el estado
    fn run_job(worker: &str, id: JobId, task: T, ctx: &WorkerContext<T>) {
        let task_name = task.name().to_string();
        let start = Instant::now();
        debug!(worker, job_id = %id, task = %task_name, "picked up job");

        let outcome = panic::catch_unwind(AssertUnwindSafe(move || task.execute()));

        let (payload, succeeded) = match outcome {
            Ok(Ok(value)) => (value.to_string(), true),
            Ok(Err(e)) => (error_payload(&e.to_string()), false),
            Err(panic) => (error_payload(&panic_message(panic.as_ref())), false),
        };

        if let Err(e) = ctx.store.put(id, &payload) {
            error!(worker, job_id = %id, error = %e, "failed to persist job result");
            // Un job Failed siempre intenta dejar su motivo
            if let Err(e) = ctx.store.put(id, &error_payload(&e.to_string())) {
                error!(worker, job_id = %id, error = %e, "failed to persist job error");
            }
            ctx.registry.mark_failed(id);
            return;
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if succeeded {
            ctx.registry.mark_done(id);
            info!(worker, job_id = %id, task = %task_name, elapsed_ms, "job done");
        } else {
            ctx.registry.mark_failed(id);
            warn!(worker, job_id = %id, task = %task_name, elapsed_ms, result = %payload, "job failed");
        }
    }
}

impl<T> WorkerPool<T> {
    /// Número fijo de workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Drena la cola y espera a que terminen todos los workers
    ///
    /// Encola un poison pill por worker al final de la cola, así todo lo
    /// encolado antes se ejecuta primero. Las llamadas concurrentes esperan
    /// al mismo drenado; las posteriores retornan de inmediato.
    pub fn graceful_shutdown(&self) {
        let mut handles = self.handles.lock().expect("worker handles poisoned");
        if handles.is_empty() {
            return;
        }

        info!(workers = handles.len(), "draining worker pool");
        for _ in 0..handles.len() {
            self.queue.push(QueueItem::PoisonPill);
        }

        for handle in handles.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked outside of a job");
            }
        }
        info!("worker pool stopped");
    }

    /// Workers que siguen vivos (0 después del shutdown)
    #[cfg(test)]
    pub fn live_workers(&self) -> usize {
        self.handles.lock().expect("worker handles poisoned").len()
    }
}

fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("job panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("job panicked: {}", s)
    } else {
        "job panicked".to_string()
    }
}
