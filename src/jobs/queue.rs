//! # Cola FIFO para Jobs
//! src/jobs/queue.rs
//!
//! Implementa una cola thread-safe sin límite de capacidad. Los workers se
//! bloquean en `pop()` hasta que haya trabajo.

use crate::jobs::types::JobId;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Elemento de la cola
pub enum QueueItem<T> {
    /// Trabajo real con el id que le asignó el registro
    Work { id: JobId, task: T },

    /// Indica al worker que lo saque que debe terminar
    PoisonPill,
}

impl<T> QueueItem<T> {
    pub fn is_poison_pill(&self) -> bool {
        matches!(self, QueueItem::PoisonPill)
    }
}

/// Cola FIFO bloqueante
pub struct JobQueue<T> {
    items: Mutex<VecDeque<QueueItem<T>>>,

    /// Condvar para notificar cuando hay nuevos elementos
    condvar: Condvar,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        }
    }

    /// Encola al final. Nunca bloquea más allá del lock interno.
    pub fn push(&self, item: QueueItem<T>) {
        let mut items = self.items.lock().expect("job queue poisoned");
        items.push_back(item);

        // Notificar a un worker esperando
        self.condvar.notify_one();
    }

    /// Desencola el elemento más antiguo
    ///
    /// Bloquea hasta que haya uno disponible
    pub fn pop(&self) -> QueueItem<T> {
        let mut items = self.items.lock().expect("job queue poisoned");

        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }

            items = self.condvar.wait(items).expect("job queue poisoned");
        }
    }

    /// Intenta desencolar sin bloquear
    #[cfg(test)]
    pub fn try_pop(&self) -> Option<QueueItem<T>> {
        let mut items = self.items.lock().expect("job queue poisoned");
        items.pop_front()
    }

    /// Número de trabajos reales pendientes (sin contar poison pills)
    #[cfg(test)]
    pub fn pending_work(&self) -> usize {
        let items = self.items.lock().expect("job queue poisoned");
        items.iter().filter(|item| !item.is_poison_pill()).count()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("job queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
