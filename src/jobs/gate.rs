//! # Compuerta de Disponibilidad
//! src/jobs/gate.rs
//!
//! Señal de un solo uso: los workers esperan aquí hasta que el dataset
//! esté cargado.

use std::sync::{Condvar, Mutex};

/// Señal one-shot thread-safe
pub struct ReadinessGate {
    released: Mutex<bool>,
    condvar: Condvar,
}

impl ReadinessGate {
    /// Crea una compuerta cerrada
    pub fn new() -> Self {
        Self {
            released: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Abre la compuerta. Idempotente.
    pub fn release(&self) {
        let mut released = self.released.lock().expect("readiness gate poisoned");
        if !*released {
            *released = true;
            self.condvar.notify_all();
        }
    }

    /// Bloquea hasta que `release()` se haya llamado al menos una vez
    pub fn await_ready(&self) {
        let mut released = self.released.lock().expect("readiness gate poisoned");
        while !*released {
            released = self.condvar.wait(released).expect("readiness gate poisoned");
        }
    }

    /// Consulta sin bloquear
    pub fn is_released(&self) -> bool {
        *self.released.lock().expect("readiness gate poisoned")
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
