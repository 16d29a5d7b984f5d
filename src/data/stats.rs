//! # Agregaciones Estadísticas
//! src/data/stats.rs
//!
//! Las nueve consultas que puede pedir un cliente, expresadas como una
//! variante etiquetada que el motor de jobs ejecuta sin conocer su tipo.

use crate::data::dataset::{is_best_max, is_best_min, DataIngestor, Dataset};
use crate::error::JobError;
use crate::jobs::types::Task;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tipo de agregación, sin parámetros (se usa para enrutar)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    StatesMean,
    StateMean,
    Best5,
    Worst5,
    GlobalMean,
    DiffFromMean,
    StateDiffFromMean,
    MeanByCategory,
    StateMeanByCategory,
}

impl Aggregation {
    pub const ALL: [Aggregation; 9] = [
        Aggregation::StatesMean,
        Aggregation::StateMean,
        Aggregation::Best5,
        Aggregation::Worst5,
        Aggregation::GlobalMean,
        Aggregation::DiffFromMean,
        Aggregation::StateDiffFromMean,
        Aggregation::MeanByCategory,
        Aggregation::StateMeanByCategory,
    ];

    /// Nombre del endpoint (`/api/<name>`)
    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::StatesMean => "states_mean",
            Aggregation::StateMean => "state_mean",
            Aggregation::Best5 => "best5",
            Aggregation::Worst5 => "worst5",
            Aggregation::GlobalMean => "global_mean",
            Aggregation::DiffFromMean => "diff_from_mean",
            Aggregation::StateDiffFromMean => "state_diff_from_mean",
            Aggregation::MeanByCategory => "mean_by_category",
            Aggregation::StateMeanByCategory => "state_mean_by_category",
        }
    }

    #[cfg(test)]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// La consulta necesita el campo `state`
    pub fn needs_state(&self) -> bool {
        matches!(
            self,
            Aggregation::StateMean | Aggregation::StateDiffFromMean | Aggregation::StateMeanByCategory
        )
    }

    /// Construye la consulta. `state` es obligatorio si `needs_state()`.
    pub fn query(&self, question: String, state: Option<String>) -> Option<StatsQuery> {
        let query = match self {
            Aggregation::StatesMean => StatsQuery::StatesMean { question },
            Aggregation::Best5 => StatsQuery::Best5 { question },
            Aggregation::Worst5 => StatsQuery::Worst5 { question },
            Aggregation::GlobalMean => StatsQuery::GlobalMean { question },
            Aggregation::DiffFromMean => StatsQuery::DiffFromMean { question },
            Aggregation::MeanByCategory => StatsQuery::MeanByCategory { question },
            Aggregation::StateMean => StatsQuery::StateMean { question, state: state? },
            Aggregation::StateDiffFromMean => StatsQuery::StateDiffFromMean { question, state: state? },
            Aggregation::StateMeanByCategory => StatsQuery::StateMeanByCategory { question, state: state? },
        };
        Some(query)
    }
}

/// Consulta concreta con sus parámetros
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsQuery {
    StatesMean { question: String },
    StateMean { question: String, state: String },
    Best5 { question: String },
    Worst5 { question: String },
    GlobalMean { question: String },
    DiffFromMean { question: String },
    StateDiffFromMean { question: String, state: String },
    MeanByCategory { question: String },
    StateMeanByCategory { question: String, state: String },
}

impl StatsQuery {
    pub fn aggregation(&self) -> Aggregation {
        match self {
            StatsQuery::StatesMean { .. } => Aggregation::StatesMean,
            StatsQuery::StateMean { .. } => Aggregation::StateMean,
            StatsQuery::Best5 { .. } => Aggregation::Best5,
            StatsQuery::Worst5 { .. } => Aggregation::Worst5,
            StatsQuery::GlobalMean { .. } => Aggregation::GlobalMean,
            StatsQuery::DiffFromMean { .. } => Aggregation::DiffFromMean,
            StatsQuery::StateDiffFromMean { .. } => Aggregation::StateDiffFromMean,
            StatsQuery::MeanByCategory { .. } => Aggregation::MeanByCategory,
            StatsQuery::StateMeanByCategory { .. } => Aggregation::StateMeanByCategory,
        }
    }

    /// Evalúa la consulta sobre el dataset
    pub fn evaluate(&self, data: &Dataset) -> Value {
        match self {
            StatsQuery::GlobalMean { question } => {
                json!({ "global_mean": global_mean(data, question) })
            }
            StatsQuery::StatesMean { question } => {
                to_object(sorted_states_means(data, question, is_best_min(question)))
            }
            StatsQuery::StateMean { question, state } => {
                single(state, state_mean(data, question, state))
            }
            StatsQuery::Best5 { question } => {
                let mut means = sorted_states_means(data, question, is_best_min(question));
                means.truncate(5);
                to_object(means)
            }
            StatsQuery::Worst5 { question } => {
                let mut means = sorted_states_means(data, question, is_best_max(question));
                means.truncate(5);
                to_object(means)
            }
            StatsQuery::DiffFromMean { question } => {
                let global = global_mean(data, question);
                let diffs = sorted_states_means(data, question, is_best_min(question))
                    .into_iter()
                    .map(|(state, mean)| (state, sub(global, mean)))
                    .collect();
                to_object(diffs)
            }
            StatsQuery::StateDiffFromMean { question, state } => {
                let diff = sub(global_mean(data, question), state_mean(data, question, state));
                single(state, diff)
            }
            StatsQuery::MeanByCategory { question } => {
                let mut groups: BTreeMap<(&str, &str, &str), Mean> = BTreeMap::new();
                for r in data.by_question(question) {
                    if let (Some(cat), Some(strat)) = (&r.category, &r.stratification) {
                        groups
                            .entry((r.location.as_str(), cat.as_str(), strat.as_str()))
                            .or_default()
                            .add(r.value);
                    }
                }
                let map = groups
                    .into_iter()
                    .map(|((loc, cat, strat), mean)| (py_tuple(&[loc, cat, strat]), json!(mean.value())))
                    .collect::<Map<String, Value>>();
                Value::Object(map)
            }
            StatsQuery::StateMeanByCategory { question, state } => {
                let mut groups: BTreeMap<(&str, &str), Mean> = BTreeMap::new();
                for r in data.by_question(question).filter(|r| &r.location == state) {
                    if let (Some(cat), Some(strat)) = (&r.category, &r.stratification) {
                        groups.entry((cat.as_str(), strat.as_str())).or_default().add(r.value);
                    }
                }
                let inner = groups
                    .into_iter()
                    .map(|((cat, strat), mean)| (py_tuple(&[cat, strat]), json!(mean.value())))
                    .collect::<Map<String, Value>>();
                let mut outer = Map::new();
                outer.insert(state.clone(), Value::Object(inner));
                Value::Object(outer)
            }
        }
    }
}

/// Job que ejecuta una consulta contra el dataset compartido
pub struct StatsJob {
    data: Arc<DataIngestor>,
    query: StatsQuery,
}

impl StatsJob {
    pub fn new(data: Arc<DataIngestor>, query: StatsQuery) -> Self {
        Self { data, query }
    }

    pub fn query(&self) -> &StatsQuery {
        &self.query
    }
}

impl Task for StatsJob {
    fn name(&self) -> &str {
        self.query.aggregation().name()
    }

    fn execute(self) -> Result<Value, JobError> {
        let data = self.data.dataset().ok_or(JobError::DataUnavailable)?;
        Ok(self.query.evaluate(data))
    }
}

/// Acumulador de media incremental
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn global_mean(data: &Dataset, question: &str) -> Option<f64> {
    let mut mean = Mean::default();
    data.by_question(question).for_each(|r| mean.add(r.value));
    mean.value()
}

fn state_mean(data: &Dataset, question: &str, state: &str) -> Option<f64> {
    let mut mean = Mean::default();
    data.by_question(question)
        .filter(|r| r.location == state)
        .for_each(|r| mean.add(r.value));
    mean.value()
}

/// Media por estado, ordenada por valor (estable ante empates)
fn sorted_states_means(data: &Dataset, question: &str, ascending: bool) -> Vec<(String, Option<f64>)> {
    let mut groups: BTreeMap<&str, Mean> = BTreeMap::new();
    for r in data.by_question(question) {
        groups.entry(r.location.as_str()).or_default().add(r.value);
    }

    let mut means: Vec<(String, f64)> = groups
        .into_iter()
        .filter_map(|(state, mean)| mean.value().map(|v| (state.to_string(), v)))
        .collect();

    means.sort_by(|a, b| {
        let ord = a.1.total_cmp(&b.1);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });

    means.into_iter().map(|(s, v)| (s, Some(v))).collect()
}

fn sub(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

fn single(key: &str, value: Option<f64>) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), json!(value));
    Value::Object(map)
}

fn to_object(entries: Vec<(String, Option<f64>)>) -> Value {
    Value::Object(entries.into_iter().map(|(k, v)| (k, json!(v))).collect())
}

/// Representación de una tupla de strings al estilo `('a', 'b')`,
/// formato de las claves compuestas en la respuesta
fn py_tuple(parts: &[&str]) -> String {
    let items: Vec<String> = parts.iter().map(|s| py_str(s)).collect();
    if items.len() == 1 {
        format!("({},)", items[0])
    } else {
        format!("({})", items.join(", "))
    }
}

fn py_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
