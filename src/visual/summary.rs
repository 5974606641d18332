use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use anyhow::Result;
use tracing::{error, debug};
use crate::llm::LlmClient;
use crate::llm::prompts::summary_prompt;
use crate::tree::{Task, TaskId, TaskTree};

pub const SUMMARY_FAILED: &str = "Summary generation failed";

/// Identifies the task content a summary was generated from.
pub fn fingerprint(task: &Task) -> u64 {
    let mut hasher = DefaultHasher::new();
    task.prompt.hash(&mut hasher);
    task.code.hash(&mut hasher);
    hasher.finish()
}

/// A summary request for a node whose cached label is missing or stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub id: TaskId,
    pub fingerprint: u64,
    pub prompt: String,
}

/// Last generated one-line summary per node. An entry is reused until the
/// node's prompt or code changes.
#[derive(Debug, Clone, Default)]
pub struct SummaryCache {
    entries: HashMap<TaskId, (u64, String)>,
}

impl SummaryCache {
    pub fn get(&self, id: TaskId, task: &Task) -> Option<&str> {
        self.entries
            .get(&id)
            .filter(|(fp, _)| *fp == fingerprint(task))
            .map(|(_, s)| s.as_str())
    }

    pub fn insert(&mut self, id: TaskId, fingerprint: u64, summary: String) {
        self.entries.insert(id, (fingerprint, summary));
    }

    /// Nodes reachable in `tree` that need a fresh summary.
    pub fn stale(&self, tree: &TaskTree) -> Vec<SummaryRequest> {
        tree.walk()
            .into_iter()
            .filter_map(|v| {
                let task = tree.get(v.id).ok()?;
                if self.get(v.id, task).is_some() {
                    return None;
                }
                Some(SummaryRequest { id: v.id, fingerprint: fingerprint(task), prompt: task.prompt.clone() })
            })
            .collect()
    }

    /// Caches the successful results. Failures are not cached, so the next
    /// render asks again; the returned labels mark them for this render only.
    pub fn absorb(&mut self, results: Vec<(SummaryRequest, Result<String>)>) -> SummaryCache {
        let mut failed = Vec::new();
        for (request, result) in results {
            match result {
                Ok(summary) => self.insert(request.id, request.fingerprint, summary),
                Err(_) => failed.push(request),
            }
        }

        let mut labels = self.clone();
        for request in failed {
            labels.insert(request.id, request.fingerprint, SUMMARY_FAILED.to_string());
        }
        labels
    }

    /// Drops entries of nodes that are no longer reachable.
    pub fn retain_reachable(&mut self, tree: &TaskTree) {
        self.entries.retain(|id, _| tree.contains(*id));
    }
}

/// Issues one summary call per request. A failure affects only its own request.
pub async fn generate_summaries(llm: &dyn LlmClient, requests: Vec<SummaryRequest>) -> Vec<(SummaryRequest, Result<String>)> {
    let mut results = Vec::with_capacity(requests.len());
    for request in requests {
        let summary = match llm.generate(&summary_prompt(&request.prompt)).await {
            Ok(text) => {
                debug!(task = %request.id, "Summary generated");
                Ok(text.trim().to_string())
            }
            Err(e) => {
                error!(task = %request.id, error = ?e, "Summary generation failed");
                Err(e)
            }
        };
        results.push((request, summary));
    }
    results
}
