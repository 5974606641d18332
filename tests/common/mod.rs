#![allow(dead_code)]

use async_trait::async_trait;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use taskforge::llm::LlmClient;
use taskforge::runtime::notice::{Notice, RecordingNotifier};

type Responder = Box<dyn Fn(&str) -> anyhow::Result<String> + Send + Sync>;

/// LLM stand-in answering from a closure and recording every prompt.
pub struct ScriptedLlm {
    respond: Responder,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(respond: impl Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static) -> Self {
        Self { respond: Box::new(respond), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }
}

impl fmt::Debug for ScriptedLlm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedLlm").finish()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt)
    }
}

/// Polls the notifier until `predicate` matches a notice.
pub async fn wait_for(notifier: &RecordingNotifier, predicate: impl Fn(&Notice) -> bool) -> Notice {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(n) = notifier.notices().into_iter().find(|n| predicate(n)) {
            return n;
        }
        assert!(tokio::time::Instant::now() < deadline, "timed out; notices: {:#?}", notifier.notices());
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_count(notifier: &RecordingNotifier, count: usize, predicate: impl Fn(&Notice) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if notifier.notices().iter().filter(|n| predicate(n)).count() >= count {
            return;
        }
        assert!(tokio::time::Instant::now() < deadline, "timed out; notices: {:#?}", notifier.notices());
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
