//! Deterministic embedder and chat model used by the unit tests

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ampdesk_core::{ChatMessage, Embedder, Error, GenerationConfig, LLMProvider, Result};

/// Embedder that returns pinned vectors for known texts and a hashed
/// bag-of-words vector for everything else
pub struct FakeEmbedder {
    dimension: usize,
    pinned: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
    short: HashSet<String>,
    fail_all: AtomicBool,
    batch_calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            pinned: HashMap::new(),
            failing: HashSet::new(),
            short: HashSet::new(),
            fail_all: AtomicBool::new(false),
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.to_string(), vector);
        self
    }

    /// Any request containing `text` fails
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Any batch containing `text` comes back one vector short
    pub fn short_on(mut self, text: &str) -> Self {
        self.short.insert(text.to_string());
        self
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn rejects(&self, text: &str) -> bool {
        self.fail_all.load(Ordering::SeqCst) || self.failing.contains(text)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.pinned.get(text) {
            return vector.clone();
        }

        let mut vector = vec![0.0; self.dimension];
        for word in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let idx = (hasher.finish() % self.dimension as u64) as usize;
            vector[idx] += 1.0;
        }
        if vector.iter().all(|x| *x == 0.0) {
            vector[0] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.rejects(text) {
            return Err(Error::Embedding("embedding service unavailable".to_string()));
        }
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if texts.iter().any(|t| self.rejects(t)) {
            return Err(Error::Embedding("embedding batch rejected".to_string()));
        }
        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
        if texts.iter().any(|t| self.short.contains(t)) {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "fake-embedding"
    }
}

/// Chat model that records every prompt and answers with a fixed reply
pub struct ScriptedLlm {
    reply: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    configs: Mutex<Vec<GenerationConfig>>,
}

impl ScriptedLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_config(&self) -> Option<GenerationConfig> {
        self.configs.lock().unwrap().last().cloned()
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage], config: &GenerationConfig) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.configs.lock().unwrap().push(config.clone());
        self.reply
            .clone()
            .ok_or_else(|| Error::Generation("model unavailable".to_string()))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}
