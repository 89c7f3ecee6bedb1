//! Mock collaborators shared by the integration tests.
#![allow(dead_code)]

use anima_core::{
    ActionSet, DesireDraft, DesireRecord, DesireStatus, Dimension, Generator, MemoryRecord,
    MemoryStore, MoodDelta, OpinionDraft, OpinionRecord, PadState, Scored, Trait, TraitProfile,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

// ============================================================================
// Mock Generator
// ============================================================================

/// Pops scripted drafts in order; an exhausted script is a generation error.
#[derive(Default)]
pub struct MockGenerator {
    pub opinions: Mutex<VecDeque<OpinionDraft>>,
    pub desires: Mutex<VecDeque<DesireDraft>>,
    pub initiative_fails: AtomicBool,
    pub opinion_calls: AtomicUsize,
    pub desire_calls: AtomicUsize,
    pub initiative_calls: AtomicUsize,
    pub initiative_prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_opinion(&self, draft: OpinionDraft) {
        self.opinions.lock().unwrap().push_back(draft);
    }

    pub fn push_desire(&self, draft: DesireDraft) {
        self.desires.lock().unwrap().push_back(draft);
    }

    pub fn opinion_calls(&self) -> usize {
        self.opinion_calls.load(Ordering::SeqCst)
    }

    pub fn desire_calls(&self) -> usize {
        self.desire_calls.load(Ordering::SeqCst)
    }

    pub fn initiative_calls(&self) -> usize {
        self.initiative_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn draft_opinion(&self, _memory: &MemoryRecord) -> Result<OpinionDraft> {
        self.opinion_calls.fetch_add(1, Ordering::SeqCst);
        match self.opinions.lock().unwrap().pop_front() {
            Some(d) => Ok(d),
            None => anyhow::bail!("no opinion draft scripted"),
        }
    }

    async fn draft_desire(&self, _opinion: &OpinionRecord, _importance: f32) -> Result<DesireDraft> {
        self.desire_calls.fetch_add(1, Ordering::SeqCst);
        match self.desires.lock().unwrap().pop_front() {
            Some(d) => Ok(d),
            None => anyhow::bail!("no desire draft scripted"),
        }
    }

    async fn draft_mood_delta(&self, _pad: &PadState, _q: &str, _a: &str) -> Result<MoodDelta> {
        Ok(MoodDelta {
            pleasure: 0.1,
            arousal: 0.0,
            dominance: 0.0,
        })
    }

    async fn run_initiative(&self, prompt: &str, _actions: &ActionSet) -> Result<String> {
        self.initiative_calls.fetch_add(1, Ordering::SeqCst);
        self.initiative_prompts.lock().unwrap().push(prompt.to_string());
        if self.initiative_fails.load(Ordering::SeqCst) {
            anyhow::bail!("model unavailable");
        }
        Ok("I looked up volunteering shifts and signed up for one.".to_string())
    }
}

pub fn opinion_draft(subject: &str, polarity: f32, dim: Option<Dimension>) -> OpinionDraft {
    OpinionDraft {
        subject: subject.to_string(),
        summary: format!("on {}", subject),
        narrative: String::new(),
        polarity,
        confidence: 0.5,
        main_dimension: dim.map(|d| d.as_str().to_string()),
    }
}

pub fn desire_draft(label: &str) -> DesireDraft {
    DesireDraft {
        label: label.to_string(),
        description: format!("do: {}", label),
        reasoning: "it matters".to_string(),
    }
}

// ============================================================================
// Mock Store
// ============================================================================

type SimilarityFn = Box<dyn Fn(&str, &str) -> f32 + Send + Sync>;

/// In-memory store. Similarity of a query to a record is computed by a
/// pluggable function over the query and the record's subject/label/content.
pub struct MockStore {
    pub memories: Mutex<Vec<MemoryRecord>>,
    pub opinions: Mutex<HashMap<Uuid, OpinionRecord>>,
    pub desires: Mutex<HashMap<Uuid, DesireRecord>>,
    pub fail_searches: AtomicBool,
    pub fail_writes: AtomicBool,
    similarity: SimilarityFn,
}

impl MockStore {
    /// Exact text match scores 1.0, anything else 0.0.
    pub fn new() -> Self {
        Self::with_similarity(|q, s| if q == s { 1.0 } else { 0.0 })
    }

    pub fn with_similarity<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> f32 + Send + Sync + 'static,
    {
        Self {
            memories: Mutex::new(Vec::new()),
            opinions: Mutex::new(HashMap::new()),
            desires: Mutex::new(HashMap::new()),
            fail_searches: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            similarity: Box::new(f),
        }
    }

    pub fn opinion(&self, id: Uuid) -> Option<OpinionRecord> {
        self.opinions.lock().unwrap().get(&id).cloned()
    }

    pub fn desire(&self, id: Uuid) -> Option<DesireRecord> {
        self.desires.lock().unwrap().get(&id).cloned()
    }

    pub fn opinion_count(&self) -> usize {
        self.opinions.lock().unwrap().len()
    }

    pub fn desire_count(&self) -> usize {
        self.desires.lock().unwrap().len()
    }

    pub fn memory_count(&self) -> usize {
        self.memories.lock().unwrap().len()
    }

    pub fn insert_opinion(&self, o: OpinionRecord) {
        self.opinions.lock().unwrap().insert(o.id, o);
    }

    pub fn insert_desire(&self, d: DesireRecord) {
        self.desires.lock().unwrap().insert(d.id, d);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        Ok(())
    }

    fn check_search(&self) -> Result<()> {
        if self.fail_searches.load(Ordering::SeqCst) {
            anyhow::bail!("index unavailable");
        }
        Ok(())
    }

    fn rank<T: Clone>(&self, query: &str, items: Vec<(String, T)>, top_k: usize) -> Vec<Scored<T>> {
        let mut scored: Vec<Scored<T>> = items
            .into_iter()
            .map(|(text, record)| Scored {
                similarity: (self.similarity)(query, &text),
                record,
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        scored.truncate(top_k);
        scored
    }
}

#[async_trait]
impl MemoryStore for MockStore {
    async fn store_memory(&self, memory: &MemoryRecord) -> Result<()> {
        self.check_write()?;
        self.memories.lock().unwrap().push(memory.clone());
        Ok(())
    }

    async fn search_memories(&self, query: &str, top_k: usize) -> Result<Vec<Scored<MemoryRecord>>> {
        self.check_search()?;
        let items = self
            .memories
            .lock()
            .unwrap()
            .iter()
            .map(|m| (m.content.clone(), m.clone()))
            .collect();
        Ok(self.rank(query, items, top_k))
    }

    async fn search_opinions(&self, query: &str, top_k: usize) -> Result<Vec<Scored<OpinionRecord>>> {
        self.check_search()?;
        let items = self
            .opinions
            .lock()
            .unwrap()
            .values()
            .map(|o| (o.subject.clone(), o.clone()))
            .collect();
        Ok(self.rank(query, items, top_k))
    }

    async fn get_opinion(&self, id: Uuid) -> Result<Option<OpinionRecord>> {
        Ok(self.opinion(id))
    }

    async fn upsert_opinion(&self, opinion: &OpinionRecord) -> Result<()> {
        self.check_write()?;
        self.insert_opinion(opinion.clone());
        Ok(())
    }

    async fn delete_opinion(&self, id: Uuid) -> Result<()> {
        self.check_write()?;
        self.opinions.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn search_desires(&self, query: &str, top_k: usize) -> Result<Vec<Scored<DesireRecord>>> {
        self.check_search()?;
        let items = self
            .desires
            .lock()
            .unwrap()
            .values()
            .map(|d| (d.label.clone(), d.clone()))
            .collect();
        Ok(self.rank(query, items, top_k))
    }

    async fn get_desire(&self, id: Uuid) -> Result<Option<DesireRecord>> {
        Ok(self.desire(id))
    }

    async fn upsert_desire(&self, desire: &DesireRecord) -> Result<()> {
        self.check_write()?;
        self.insert_desire(desire.clone());
        Ok(())
    }

    async fn desires_with_status(&self, status: DesireStatus) -> Result<Vec<DesireRecord>> {
        Ok(self
            .desires
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.status == status)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn profile_with(dim: Dimension, score: f32) -> TraitProfile {
    let mut p = TraitProfile::balanced();
    for t in dim.traits() {
        p.set_score(*t, score);
    }
    p
}

pub fn uniform_profile(score: f32) -> TraitProfile {
    let mut p = TraitProfile::balanced();
    for t in Trait::ALL {
        p.set_score(t, score);
    }
    p
}

pub fn stored_opinion(
    subject: &str,
    polarity: f32,
    confidence: f32,
    stability: f32,
    dim: Option<Dimension>,
) -> OpinionRecord {
    let now = Utc::now();
    OpinionRecord {
        id: Uuid::new_v4(),
        subject: subject.to_string(),
        summary: String::new(),
        narrative: String::new(),
        polarity,
        confidence,
        stability,
        associated_memories: BTreeSet::new(),
        associated_desire: None,
        main_dimension: dim,
        embedding: vec![],
        created_at: now,
        updated_at: now,
    }
}

pub fn stored_desire(opinion_id: Uuid, label: &str, intensity: f32, status: DesireStatus) -> DesireRecord {
    let now = Utc::now();
    DesireRecord {
        id: Uuid::new_v4(),
        opinion_id,
        label: label.to_string(),
        description: String::new(),
        intensity,
        reasoning: String::new(),
        status,
        embedding: vec![],
        created_at: now,
        updated_at: now,
    }
}
