//! End-to-end cycle tests against the SQLite store with hashed embeddings.

mod common;

use anima_core::{
    ActionSet, AnimaConfig, DesireStatus, Dimension, MemoryRecord, MemoryStore, MemorySubject,
    SharedTraits, TraitProfile,
};
use anima_limbic::TurnContext;
use anima_memory::{HashEmbedder, SqliteStore};
use anima_reasoning::CognitiveCycle;
use common::*;
use std::sync::Arc;

async fn setup(generator: &Arc<MockGenerator>) -> (CognitiveCycle, Arc<SqliteStore>) {
    let store = Arc::new(
        SqliteStore::new(":memory:", Arc::new(HashEmbedder::new(128)))
            .await
            .unwrap(),
    );
    let cycle = CognitiveCycle::new(
        generator.clone(),
        store.clone(),
        SharedTraits::new(TraitProfile::balanced()),
        ActionSet::new(),
        &AnimaConfig::default(),
    );
    (cycle, store)
}

#[tokio::test]
async fn test_observation_forms_opinion_and_desire() {
    let generator = Arc::new(MockGenerator::new());
    let dim = Some(Dimension::SelfTranscendence);
    generator.push_opinion(opinion_draft("gardening", 0.9, dim));
    generator.push_desire(desire_draft("start a community garden"));
    let (cycle, store) = setup(&generator).await;

    let memory = MemoryRecord::new("My neighbour shared her tomatoes", MemorySubject::World, 0.4);
    let report = cycle.observe(&memory).await;

    assert_eq!(report.opinions.len(), 1);
    assert_eq!(report.desires.len(), 1);
    // (0.36 + 0.15 + 0.225) · (0.5 + 0.5)
    assert!((report.desires[0].intensity - 0.735).abs() < 1e-5);
    assert_eq!(report.desires[0].status, DesireStatus::Pending);

    assert_eq!(store.memory_count().await.unwrap(), 1);
    assert_eq!(store.opinion_count().await.unwrap(), 1);
    assert_eq!(store.desire_count().await.unwrap(), 1);

    let stored = store.get_opinion(report.opinions[0].id).await.unwrap().unwrap();
    assert_eq!(stored.associated_desire, Some(report.desires[0].id));
}

#[tokio::test]
async fn test_repeated_subject_revises_and_reinforces() {
    let generator = Arc::new(MockGenerator::new());
    let dim = Some(Dimension::SelfTranscendence);
    generator.push_opinion(opinion_draft("gardening", 0.9, dim));
    generator.push_opinion(opinion_draft("gardening", 0.8, dim));
    generator.push_desire(desire_draft("start a community garden"));
    let (cycle, store) = setup(&generator).await;

    let first = cycle
        .observe(&MemoryRecord::new("Tomatoes grew well", MemorySubject::World, 0.4))
        .await;
    let second = cycle
        .observe(&MemoryRecord::new("The basil came up", MemorySubject::World, 0.3))
        .await;

    assert_eq!(second.opinions.len(), 1);
    assert_eq!(second.opinions[0].id, first.opinions[0].id);
    assert_eq!(second.opinions[0].associated_memories.len(), 2);
    assert_eq!(second.desires.len(), 1);
    assert_eq!(second.desires[0].id, first.desires[0].id);
    assert_eq!(generator.desire_calls(), 1);

    // Revision pushed the opinion to full confidence and stability, so the
    // smoothed intensity 0.7 · 0.735 + 0.3 · 0.96 crosses the threshold.
    assert!((second.desires[0].intensity - 0.8025).abs() < 1e-4);
    assert_eq!(second.desires[0].status, DesireStatus::Active);
    assert_eq!(generator.initiative_calls(), 1);
    let stored = store.get_desire(first.desires[0].id).await.unwrap().unwrap();
    assert_eq!(stored.status, DesireStatus::Satisfied);

    assert_eq!(store.opinion_count().await.unwrap(), 1);
    assert_eq!(store.desire_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_turn_memorises_exchange() {
    let generator = Arc::new(MockGenerator::new());
    let (cycle, store) = setup(&generator).await;

    let report = cycle.turn("How was your day?", "Quiet, thanks.").await;
    assert!(report.opinions.is_empty());

    let hits = store.search_memories("How was your day?", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.subject, MemorySubject::User);
    assert!(hits[0].record.content.starts_with("User: How was your day?"));
}

#[tokio::test]
async fn test_mood_moves_with_turn() {
    let generator = Arc::new(MockGenerator::new());
    let (cycle, _) = setup(&generator).await;

    let before = cycle.mood().pad();
    assert!(cycle.mood().apply_turn(&TurnContext::new("hi", "hello")).await);
    let after = cycle.mood().pad();
    assert!(after.pleasure > before.pleasure);
}

#[tokio::test]
async fn test_retry_pending_resumes_active_desires_only() {
    let generator = Arc::new(MockGenerator::new());
    let (cycle, store) = setup(&generator).await;

    let interrupted = stored_desire(uuid::Uuid::new_v4(), "call an old friend", 0.9, DesireStatus::Active);
    let untriggered = stored_desire(uuid::Uuid::new_v4(), "tidy the shelf", 0.9, DesireStatus::Pending);
    store.upsert_desire(&interrupted).await.unwrap();
    store.upsert_desire(&untriggered).await.unwrap();

    assert_eq!(cycle.retry_pending().await, 1);
    assert_eq!(generator.initiative_calls(), 1);

    let interrupted = store.get_desire(interrupted.id).await.unwrap().unwrap();
    let untriggered = store.get_desire(untriggered.id).await.unwrap().unwrap();
    assert_eq!(interrupted.status, DesireStatus::Satisfied);
    assert_eq!(untriggered.status, DesireStatus::Pending);

    // Nothing left to retry.
    assert_eq!(cycle.retry_pending().await, 0);
}

#[tokio::test]
async fn test_new_intense_desire_waits_for_reinforcement() {
    let generator = Arc::new(MockGenerator::new());
    let mut draft = opinion_draft("sailing", 1.0, Some(Dimension::SelfTranscendence));
    draft.confidence = 1.0;
    generator.push_opinion(draft);
    generator.push_desire(desire_draft("learn to sail"));
    let (cycle, store) = setup(&generator).await;

    let report = cycle
        .observe(&MemoryRecord::new("The boats looked beautiful", MemorySubject::World, 0.5))
        .await;
    let created = &report.desires[0];
    // (0.4 + 0.3 + 0.225) · (0.5 + 0.5)
    assert!((created.intensity - 0.925).abs() < 1e-5);
    assert_eq!(created.status, DesireStatus::Pending);

    assert_eq!(cycle.retry_pending().await, 0);
    assert_eq!(generator.initiative_calls(), 0);
    let stored = store.get_desire(created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DesireStatus::Pending);
}

#[tokio::test]
async fn test_failed_initiative_is_retried_later() {
    let generator = Arc::new(MockGenerator::new());
    generator
        .initiative_fails
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let dim = Some(Dimension::SelfTranscendence);
    generator.push_opinion(opinion_draft("gardening", 0.9, dim));
    generator.push_opinion(opinion_draft("gardening", 0.8, dim));
    generator.push_desire(desire_draft("start a community garden"));
    let (cycle, store) = setup(&generator).await;

    cycle
        .observe(&MemoryRecord::new("Tomatoes grew well", MemorySubject::World, 0.4))
        .await;
    let second = cycle
        .observe(&MemoryRecord::new("The basil came up", MemorySubject::World, 0.3))
        .await;
    let id = second.desires[0].id;
    assert_eq!(generator.initiative_calls(), 1);
    let after = store.get_desire(id).await.unwrap().unwrap();
    assert_eq!(after.status, DesireStatus::Active);

    generator
        .initiative_fails
        .store(false, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(cycle.retry_pending().await, 1);
    let after = store.get_desire(id).await.unwrap().unwrap();
    assert_eq!(after.status, DesireStatus::Satisfied);
    assert_eq!(generator.initiative_calls(), 2);
}
