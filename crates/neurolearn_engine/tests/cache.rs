use std::sync::Arc;
use std::time::Duration;

use neurolearn_engine::{
    ApiSettings, CacheKey, CachePolicy, CacheStore, ChatRecord, ChatRole, ContentCache,
    FileCacheStore, InvalidationEvent, LearningApi, ManualClock, MemoryCacheStore,
    ReqwestApiClient,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn memory_cache() -> (Arc<MemoryCacheStore>, Arc<ManualClock>, ContentCache) {
    neurolearn_logging::initialize_for_tests();
    let store = Arc::new(MemoryCacheStore::new());
    let clock = Arc::new(ManualClock::new(1_000_000));
    let cache = ContentCache::new(store.clone(), clock.clone(), CachePolicy::default());
    (store, clock, cache)
}

fn seed_all(cache: &ContentCache) {
    cache.write(CacheKey::SummaryText, &"summary".to_string());
    cache.write(CacheKey::ReferenceLinks, &Vec::<String>::new());
    cache.write(CacheKey::AvailableFiles, &vec!["a.pdf".to_string()]);
    cache.write(
        CacheKey::ChatHistory,
        &vec![ChatRecord {
            id: 1,
            role: ChatRole::Bot,
            content: "Heyy any doubts?".to_string(),
            timestamp_ms: 0,
        }],
    );
}

#[tokio::test]
async fn two_reads_within_ttl_fetch_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "script_text": "Motion." })))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, clock, cache) = memory_cache();
    let api = ReqwestApiClient::new(&ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    })
    .unwrap();

    let first = cache
        .get_or_fetch(CacheKey::SummaryText, false, || api.get_text())
        .await
        .unwrap();
    clock.advance(Duration::from_secs(4 * 60));
    let second = cache
        .get_or_fetch(CacheKey::SummaryText, false, || api.get_text())
        .await
        .unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.value, "Motion.");
    server.verify().await;
}

#[tokio::test]
async fn expired_entry_is_refetched() {
    let (_store, clock, cache) = memory_cache();
    let mut calls = 0;

    let loaded = cache
        .get_or_fetch(CacheKey::AvailableFiles, false, || {
            calls += 1;
            async { Ok::<_, ()>(vec!["a.pdf".to_string()]) }
        })
        .await
        .unwrap();
    assert!(!loaded.from_cache);

    // The file list lives for two minutes.
    clock.advance(Duration::from_secs(2 * 60));
    let loaded = cache
        .get_or_fetch(CacheKey::AvailableFiles, false, || {
            calls += 1;
            async { Ok::<_, ()>(vec!["b.pdf".to_string()]) }
        })
        .await
        .unwrap();

    assert!(!loaded.from_cache);
    assert_eq!(loaded.value, vec!["b.pdf".to_string()]);
    assert_eq!(calls, 2);
}

#[tokio::test]
async fn forced_load_bypasses_fresh_entry() {
    let (_store, _clock, cache) = memory_cache();
    cache.write(CacheKey::SummaryText, &"old".to_string());

    let loaded = cache
        .get_or_fetch(CacheKey::SummaryText, true, || async {
            Ok::<_, ()>("new".to_string())
        })
        .await
        .unwrap();

    assert!(!loaded.from_cache);
    assert_eq!(cache.read::<String>(CacheKey::SummaryText).as_deref(), Some("new"));
}

#[tokio::test]
async fn failed_fetch_leaves_cache_empty() {
    let (store, _clock, cache) = memory_cache();

    let result = cache
        .get_or_fetch(CacheKey::ReferenceLinks, false, || async {
            Err::<Vec<String>, _>("offline")
        })
        .await;

    assert_eq!(result.unwrap_err(), "offline");
    assert!(!store.contains(CacheKey::ReferenceLinks.storage_key()));
}

#[test]
fn upload_clears_every_derived_key() {
    let (store, _clock, cache) = memory_cache();
    seed_all(&cache);
    assert_eq!(store.len(), 4);

    cache.invalidate_for(InvalidationEvent::Upload);

    for key in CacheKey::ALL {
        assert!(!store.contains(key.storage_key()), "{key:?} survived upload");
    }
}

#[test]
fn learning_tab_and_completion_clear_summary_and_links_only() {
    for event in [
        InvalidationEvent::LearningTabOpened,
        InvalidationEvent::ProcessingCompleted,
    ] {
        let (store, _clock, cache) = memory_cache();
        seed_all(&cache);

        cache.invalidate_for(event);

        assert!(!store.contains(CacheKey::SummaryText.storage_key()));
        assert!(!store.contains(CacheKey::ReferenceLinks.storage_key()));
        assert!(store.contains(CacheKey::AvailableFiles.storage_key()));
        assert!(store.contains(CacheKey::ChatHistory.storage_key()));
    }
}

#[test]
fn chat_history_has_no_ttl() {
    let (_store, clock, cache) = memory_cache();
    seed_all(&cache);

    clock.advance(Duration::from_secs(24 * 60 * 60));

    let records: Vec<ChatRecord> = cache.read(CacheKey::ChatHistory).expect("chat kept");
    assert_eq!(records.len(), 1);
    assert_eq!(cache.read::<String>(CacheKey::SummaryText), None);
}

#[test]
fn undecodable_entry_is_dropped() {
    let (store, _clock, cache) = memory_cache();
    store.set(CacheKey::SummaryText.storage_key(), "not json");

    assert_eq!(cache.read::<String>(CacheKey::SummaryText), None);
    assert!(store.is_empty());
}

#[test]
fn file_store_survives_reopen() {
    neurolearn_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("cache");
    let clock = Arc::new(ManualClock::new(5));

    let cache = ContentCache::new(
        Arc::new(FileCacheStore::new(dir.clone())),
        clock.clone(),
        CachePolicy::default(),
    );
    cache.write(CacheKey::SummaryText, &"persisted".to_string());
    assert!(dir.join("neurolearn_summary_text.json").is_file());

    let reopened = ContentCache::new(
        Arc::new(FileCacheStore::new(dir.clone())),
        clock,
        CachePolicy::default(),
    );
    assert_eq!(
        reopened.read::<String>(CacheKey::SummaryText).as_deref(),
        Some("persisted")
    );

    reopened.invalidate(CacheKey::SummaryText);
    reopened.invalidate(CacheKey::SummaryText);
    assert!(!dir.join("neurolearn_summary_text.json").exists());
}
