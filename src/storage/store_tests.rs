use crate::ads::{AnalyticsEvent, ClientContext, EventKind};
use crate::storage::{EventFilter, EventStore, MemoryEventStore, SqliteEventStore};
use std::sync::Arc;

async fn setup_sqlite() -> Arc<dyn EventStore> {
    // A single connection keeps every query on the same in-memory database
    let store = SqliteEventStore::new("sqlite::memory:", 1).await.unwrap();
    store.init().await.unwrap();
    Arc::new(store)
}

async fn setup_memory() -> Arc<dyn EventStore> {
    let store = MemoryEventStore::new();
    store.init().await.unwrap();
    Arc::new(store)
}

fn event(kind: EventKind, ad_id: &str, ad_type: &str, timestamp: i64) -> AnalyticsEvent {
    let context = ClientContext {
        user_agent: "test-agent".to_string(),
        url: "https://example.com/".to_string(),
        referrer: Some("https://search.example/".to_string()),
        screen_resolution: None,
        viewport_size: Some("800x600".to_string()),
    };
    AnalyticsEvent::new(kind, ad_id, ad_type, timestamp, &context)
}

async fn seed(store: &Arc<dyn EventStore>) {
    let events = [
        event(EventKind::Impression, "top-banner-ad", "banner", 1_000),
        event(EventKind::Impression, "sidebar-square-ad", "sidebar", 2_000),
        event(EventKind::Click, "top-banner-ad", "banner", 3_000),
        event(EventKind::Impression, "top-banner-ad", "banner", 4_000),
    ];
    for e in &events {
        store.insert(e).await.unwrap();
    }
}

async fn check_filters(store: Arc<dyn EventStore>) {
    seed(&store).await;

    let all = store.query(&EventFilter::since(0)).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[2].event, EventKind::Click);
    assert_eq!(all[0].referrer.as_deref(), Some("https://search.example/"));
    assert_eq!(all[0].screen_resolution, None);

    let recent = store.query(&EventFilter::since(3_000)).await.unwrap();
    assert_eq!(recent.len(), 2);

    let by_id = store
        .query(&EventFilter {
            since_ms: 0,
            ad_id: Some("top-banner-ad".to_string()),
            ad_type: None,
        })
        .await
        .unwrap();
    assert_eq!(by_id.len(), 3);

    let by_type = store
        .query(&EventFilter {
            since_ms: 0,
            ad_id: None,
            ad_type: Some("sidebar".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].ad_id, "sidebar-square-ad");

    let none = store
        .query(&EventFilter {
            since_ms: 0,
            ad_id: Some("top-banner-ad".to_string()),
            ad_type: Some("sidebar".to_string()),
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_memory_store_filters() {
    check_filters(setup_memory().await).await;
}

#[tokio::test]
async fn test_sqlite_store_filters() {
    check_filters(setup_sqlite().await).await;
}

#[tokio::test]
async fn test_sqlite_init_is_idempotent() {
    let store = SqliteEventStore::new("sqlite::memory:", 1).await.unwrap();
    store.init().await.unwrap();
    store.init().await.unwrap();

    let events = store.query(&EventFilter::since(0)).await.unwrap();
    assert!(events.is_empty());
}
