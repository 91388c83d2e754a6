use auctiondash_core::CacheStore;
use auctiondash_core::Orchestrator;
use auctiondash_core::SourceTag;
use auctiondash_core::cache::CacheConfig;
use auctiondash_core::cache::SledStore;
use auctiondash_core::clock::ManualClock;
use auctiondash_core::sources::BackupSnapshotAdapter;
use auctiondash_core::sources::LocalFileAdapter;
use auctiondash_core::sources::LocalFileOrigin;
use auctiondash_core::sources::RemoteDatabaseAdapter;
use chrono::FixedOffset;
use chrono::TimeZone;
use reqwest::Client;
use serde_json::Value;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use url::Url;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn node(uids: &[u64]) -> Value {
    let data: Vec<Value> = uids
        .iter()
        .map(|uid| json!({ "uid": uid, "address": "서울특별시 용산구", "maemulinfo": "아파트" }))
        .collect();
    json!({ "data": data, "last_updated": "2026-03-14 06:00:00" })
}

fn sled_cache(dir: &Path) -> Arc<CacheStore> {
    let store = SledStore::open(&CacheConfig {
        path: Some(dir.join("cache")),
        ..CacheConfig::default()
    })
    .expect("open sled");
    Arc::new(CacheStore::new(Arc::new(store)))
}

fn orchestrator(server: &MockServer, site: &Path, cache: Arc<CacheStore>) -> Orchestrator {
    let clock = ManualClock::new(
        FixedOffset::east_opt(9 * 3600)
            .expect("offset")
            .with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
            .single()
            .expect("time"),
    );
    let client = Client::new();
    let remote = RemoteDatabaseAdapter::new(
        client.clone(),
        Url::parse(&server.uri()).expect("url"),
        Arc::clone(&cache),
    );
    let local = LocalFileAdapter::new(client, LocalFileOrigin::Directory(site.to_path_buf()))
        .with_candidates(vec!["dashboard_data.json".to_string()]);
    Orchestrator::builder(Arc::clone(&cache))
        .clock(Arc::new(clock))
        .source(Arc::new(BackupSnapshotAdapter::new(Arc::clone(&cache))))
        .source(Arc::new(local))
        .source(Arc::new(remote))
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_outage_falls_back_to_local_export() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("dashboard_data.json"),
        serde_json::to_vec(&node(&[515468])).expect("encode"),
    )
    .expect("write export");

    let cache = sled_cache(dir.path());
    let orchestrator = orchestrator(&server, dir.path(), Arc::clone(&cache));
    let dataset = orchestrator.resolve(false).await.expect("resolve");

    assert_eq!(dataset.source, Some(SourceTag::LocalFile));
    assert_eq!(dataset.records[0].id, "515468");
    assert!(cache.backup_entry().expect("read").is_none());
    assert_eq!(orchestrator.stats().fallbacks, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backup_from_remote_survives_into_the_next_session() {
    let dir = tempdir().expect("tempdir");
    let online = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auction_data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(node(&[402604, 515468])))
        .mount(&online)
        .await;

    {
        let cache = sled_cache(dir.path());
        let first = orchestrator(&online, dir.path(), Arc::clone(&cache));
        let dataset = first.resolve(false).await.expect("online resolve");
        assert_eq!(dataset.source, Some(SourceTag::RemoteDb));
        assert_eq!(
            cache.backup_date().expect("date"),
            Some("2026-03-14".to_string())
        );
    }

    let offline = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&offline)
        .await;
    let cache = sled_cache(dir.path());
    let second = orchestrator(&offline, dir.path(), Arc::clone(&cache));

    let dataset = second.refresh().await.expect("offline resolve");
    assert_eq!(dataset.source, Some(SourceTag::Backup));
    let ids: Vec<_> = dataset.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["402604", "515468"]);
    assert!(!dataset.is_sample);
}
