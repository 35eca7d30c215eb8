use chrono::Utc;
use patternedge::config::{StatisticalConfig, StorageConfig};
use patternedge::coordinator::StatisticalDecisionManager;
use patternedge::domain::Timeframe;
use patternedge::persistence::{render, JsonDocument, StatisticsData};
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "patternedge-persist-{}-{}",
        name,
        Utc::now().timestamp_nanos_opt().unwrap_or(0)
    ))
}

async fn seeded(storage: &StorageConfig) -> StatisticalDecisionManager {
    let manager = StatisticalDecisionManager::open(storage, StatisticalConfig::default()).await;
    let trades: [(Timeframe, &str, bool, f64); 8] = [
        (Timeframe::H1, "Hammer", true, 0.1 + 0.2),
        (Timeframe::H1, "Hammer", false, -1.0 / 3.0),
        (Timeframe::H1, "Doji", true, 2.0 / 7.0),
        (Timeframe::M15, "Pin_Bar", false, -0.7),
        (Timeframe::M15, "Pin_Bar", true, 1e-9),
        (Timeframe::D1, "Engulfing", true, 12.345678901234567),
        (Timeframe::H4, "Engulfing", false, 0.0),
        (Timeframe::H1, "Hammer", true, 1.7976931348623157e10),
    ];
    for (tf, pattern, win, r) in trades {
        manager.record_outcome(tf, pattern, win, r).await;
    }
    manager
}

/// save(load(save(load(D)))) == save(D), byte for byte.
#[tokio::test]
async fn save_load_save_is_stable() {
    let storage = StorageConfig::in_dir(temp_dir("roundtrip"));
    seeded(&storage).await.close().await.unwrap();

    let first = tokio::fs::read_to_string(storage.data_path()).await.unwrap();

    let doc: JsonDocument<StatisticsData> = JsonDocument::new(storage.data_path(), "test");
    let loaded = doc.read().await.unwrap().unwrap();
    doc.save(&loaded).await.unwrap();
    let second = tokio::fs::read_to_string(storage.data_path()).await.unwrap();
    assert_eq!(first, second);

    let reloaded = doc.read().await.unwrap().unwrap();
    assert_eq!(reloaded, loaded);
    assert_eq!(render(&reloaded).unwrap(), first);

    // Reopening the manager and closing again does not drift either
    StatisticalDecisionManager::open(&storage, StatisticalConfig::default())
        .await
        .close()
        .await
        .unwrap();
    let third = tokio::fs::read_to_string(storage.data_path()).await.unwrap();
    assert_eq!(first, third);

    let _ = tokio::fs::remove_dir_all(&storage.data_dir).await;
}

#[tokio::test]
async fn config_document_uses_field_names() {
    let storage = StorageConfig::in_dir(temp_dir("config-doc"));
    let manager = StatisticalDecisionManager::open(&storage, StatisticalConfig::default()).await;
    manager.set_prior(3.0, 7.0).await.unwrap();

    let raw = tokio::fs::read_to_string(storage.config_path()).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["enabled"], true);
    assert_eq!(value["selected_timeframe"], "H1");
    assert_eq!(value["bayesian_prior_alpha"], 3.0);
    assert_eq!(value["bayesian_prior_beta"], 7.0);
    assert_eq!(value["max_kelly_fraction"], 0.25);
    assert_eq!(value["use_half_kelly"], true);
    assert_eq!(value["confidence_level"], 0.95);

    let _ = tokio::fs::remove_dir_all(&storage.data_dir).await;
}

#[tokio::test]
async fn reset_twice_equals_reset_once_on_disk() {
    let storage = StorageConfig::in_dir(temp_dir("reset"));
    let manager = seeded(&storage).await;

    assert!(manager.reset_pattern(Timeframe::H1, "Hammer").await);
    let once = tokio::fs::read_to_string(storage.data_path()).await.unwrap();

    assert!(!manager.reset_pattern(Timeframe::H1, "Hammer").await);
    let twice = tokio::fs::read_to_string(storage.data_path()).await.unwrap();
    assert_eq!(once, twice);

    let data: StatisticsData = serde_json::from_str(&once).unwrap();
    let h1 = data.timeframe(Timeframe::H1).unwrap();
    assert!(!h1.patterns.contains_key("Hammer"));
    assert_eq!(h1.trade_count("Hammer"), 0);
    assert_eq!(h1.trade_count("Doji"), 1);

    let _ = tokio::fs::remove_dir_all(&storage.data_dir).await;
}

#[tokio::test]
async fn every_record_is_on_disk_before_return() {
    let storage = StorageConfig::in_dir(temp_dir("durable"));
    let manager = StatisticalDecisionManager::open(&storage, StatisticalConfig::default()).await;
    let doc: JsonDocument<StatisticsData> = JsonDocument::new(storage.data_path(), "test");

    for n in 1..=5u64 {
        manager.record_outcome(Timeframe::H1, "Doji", n % 2 == 0, 1.0).await;
        let on_disk = doc.read().await.unwrap().unwrap();
        let stats = on_disk.lookup(Timeframe::H1, "Doji").into_option().unwrap();
        assert_eq!(stats.total_trades(), n);
    }
    assert!(!storage.data_path().with_extension("json.tmp").exists());

    let _ = tokio::fs::remove_dir_all(&storage.data_dir).await;
}
