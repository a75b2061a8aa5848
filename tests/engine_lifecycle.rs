//! End-to-end behaviour of the engine across simulated restarts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use sitewatch::notify::{ChannelNotifier, WatchEvent};
use sitewatch::snapshot::SnapshotStore;
use sitewatch::watchlist::WatchList;
use sitewatch::{Config, Engine, ResourceId, Result, WatchError};

/// Serves canned bodies keyed by URL; anything else is unreachable.
#[derive(Default)]
struct StaticFetcher {
    pages: Mutex<HashMap<String, String>>,
}

impl StaticFetcher {
    fn set(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    fn unset(&self, url: &str) {
        self.pages.lock().unwrap().remove(url);
    }
}

#[async_trait]
impl sitewatch::fetch::Fetcher for StaticFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<String> {
        self.pages
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| WatchError::Fetch(format!("Could not access {}", id)))
    }
}

fn id(s: &str) -> ResourceId {
    ResourceId::new(s).unwrap()
}

fn config_in(dir: &TempDir) -> Config {
    Config {
        data_dir: dir.path().to_path_buf(),
        desktop_notifications: false,
        ..Config::default()
    }
}

fn open(
    config: &Config,
    fetcher: Arc<StaticFetcher>,
) -> (Engine, tokio::sync::mpsc::UnboundedReceiver<WatchEvent>) {
    let (notifier, rx) = ChannelNotifier::new();
    let engine = Engine::from_config(config, fetcher, Arc::new(notifier)).unwrap();
    (engine, rx)
}

fn changes(rx: &mut tokio::sync::mpsc::UnboundedReceiver<WatchEvent>) -> Vec<ResourceId> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let WatchEvent::Changed(change) = event {
            out.push(change.id);
        }
    }
    out
}

#[tokio::test]
async fn hello_world_scenario_across_restarts() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let fetcher = Arc::new(StaticFetcher::default());

    {
        let (engine, mut rx) = open(&config, fetcher.clone());
        engine.add_resource(id("http://a")).await.unwrap();
        fetcher.set("http://a", "<html><body><p>Hello</p></body></html>");
        engine.run_once().await;
        assert!(changes(&mut rx).is_empty());
    }

    // Restart: list and snapshot come back from disk.
    let (engine, mut rx) = open(&config, fetcher.clone());
    assert_eq!(engine.current_list().await, vec![id("http://a")]);
    assert_eq!(
        engine.store().get(&id("http://a")).unwrap().as_deref(),
        Some("Hello")
    );

    fetcher.set("http://a", "<html><body><p>Hello, world</p></body></html>");
    engine.run_once().await;
    assert_eq!(changes(&mut rx), vec![id("http://a")]);

    engine.run_once().await;
    assert!(changes(&mut rx).is_empty());
}

#[tokio::test]
async fn remove_survives_restart_and_clears_snapshot() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.set("http://a", "A");
    fetcher.set("http://b", "B");

    {
        let (engine, _rx) = open(&config, fetcher.clone());
        engine.add_resource(id("http://a")).await.unwrap();
        engine.add_resource(id("http://b")).await.unwrap();
        engine.run_once().await;
        assert!(engine.remove_resource(&id("http://a")).await.unwrap());
    }

    let list = WatchList::load(config.watch_list_path()).unwrap();
    assert_eq!(list.list(), vec![id("http://b")]);

    let store = SnapshotStore::open(config.snapshot_dir()).unwrap();
    assert_eq!(store.get(&id("http://a")).unwrap(), None);
    assert_eq!(store.get(&id("http://b")).unwrap().as_deref(), Some("B"));
}

#[tokio::test]
async fn daemon_follows_list_edits_from_cli() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.set("http://a", "A");
    fetcher.set("http://b", "B");

    let (daemon, _daemon_rx) = open(&config, fetcher.clone());
    daemon.add_resource(id("http://a")).await.unwrap();
    daemon.run_once().await;

    {
        let (cli, _cli_rx) = open(&config, fetcher.clone());
        assert!(cli.remove_resource(&id("http://a")).await.unwrap());
        assert!(cli.add_resource(id("http://b")).await.unwrap());
    }

    daemon.run_once().await;
    assert_eq!(daemon.current_list().await, vec![id("http://b")]);

    let list = WatchList::load(config.watch_list_path()).unwrap();
    assert_eq!(list.list(), vec![id("http://b")]);

    let store = SnapshotStore::open(config.snapshot_dir()).unwrap();
    assert_eq!(store.get(&id("http://a")).unwrap(), None);
    assert_eq!(store.get(&id("http://b")).unwrap().as_deref(), Some("B"));
}

#[tokio::test]
async fn corrupt_watch_list_recovers_to_empty() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    std::fs::write(config.watch_list_path(), "[\"http://a\",").unwrap();

    let (engine, _rx) = open(&config, Arc::new(StaticFetcher::default()));
    assert!(engine.current_list().await.is_empty());

    let raw = std::fs::read_to_string(config.watch_list_path()).unwrap();
    let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
    assert!(parsed.is_empty());
}

#[tokio::test]
async fn unreachable_resource_keeps_baseline() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let fetcher = Arc::new(StaticFetcher::default());
    let (engine, mut rx) = open(&config, fetcher.clone());

    engine.add_resource(id("http://flaky")).await.unwrap();
    engine.add_resource(id("http://steady")).await.unwrap();
    fetcher.set("http://flaky", "v1");
    fetcher.set("http://steady", "s1");
    engine.run_once().await;

    fetcher.unset("http://flaky");
    fetcher.set("http://steady", "s2");
    let report = engine.run_once().await;
    assert_eq!(report.failed(), 1);
    assert_eq!(changes(&mut rx), vec![id("http://steady")]);
    assert_eq!(
        engine.store().get(&id("http://flaky")).unwrap().as_deref(),
        Some("v1")
    );

    fetcher.set("http://flaky", "v2");
    engine.run_once().await;
    assert_eq!(changes(&mut rx), vec![id("http://flaky")]);
}

#[tokio::test]
async fn duplicates_allowed_when_configured() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        allow_duplicates: true,
        ..config_in(&dir)
    };
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.set("http://a", "A");
    let (engine, _rx) = open(&config, fetcher);

    assert!(engine.add_resource(id("http://a")).await.unwrap());
    assert!(engine.add_resource(id("http://a")).await.unwrap());
    engine.run_once().await;

    // One copy removed; the other still needs the snapshot.
    engine.remove_resource(&id("http://a")).await.unwrap();
    assert!(engine.store().contains(&id("http://a")));

    engine.remove_resource(&id("http://a")).await.unwrap();
    assert!(!engine.store().contains(&id("http://a")));
}
