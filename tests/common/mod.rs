//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use api_dispatch::config::AppConfig;
use api_dispatch::http::HttpServer;
use api_dispatch::lifecycle::Shutdown;
use api_dispatch::registry::MetadataStore;
use api_dispatch::routing::RouteTable;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Scratch api root populated with empty source files.
pub struct ApiTree {
    dir: TempDir,
}

impl ApiTree {
    pub fn new(files: &[&str]) -> Self {
        let tree = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        for file in files {
            tree.add(file);
        }
        tree
    }

    pub fn add(&self, relative: &str) {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Default configuration pointed at this tree.
    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.routing.api_root = self.root().to_path_buf();
        config
    }
}

/// A running server; shuts down when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub route_updates: mpsc::UnboundedSender<RouteTable>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Resolve routes from `config`, then serve `store` on an ephemeral port.
pub async fn start_server(config: AppConfig, store: MetadataStore) -> TestServer {
    let server = HttpServer::new(config, Arc::new(store.freeze())).expect("routes resolve");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (route_updates, route_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, route_rx, server_shutdown).await;
    });

    TestServer {
        addr,
        route_updates,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
