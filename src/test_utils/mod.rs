use std::collections::BTreeSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::AdvertisementRegistry;
use crate::DiscoClient;
use crate::FeatureInfo;
use crate::Identity;
use crate::PeerId;
use crate::QueryError;
use crate::Result;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Wait for a fire-and-forget writeback worker to land `path`
pub async fn wait_for_file(path: &std::path::Path) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !path.exists() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("writeback never produced the entry file");
}

pub fn sample_info() -> FeatureInfo {
    FeatureInfo {
        identities: vec![Identity {
            category: "client".to_string(),
            type_: "pc".to_string(),
            lang: Some("en".to_string()),
            name: Some("exampleclient".to_string()),
        }],
        features: BTreeSet::from([
            "urn:example:presence".to_string(),
            "urn:example:caps".to_string(),
        ]),
    }
}

pub fn info_with_feature(feature: &str) -> FeatureInfo {
    let mut info = sample_info();
    info.features.insert(feature.to_string());
    info
}

/// Hand-written feature-query stub with slot-based responses.
///
/// An optional gate semaphore lets tests park a query mid-flight to
/// exercise the single-flight deduplication path.
#[derive(Default)]
pub struct StubDisco {
    /// Expected response for query_info, replayed on every call
    pub expected_info_response: Mutex<Option<std::result::Result<FeatureInfo, QueryError>>>,
    pub query_calls: AtomicUsize,
    pub gate: Mutex<Option<Arc<Semaphore>>>,
    pub info_futures: Mutex<Vec<(PeerId, JoinHandle<Result<FeatureInfo>>)>>,
}

impl StubDisco {
    pub fn with_response(info: FeatureInfo) -> Self {
        let stub = Self::default();
        *stub.expected_info_response.lock() = Some(Ok(info));
        stub
    }

    pub fn set_gate(
        &self,
        gate: Arc<Semaphore>,
    ) {
        *self.gate.lock() = Some(gate);
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Pop the most recently associated resolution task
    pub fn take_info_future(&self) -> Option<(PeerId, JoinHandle<Result<FeatureInfo>>)> {
        self.info_futures.lock().pop()
    }
}

#[async_trait]
impl DiscoClient for StubDisco {
    async fn query_info(
        &self,
        _peer: &PeerId,
        _node: &str,
        _require_fresh: bool,
    ) -> Result<FeatureInfo> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }

        match self.expected_info_response.lock().clone() {
            Some(Ok(info)) => Ok(info),
            Some(Err(e)) => Err(e.into()),
            None => Err(QueryError::Transport("no stub response set".to_string()).into()),
        }
    }

    fn set_info_future(
        &self,
        peer: &PeerId,
        task: JoinHandle<Result<FeatureInfo>>,
    ) {
        self.info_futures.lock().push((peer.clone(), task));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Mount(String),
    Unmount(String),
}

/// Advertisement registry recording mount/unmount order
pub struct RecordingRegistry {
    pub info: Mutex<FeatureInfo>,
    pub events: Mutex<Vec<RegistryEvent>>,
}

impl RecordingRegistry {
    pub fn new(info: FeatureInfo) -> Self {
        Self {
            info: Mutex::new(info),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn set_info(
        &self,
        info: FeatureInfo,
    ) {
        *self.info.lock() = info;
    }

    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().clone()
    }

    pub fn mounted_nodes(&self) -> Vec<String> {
        let mut mounted = Vec::new();
        for event in self.events.lock().iter() {
            match event {
                RegistryEvent::Mount(node) => mounted.push(node.clone()),
                RegistryEvent::Unmount(node) => mounted.retain(|n| n != node),
            }
        }
        mounted
    }
}

impl AdvertisementRegistry for RecordingRegistry {
    fn local_info(&self) -> FeatureInfo {
        self.info.lock().clone()
    }

    fn mount(
        &self,
        node: &str,
        _info: FeatureInfo,
    ) {
        self.events.lock().push(RegistryEvent::Mount(node.to_string()));
    }

    fn unmount(
        &self,
        node: &str,
    ) {
        self.events.lock().push(RegistryEvent::Unmount(node.to_string()));
    }
}
