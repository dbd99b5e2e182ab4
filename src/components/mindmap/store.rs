//! Document-store client, durable local cache, and the load/save
//! protocols the canvas runs against them.
//!
//! Load priority: local cache → remote store → seed graph. Saves are an
//! explicit two-phase task — the local write is synchronous and
//! unconditional, the remote write is attempted afterwards and its
//! failure never rolls the local one back.

use serde_json::{Value, json};
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

use super::graph::MindmapGraph;
use super::persist::{self, normalize, serialize};

/// Failures at the persistence boundary. None of these are fatal: loads
/// fall back toward the seed graph, saves degrade to local-only.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
	#[error("request failed: {0}")]
	Http(String),
	#[error("server returned status {0}")]
	Status(u16),
	#[error("malformed response: {0}")]
	Parse(String),
	#[error("local cache rejected write: {0}")]
	Cache(String),
	#[error("store unavailable")]
	Unavailable,
}

/// The consumed document-store collaborator: a path-keyed get/set pair
/// over `{ nodes, edges }` JSON documents.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
	async fn get(&self, path: &str) -> Result<Value, StoreError>;
	async fn set(&self, path: &str, doc: &Value) -> Result<(), StoreError>;
}

/// Synchronous durable cache keyed by document path.
pub trait GraphCache {
	fn read(&self, path: &str) -> Option<String>;
	fn write(&self, path: &str, payload: &str) -> Result<(), StoreError>;
}

/// Where a loaded graph came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSource {
	Cache,
	Remote,
	Seed,
}

/// Per-phase result of a save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseStatus {
	Ok,
	Failed(String),
}

impl PhaseStatus {
	pub fn is_ok(&self) -> bool {
		matches!(self, Self::Ok)
	}
}

/// Recorded outcome of one two-phase save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveOutcome {
	pub local: PhaseStatus,
	pub remote: PhaseStatus,
}

impl SaveOutcome {
	pub fn is_clean(&self) -> bool {
		self.local.is_ok() && self.remote.is_ok()
	}
}

/// Load a graph: cache first, then the remote store, then the seed.
/// Empty documents count as misses so a blank store still produces a
/// usable canvas. Remote failure is a diagnostic, never an error.
pub async fn load_graph<C: GraphCache, S: DocumentStore>(
	cache: &C,
	store: &S,
	path: &str,
) -> (MindmapGraph, LoadSource) {
	if let Some(payload) = cache.read(path) {
		if let Ok(raw) = serde_json::from_str::<Value>(&payload) {
			let graph = normalize(&raw);
			if !graph.nodes.is_empty() {
				return (graph, LoadSource::Cache);
			}
		}
	}
	match store.get(path).await {
		Ok(raw) => {
			let graph = normalize(&raw);
			if !graph.nodes.is_empty() {
				return (graph, LoadSource::Remote);
			}
		}
		Err(err) => log::warn!("remote load of {path} failed: {err}"),
	}
	(persist::seed_graph(), LoadSource::Seed)
}

/// Best-effort remote persist of a freshly seeded graph; failure is only
/// logged. Callers run this off the load path so the canvas never waits
/// on it.
pub async fn persist_seed<S: DocumentStore>(store: &S, path: &str, graph: &MindmapGraph) {
	if let Err(err) = store.set(path, &serialize(graph)).await {
		log::info!("seed persist to {path} skipped: {err}");
	}
}

/// Two-phase save: local cache synchronously and unconditionally, then
/// the remote store. Both phase outcomes are recorded; nothing is rolled
/// back.
pub async fn save_graph<C: GraphCache, S: DocumentStore>(
	cache: &C,
	store: &S,
	path: &str,
	graph: &MindmapGraph,
) -> SaveOutcome {
	let doc = serialize(graph);
	let local = match cache.write(path, &doc.to_string()) {
		Ok(()) => PhaseStatus::Ok,
		Err(err) => PhaseStatus::Failed(err.to_string()),
	};
	let remote = match store.set(path, &doc).await {
		Ok(()) => PhaseStatus::Ok,
		Err(err) => PhaseStatus::Failed(err.to_string()),
	};
	SaveOutcome { local, remote }
}

/// Durable cache backed by browser `localStorage`.
#[derive(Clone, Debug, Default)]
pub struct LocalStorageCache;

impl LocalStorageCache {
	fn key(path: &str) -> String {
		format!("mindmap-canvas:{path}")
	}

	fn storage() -> Option<web_sys::Storage> {
		web_sys::window()?.local_storage().ok()?
	}
}

impl GraphCache for LocalStorageCache {
	fn read(&self, path: &str) -> Option<String> {
		Self::storage()?.get_item(&Self::key(path)).ok()?
	}

	fn write(&self, path: &str, payload: &str) -> Result<(), StoreError> {
		let storage = Self::storage().ok_or(StoreError::Unavailable)?;
		storage
			.set_item(&Self::key(path), payload)
			.map_err(|err| StoreError::Cache(format!("{err:?}")))
	}
}

/// CMS-style document store speaking a fixed query/mutation pair over a
/// single JSON POST endpoint.
#[derive(Clone, Debug)]
pub struct CmsStore {
	endpoint: String,
	token: Option<String>,
}

impl CmsStore {
	pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
		Self { endpoint: endpoint.into(), token }
	}

	async fn post(&self, body: &Value) -> Result<Value, StoreError> {
		let init = RequestInit::new();
		init.set_method("POST");
		init.set_body(&JsValue::from_str(&body.to_string()));
		let request = Request::new_with_str_and_init(&self.endpoint, &init).map_err(js_error)?;
		request
			.headers()
			.set("Content-Type", "application/json")
			.map_err(js_error)?;
		if let Some(token) = &self.token {
			request
				.headers()
				.set("Authorization", &format!("Bearer {token}"))
				.map_err(js_error)?;
		}

		let window = web_sys::window().ok_or(StoreError::Unavailable)?;
		let response = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(js_error)?;
		let response: Response = response
			.dyn_into()
			.map_err(|_| StoreError::Parse("fetch did not yield a response".into()))?;
		if !response.ok() {
			return Err(StoreError::Status(response.status()));
		}
		let text = JsFuture::from(response.text().map_err(js_error)?)
			.await
			.map_err(js_error)?;
		let text = text
			.as_string()
			.ok_or_else(|| StoreError::Parse("non-text response body".into()))?;
		serde_json::from_str(&text).map_err(|err| StoreError::Parse(err.to_string()))
	}
}

fn js_error(err: JsValue) -> StoreError {
	StoreError::Http(format!("{err:?}"))
}

impl DocumentStore for CmsStore {
	async fn get(&self, path: &str) -> Result<Value, StoreError> {
		let body = json!({ "query": "canvas", "path": path });
		let response = self.post(&body).await?;
		// tolerate both a bare document and one nested under `data`
		Ok(response.get("data").cloned().unwrap_or(response))
	}

	async fn set(&self, path: &str, doc: &Value) -> Result<(), StoreError> {
		let body = json!({
			"mutation": "saveCanvas",
			"path": path,
			"nodes": doc.get("nodes").cloned().unwrap_or(Value::Null),
			"edges": doc.get("edges").cloned().unwrap_or(Value::Null),
		});
		self.post(&body).await.map(|_| ())
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::collections::HashMap;

	use futures::executor::block_on;

	use super::super::persist::seed_graph;
	use super::*;

	#[derive(Default)]
	struct MemoryCache {
		entries: RefCell<HashMap<String, String>>,
		reject_writes: bool,
	}

	impl GraphCache for MemoryCache {
		fn read(&self, path: &str) -> Option<String> {
			self.entries.borrow().get(path).cloned()
		}

		fn write(&self, path: &str, payload: &str) -> Result<(), StoreError> {
			if self.reject_writes {
				return Err(StoreError::Cache("rejected".into()));
			}
			self.entries.borrow_mut().insert(path.into(), payload.into());
			Ok(())
		}
	}

	#[derive(Default)]
	struct MockStore {
		doc: RefCell<Option<Value>>,
		fail: bool,
		sets: RefCell<Vec<Value>>,
	}

	impl DocumentStore for MockStore {
		async fn get(&self, _path: &str) -> Result<Value, StoreError> {
			if self.fail {
				return Err(StoreError::Status(500));
			}
			self.doc.borrow().clone().ok_or(StoreError::Unavailable)
		}

		async fn set(&self, _path: &str, doc: &Value) -> Result<(), StoreError> {
			if self.fail {
				return Err(StoreError::Status(500));
			}
			self.sets.borrow_mut().push(doc.clone());
			*self.doc.borrow_mut() = Some(doc.clone());
			Ok(())
		}
	}

	fn cached_graph() -> (MindmapGraph, String) {
		let mut graph = MindmapGraph::new();
		graph.add_node();
		let payload = serialize(&graph).to_string();
		(graph, payload)
	}

	#[test]
	fn load_prefers_the_local_cache() {
		let (graph, payload) = cached_graph();
		let cache = MemoryCache::default();
		cache.write("doc", &payload).unwrap();
		let store = MockStore { doc: RefCell::new(Some(serialize(&seed_graph()))), ..Default::default() };

		let (loaded, source) = block_on(load_graph(&cache, &store, "doc"));
		assert_eq!(source, LoadSource::Cache);
		assert_eq!(loaded, graph);
	}

	#[test]
	fn load_falls_back_to_remote_when_cache_is_empty() {
		let (graph, _) = cached_graph();
		let cache = MemoryCache::default();
		let store = MockStore { doc: RefCell::new(Some(serialize(&graph))), ..Default::default() };

		let (loaded, source) = block_on(load_graph(&cache, &store, "doc"));
		assert_eq!(source, LoadSource::Remote);
		assert_eq!(loaded, graph);
	}

	#[test]
	fn load_ignores_corrupt_cache_payloads() {
		let (graph, _) = cached_graph();
		let cache = MemoryCache::default();
		cache.write("doc", "{not json").unwrap();
		let store = MockStore { doc: RefCell::new(Some(serialize(&graph))), ..Default::default() };

		let (_, source) = block_on(load_graph(&cache, &store, "doc"));
		assert_eq!(source, LoadSource::Remote);
	}

	#[test]
	fn load_seeds_when_everything_else_fails() {
		let cache = MemoryCache::default();
		let store = MockStore { fail: true, ..Default::default() };

		let (loaded, source) = block_on(load_graph(&cache, &store, "doc"));
		assert_eq!(source, LoadSource::Seed);
		assert_eq!(loaded, seed_graph());
	}

	#[test]
	fn empty_remote_documents_count_as_misses() {
		let cache = MemoryCache::default();
		let store = MockStore {
			doc: RefCell::new(Some(json!({ "nodes": [], "edges": [] }))),
			..Default::default()
		};

		let (_, source) = block_on(load_graph(&cache, &store, "doc"));
		assert_eq!(source, LoadSource::Seed);
	}

	#[test]
	fn persist_seed_records_the_document_and_tolerates_failure() {
		let store = MockStore::default();
		let graph = seed_graph();
		block_on(persist_seed(&store, "doc", &graph));
		assert_eq!(store.sets.borrow().len(), 1);
		assert_eq!(normalize(&store.sets.borrow()[0]), graph);

		let failing = MockStore { fail: true, ..Default::default() };
		block_on(persist_seed(&failing, "doc", &graph));
		assert!(failing.sets.borrow().is_empty());
	}

	#[test]
	fn save_records_both_phases() {
		let cache = MemoryCache::default();
		let store = MockStore::default();
		let graph = seed_graph();

		let outcome = block_on(save_graph(&cache, &store, "doc", &graph));
		assert!(outcome.is_clean());
		assert!(cache.read("doc").is_some());
		assert_eq!(store.sets.borrow().len(), 1);
	}

	#[test]
	fn remote_failure_never_discards_the_local_write() {
		let cache = MemoryCache::default();
		let store = MockStore { fail: true, ..Default::default() };
		let graph = seed_graph();

		let outcome = block_on(save_graph(&cache, &store, "doc", &graph));
		assert!(outcome.local.is_ok());
		assert_eq!(outcome.remote, PhaseStatus::Failed(StoreError::Status(500).to_string()));
		// the local copy survives and round-trips
		let payload = cache.read("doc").unwrap();
		let raw: Value = serde_json::from_str(&payload).unwrap();
		assert_eq!(normalize(&raw), graph);
	}

	#[test]
	fn local_failure_is_recorded_while_remote_proceeds() {
		let cache = MemoryCache { reject_writes: true, ..Default::default() };
		let store = MockStore::default();
		let graph = seed_graph();

		let outcome = block_on(save_graph(&cache, &store, "doc", &graph));
		assert!(!outcome.local.is_ok());
		assert!(outcome.remote.is_ok());
	}
}
