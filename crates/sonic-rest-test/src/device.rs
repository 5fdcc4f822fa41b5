//! In-memory device for manager tests.
//!
//! [`MockDevice`] holds one JSON tree below a root path and answers the
//! REST subset resource managers use:
//!
//! - GET returns the node wrapped in its module-qualified name, or nothing
//! - PATCH merges the body into the tree; lists merge entry-wise by `name`
//! - DELETE removes a leaf, container or list entry, 404 when absent
//!
//! Path segments are either `node` or `list=key`, with keys
//! percent-encoded (`%2F`, `%25`).

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sonic_rest_common::{Method, RestError, RestRequest, RestResult, Transport};
use tracing::debug;

const NAME: &str = "name";

#[derive(Debug, Clone)]
struct InjectedFailure {
    method: Method,
    path: String,
    status: u16,
    message: String,
}

#[derive(Debug)]
struct DeviceState {
    root: Value,
    requests: Vec<RestRequest>,
    fetches: usize,
    failures: Vec<InjectedFailure>,
    unreachable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Node(String),
    Entry { list: String, key: String },
}

impl Segment {
    fn parse(segment: &str) -> Self {
        match segment.split_once('=') {
            Some((list, key)) => Segment::Entry {
                list: list.to_string(),
                key: decode_key(key),
            },
            None => Segment::Node(segment.to_string()),
        }
    }

    /// Name of the node this segment addresses (the list name for entries).
    fn node_name(&self) -> &str {
        match self {
            Segment::Node(name) => name,
            Segment::Entry { list, .. } => list,
        }
    }
}

fn decode_key(key: &str) -> String {
    key.replace("%2F", "/").replace("%25", "%")
}

fn entry_name(entry: &Value) -> Option<&str> {
    entry.get(NAME).and_then(Value::as_str)
}

/// Mock device REST interface
pub struct MockDevice {
    root_path: String,
    container: String,
    state: Mutex<DeviceState>,
}

impl MockDevice {
    /// Creates an empty device.
    ///
    /// `container` is the module-qualified name of the root node, e.g.
    /// `openconfig-qos-buffer:buffer`.
    pub fn new(root_path: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            container: container.into(),
            state: Mutex::new(DeviceState {
                root: Value::Object(Map::new()),
                requests: Vec::new(),
                fetches: 0,
                failures: Vec::new(),
                unreachable: false,
            }),
        }
    }

    /// Seeds the device with a document, either wrapped in the qualified
    /// container name or bare.
    pub fn with_document(self, document: Value) -> Self {
        let root = match document.get(&self.container).cloned() {
            Some(inner) => inner,
            None => document,
        };
        self.state().root = root;
        self
    }

    /// The document a GET on the root path would return.
    pub fn document(&self) -> Option<Value> {
        let state = self.state();
        self.wrap_root(&state.root)
    }

    /// Makes every `method` request on exactly `path` fail with `status`.
    /// GET failures apply to fetches.
    pub fn fail_on(&self, method: Method, path: impl Into<String>, status: u16, message: &str) {
        self.state().failures.push(InjectedFailure {
            method,
            path: path.into(),
            status,
            message: message.to_string(),
        });
    }

    /// Simulates a lost connection: every call fails at the transport level.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Requests received through `execute`, in order, including rejected ones.
    pub fn requests(&self) -> Vec<RestRequest> {
        self.state().requests.clone()
    }

    /// Number of fetches served.
    pub fn fetch_count(&self) -> usize {
        self.state().fetches
    }

    /// Forgets received requests and fetches.
    pub fn clear_log(&self) {
        let mut state = self.state();
        state.requests.clear();
        state.fetches = 0;
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn module(&self) -> &str {
        self.container
            .split_once(':')
            .map(|(module, _)| module)
            .unwrap_or(&self.container)
    }

    fn segments(&self, path: &str) -> Option<Vec<Segment>> {
        let rest = path.strip_prefix(&self.root_path)?;
        if rest.is_empty() {
            return Some(Vec::new());
        }
        let rest = rest.strip_prefix('/')?;
        Some(rest.split('/').map(Segment::parse).collect())
    }

    fn wrap_root(&self, root: &Value) -> Option<Value> {
        match root {
            Value::Object(map) if map.is_empty() => None,
            Value::Null => None,
            other => Some(json!({ self.container.as_str(): other.clone() })),
        }
    }

    fn check_failure(&self, state: &DeviceState, method: Method, path: &str) -> RestResult<()> {
        if state.unreachable {
            return Err(RestError::transport(method.as_str(), "device unreachable"));
        }
        match state
            .failures
            .iter()
            .find(|f| f.method == method && f.path == path)
        {
            Some(f) => Err(RestError::device_request(method, path, f.status, &f.message)),
            None => Ok(()),
        }
    }

    fn patch(&self, root: &mut Value, path: &str, body: Option<&Value>) -> RestResult<()> {
        let segments = self
            .segments(path)
            .ok_or_else(|| not_found(Method::Patch, path))?;
        let Some((qualified, value)) = body
            .and_then(Value::as_object)
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next())
        else {
            return Err(bad_request(
                Method::Patch,
                path,
                "body must hold exactly one top-level node",
            ));
        };

        let Some((last, parents)) = segments.split_last() else {
            if qualified != &self.container {
                return Err(bad_request(
                    Method::Patch,
                    path,
                    &format!("expected '{}', got '{}'", self.container, qualified),
                ));
            }
            merge(root, value);
            return Ok(());
        };

        let expected = format!("{}:{}", self.module(), last.node_name());
        if qualified != &expected {
            return Err(bad_request(
                Method::Patch,
                path,
                &format!("expected '{}', got '{}'", expected, qualified),
            ));
        }
        if let Segment::Entry { key, .. } = last {
            let matches_key = value
                .as_array()
                .map(|entries| entries.iter().all(|e| entry_name(e) == Some(key.as_str())))
                .unwrap_or(false);
            if !matches_key {
                return Err(bad_request(
                    Method::Patch,
                    path,
                    "list body must only carry the addressed entry",
                ));
            }
        }

        let parent = walk_mut(root, parents, true)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| not_found(Method::Patch, path))?;
        let slot = parent
            .entry(last.node_name().to_string())
            .or_insert(Value::Null);
        merge(slot, value);
        Ok(())
    }

    fn delete(&self, root: &mut Value, path: &str) -> RestResult<()> {
        let segments = self
            .segments(path)
            .ok_or_else(|| not_found(Method::Delete, path))?;
        let Some((last, parents)) = segments.split_last() else {
            *root = Value::Object(Map::new());
            return Ok(());
        };

        let parent = walk_mut(root, parents, false).ok_or_else(|| not_found(Method::Delete, path))?;
        let removed = match last {
            Segment::Node(name) => parent
                .as_object_mut()
                .and_then(|m| m.remove(name))
                .is_some(),
            Segment::Entry { list, key } => match parent.get_mut(list).and_then(Value::as_array_mut)
            {
                Some(entries) => {
                    let before = entries.len();
                    entries.retain(|e| entry_name(e) != Some(key.as_str()));
                    entries.len() != before
                }
                None => false,
            },
        };

        if removed {
            Ok(())
        } else {
            Err(not_found(Method::Delete, path))
        }
    }
}

#[async_trait]
impl Transport for MockDevice {
    async fn fetch(&self, path: &str) -> RestResult<Option<Value>> {
        let mut state = self.state();
        self.check_failure(&state, Method::Get, path)?;
        state.fetches += 1;
        debug!("GET {}", path);

        let Some(segments) = self.segments(path) else {
            return Ok(None);
        };
        let Some(last) = segments.last() else {
            return Ok(self.wrap_root(&state.root));
        };

        let node = segments
            .iter()
            .try_fold(&state.root, |node, segment| child(node, segment));
        let qualified = format!("{}:{}", self.module(), last.node_name());
        Ok(node.map(|value| match last {
            Segment::Entry { .. } => json!({ qualified: [value.clone()] }),
            Segment::Node(_) => json!({ qualified: value.clone() }),
        }))
    }

    async fn execute(&self, request: &RestRequest) -> RestResult<()> {
        let mut state = self.state();
        state.requests.push(request.clone());
        self.check_failure(&state, request.method, &request.path)?;
        debug!("{}", request);

        match request.method {
            Method::Patch => self.patch(&mut state.root, &request.path, request.body.as_ref()),
            Method::Delete => self.delete(&mut state.root, &request.path),
            Method::Get => Err(RestError::device_request(
                Method::Get,
                &request.path,
                405,
                "GET is served by fetch",
            )),
        }
    }
}

fn not_found(method: Method, path: &str) -> RestError {
    RestError::device_request(method, path, 404, "Resource not found")
}

fn bad_request(method: Method, path: &str, message: &str) -> RestError {
    RestError::device_request(method, path, 400, message)
}

fn child<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match segment {
        Segment::Node(name) => node.get(name),
        Segment::Entry { list, key } => node
            .get(list)?
            .as_array()?
            .iter()
            .find(|e| entry_name(e) == Some(key.as_str())),
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &Segment, create: bool) -> Option<&'a mut Value> {
    match segment {
        Segment::Node(name) => {
            let map = node.as_object_mut()?;
            if create {
                Some(
                    map.entry(name.clone())
                        .or_insert_with(|| Value::Object(Map::new())),
                )
            } else {
                map.get_mut(name)
            }
        }
        Segment::Entry { list, key } => node
            .get_mut(list)?
            .as_array_mut()?
            .iter_mut()
            .find(|e| entry_name(e) == Some(key.as_str())),
    }
}

fn walk_mut<'a>(mut node: &'a mut Value, segments: &[Segment], create: bool) -> Option<&'a mut Value> {
    for segment in segments {
        node = child_mut(node, segment, create)?;
    }
    Some(node)
}

/// Deep merge: objects key-wise, lists of named entries entry-wise,
/// everything else replaced.
fn merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            for item in source {
                let existing = entry_name(item)
                    .and_then(|name| target.iter_mut().find(|e| entry_name(e) == Some(name)));
                match existing {
                    Some(existing) => merge(existing, item),
                    None => target.push(item.clone()),
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ROOT: &str = "/data/openconfig-qos:qos/buffer";
    const CONTAINER: &str = "openconfig-qos-buffer:buffer";

    fn device() -> MockDevice {
        MockDevice::new(ROOT, CONTAINER).with_document(json!({
            "buffer-profiles": {"buffer-profile": [
                {"name": "p1", "config": {"name": "p1", "size": "10", "static-threshold": "5"}}
            ]}
        }))
    }

    #[tokio::test]
    async fn test_fetch_empty_root_is_none() {
        let device = MockDevice::new(ROOT, CONTAINER);
        assert_eq!(device.fetch(ROOT).await.unwrap(), None);
        assert_eq!(device.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_wraps_root() {
        let doc = device().fetch(ROOT).await.unwrap().unwrap();
        assert_eq!(
            doc[CONTAINER]["buffer-profiles"]["buffer-profile"][0]["name"],
            json!("p1")
        );
    }

    #[tokio::test]
    async fn test_fetch_entry() {
        let doc = device()
            .fetch(&format!("{}/buffer-profiles/buffer-profile=p1/config/size", ROOT))
            .await
            .unwrap();
        assert_eq!(doc, Some(json!({"openconfig-qos-buffer:size": "10"})));
    }

    #[tokio::test]
    async fn test_patch_root_merges_lists_by_name() {
        let device = device();
        let body = json!({CONTAINER: {
            "buffer-profiles": {"buffer-profile": [
                {"name": "p1", "config": {"name": "p1", "size": "20"}},
                {"name": "p2", "config": {"name": "p2"}}
            ]}
        }});

        device
            .execute(&RestRequest::patch(ROOT, body))
            .await
            .unwrap();

        let doc = device.document().unwrap();
        let profiles = &doc[CONTAINER]["buffer-profiles"]["buffer-profile"];
        assert_eq!(
            profiles[0]["config"],
            json!({"name": "p1", "size": "20", "static-threshold": "5"})
        );
        assert_eq!(profiles[1]["name"], json!("p2"));
    }

    #[tokio::test]
    async fn test_patch_entry_creates_missing_containers() {
        let device = MockDevice::new(ROOT, CONTAINER);
        let path = format!("{}/buffer-pools/buffer-pool=a%2Fb", ROOT);
        let body = json!({"openconfig-qos-buffer:buffer-pool": [
            {"name": "a/b", "config": {"name": "a/b", "xoff": "1"}}
        ]});

        device
            .execute(&RestRequest::patch(path.clone(), body))
            .await
            .unwrap();

        let fetched = device.fetch(&path).await.unwrap().unwrap();
        assert_eq!(
            fetched["openconfig-qos-buffer:buffer-pool"][0]["config"]["xoff"],
            json!("1")
        );
    }

    #[tokio::test]
    async fn test_patch_rejects_mismatched_entry() {
        let device = MockDevice::new(ROOT, CONTAINER);
        let body = json!({"openconfig-qos-buffer:buffer-pool": [{"name": "other"}]});
        let err = device
            .execute(&RestRequest::patch(
                format!("{}/buffer-pools/buffer-pool=p", ROOT),
                body,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_delete_leaf_and_entry() {
        let device = device();
        let entry = format!("{}/buffer-profiles/buffer-profile=p1", ROOT);

        device
            .execute(&RestRequest::delete(format!("{}/config/static-threshold", entry)))
            .await
            .unwrap();
        let doc = device.document().unwrap();
        assert_eq!(
            doc[CONTAINER]["buffer-profiles"]["buffer-profile"][0]["config"],
            json!({"name": "p1", "size": "10"})
        );

        device.execute(&RestRequest::delete(entry)).await.unwrap();
        let doc = device.document().unwrap();
        assert_eq!(doc[CONTAINER]["buffer-profiles"]["buffer-profile"], json!([]));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let err = device()
            .execute(&RestRequest::delete(format!(
                "{}/buffer-profiles/buffer-profile=nope",
                ROOT
            )))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_injected_failure_is_logged() {
        let device = device();
        let path = format!("{}/buffer-profiles/buffer-profile=p1", ROOT);
        device.fail_on(Method::Delete, path.clone(), 500, "boom");

        let err = device
            .execute(&RestRequest::delete(path.clone()))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(device.requests(), vec![RestRequest::delete(path)]);
        assert!(device.document().is_some());
    }

    #[tokio::test]
    async fn test_unreachable() {
        let device = device();
        device.set_unreachable(true);
        let err = device.fetch(ROOT).await.unwrap_err();
        assert!(matches!(err, RestError::Transport { .. }));
        assert_eq!(device.fetch_count(), 0);
    }

    #[test]
    fn test_decode_key() {
        assert_eq!(decode_key("a%2Fb"), "a/b");
        assert_eq!(decode_key("100%25"), "100%");
        assert_eq!(decode_key("%252F"), "%2F");
    }
}
