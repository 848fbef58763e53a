//! Browser glue: DOM-backed flip elements, localStorage persistence and an
//! `XMLHttpRequest` transport with upload progress.

use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Blob, FormData, HtmlElement, ProgressEvent, Storage, XmlHttpRequest};

use crate::config::AppConfig;
use crate::constants::FLIP_KEY_ATTRIBUTE;
use crate::error::{HttpError, StoreError};
use crate::flip::{ElementHandle, ElementLocator, FlipRegistry, Rect, SpringFlipAnimator};
use crate::gesture::{FrameClock, ZIndexQueue};
use crate::services::{
    HttpClient, HttpRequest, KeyValueStore, MemoryStore, RequestBody, RequestOptions,
    TransferProgress, split_path,
};
use crate::upload::{CancellationToken, UploadFile, Uploader};

#[wasm_bindgen(start)]
pub fn start() {
    let config = match LocalStorageStore::open() {
        Ok(store) => AppConfig::load_from_store(&store),
        Err(_) => AppConfig::default(),
    };
    crate::logging::init(config.log_level);
    log::info!("Dankbank {} ready", env!("CARGO_PKG_VERSION"));
}

fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

/// A flip-able element found by its `data-flip-key`.
#[derive(Debug, Clone)]
pub struct DomElement(HtmlElement);

impl ElementHandle for DomElement {
    fn bounding_rect(&self) -> Rect {
        let rect = self.0.get_bounding_client_rect();
        Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
    }

    fn inline_transform(&self) -> Option<String> {
        self.0
            .style()
            .get_property_value("transform")
            .ok()
            .filter(|value| !value.is_empty())
    }

    fn set_inline_transform(&self, transform: Option<&str>) {
        let style = self.0.style();
        let result = match transform {
            Some(transform) => style
                .set_property("transform-origin", "0 0")
                .and_then(|_| style.set_property("transform", transform)),
            None => style.remove_property("transform").map(|_| ()),
        };
        if let Err(e) = result {
            log::debug!("Failed to set transform: {}", js_message(&e));
        }
    }
}

impl DomElement {
    fn set_z_index(&self, z_index: i32) {
        if let Err(e) = self.0.style().set_property("z-index", &z_index.to_string()) {
            log::debug!("Failed to set z-index: {}", js_message(&e));
        }
    }
}

/// Finds `[data-flip-key="<id>"]` elements, in the whole document or under
/// one container.
#[derive(Debug, Clone, Default)]
pub struct DomLocator {
    root: Option<web_sys::Element>,
}

impl DomLocator {
    pub fn document() -> Self {
        Self::default()
    }

    pub fn within(root: web_sys::Element) -> Self {
        Self { root: Some(root) }
    }

    fn selector(id: &str) -> String {
        let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
        format!("[{}=\"{}\"]", FLIP_KEY_ATTRIBUTE, escaped)
    }
}

impl ElementLocator for DomLocator {
    type Handle = DomElement;

    fn locate(&self, id: &str) -> Option<DomElement> {
        let selector = Self::selector(id);
        let found = match &self.root {
            Some(root) => root.query_selector(&selector),
            None => web_sys::window()?.document()?.query_selector(&selector),
        };
        found
            .ok()
            .flatten()
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
            .map(DomElement)
    }
}

/// `localStorage`-backed store. The first path segment is the storage key;
/// the rest addresses into that key's JSON value.
#[derive(Debug, Clone)]
pub struct LocalStorageStore {
    storage: Storage,
}

impl LocalStorageStore {
    pub fn open() -> Result<Self, StoreError> {
        let storage = web_sys::window()
            .ok_or_else(|| StoreError::Backend("no window".to_string()))?
            .local_storage()
            .map_err(|e| StoreError::Backend(js_message(&e)))?
            .ok_or_else(|| StoreError::Backend("localStorage unavailable".to_string()))?;
        Ok(Self { storage })
    }

    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw = self
            .storage
            .get_item(key)
            .map_err(|e| StoreError::Backend(js_message(&e)))?;
        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| StoreError::Backend(e.to_string()))
        })
        .transpose()
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.storage
            .set_item(key, &value.to_string())
            .map_err(|e| StoreError::Backend(js_message(&e)))
    }

    /// The stored value under `key` as a tree addressed by the remaining
    /// segments.
    fn subtree(&self, key: &str) -> Result<MemoryStore, StoreError> {
        match self.read(key)? {
            Some(value) => MemoryStore::from_value(value)
                .map_err(|_| StoreError::NotAnObject(key.to_string())),
            None => Ok(MemoryStore::new()),
        }
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let Some((key, rest)) = segments.split_first() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };
        let Some(value) = self.read(key)? else {
            return Ok(None);
        };
        if rest.is_empty() {
            return Ok(Some(value));
        }
        match MemoryStore::from_value(value) {
            Ok(tree) => tree.get(&rest.join(".")),
            Err(_) => Ok(None),
        }
    }

    fn set(&mut self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let Some((key, rest)) = segments.split_first() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };
        if rest.is_empty() {
            return self.write(key, &value);
        }
        let mut tree = self.subtree(key)?;
        tree.set(&rest.join("."), value)?;
        self.write(key, &tree.to_value())
    }

    fn remove(&mut self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let Some((key, rest)) = segments.split_first() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };
        if rest.is_empty() {
            let previous = self.read(key)?;
            self.storage
                .remove_item(key)
                .map_err(|e| StoreError::Backend(js_message(&e)))?;
            return Ok(previous);
        }
        let mut tree = self.subtree(key)?;
        let removed = tree.remove(&rest.join("."))?;
        if removed.is_some() {
            self.write(key, &tree.to_value())?;
        }
        Ok(removed)
    }
}

/// Aborts the request when the owning future is dropped before it settled.
struct AbortOnDrop {
    xhr: XmlHttpRequest,
    settled: bool,
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if !self.settled && self.xhr.abort().is_err() {
            log::debug!("Failed to abort XMLHttpRequest");
        }
    }
}

type Outcome = Rc<RefCell<Option<oneshot::Sender<Result<Value, HttpError>>>>>;

fn settle(outcome: &Outcome, result: Result<Value, HttpError>) {
    if let Some(sender) = outcome.borrow_mut().take() {
        // The receiver is gone once the request was aborted.
        let _ = sender.send(result);
    }
}

/// [`HttpClient`] over `XMLHttpRequest`, the browser API with upload
/// progress events.
#[derive(Debug, Clone, Default)]
pub struct XhrClient;

impl XhrClient {
    pub fn new() -> Self {
        Self
    }

    async fn send(request: HttpRequest, options: RequestOptions) -> Result<Value, HttpError> {
        let RequestOptions {
            cancel,
            on_upload_progress,
        } = options;
        if cancel.is_cancelled() {
            return Err(HttpError::Canceled);
        }

        let network = |e: JsValue| HttpError::Network(js_message(&e));
        let xhr = XmlHttpRequest::new().map_err(network)?;
        xhr.open_with_async(request.method.as_str(), &request.url, true)
            .map_err(network)?;
        for (name, value) in &request.headers {
            xhr.set_request_header(name, value).map_err(network)?;
        }

        let (sender, receiver) = oneshot::channel();
        let outcome: Outcome = Rc::new(RefCell::new(Some(sender)));

        let onload = {
            let xhr = xhr.clone();
            let outcome = outcome.clone();
            Closure::<dyn FnMut()>::new(move || {
                let status = xhr.status().unwrap_or(0);
                let body = xhr.response_text().ok().flatten().unwrap_or_default();
                let result = if (200..300).contains(&status) {
                    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
                } else {
                    Err(HttpError::Status { status, body })
                };
                settle(&outcome, result);
            })
        };
        xhr.set_onload(Some(onload.as_ref().unchecked_ref()));

        let onerror = {
            let outcome = outcome.clone();
            Closure::<dyn FnMut()>::new(move || {
                settle(
                    &outcome,
                    Err(HttpError::Network("XMLHttpRequest failed".to_string())),
                );
            })
        };
        xhr.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let onprogress = on_upload_progress.map(|mut report| {
            Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
                report(TransferProgress::new(
                    event.loaded() as u64,
                    event.total() as u64,
                ));
            })
        });
        if let Some(onprogress) = &onprogress {
            xhr.upload()
                .map_err(network)?
                .set_onprogress(Some(onprogress.as_ref().unchecked_ref()));
        }

        match &request.body {
            RequestBody::Empty => xhr.send(),
            RequestBody::Bytes(bytes) => xhr.send_with_opt_u8_array(Some(bytes.as_slice())),
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
            } => {
                let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes.as_slice()));
                let blob = Blob::new_with_u8_array_sequence(&parts).map_err(network)?;
                let form = FormData::new().map_err(network)?;
                form.append_with_blob_and_filename(field, &blob, file_name)
                    .map_err(network)?;
                xhr.send_with_opt_form_data(Some(&form))
            }
        }
        .map_err(network)?;

        let mut guard = AbortOnDrop {
            xhr: xhr.clone(),
            settled: false,
        };
        let result = futures::select_biased! {
            _ = cancel.cancelled().fuse() => Err(HttpError::Canceled),
            outcome = receiver.fuse() => {
                guard.settled = true;
                outcome.unwrap_or_else(|_| Err(HttpError::Network("request dropped".to_string())))
            }
        };
        drop(guard);

        // Keep the callbacks alive until the request settled.
        drop((onload, onerror, onprogress));
        result
    }
}

impl HttpClient for XhrClient {
    fn request(
        &self,
        request: HttpRequest,
        options: RequestOptions,
    ) -> LocalBoxFuture<'_, Result<Value, HttpError>> {
        Self::send(request, options).boxed_local()
    }
}

/// FLIP transitions for one container, driven from JavaScript.
///
/// Call `beforeFlip` before a state change, `flip` once it rendered, then
/// `frame` on every animation frame while it returns true.
#[wasm_bindgen]
pub struct FlipController {
    registry: FlipRegistry<DomLocator>,
    animator: SpringFlipAnimator,
    layers: ZIndexQueue,
    clock: FrameClock,
}

#[wasm_bindgen]
impl FlipController {
    #[wasm_bindgen(constructor)]
    pub fn new(root: Option<web_sys::Element>) -> FlipController {
        let locator = root.map_or_else(DomLocator::document, DomLocator::within);
        FlipController {
            registry: FlipRegistry::new(locator),
            animator: SpringFlipAnimator::default(),
            layers: ZIndexQueue::new(),
            clock: FrameClock::new(),
        }
    }

    #[wasm_bindgen(js_name = beforeFlip)]
    pub fn before_flip(&mut self, id: &str) -> bool {
        self.registry.before_flip(id)
    }

    pub fn flip(&mut self, id: &str) -> bool {
        if self.registry.flip(id, &mut self.animator, None).is_none() {
            return false;
        }
        self.layers.raise(id);
        if let Some(element) = self.registry.locator().locate(id) {
            element.set_z_index(self.layers.z_index(id));
        }
        true
    }

    /// Advance animations. Returns whether another frame is needed.
    pub fn frame(&mut self) -> bool {
        let dt = self.clock.tick();
        for frame in self.animator.tick(dt) {
            self.registry.apply_frame(&frame.id, &frame.diff, frame.settled);
            if frame.settled && self.layers.settle(&frame.id) {
                if let Some(element) = self.registry.locator().locate(&frame.id) {
                    element.set_z_index(self.layers.z_index(&frame.id));
                }
            }
        }
        let animating = self.animator.is_animating();
        if !animating {
            self.clock.reset();
        }
        animating
    }
}

/// Upload `file` with the stored configuration, resolving to the server's
/// final response.
#[wasm_bindgen]
pub async fn upload(file: web_sys::File, endpoint: Option<String>) -> Result<JsValue, JsValue> {
    let mut config = match LocalStorageStore::open() {
        Ok(store) => AppConfig::load_from_store(&store),
        Err(_) => AppConfig::default(),
    };
    if let Some(endpoint) = endpoint {
        config.upload.endpoint = endpoint;
    }

    let buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer()).await?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    let file = UploadFile::new(file.name(), bytes);

    let uploader = Uploader::new(XhrClient::new(), config.upload);
    let uploaded = uploader
        .upload(&file, &CancellationToken::new())
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&uploaded.data.to_string())
}
