// Shared helpers for the integration tests
//
// Fixtures, stub translators, a recording progress reporter and temporary
// usage databases.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tempfile::TempDir;

use interlinear::parsers::html::dom::{find_element_by_id, first_text_descendant, html_to_dom};
use interlinear::translation::background::Background;
use interlinear::translation::config::{ConfigManager, TranslationConfig};
use interlinear::translation::error::{TranslationError, TranslationResult};
use interlinear::translation::progress::ProgressReporter;
use interlinear::translation::provider::Translator;
use interlinear::translation::session::{PageSession, SessionControl};
use interlinear::translation::storage::QuotaStore;

pub const TEST_API_KEY: &str = "test-key";

/// Three eligible texts: "Welcome to the site", "Hello world", "About us"
pub const FIXTURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Fixture page</title><base href="https://example.com/docs/"></head>
<body style="color: #333; font-family: Georgia">
<h1 id="title">Welcome to the site</h1>
<p id="intro" class="lead" style="font-size: 18px; margin: 4px">Hello world</p>
<p id="chinese">你好世界</p>
<script>var greeting = "hello there";</script>
<style>.note { color: red }</style>
<pre>fn main() {}</pre>
<code>let value</code>
<div class="v-cloak">Template text</div>
<span v-if="show">Conditional text</span>
<p>{{ message }}</p>
<p id="percent">42%</p>
<a id="link" href="about.html" target="_blank" rel="noopener">About us</a>
</body>
</html>"#;

/// One paragraph holding two text runs around a nested element
pub const MIXED_PARAGRAPH: &str =
    r#"<html><body><p id="mixed">Hello <b id="bold">bold text</b> world again</p></body></html>"#;

pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").expect("fixture parses")
    }

    pub fn element(dom: &RcDom, id: &str) -> Handle {
        find_element_by_id(&dom.document, id).unwrap_or_else(|| panic!("no element #{id}"))
    }

    pub fn text_of(dom: &RcDom, id: &str) -> Handle {
        first_text_descendant(&Self::element(dom, id)).expect("element has text")
    }

    /// The `index`th child of the element with `id`
    pub fn child(dom: &RcDom, id: &str, index: usize) -> Handle {
        Self::element(dom, id).children.borrow()[index].clone()
    }

    /// Elements carrying the mirror marker class, in document order
    pub fn mirrors(dom: &RcDom) -> Vec<Handle> {
        let mut found = Vec::new();
        let mut stack = vec![dom.document.clone()];
        while let Some(node) = stack.pop() {
            if let NodeData::Element { attrs, .. } = &node.data {
                let is_mirror = attrs.borrow().iter().any(|attr| {
                    &*attr.name.local == "class"
                        && attr.value.split_whitespace().any(|c| c == "translation-container")
                });
                if is_mirror {
                    found.push(node.clone());
                }
            }
            for child in node.children.borrow().iter().rev() {
                stack.push(child.clone());
            }
        }
        found
    }
}

pub fn test_config(api_key: &str) -> TranslationConfig {
    TranslationConfig {
        api_key: api_key.to_string(),
        batch_delay_ms: 0,
        ..TranslationConfig::default()
    }
}

pub fn config_manager(config: TranslationConfig) -> ConfigManager {
    ConfigManager::from_config(config)
}

/// A redb usage store in a fresh temporary directory
pub fn temp_store(limit: u64) -> (QuotaStore, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let store = QuotaStore::open(&dir.path().join("quota.redb"), limit).expect("store opens");
    (store, dir)
}

/// Spawns a background owner over a temporary store; needs a tokio runtime
pub fn temp_background(limit: u64) -> (Background, TempDir) {
    let (store, dir) = temp_store(limit);
    (Background::spawn(store), dir)
}

/// Translates to `"T:" + text`, recording every call
///
/// With `staggered`, earlier calls of a round take longer than later ones,
/// so calls complete in reverse issue order.
#[derive(Default)]
pub struct StubTranslator {
    calls: Mutex<Vec<Vec<String>>>,
    completions: Mutex<Vec<usize>>,
    staggered: bool,
    fail_on_call: Option<usize>,
}

impl StubTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staggered() -> Self {
        Self {
            staggered: true,
            ..Self::default()
        }
    }

    /// Fails the call with this zero-based index
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Call indices in completion order
    pub fn completions(&self) -> Vec<usize> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate_batch(&self, texts: &[String], _target_lang: &str) -> TranslationResult<Vec<String>> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(texts.to_vec());
            calls.len() - 1
        };

        if self.staggered {
            let delay = (10 - (index % 10)) as u64 * 5;
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_on_call == Some(index) {
            return Err(TranslationError::NetworkError("connection reset".to_string()));
        }

        self.completions.lock().unwrap().push(index);
        Ok(texts.iter().map(|text| format!("T:{text}")).collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Raises a stop flag from inside its first call
pub struct StoppingTranslator {
    inner: StubTranslator,
    flag: Option<Arc<AtomicBool>>,
    control: Mutex<Option<SessionControl>>,
    stopped: AtomicUsize,
}

impl StoppingTranslator {
    pub fn with_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            inner: StubTranslator::new(),
            flag: Some(flag),
            control: Mutex::new(None),
            stopped: AtomicUsize::new(0),
        }
    }

    /// The session control is attached after the session is built
    pub fn for_session() -> Self {
        Self {
            inner: StubTranslator::new(),
            flag: None,
            control: Mutex::new(None),
            stopped: AtomicUsize::new(0),
        }
    }

    pub fn attach(&self, control: SessionControl) {
        *self.control.lock().unwrap() = Some(control);
    }

    pub fn call_count(&self) -> usize {
        self.inner.call_count()
    }
}

#[async_trait]
impl Translator for StoppingTranslator {
    async fn translate_batch(&self, texts: &[String], target_lang: &str) -> TranslationResult<Vec<String>> {
        if self.stopped.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(flag) = &self.flag {
                flag.store(true, Ordering::SeqCst);
            }
            if let Some(control) = self.control.lock().unwrap().as_ref() {
                control.request_stop();
            }
        }
        self.inner.translate_batch(texts, target_lang).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Begin(usize),
    Update(usize, usize),
    Finish,
}

/// Records every progress call; clones share the log
#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    events: Rc<RefCell<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.borrow().clone()
    }

    pub fn updates(&self) -> Vec<(usize, usize)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Update(processed, total) => Some((*processed, *total)),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn begin(&mut self, total: usize) {
        self.events.borrow_mut().push(ProgressEvent::Begin(total));
    }

    fn update(&mut self, processed: usize, total: usize) {
        self.events.borrow_mut().push(ProgressEvent::Update(processed, total));
    }

    fn finish(&mut self) {
        self.events.borrow_mut().push(ProgressEvent::Finish);
    }
}

/// A session over `translator` with a temporary usage store
pub fn session_with(
    config: TranslationConfig,
    translator: Arc<dyn Translator>,
    limit: u64,
) -> (PageSession, Background, TempDir) {
    let (background, dir) = temp_background(limit);
    let session = PageSession::new(config_manager(config), translator, background.handle())
        .expect("session builds");
    (session, background, dir)
}
