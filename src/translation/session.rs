//! Per-document translation session
//!
//! A [`PageSession`] is created for one loaded document and owns everything
//! the translation paths share: the registry of injected mirrors, the
//! running/stop flags and the progress reporter. Quota state is not owned
//! here; it is reached through the [`BackgroundHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use markup5ever_rcdom::{Handle, RcDom};

use crate::parsers::html::dom::{document_body, text_content};
use crate::translation::background::BackgroundHandle;
use crate::translation::config::ConfigManager;
use crate::translation::error::{helpers::log_error, TranslationError, TranslationResult};
use crate::translation::inject::{inject_translation, revert_translation, InjectOptions};
use crate::translation::pipeline::{
    BatchOrchestrator, BatchSettings, Rejection, TextCollector, TextItem,
};
use crate::translation::progress::{ProgressIndicator, ProgressReporter};
use crate::translation::provider::Translator;
use crate::translation::registry::TranslatedRegistry;
use crate::translation::storage::LimitCheck;

/// Flags shared with whoever may ask a running page translation to stop
#[derive(Debug, Clone, Default)]
pub struct SessionControl {
    is_translating: Arc<AtomicBool>,
    should_stop: Arc<AtomicBool>,
}

impl SessionControl {
    pub fn is_translating(&self) -> bool {
        self.is_translating.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }

    /// Asks a running translation to stop; false when nothing is running
    pub fn request_stop(&self) -> bool {
        if !self.is_translating() {
            return false;
        }
        self.should_stop.store(true, Ordering::SeqCst);
        tracing::info!("stop requested");
        true
    }

    /// Label of the page trigger button
    pub fn trigger_label(&self) -> &'static str {
        if self.is_translating() {
            "Stop translation"
        } else {
            "Translate page"
        }
    }
}

/// Clears both flags when a run ends, whichever way it ends
struct RunGuard(SessionControl);

impl RunGuard {
    fn enter(control: &SessionControl) -> Self {
        control.should_stop.store(false, Ordering::SeqCst);
        control.is_translating.store(true, Ordering::SeqCst);
        Self(control.clone())
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.is_translating.store(false, Ordering::SeqCst);
        self.0.should_stop.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReport {
    pub collected: usize,
    pub translated: usize,
    pub injected: usize,
    pub skipped: usize,
    pub characters: u64,
    pub stopped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Completed(PageReport),
    NothingToTranslate,
    /// A run was already in progress and has been asked to stop
    StopRequested,
    QuotaExceeded(LimitCheck),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    Translated(String),
    QuotaExceeded(LimitCheck),
}

/// Result of toggling a single node from the hover path
#[derive(Debug, Clone)]
pub enum ToggleOutcome {
    Translated(Handle),
    Reverted,
    Ineligible(Rejection),
    QuotaExceeded(LimitCheck),
    /// Translated, but the node had no place to put a mirror
    NotInjected,
}

pub struct PageSession {
    config: ConfigManager,
    translator: Arc<dyn Translator>,
    background: BackgroundHandle,
    orchestrator: BatchOrchestrator,
    collector: TextCollector,
    registry: TranslatedRegistry,
    progress: Box<dyn ProgressReporter>,
    control: SessionControl,
    inject_options: InjectOptions,
}

impl PageSession {
    pub fn new(
        config: ConfigManager,
        translator: Arc<dyn Translator>,
        background: BackgroundHandle,
    ) -> TranslationResult<Self> {
        let settings = BatchSettings::from(&config.get()?);

        Ok(Self {
            config,
            translator,
            background,
            orchestrator: BatchOrchestrator::new(settings),
            collector: TextCollector::default(),
            registry: TranslatedRegistry::new(),
            progress: Box::new(ProgressIndicator::new()),
            control: SessionControl::default(),
            inject_options: InjectOptions::default(),
        })
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_inject_options(mut self, options: InjectOptions) -> Self {
        self.inject_options = options;
        self
    }

    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    pub fn registry(&self) -> &TranslatedRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// Full-page translation, or a stop request if one is already running
    pub async fn translate_page(&mut self, dom: &RcDom) -> TranslationResult<PageOutcome> {
        if self.control.request_stop() {
            return Ok(PageOutcome::StopRequested);
        }

        let _guard = RunGuard::enter(&self.control);
        let result = self.run_page(dom).await;
        self.progress.finish();

        if let Err(ref e) = result {
            log_error(e);
        }
        result
    }

    async fn run_page(&mut self, dom: &RcDom) -> TranslationResult<PageOutcome> {
        let root = document_body(dom);
        let items: Vec<TextItem> = self.collector.collect(&root, &self.registry);
        if items.is_empty() {
            tracing::info!("no translatable text found");
            return Ok(PageOutcome::NothingToTranslate);
        }

        let api_key = self.config.api_key()?;
        let target_lang = self.config.get()?.target_lang;

        let texts: Vec<String> = items.iter().map(|item| item.text.clone()).collect();
        let total_chars: u64 = items.iter().map(|item| item.char_count() as u64).sum();

        let check = self.background.check_limit(total_chars, Some(&api_key)).await?;
        if !check.allowed {
            tracing::warn!("{}", check.message());
            return Ok(PageOutcome::QuotaExceeded(check));
        }

        tracing::info!(
            "translating {} texts ({} chars) into '{}'",
            texts.len(),
            total_chars,
            target_lang
        );
        self.progress.begin(texts.len());

        let outcome = self
            .orchestrator
            .translate_all(
                self.translator.as_ref(),
                &texts,
                &target_lang,
                self.progress.as_mut(),
                &self.control.should_stop,
            )
            .await?;

        let characters = outcome.translated_chars(&texts) as u64;
        if characters > 0 {
            self.background.update_count(characters, Some(&api_key)).await?;
        }

        let mut report = PageReport {
            collected: items.len(),
            translated: outcome.translated.len(),
            characters,
            stopped: outcome.stopped,
            ..PageReport::default()
        };

        for (item, translated) in items.iter().zip(outcome.translated.iter()) {
            match inject_translation(&mut self.registry, &item.node, translated, &self.inject_options) {
                Some(_) => report.injected += 1,
                None => report.skipped += 1,
            }
        }

        tracing::info!(
            "injected {} of {} translations{}",
            report.injected,
            report.translated,
            if report.stopped { " (stopped early)" } else { "" }
        );

        Ok(PageOutcome::Completed(report))
    }

    /// Translates free text, e.g. a selection, and records its usage
    pub async fn translate_text(&self, text: &str) -> TranslationResult<TextOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranslationError::InvalidInput(
                "nothing to translate".to_string(),
            ));
        }

        let api_key = self.config.api_key()?;
        let target_lang = self.config.get()?.target_lang;
        let characters = text.chars().count() as u64;

        let check = self.background.check_limit(characters, Some(&api_key)).await?;
        if !check.allowed {
            tracing::warn!("{}", check.message());
            return Ok(TextOutcome::QuotaExceeded(check));
        }

        let translated = self.translator.translate(text, &target_lang).await?;
        self.background.update_count(characters, Some(&api_key)).await?;
        Ok(TextOutcome::Translated(translated))
    }

    /// Whether `text_node` currently has a mirror
    pub fn is_translated(&self, text_node: &Handle) -> bool {
        self.registry.has(text_node)
    }

    /// Reverts `text_node` if it has a mirror, else translates and mirrors it
    pub async fn toggle_node(&mut self, text_node: &Handle) -> TranslationResult<ToggleOutcome> {
        if self.registry.has(text_node) {
            revert_translation(&mut self.registry, text_node);
            tracing::debug!("translation removed");
            return Ok(ToggleOutcome::Reverted);
        }

        let raw = text_content(text_node);
        if let Err(rejection) = self.collector.accept(text_node, &raw, &self.registry) {
            return Ok(ToggleOutcome::Ineligible(rejection));
        }
        let text = raw.trim().to_string();

        let api_key = self.config.api_key()?;
        let target_lang = self.config.get()?.target_lang;
        let characters = text.chars().count() as u64;

        let check = self.background.check_limit(characters, Some(&api_key)).await?;
        if !check.allowed {
            tracing::warn!("{}", check.message());
            return Ok(ToggleOutcome::QuotaExceeded(check));
        }

        let translated = self
            .orchestrator
            .translate_texts(self.translator.as_ref(), &[text], &target_lang)
            .await?;
        let Some(translated) = translated.into_iter().next() else {
            return Err(TranslationError::TranslationServiceError(
                "empty translation response".to_string(),
            ));
        };
        self.background.update_count(characters, Some(&api_key)).await?;

        Ok(
            match inject_translation(&mut self.registry, text_node, &translated, &self.inject_options) {
                Some(mirror) => ToggleOutcome::Translated(mirror),
                None => ToggleOutcome::NotInjected,
            },
        )
    }
}
