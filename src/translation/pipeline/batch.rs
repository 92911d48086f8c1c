//! Batch translation orchestrator
//!
//! Texts are split, in input order, into chunks of at most `batch_size`, and
//! each chunk into groups of at most `concurrency`. One remote call is issued
//! per group; all calls of a chunk are in flight together and are awaited as
//! a whole. Results are stitched back by group index, never by completion
//! order, so `translated[i]` always belongs to `texts[i]`.
//!
//! Any failed call aborts the whole run and discards every result. The stop
//! flag is consulted before each chunk; a stopped run returns the translated
//! prefix instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::try_join_all;

use crate::translation::config::{constants, TranslationConfig};
use crate::translation::error::{helpers::service_error, TranslationResult};
use crate::translation::progress::{NoProgress, ProgressReporter};
use crate::translation::provider::Translator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub concurrency: usize,
    pub delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: constants::BATCH_SIZE,
            concurrency: constants::CONCURRENCY,
            delay: Duration::from_millis(constants::BATCH_DELAY_MS),
        }
    }
}

impl From<&TranslationConfig> for BatchSettings {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            concurrency: config.concurrency.max(1),
            delay: config.batch_delay(),
        }
    }
}

/// Result of an orchestration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Translations for the first `translated.len()` inputs
    pub translated: Vec<String>,
    /// The run ended early on a stop request
    pub stopped: bool,
}

impl BatchOutcome {
    pub fn translated_chars(&self, texts: &[String]) -> usize {
        texts
            .iter()
            .take(self.translated.len())
            .map(|text| text.chars().count())
            .sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOrchestrator {
    settings: BatchSettings,
}

impl BatchOrchestrator {
    pub fn new(settings: BatchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> BatchSettings {
        self.settings
    }

    /// Number of chunks a run over `total` texts takes
    pub fn chunk_count(&self, total: usize) -> usize {
        total.div_ceil(self.settings.batch_size.max(1))
    }

    pub async fn translate_all(
        &self,
        translator: &dyn Translator,
        texts: &[String],
        target_lang: &str,
        progress: &mut dyn ProgressReporter,
        stop: &AtomicBool,
    ) -> TranslationResult<BatchOutcome> {
        let total = texts.len();
        let batch_size = self.settings.batch_size.max(1);
        let concurrency = self.settings.concurrency.max(1);
        let chunk_count = self.chunk_count(total);

        let mut translated: Vec<String> = Vec::with_capacity(total);

        for (index, chunk) in texts.chunks(batch_size).enumerate() {
            if stop.load(Ordering::SeqCst) {
                tracing::info!(
                    "stop requested, ending after {} of {} texts",
                    translated.len(),
                    total
                );
                return Ok(BatchOutcome {
                    translated,
                    stopped: true,
                });
            }

            let groups: Vec<&[String]> = chunk.chunks(concurrency).collect();
            tracing::debug!(
                "chunk {}/{}: {} texts in {} calls",
                index + 1,
                chunk_count,
                chunk.len(),
                groups.len()
            );

            let calls = groups
                .iter()
                .map(|group| translator.translate_batch(group, target_lang));
            let results = try_join_all(calls).await?;

            for (group, result) in groups.iter().zip(results) {
                if result.len() != group.len() {
                    return Err(service_error(format!(
                        "{} returned {} translations for {} texts",
                        translator.name(),
                        result.len(),
                        group.len()
                    )));
                }
                translated.extend(result);
            }

            progress.update(translated.len(), total);

            if index + 1 < chunk_count && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        Ok(BatchOutcome {
            translated,
            stopped: false,
        })
    }

    /// Runs without progress reporting or a stop flag
    pub async fn translate_texts(
        &self,
        translator: &dyn Translator,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        let stop = AtomicBool::new(false);
        let outcome = self
            .translate_all(translator, texts, target_lang, &mut NoProgress, &stop)
            .await?;
        Ok(outcome.translated)
    }
}
