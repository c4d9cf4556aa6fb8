// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Concurrency orchestrator — run one recognition task per page, at most
// `max_concurrency` at a time, and hand the results back in page order.
//
// All-or-error: the first page that cannot be recognised aborts every other
// in-flight task and fails the batch.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use idmask_core::config::{MaskConfig, ProbeConfig, RetryConfig};
use idmask_core::error::{MaskError, Result};
use idmask_core::recognition::RecognitionBackend;
use idmask_core::types::{Orientation, RecognitionResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::locator::find_candidates;
use crate::probe;
use crate::retry::{RetryDecision, should_retry};

/// Recognition output for one page and how it was obtained.
#[derive(Debug, Clone)]
pub struct PageRecognition {
    pub result: RecognitionResult,
    /// Orientation the result's coordinates refer to.
    pub orientation: Orientation,
    /// Backend calls spent on this page, retries excluded.
    pub attempts: usize,
}

/// Everything a per-page task needs; cloned into each task.
#[derive(Clone)]
struct PageWorker {
    backend: Arc<dyn RecognitionBackend>,
    call_timeout: Duration,
    retry: RetryConfig,
    probe: Option<ProbeConfig>,
}

impl PageWorker {
    /// One backend call under the per-call timeout.
    async fn call_once(&self, page: usize, image: &DynamicImage) -> Result<RecognitionResult> {
        match tokio::time::timeout(self.call_timeout, self.backend.analyze(image)).await {
            Ok(result) => result,
            Err(_) => Err(MaskError::BackendTimeout {
                page,
                seconds: self.call_timeout.as_secs(),
            }),
        }
    }

    /// A backend call with transient failures retried.
    async fn call(&self, page: usize, image: DynamicImage) -> Result<RecognitionResult> {
        let mut attempt = 0;
        loop {
            let err = match self.call_once(page, &image).await {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };
            match should_retry(&err, attempt, &self.retry) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(page, attempt, error = %err, "Recognition failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp(_) | RetryDecision::Exhausted => return Err(err),
            }
        }
    }

    async fn recognize(&self, page: usize, image: DynamicImage) -> Result<PageRecognition> {
        let initial = self.call(page, image.clone()).await?;

        let probe_config = match &self.probe {
            Some(config) if find_candidates(&initial.text).is_empty() => config,
            _ => {
                return Ok(PageRecognition {
                    result: initial,
                    orientation: Orientation::Upright,
                    attempts: 1,
                });
            }
        };

        debug!(page, "No grouped number upright, probing orientations");
        probe::run(&image, probe_config, initial, |variant| self.call(page, variant)).await
    }
}

/// Fans page recognition out over the tokio runtime.
pub struct Orchestrator {
    worker: PageWorker,
    max_concurrency: usize,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn RecognitionBackend>, config: &MaskConfig) -> Self {
        // The probe only runs for backends that ask for it.
        let probe = (config.probe.enabled && backend.needs_orientation_probe())
            .then(|| config.probe.clone());
        Self {
            worker: PageWorker {
                backend,
                call_timeout: config.recognition_timeout(),
                retry: config.retry.clone(),
                probe,
            },
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Override the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.worker.call_timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.worker.backend.name()
    }

    /// Recognise every page. `pages[i]` is page `i`; the output has the same
    /// order regardless of completion order.
    #[instrument(skip_all, fields(pages = pages.len(), backend = self.backend_name()))]
    pub async fn recognize_pages(&self, pages: Vec<DynamicImage>) -> Result<Vec<PageRecognition>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let page_count = pages.len();

        for (index, image) in pages.into_iter().enumerate() {
            let worker = self.worker.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => worker.recognize(index, image).await,
                    Err(_) => Err(MaskError::Cancelled("recognition pool closed".into())),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<PageRecognition>> = vec![None; page_count];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(pair) => pair,
                Err(err) => {
                    tasks.abort_all();
                    return Err(MaskError::Backend(format!("recognition task failed: {}", err)));
                }
            };
            match result {
                Ok(recognition) => {
                    debug!(page = index, attempts = recognition.attempts, "Page recognised");
                    slots[index] = Some(recognition);
                }
                Err(err) => {
                    warn!(page = index, error = %err, "Page recognition failed, aborting batch");
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        let results: Option<Vec<PageRecognition>> = slots.into_iter().collect();
        let results =
            results.ok_or_else(|| MaskError::Backend("recognition result missing".into()))?;
        info!(pages = results.len(), "All pages recognised");
        Ok(results)
    }
}
