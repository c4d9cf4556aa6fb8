// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request pipeline — load, recognise, locate, mask, assemble.
//
// Each request walks Pending → Loading → Recognizing → Locating → Masking →
// Assembling → Done. Any error ends the request in Failed with no output.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use idmask_core::config::MaskConfig;
use idmask_core::error::{MaskError, Result};
use idmask_core::integrity::hash_bytes;
use idmask_core::recognition::RecognitionBackend;
use idmask_core::types::{MaskResponse, PageReport, RecognitionToken, RequestId, RequestStage};
use idmask_document::{
    DocumentLoader, EmbeddedImageRasterizer, LoadedDocument, PageAssembler, PageRasterizer,
    RedactionCompositor, RenderedPage,
};
use tracing::{debug, info, instrument, warn};

use crate::locator::evaluate_page;
use crate::orchestrator::{Orchestrator, PageRecognition};

/// The masked artifact and everything reported about it.
#[derive(Debug, Clone)]
pub struct MaskedDocument {
    pub request_id: RequestId,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    /// Per-page reports in input order.
    pub pages: Vec<PageReport>,
    /// True when at least one page was masked.
    pub valid: bool,
    pub summary: String,
    /// SHA-256 of the input bytes, hex encoded.
    pub input_digest: String,
}

impl MaskedDocument {
    pub fn comments(&self) -> Vec<String> {
        self.pages.iter().map(|p| p.comment.clone()).collect()
    }

    pub fn payload_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn into_response(self) -> MaskResponse {
        MaskResponse {
            payload: self.payload_base64(),
            valid: self.valid,
            comments: self.comments(),
            summary: self.summary,
        }
    }
}

/// Validated, logged walk through [`RequestStage`].
struct StageTracker {
    request_id: RequestId,
    stage: RequestStage,
}

impl StageTracker {
    fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            stage: RequestStage::Pending,
        }
    }

    /// Move to `next` if it directly follows the current stage. Out-of-order
    /// transitions are logged and ignored.
    fn advance(&mut self, next: RequestStage) -> bool {
        if self.stage.next() != Some(next) {
            warn!(
                request_id = %self.request_id,
                from = %self.stage,
                to = %next,
                "Invalid stage transition ignored"
            );
            return false;
        }
        info!(request_id = %self.request_id, from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
        true
    }

    fn fail(&mut self, err: &MaskError) {
        if self.stage.is_terminal() {
            warn!(request_id = %self.request_id, stage = %self.stage, error = %err, "Failure after the request ended");
            return;
        }
        if !self.stage.can_fail() {
            warn!(request_id = %self.request_id, stage = %self.stage, "Failure in a non-failing stage");
        }
        warn!(request_id = %self.request_id, stage = %self.stage, error = %err, "Request failed");
        self.stage = RequestStage::Failed;
    }
}

async fn blocking<T, F>(what: &str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| MaskError::Cancelled(format!("{} task failed: {}", what, err)))?
}

/// Masks identity numbers in documents.
///
/// ```ignore
/// let masker = Masker::new(Arc::new(OcrsRecognizer::from_model_dir(dir)?), MaskConfig::default());
/// let masked = masker.mask(std::fs::read("card.jpg")?).await?;
/// println!("{}", masked.summary);
/// ```
pub struct Masker {
    backend: Arc<dyn RecognitionBackend>,
    rasterizer: Arc<dyn PageRasterizer>,
    config: MaskConfig,
}

impl Masker {
    pub fn new(backend: Arc<dyn RecognitionBackend>, config: MaskConfig) -> Self {
        Self {
            backend,
            rasterizer: Arc::new(EmbeddedImageRasterizer),
            config,
        }
    }

    /// Use a different PDF rasteriser.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    /// Mask one document under the request timeout. Dropping the returned
    /// future aborts all in-flight recognition.
    pub async fn mask(&self, bytes: Vec<u8>) -> Result<MaskedDocument> {
        let request_id = RequestId::new();
        let limit = self.config.request_timeout();
        match tokio::time::timeout(limit, self.run(request_id, bytes)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%request_id, seconds = limit.as_secs(), "Request timed out");
                Err(MaskError::Cancelled(format!(
                    "request exceeded {}s",
                    limit.as_secs()
                )))
            }
        }
    }

    #[instrument(skip_all, fields(%request_id, bytes_len = bytes.len()))]
    async fn run(&self, request_id: RequestId, bytes: Vec<u8>) -> Result<MaskedDocument> {
        let mut stages = StageTracker::new(request_id);
        let result = self.run_stages(&mut stages, bytes).await;
        match &result {
            Ok(doc) => {
                stages.advance(RequestStage::Done);
                info!(valid = doc.valid, pages = doc.pages.len(), "Request complete");
            }
            Err(err) => stages.fail(err),
        }
        result
    }

    async fn run_stages(&self, stages: &mut StageTracker, bytes: Vec<u8>) -> Result<MaskedDocument> {
        stages.advance(RequestStage::Loading);
        let input_digest = hash_bytes(&bytes);
        let loader = DocumentLoader::new(&self.config, Arc::clone(&self.rasterizer));
        let document = blocking("load", move || loader.load(&bytes)).await?;

        stages.advance(RequestStage::Recognizing);
        let orchestrator = Orchestrator::new(Arc::clone(&self.backend), &self.config);
        let analysis = document.pages.iter().map(|p| p.analysis.clone()).collect();
        let recognitions = orchestrator.recognize_pages(analysis).await?;

        stages.advance(RequestStage::Locating);
        let mut evaluations = Vec::with_capacity(recognitions.len());
        for (page, recognition) in document.pages.iter().zip(&recognitions) {
            let evaluation = evaluate_page(&recognition.result, self.config.match_policy)?;
            info!(page = page.index, outcome = ?evaluation.outcome, "Page located");
            evaluations.push(evaluation);
        }

        stages.advance(RequestStage::Masking);
        let LoadedDocument {
            format,
            source_encoding,
            pages,
        } = document;
        let (rendered, reports) = blocking("mask", move || {
            let compositor = RedactionCompositor::new();
            let mut rendered = Vec::with_capacity(pages.len());
            let mut reports = Vec::with_capacity(pages.len());
            for ((page, recognition), evaluation) in pages.into_iter().zip(recognitions).zip(evaluations) {
                let PageRecognition {
                    result,
                    orientation,
                    ..
                } = recognition;
                let page = page.reorient(orientation);
                let tokens: Vec<&RecognitionToken> = evaluation
                    .masked_tokens
                    .iter()
                    .filter_map(|&i| result.tokens.get(i))
                    .collect();
                let (image, regions) = compositor.apply(page.original, &tokens, &page.geometry);

                let mut report = PageReport::new(page.index, evaluation.outcome);
                report.masked_regions = regions;
                report.orientation = orientation;
                reports.push(report);
                rendered.push(RenderedPage::new(image, page.geometry.render_scale));
            }
            Ok((rendered, reports))
        })
        .await?;

        stages.advance(RequestStage::Assembling);
        let assembler = PageAssembler::new(self.config.output.clone());
        let output = blocking("assemble", move || {
            assembler.assemble(format, source_encoding, rendered)
        })
        .await?;

        let valid = PageAssembler::is_valid(&reports);
        let summary = PageAssembler::summary(&reports).to_string();
        debug!(mime_type = output.mime_type, bytes = output.bytes.len(), "Output ready");

        Ok(MaskedDocument {
            request_id: stages.request_id,
            bytes: output.bytes,
            mime_type: output.mime_type,
            pages: reports,
            valid,
            summary,
            input_digest,
        })
    }
}
