// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use idmask_core::config::MaskConfig;
use idmask_core::error::{MaskError, Result};
use idmask_core::recognition::RecognitionBackend;
use idmask_pipeline::{MaskedDocument, Masker};
use tracing::info;

#[derive(Parser)]
#[command(name = "idmask")]
#[command(about = "Mask 12-digit identity numbers in scanned images and PDFs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask the first eight digits of every valid identity number in a document
    Mask(MaskArgs),
}

#[derive(Args)]
struct MaskArgs {
    /// Image, multi-page TIFF/GIF, or PDF to mask
    input: PathBuf,
    /// Where to write the masked document (default: <input>.masked.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the page limit
    #[arg(long)]
    max_pages: Option<usize>,
    /// Directory holding text-detection.rten and text-recognition.rten
    #[arg(long, env = "IDMASK_MODELS")]
    models: Option<PathBuf>,
    /// Print the full JSON response (including the base64 payload)
    #[arg(long)]
    json: bool,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Mask(args) => {
            let config = load_config(&args)?;
            let backend = recognition_backend(args.models.as_deref())?;
            let masked = mask_file(&args, config, backend).await?;
            report(&masked, args.json)
        }
    }
}

fn load_config(args: &MaskArgs) -> Result<MaskConfig> {
    let mut config = match &args.config {
        Some(path) => MaskConfig::from_json_file(path)?,
        None => MaskConfig::default(),
    };
    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "ocr")]
fn recognition_backend(models: Option<&Path>) -> Result<Arc<dyn RecognitionBackend>> {
    let dir = models.ok_or_else(|| {
        MaskError::Config("--models (or IDMASK_MODELS) must point at the OCR model directory".into())
    })?;
    Ok(Arc::new(idmask_document::OcrsRecognizer::from_model_dir(dir)?))
}

#[cfg(not(feature = "ocr"))]
fn recognition_backend(_models: Option<&Path>) -> Result<Arc<dyn RecognitionBackend>> {
    Err(MaskError::Config(
        "built without a recognition backend; enable the `ocr` feature".into(),
    ))
}

#[cfg(feature = "pdfium")]
fn build_masker(backend: Arc<dyn RecognitionBackend>, config: MaskConfig) -> Masker {
    let scale = config.pdf_render_scale;
    Masker::new(backend, config)
        .with_rasterizer(Arc::new(idmask_document::PdfiumRasterizer::new(scale)))
}

#[cfg(not(feature = "pdfium"))]
fn build_masker(backend: Arc<dyn RecognitionBackend>, config: MaskConfig) -> Masker {
    Masker::new(backend, config)
}

async fn mask_file(
    args: &MaskArgs,
    config: MaskConfig,
    backend: Arc<dyn RecognitionBackend>,
) -> Result<MaskedDocument> {
    let bytes = tokio::fs::read(&args.input).await?;
    let masked = build_masker(backend, config).mask(bytes).await?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, masked.mime_type));
    tokio::fs::write(&output, &masked.bytes).await?;
    info!(output = %output.display(), valid = masked.valid, "Masked document written");
    Ok(masked)
}

/// `scan.jpg` → `scan.masked.jpg`; PDF output always ends in `.pdf`.
fn default_output_path(input: &Path, mime_type: &str) -> PathBuf {
    let extension = match mime_type {
        "application/pdf" => "pdf",
        "image/jpeg" => "jpg",
        _ => "png",
    };
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{stem}.masked.{extension}"))
}

fn report(masked: &MaskedDocument, json: bool) -> Result<()> {
    if json {
        let response = masked.clone().into_response();
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }
    for page in &masked.pages {
        println!("page {}: {}", page.index + 1, page.comment);
    }
    println!("{}", masked.summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use idmask_core::types::{CoordinateUnit, RecognitionResult, RecognitionToken};
    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;

    struct FixedLine;

    #[async_trait]
    impl RecognitionBackend for FixedLine {
        fn name(&self) -> &str {
            "fixed-line"
        }

        async fn analyze(&self, _page: &DynamicImage) -> Result<RecognitionResult> {
            let token = |content: &str, x: f32| {
                RecognitionToken::from_rect(content, (x, 5.0), (x + 20.0, 15.0), CoordinateUnit::Pixel)
            };
            Ok(RecognitionResult::from_tokens(
                vec![token("4991", 5.0), token("1866", 30.0), token("5246", 55.0)],
                CoordinateUnit::Pixel,
            ))
        }
    }

    fn args(input: PathBuf, output: Option<PathBuf>) -> MaskArgs {
        MaskArgs {
            input,
            output,
            config: None,
            max_pages: None,
            models: None,
            json: false,
        }
    }

    #[test]
    fn cli_parses_mask_command() {
        let cli = Cli::try_parse_from(["idmask", "mask", "card.jpg", "--max-pages", "5", "--json"])
            .unwrap();
        let Commands::Mask(args) = cli.command;
        assert_eq!(args.input, PathBuf::from("card.jpg"));
        assert_eq!(args.max_pages, Some(5));
        assert!(args.json);
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("/scans/card.jpeg"), "image/jpeg"),
            PathBuf::from("/scans/card.masked.jpg")
        );
        assert_eq!(
            default_output_path(Path::new("/scans/pack.tiff"), "application/pdf"),
            PathBuf::from("/scans/pack.masked.pdf")
        );
    }

    #[test]
    fn config_file_and_flags_combine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idmask.json");
        std::fs::write(&path, r#"{ "max_concurrency": 2 }"#).unwrap();

        let mut mask_args = args(PathBuf::from("in.png"), None);
        mask_args.config = Some(path);
        mask_args.max_pages = Some(7);
        let config = load_config(&mask_args).unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.max_pages, 7);

        mask_args.max_pages = Some(0);
        assert!(matches!(load_config(&mask_args), Err(MaskError::Config(_))));
    }

    #[tokio::test]
    async fn masks_a_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("card.png");
        let page = RgbImage::from_pixel(100, 40, Rgb([255, 255, 255]));
        page.save(&input).unwrap();

        let masked = mask_file(&args(input, None), MaskConfig::default(), Arc::new(FixedLine))
            .await
            .unwrap();
        assert!(masked.valid);

        let written = dir.path().join("card.masked.png");
        let out = image::open(&written).unwrap().to_rgb8();
        assert_eq!(*out.get_pixel(10, 10), Rgb([255, 165, 0]));
        assert_eq!(*out.get_pixel(60, 10), Rgb([255, 255, 255]));
    }
}
