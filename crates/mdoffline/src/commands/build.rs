//! `mdoffline build` command implementation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use mdoffline_assets::VendorAssets;
use mdoffline_config::{CliSettings, Config, Theme, TocMode};
use mdoffline_renderer::{Pipeline, TocNode, Warning};
use mdoffline_template::{DEFAULT_TITLE, DocumentData, render_document, sanitize_filename};
use rayon::prelude::*;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Markdown files to render.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (single input only).
    #[arg(short, long, conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Output directory (default: next to each input).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover mdoffline.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Theme preset (overrides config).
    #[arg(long)]
    theme: Option<Theme>,

    /// Table of contents placement: top, sidebar or none (overrides config).
    #[arg(long = "toc")]
    toc_mode: Option<TocMode>,

    /// Disable math protection and typesetting.
    #[arg(long)]
    no_math: bool,

    /// Disable syntax highlighting.
    #[arg(long)]
    no_highlight: bool,

    /// Show line numbers in code blocks.
    #[arg(long)]
    line_numbers: bool,

    /// Document title (default: first H1, then the file name).
    #[arg(long)]
    title: Option<String>,

    /// Also write the table of contents as JSON (single input only).
    #[arg(long)]
    toc_json: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Result of rendering one input.
struct Built {
    path: PathBuf,
    warnings: Vec<Warning>,
    toc: Vec<TocNode>,
}

/// Shared, read-only state for rendering inputs in parallel.
struct Job<'a> {
    args: &'a BuildArgs,
    config: &'a Config,
    pipeline: &'a Pipeline,
    vendor: &'a VendorAssets,
    syntax_css: Option<&'a str>,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// Inputs are rendered in parallel. A failing input does not stop the
    /// others, but makes the command fail once all of them are done.
    ///
    /// # Errors
    ///
    /// Returns an error if arguments or configuration are invalid, vendor
    /// files fail validation, or any input fails to render.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        if self.inputs.len() > 1 {
            if self.output.is_some() {
                return Err(CliError::Validation(
                    "--output accepts a single input, use --out-dir instead".to_owned(),
                ));
            }
            if self.toc_json.is_some() {
                return Err(CliError::Validation(
                    "--toc-json accepts a single input".to_owned(),
                ));
            }
        }

        let cli_settings = CliSettings {
            theme: self.theme,
            toc_mode: self.toc_mode,
            math: self.no_math.then_some(false),
            syntax_highlight: self.no_highlight.then_some(false),
            line_numbers: self.line_numbers.then_some(true),
            vendor_dir: None,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if let Some(path) = &config.config_path {
            output.config(path);
        }
        if let Some(dir) = &self.out_dir {
            fs::create_dir_all(dir)?;
        }

        let pipeline = Pipeline::new();
        let vendor = if config.render.math {
            VendorAssets::load(&config.vendor_resolved.dir, true)?
        } else {
            VendorAssets::none()
        };
        let syntax_css = if config.render.syntax_highlight {
            pipeline.syntax_stylesheet(config.render.syntax_theme)
        } else {
            None
        };

        let job = Job {
            args: &self,
            config: &config,
            pipeline: &pipeline,
            vendor: &vendor,
            syntax_css: syntax_css.as_deref(),
        };
        let results: Vec<_> = self
            .inputs
            .par_iter()
            .map(|input| (input, job.build_one(input)))
            .collect();

        let mut failed = 0;
        for (input, result) in results {
            match result {
                Ok(built) => {
                    for warning in &built.warnings {
                        output.warning(input, warning);
                    }
                    if let Some(toc_path) = &self.toc_json {
                        fs::write(toc_path, serde_json::to_string_pretty(&built.toc)?)?;
                    }
                    output.rendered(input, &built.path);
                }
                Err(err) => {
                    failed += 1;
                    output.failed(input, &err);
                }
            }
        }

        if failed > 0 {
            return Err(CliError::Validation(format!(
                "{failed} of {} inputs failed",
                self.inputs.len()
            )));
        }
        Ok(())
    }
}

impl Job<'_> {
    fn build_one(&self, input: &Path) -> Result<Built, CliError> {
        let limit = self.config.limits.max_markdown_bytes;
        let size = fs::metadata(input)?.len();
        if size > limit {
            return Err(CliError::Validation(format!(
                "input is {size} bytes, limit is {limit}"
            )));
        }

        let markdown = fs::read_to_string(input)?;
        let render = &self.config.render;
        let transformed = self.pipeline.transform(&markdown, render)?;

        let title = document_title(
            self.args.title.as_deref(),
            transformed.title.as_deref(),
            input,
        );
        let html = render_document(&DocumentData {
            title: &title,
            article: &transformed.html,
            toc: &transformed.toc,
            manifest: &transformed.manifest,
            config: render,
            source: transformed
                .manifest
                .embed_source
                .then_some(markdown.as_str()),
            syntax_css: self.syntax_css,
            katex: self.vendor.katex(),
        });

        let path = output_path(
            input,
            self.args.output.as_deref(),
            self.args.out_dir.as_deref(),
        );
        fs::write(&path, html)?;
        tracing::info!(
            input = %input.display(),
            output = %path.display(),
            warnings = transformed.warnings.len(),
            "Rendered document"
        );

        Ok(Built {
            path,
            warnings: transformed.warnings,
            toc: transformed.toc,
        })
    }
}

/// Pick the document title: explicit, then first H1, then the file stem.
fn document_title(explicit: Option<&str>, detected: Option<&str>, input: &Path) -> String {
    let stem = input.file_stem().and_then(|s| s.to_str());
    [explicit, detected, stem]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|title| !title.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_owned()
}

/// Where the document for `input` is written.
fn output_path(input: &Path, output: Option<&Path>, out_dir: Option<&Path>) -> PathBuf {
    if let Some(path) = output {
        return path.to_path_buf();
    }
    let dir = out_dir
        .or_else(|| input.parent())
        .unwrap_or_else(|| Path::new(""));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    dir.join(sanitize_filename(&stem))
}
