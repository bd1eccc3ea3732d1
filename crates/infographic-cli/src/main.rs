use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Args, Parser, Subcommand};
use infographic_contracts::events::EventWriter;
use infographic_contracts::request::{
    ContextImage, GenerationRequest, SUGGESTED_MAX_CONTEXT_IMAGES,
};
use infographic_contracts::runs::summary::{read_summary, write_summary, GalleryEntry, RunSummary};
use infographic_contracts::state::PipelineState;
use infographic_engine::gallery::{download_gallery, write_gallery_html};
use infographic_engine::{
    has_api_key, ApiKey, EngineConfig, InfographicEngine, Pipeline, SubmitError,
};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DRYRUN_TEXT_MODEL: &str = "dryrun-text-1";
const DRYRUN_IMAGE_MODEL: &str = "dryrun-image-1";
const DEFAULT_LOG_FILTER: &str = "infographic_engine=info,infographic_rs=info";
const QUIT_COMMAND: &str = "/quit";

#[derive(Debug, Parser)]
#[command(
    name = "infographic-rs",
    version,
    about = "Turn a topic and source material into educational infographics"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one request from flags and write the gallery to --out.
    Generate(GenerateArgs),
    /// Interactive form; loops until /quit or end of input.
    Session(SessionArgs),
    /// Rebuild gallery.html for a finished run.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct EngineArgs {
    #[arg(long, env = "INFOGRAPHIC_TEXT_MODEL")]
    text_model: Option<String>,
    #[arg(long, env = "INFOGRAPHIC_IMAGE_MODEL")]
    image_model: Option<String>,
    #[arg(long, env = "GEMINI_API_BASE")]
    api_base: Option<String>,
    /// Seconds. Unset leaves requests unbounded.
    #[arg(long)]
    request_timeout: Option<f64>,
    /// Use the offline placeholder models.
    #[arg(long)]
    dry_run: bool,
}

impl EngineArgs {
    fn config(&self) -> Result<EngineConfig> {
        let request_timeout = match self.request_timeout {
            Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
            Some(secs) => bail!("--request-timeout must be a positive number of seconds, got {secs}"),
            None => None,
        };
        let dryrun_default = |model: &str| self.dry_run.then(|| model.to_string());
        Ok(EngineConfig {
            text_model: self
                .text_model
                .clone()
                .or_else(|| dryrun_default(DRYRUN_TEXT_MODEL)),
            image_model: self
                .image_model
                .clone()
                .or_else(|| dryrun_default(DRYRUN_IMAGE_MODEL)),
            api_base: self.api_base.clone(),
            request_timeout,
        })
    }
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    topic: String,
    #[arg(long)]
    subject: String,
    #[arg(long)]
    grade: String,
    #[arg(long, default_value = "")]
    text: String,
    #[arg(long, conflicts_with = "text")]
    text_file: Option<PathBuf>,
    /// Context image; repeat for several.
    #[arg(long = "image")]
    images: Vec<PathBuf>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct ExportArgs {
    #[arg(long)]
    run: PathBuf,
    #[arg(long)]
    out: PathBuf,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("infographic-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Session(args) => {
            let stdin = io::stdin();
            run_session(args, has_api_key(), &mut stdin.lock())
        }
        Command::Export(args) => run_export(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let request = build_request(&args)?;
    let engine = InfographicEngine::new(&args.engine.config()?, ApiKey::from_env())?;
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventWriter::new(events_path, run_id_for(&args.out));
    let mut pipeline = Pipeline::new(engine).with_events(events);
    pipeline.on_state_change(print_state);
    run_once(&mut pipeline, request, &args.out)
}

fn build_request(args: &GenerateArgs) -> Result<GenerationRequest> {
    let text = match args.text_file.as_ref() {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?,
        None => args.text.clone(),
    };
    let mut request = GenerationRequest::new(&args.topic, &args.subject, &args.grade)
        .with_context_text(text.trim());
    for path in &args.images {
        request = request.with_context_image(ContextImage::from_path(path)?);
    }
    if request.exceeds_suggested_image_count() {
        println!(
            "Note: up to {SUGGESTED_MAX_CONTEXT_IMAGES} images are recommended; sending {}.",
            request.context_images.len()
        );
    }
    Ok(request)
}

/// Submits one request and writes its artifacts. Exit code 0 on `complete`,
/// 2 when the form was rejected or the run ended in `error`.
fn run_once(pipeline: &mut Pipeline, request: GenerationRequest, run_dir: &Path) -> Result<i32> {
    let started_at = now_utc_iso();
    let title = request.title();
    pipeline.events().emit(
        "run_started",
        map_object(json!({
            "title": title,
            "out_dir": run_dir.to_string_lossy(),
        })),
    )?;

    match pipeline.submit(request) {
        Ok(_) => {}
        Err(SubmitError::Invalid(err)) => {
            println!("Cannot submit: {err}.");
            pipeline.events().emit(
                "run_finished",
                map_object(json!({ "state": pipeline.state().name(), "rejected": err.to_string() })),
            )?;
            return Ok(2);
        }
        Err(err @ SubmitError::Refused(_)) => return Err(err.into()),
    }

    let state = pipeline.state().clone();
    let entries = finish_run(pipeline, &state, run_dir, &title, started_at)?;
    match &state {
        PipelineState::Complete { .. } => {
            print_gallery(&title, &entries, run_dir);
            Ok(0)
        }
        _ => {
            println!(
                "Error: {}",
                state.error_message().unwrap_or("An unexpected error occurred.")
            );
            Ok(2)
        }
    }
}

fn finish_run(
    pipeline: &Pipeline,
    state: &PipelineState,
    run_dir: &Path,
    title: &str,
    started_at: String,
) -> Result<Vec<GalleryEntry>> {
    let entries = download_gallery(state.images(), run_dir)?;
    if !entries.is_empty() {
        write_gallery_html(&run_dir.join("gallery.html"), title, &entries, "")?;
    }
    let summary = RunSummary {
        run_id: pipeline.events().run_id().to_string(),
        started_at,
        finished_at: now_utc_iso(),
        title: title.to_string(),
        text_model: pipeline.engine().text_model().to_string(),
        image_model: pipeline.engine().image_model().to_string(),
        state: state.name().to_string(),
        error: state.error_message().map(str::to_string),
        images: entries.clone(),
    };
    write_summary(&run_dir.join("summary.json"), &summary, None)?;
    pipeline.events().emit(
        "run_finished",
        map_object(json!({
            "state": state.name(),
            "images": entries.len(),
            "out_dir": run_dir.to_string_lossy(),
        })),
    )?;
    info!(state = %state, images = entries.len(), "run finished");
    Ok(entries)
}

fn run_session(
    args: SessionArgs,
    key_configured: bool,
    input: &mut impl BufRead,
) -> Result<i32> {
    let api_key = if needs_key_selection(args.engine.dry_run, key_configured) {
        match select_api_key(input)? {
            Some(key) => Some(key),
            None => {
                println!("No API key selected.");
                return Ok(1);
            }
        }
    } else {
        ApiKey::from_env()
    };
    let engine = InfographicEngine::new(&args.engine.config()?, api_key)?;
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventWriter::new(events_path, format!("session-{}", compact_timestamp()));
    let mut pipeline = Pipeline::new(engine).with_events(events);
    pipeline.on_state_change(print_state);

    println!("Infographic session started. Type {QUIT_COMMAND} at any prompt to exit.");
    let mut last_code = 0;
    loop {
        let Some(request) = prompt_form(input)? else {
            break;
        };
        let run_dir = args.out.join(format!("run-{}", compact_timestamp()));
        last_code = run_once(&mut pipeline, request, &run_dir)?;

        let next = match pipeline.state() {
            PipelineState::Complete { .. } => "Press Enter to create new infographics",
            PipelineState::Error { .. } => "Press Enter to try again",
            _ => continue,
        };
        if read_answer(input, &format!("{next} ({QUIT_COMMAND} to exit): "))?.is_none() {
            break;
        }
        if pipeline.state().is_busy() {
            warn!(state = %pipeline.state(), "pipeline still busy");
        } else if pipeline.state().error_message().is_some() {
            pipeline.retry()?;
        } else {
            pipeline.reset()?;
        }
    }
    Ok(last_code)
}

fn needs_key_selection(dry_run: bool, key_configured: bool) -> bool {
    !dry_run && !key_configured
}

/// Shown when no key is configured; mirrors the host's key-selection dialog.
fn select_api_key(input: &mut impl BufRead) -> Result<Option<ApiKey>> {
    println!("API Key Required");
    println!(
        "The Gemini image model needs a key from a paid Google Cloud project \
         (see https://ai.google.dev/gemini-api/docs/billing)."
    );
    loop {
        let Some(raw) = read_answer(input, "Paste API key: ")? else {
            return Ok(None);
        };
        if let Some(key) = ApiKey::new(raw) {
            return Ok(Some(key));
        }
        println!("The key cannot be empty.");
    }
}

fn prompt_form(input: &mut impl BufRead) -> Result<Option<GenerationRequest>> {
    println!();
    let Some(topic) = read_answer(input, "Topic: ")? else {
        return Ok(None);
    };
    let Some(subject) = read_answer(input, "Subject: ")? else {
        return Ok(None);
    };
    let Some(grade) = read_answer(input, "Grade: ")? else {
        return Ok(None);
    };
    let Some(text) = read_answer(input, "Context text (optional): ")? else {
        return Ok(None);
    };
    let Some(images) = read_answer(
        input,
        &format!("Context images, comma separated (optional, up to {SUGGESTED_MAX_CONTEXT_IMAGES}): "),
    )?
    else {
        return Ok(None);
    };

    let mut request = GenerationRequest::new(topic, subject, grade).with_context_text(text);
    for raw in images.split(',').map(str::trim).filter(|raw| !raw.is_empty()) {
        match ContextImage::from_path(raw) {
            Ok(image) => request = request.with_context_image(image),
            Err(err) => println!("Skipping {raw}: {err}."),
        }
    }
    if request.exceeds_suggested_image_count() {
        println!(
            "Note: up to {SUGGESTED_MAX_CONTEXT_IMAGES} images are recommended; sending {}.",
            request.context_images.len()
        );
    }
    Ok(Some(request))
}

/// `None` on end of input or the quit command.
fn read_answer(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let answer = line.trim();
    if answer == QUIT_COMMAND {
        return Ok(None);
    }
    Ok(Some(answer.to_string()))
}

fn run_export(args: ExportArgs) -> Result<i32> {
    let summary = read_summary(&args.run.join("summary.json"))?;
    if summary.images.is_empty() {
        bail!("run {} has no images to export", args.run.display());
    }
    let out_dir = match args.out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&out_dir)?;
    let image_root = image_root_for(&args.run, &out_dir)?;
    write_gallery_html(&args.out, &summary.title, &summary.images, &image_root)?;
    println!("Exported to {}", args.out.display());
    Ok(0)
}

/// Link prefix from the page's directory to the run directory: `/`-separated,
/// relative, with a trailing slash. Empty when both are the same directory.
fn image_root_for(run_dir: &Path, page_dir: &Path) -> Result<String> {
    let run_dir = fs::canonicalize(run_dir)
        .with_context(|| format!("failed to resolve {}", run_dir.display()))?;
    let page_dir = fs::canonicalize(page_dir)
        .with_context(|| format!("failed to resolve {}", page_dir.display()))?;
    let run: Vec<Component> = run_dir.components().collect();
    let page: Vec<Component> = page_dir.components().collect();
    let shared = run
        .iter()
        .zip(&page)
        .take_while(|(left, right)| left == right)
        .count();
    if shared == 0 {
        bail!(
            "{} and {} share no common root; export next to the run instead",
            run_dir.display(),
            page_dir.display()
        );
    }

    let ups = std::iter::repeat("..".to_string()).take(page.len() - shared);
    let downs = run[shared..]
        .iter()
        .map(|component| component.as_os_str().to_string_lossy().into_owned());
    Ok(ups.chain(downs).map(|segment| format!("{segment}/")).collect())
}

fn print_state(state: &PipelineState) {
    match state {
        PipelineState::Analyzing => println!("Analyzing content..."),
        PipelineState::Generating => println!("Generating infographics (this can take a minute)..."),
        PipelineState::Complete { images } => println!("Done: {} infographic(s).", images.len()),
        PipelineState::Idle | PipelineState::Error { .. } => {}
    }
}

fn print_gallery(title: &str, entries: &[GalleryEntry], run_dir: &Path) {
    println!();
    println!("Your Infographics: {title}");
    for entry in entries {
        println!(
            "  [{}] {} -> {}",
            entry.kind,
            entry.description,
            run_dir.join(&entry.file).display()
        );
    }
    println!("Gallery: {}", run_dir.join("gallery.html").display());
}

fn run_id_for(run_dir: &Path) -> String {
    run_dir
        .file_name()
        .and_then(|value| value.to_str())
        .filter(|value| !value.is_empty())
        .unwrap_or("run-rs")
        .to_string()
}

fn compact_timestamp() -> String {
    Utc::now().format("%Y%m%d-%H%M%S%3f").to_string()
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
