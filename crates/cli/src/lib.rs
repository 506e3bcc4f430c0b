use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagemark_core::{apply_session_action, Session, SessionAction};
use pagemark_model::{EditorConfig, PageSize, ZoomFactor};
use pagemark_storage::{load_config_file, Storage, StorageError};
use pdf_engine::{build_numbered_pages, default_engine, OpenSource, PdfEngine};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "pagemark")]
#[command(about = "Draw on PDF pages and bake the annotations into a new file")]
pub struct Cli {
    /// Editor config to use instead of the stored one.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Write a PDF of numbered blank pages.
    Blank {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        #[arg(long, default_value_t = 612.0)]
        width: f32,
        #[arg(long, default_value_t = 792.0)]
        height: f32,
    },
    /// Render one page to PNG at the given zoom.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        zoom: f32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay a JSON list of editing actions and export the annotated PDF.
    Annotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "SCRIPT")]
        script: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective editor config as JSON.
    Config {
        /// Also store it as the default config for later runs.
        #[arg(long)]
        save: bool,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    page_count: u32,
    page_sizes_pt: Vec<PageSizeOutput>,
    path: String,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    height: f32,
    width: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Blank { output, pages, width, height } => {
            run_blank(&output, pages, width, height)
        }
        Commands::Render { file, page, zoom, output } => {
            run_render(&file, page, zoom, output.as_deref(), config_path)
        }
        Commands::Annotate { file, script, output } => {
            run_annotate(&file, &script, output.as_deref(), config_path)
        }
        Commands::Config { save } => run_config(config_path, save),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn effective_config(path: Option<&Path>) -> Result<EditorConfig> {
    if let Some(path) = path {
        ensure_file_exists(path)?;
        return load_config_file(path)
            .with_context(|| format!("failed to read config {}", path.display()));
    }

    match Storage::from_default_project() {
        Ok(storage) => storage.load_config().context("failed to read stored config"),
        Err(StorageError::NoDataDirectory) => {
            log::warn!("no data directory available, using default config");
            Ok(EditorConfig::default())
        }
        Err(err) => Err(err.into()),
    }
}

fn run_config(config_path: Option<&Path>, save: bool) -> Result<()> {
    let config = effective_config(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    if save {
        let storage = Storage::from_default_project()?;
        storage.save_config(&config).context("failed to save config")?;
        eprintln!("saved config to {}", storage.config_path().display());
    }

    Ok(())
}

fn run_info(file: &Path) -> Result<()> {
    ensure_file_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let page_sizes_pt = (0..page_count)
        .map(|index| {
            engine
                .page_size(handle, index)
                .map(|size| PageSizeOutput { height: size.height_pt, width: size.width_pt })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let payload = InfoOutput { page_count, page_sizes_pt, path: file.display().to_string() };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    engine.close(handle)?;

    Ok(())
}

fn run_blank(output: &Path, pages: u32, width: f32, height: f32) -> Result<()> {
    if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
        anyhow::bail!("--width and --height must be positive");
    }

    let sizes = vec![PageSize::new(width, height); pages as usize];
    let bytes = build_numbered_pages(&sizes).context("failed to build PDF")?;

    write_output(output, &bytes)?;
    println!("{}", output.display());
    Ok(())
}

fn run_render(
    file: &Path,
    page: u32,
    zoom: f32,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    ensure_file_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    let zoom = ZoomFactor::new(zoom).context("invalid --zoom")?;

    let config = effective_config(config_path)?;
    let mut session = Session::open(file, config).context("failed to open PDF")?;
    if page > session.page_count() {
        anyhow::bail!("page {page} out of range (document has {} pages)", session.page_count());
    }

    session.go_to_page(page);
    let applied = session.set_zoom(zoom);
    if applied != zoom {
        log::warn!("zoom {} clamped to {}", zoom.get(), applied.get());
    }
    session.render_current().context("failed to render page")?;

    let image = session.page_raster().context("render was not committed")?;
    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn run_annotate(
    file: &Path,
    script: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    ensure_file_exists(file)?;
    ensure_file_exists(script)?;

    let actions: Vec<SessionAction> = serde_json::from_slice(&fs::read(script)?)
        .with_context(|| format!("failed to parse script {}", script.display()))?;

    let config = effective_config(config_path)?;
    let mut session = Session::open(file, config).context("failed to open PDF")?;

    let action_count = actions.len();
    for action in actions {
        apply_session_action(&mut session, action);
    }
    log::info!("replayed {action_count} actions");

    let exported = session.export().context("failed to export annotated PDF")?;
    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| file.with_file_name(&exported.file_name));

    if output == file {
        anyhow::bail!("refusing to overwrite the input file {}", file.display());
    }

    write_output(&output, &exported.bytes)?;
    println!("{}", output.display());

    Ok(())
}

fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::write(output, bytes).with_context(|| format!("failed to write {}", output.display()))
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
