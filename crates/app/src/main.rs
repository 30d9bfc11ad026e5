use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use flipbook_application::{DocumentSource, Viewer};
use flipbook_core::{Settings, VideoConfig};
use flipbook_engine::Document;
use flipbook_ui::{TuiStage, Ui};
use serde::de::DeserializeOwned;

const USAGE: &str = "usage: flipbook <document.pdf> [--videos <file.json>] [--settings <file.json>]";
const VIDEOS_FILE: &str = "videos.json";
const SETTINGS_FILE: &str = "settings.json";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    document: PathBuf,
    videos: Option<PathBuf>,
    settings: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut document = None;
    let mut videos = None;
    let mut settings = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--videos" => {
                let value = args.next().context("--videos needs a file")?;
                videos = Some(PathBuf::from(value));
            }
            "--settings" => {
                let value = args.next().context("--settings needs a file")?;
                settings = Some(PathBuf::from(value));
            }
            "-h" | "--help" => anyhow::bail!("{USAGE}"),
            flag if flag.starts_with("--") => anyhow::bail!("unknown option {flag}\n{USAGE}"),
            _ if document.is_none() => document = Some(PathBuf::from(&arg)),
            _ => anyhow::bail!("unexpected argument {arg}\n{USAGE}"),
        }
    }

    Ok(Args {
        document: document.context(USAGE)?,
        videos,
        settings,
    })
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let project_dirs =
        ProjectDirs::from("dev", "flipbook", "flipbook").context("resolve project dirs")?;

    init_logging(project_dirs.cache_dir());

    let config_dir = project_dirs.config_dir();
    let settings: Settings =
        load_json_or_default(args.settings.as_deref(), &config_dir.join(SETTINGS_FILE))?;
    let videos: VideoConfig =
        load_json_or_default(args.videos.as_deref(), &config_dir.join(VIDEOS_FILE))?;

    let document = Document::open(&args.document)?;
    if let Err(err) = document.engine().check_pdfium() {
        log::warn!("{}: page images unavailable: {err:#}", document.path().display());
    }
    let videos = videos
        .validated(document.page_count())
        .context("validate video config")?;
    log::info!(
        "{} video entries for {} pages",
        videos.videos.len(),
        document.page_count()
    );

    let title = document.title().to_string();
    let viewer = Viewer::new(document, videos, settings, TuiStage::new());
    let mut ui = Ui::new(viewer, title);
    let exit = ui.run()?;
    log::info!("exit: {exit:?}");
    Ok(())
}

/// Logs go to a file: the terminal belongs to the UI.
fn init_logging(cache_dir: &Path) {
    if let Err(err) = fs::create_dir_all(cache_dir) {
        eprintln!("log dir {} unavailable: {err}", cache_dir.display());
        return;
    }
    let log_path = cache_dir.join("flipbook.log");
    let file = match fs::File::create(&log_path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("log file {} unavailable: {err}", log_path.display());
            return;
        }
    };

    let env = env_logger::Env::new().filter_or("FLIPBOOK_LOG", "info");
    let _ = env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();
}

/// An explicit path must exist; otherwise the config-dir file is used when present.
fn load_json_or_default<T: DeserializeOwned + Default>(
    explicit: Option<&Path>,
    fallback: &Path,
) -> anyhow::Result<T> {
    let path = match explicit {
        Some(path) => path,
        None if fallback.is_file() => fallback,
        None => return Ok(T::default()),
    };
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
