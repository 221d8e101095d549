use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use posegen::{
    archive::ARCHIVE_FILE_NAME,
    capture::read_source_image,
    logger::{self, LogLevel, LoggerConfig},
    models::{DEFAULT_POSE_COUNT, DEFAULT_THEME},
    AspectRatio, Config, GeneratedImage, GenerationObserver, GenerationSession, Orchestrator,
    OrchestratorConfig, PoseGenError, ProgressState, RunSummary,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate AI pose variations of a portrait photo", long_about = None)]
struct Args {
    /// Portrait photo to base the poses on
    #[arg(short, long)]
    image: PathBuf,

    /// Theme or scene for the generated images
    #[arg(short, long, default_value = DEFAULT_THEME)]
    theme: String,

    /// Output framing: 1:1, 9:16 or 16:9
    #[arg(short, long, default_value = "1:1")]
    aspect_ratio: AspectRatio,

    /// Number of poses to request
    #[arg(short = 'n', long, default_value_t = DEFAULT_POSE_COUNT)]
    count: usize,

    /// Directory the generated images are written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also package every image into generated_poses.zip
    #[arg(long)]
    zip: bool,

    /// Cap on concurrent image requests
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Writes each image to disk the moment it arrives.
struct CliRenderer {
    output_dir: PathBuf,
    written: AtomicUsize,
}

impl GenerationObserver for CliRenderer {
    fn on_progress(&self, progress: &ProgressState) {
        log::info!("⏳ {}", progress.message);
        if progress.is_finished() {
            log::debug!("All {} image requests have returned", progress.total);
        }
    }

    fn on_image(&self, image: GeneratedImage) {
        let index = self.written.fetch_add(1, Ordering::SeqCst);
        let path = self.output_dir.join(GeneratedImage::file_name(index));

        let saved = image
            .decode()
            .and_then(|bytes| fs::write(&path, bytes).map_err(PoseGenError::from));

        match saved {
            Ok(()) => log::info!("🖼️  Saved \"{}\" to {}", image.pose, path.display()),
            Err(e) => log::error!("Failed to save image for \"{}\": {}", image.pose, e),
        }
    }

    fn on_done(&self, summary: &RunSummary) {
        log::info!(
            "🎉 Done: {} of {} poses generated",
            summary.delivered,
            summary.requested
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let args = Args::parse();

    let level = if args.verbose { LogLevel::Debug } else { LogLevel::Info };
    let logger_config = if args.json_logs {
        LoggerConfig::production().with_level(level)
    } else {
        LoggerConfig::new().with_level(level)
    };
    logger::init_with_config(logger_config)?;

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if !dotenv_loaded {
        log::debug!("No .env file found, using process environment");
    }

    let mut config = Config::from_env();
    if let Some(output) = args.output {
        config = config.with_output_dir(output);
    }
    if let Some(limit) = args.max_concurrency {
        config = config.with_orchestrator(OrchestratorConfig::new().with_max_concurrency(limit));
    }
    logger::log_config_info(&config);

    let orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            log::error!("❌ {}", e);
            return Err(e.into());
        }
    };

    let mut session = GenerationSession::new();
    match read_source_image(&args.image) {
        Ok(source) => session.set_source(source),
        Err(e) => {
            log::error!("❌ {}", e.user_message());
            return Err(e.into());
        }
    }
    session.theme = args.theme;
    session.aspect_ratio = args.aspect_ratio;
    session.pose_count = args.count;

    fs::create_dir_all(&config.output_dir)?;
    let renderer = CliRenderer {
        output_dir: config.output_dir.clone(),
        written: AtomicUsize::new(0),
    };

    log::info!(
        "✨ {} for \"{}\" ({})",
        session.generate_button_text(),
        session.theme,
        session.aspect_ratio
    );

    let outcome = session
        .run(&orchestrator, Some(&renderer as &dyn GenerationObserver))
        .await;
    if let Err(e) = outcome {
        log::error!("❌ {}", e.user_message());
        return Err(e.into());
    }

    if args.zip {
        let archive_path = config.output_dir.join(ARCHIVE_FILE_NAME);
        match session.download_all(&archive_path) {
            Ok(Some(path)) => log::info!("📦 Archive ready: {}", path.display()),
            Ok(None) => log::warn!("No images were generated, skipping archive"),
            Err(e) => log::error!("❌ {}", e.user_message()),
        }
    }

    Ok(())
}
