use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tilemark::config::Config;
use tilemark::watermark::{parse_hex_color, Watermarker};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Tiled text watermarks for images and videos",
    long_about = None
)]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Command-line values that take precedence over the configuration file.
#[derive(ClapArgs, Debug)]
struct Overrides {
    /// Watermark text, `\n` separates lines
    #[arg(long, global = true)]
    text: Option<String>,

    /// Font file to render the text with
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    /// Font size in pixels
    #[arg(long, global = true)]
    font_size: Option<u32>,

    /// Counter-clockwise rotation in degrees
    #[arg(long, global = true, allow_hyphen_values = true)]
    angle: Option<f32>,

    /// Fill color as #RRGGBB or #RRGGBBAA
    #[arg(long, global = true)]
    color: Option<String>,

    /// Worker threads for frame compositing (0 = all cores)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Video codec passed to ffmpeg
    #[arg(long, global = true)]
    codec: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark a still image
    Image {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Watermark every frame of a video, keeping its audio
    Video {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Overrides {
    fn apply(self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(text) = self.text {
            config.watermark.text = text.replace("\\n", "\n");
        }
        if let Some(font) = self.font {
            config.font.path = Some(font);
        }
        if let Some(size) = self.font_size {
            config.watermark.font_size = size;
        }
        if let Some(angle) = self.angle {
            config.watermark.angle = angle;
        }
        if let Some(color) = self.color {
            parse_hex_color(&color).with_context(|| format!("invalid --color '{}'", color))?;
            config.watermark.color = color;
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if let Some(codec) = self.codec {
            config.encoder.video_codec = codec;
        }
        Ok(())
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::default(),
    };
    args.overrides.apply(&mut config)?;

    tilemark::logging::init_subscriber(&config.logging)
        .context("failed to initialize logging subsystem")?;

    tracing::info!(
        config_file = ?args.config.as_ref().map(|p| p.display().to_string()),
        text = %config.watermark.text,
        font_size = config.watermark.font_size,
        angle = config.watermark.angle,
        workers = config.pipeline.workers,
        "Configuration loaded successfully"
    );

    let watermarker = Watermarker::from_config(&config)?;

    match args.command {
        Command::Image { input, output } => {
            watermarker.watermark_image(&input, &output)?;
        }
        Command::Video { input, output } => {
            watermarker.watermark_video(&input, &output)?;
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!(error = %e, "Watermarking failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
