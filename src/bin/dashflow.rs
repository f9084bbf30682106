use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

use dashflow::{
    CancelToken, Color, DashflowConfig, GenerateRequest, GifEncoder, ProgressTracker,
    RasterSettings, ResvgRasterizer, SvgScene,
    speed::{closest_preset, format_duration, format_speed, frame_delay_ms},
};

#[derive(Parser, Debug)]
#[command(name = "dashflow", version, about = "Animate dashed SVG strokes into a looping GIF")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the full animation to a GIF.
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// List the dashed paths found in a scene and the frame plan for the chosen speed.
    Inspect(InspectArgs),
    /// Show how a slider position or speed maps to duration and frame count.
    Speed(SpeedArgs),
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

/// Look and timing, layered over an optional JSON config file.
#[derive(Args, Debug)]
struct LookArgs {
    /// JSON config (`animation`, `output`, `speed` sections, all optional).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Speed multiplier.
    #[arg(long, conflicts_with = "slider")]
    speed: Option<f64>,

    /// Slider position 0-100, mapped through the configured speed curve.
    #[arg(long)]
    slider: Option<f64>,

    #[arg(long)]
    fps: Option<u32>,

    /// Race a bright segment along each path.
    #[arg(long)]
    glint: bool,

    /// Sweep a two-color gradient along the strokes.
    #[arg(long)]
    gradient: bool,

    #[arg(long)]
    color_from: Option<Color>,

    #[arg(long)]
    color_to: Option<Color>,

    #[arg(long)]
    background: Option<Color>,

    /// Uniform stroke width for animated paths.
    #[arg(long)]
    stroke_width: Option<f64>,

    /// Output width in pixels (defaults to the scene's).
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels (defaults to the scene's).
    #[arg(long)]
    height: Option<u32>,
}

impl LookArgs {
    fn resolve(&self) -> anyhow::Result<DashflowConfig> {
        let mut cfg = match &self.config {
            Some(path) => DashflowConfig::from_path(path)?,
            None => DashflowConfig::default(),
        };

        if let Some(speed) = self.speed {
            cfg.animation.speed = speed;
        } else if let Some(slider) = self.slider {
            cfg.animation.speed = cfg.speed.slider_to_speed(slider);
        }
        if let Some(fps) = self.fps {
            cfg.output.fps = fps;
        }
        cfg.animation.use_glint_overlay |= self.glint;
        cfg.animation.gradient_sweep |= self.gradient;
        if let Some(c) = self.color_from {
            cfg.animation.color_from = c;
        }
        if let Some(c) = self.color_to {
            cfg.animation.color_to = c;
        }
        if let Some(c) = self.background {
            cfg.output.background = c;
        }
        if self.stroke_width.is_some() {
            cfg.animation.stroke_width = self.stroke_width;
        }
        if self.width.is_some() {
            cfg.output.width = self.width;
        }
        if self.height.is_some() {
            cfg.output.height = self.height;
        }

        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Input SVG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    look: LookArgs,

    /// Palette sampling factor, 1 (best) to 30 (fastest).
    #[arg(long)]
    quality: Option<u8>,

    /// Threads used to quantize frames.
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    dither: bool,

    /// Build one palette per frame instead of one shared palette.
    #[arg(long)]
    no_global_palette: bool,

    /// Mark the background color as transparent.
    #[arg(long)]
    transparent: bool,
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Input SVG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    index: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    look: LookArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Input SVG.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    look: LookArgs,
}

#[derive(Args, Debug)]
struct SpeedArgs {
    #[arg(long, conflicts_with = "speed")]
    slider: Option<f64>,

    #[arg(long)]
    speed: Option<f64>,

    #[arg(long, default_value_t = 24)]
    fps: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format)?;

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Speed(args) => cmd_speed(args),
    }
}

fn init_logging(level: LogLevel, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.as_str().parse().context("parse log level")?)
        .from_env_lossy();
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.compact().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("init logging: {e}"))
}

fn read_scene(path: &Path) -> anyhow::Result<SvgScene> {
    let svg = std::fs::read_to_string(path)
        .with_context(|| format!("read svg '{}'", path.display()))?;
    let scene = SvgScene::parse(&svg).with_context(|| format!("parse svg '{}'", path.display()))?;
    Ok(scene)
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    let mut cfg = args.look.resolve()?;
    if let Some(q) = args.quality {
        cfg.output.quality = q;
    }
    if let Some(w) = args.workers {
        cfg.output.workers = w;
    }
    cfg.output.dither |= args.dither;
    cfg.output.transparent |= args.transparent;
    if args.no_global_palette {
        cfg.output.global_palette = false;
    }
    cfg.output.validate().context("invalid output options")?;

    let tracker = ProgressTracker::new();
    let req = GenerateRequest {
        scene: &scene,
        animation: &cfg.animation,
        output: &cfg.output,
        speed: &cfg.speed,
    };
    let out = dashflow::generate(
        &req,
        &mut ResvgRasterizer::new(),
        &mut GifEncoder::new(),
        &tracker,
        &CancelToken::new(),
    )?;

    create_parent_dir(&args.out)?;
    std::fs::write(&args.out, &out.bytes)
        .with_context(|| format!("write gif '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} frames, {}x{}, {} bytes)",
        args.out.display(),
        out.frame_count,
        out.width,
        out.height,
        out.bytes.len()
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    let cfg = args.look.resolve()?;
    let plan = dashflow::plan(&GenerateRequest {
        scene: &scene,
        animation: &cfg.animation,
        output: &cfg.output,
        speed: &cfg.speed,
    })?;

    let settings = RasterSettings {
        width: plan.width,
        height: plan.height,
        frame_count: plan.frame_count,
        background: cfg.output.background,
    };
    let frame = dashflow::render_frame(
        &scene,
        &scene.dash_lengths(),
        args.index,
        &settings,
        &cfg.animation,
        &mut ResvgRasterizer::new(),
    )?;

    create_parent_dir(&args.out)?;
    frame
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} (frame {} of {})",
        args.out.display(),
        args.index,
        plan.frame_count
    );
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    let cfg = args.look.resolve()?;
    let plan = dashflow::plan(&GenerateRequest {
        scene: &scene,
        animation: &cfg.animation,
        output: &cfg.output,
        speed: &cfg.speed,
    })?;

    println!("size:   {}x{}", scene.width(), scene.height());
    println!("paths:  {}", scene.paths().len());
    for path in scene.paths() {
        let pattern: Vec<String> = path.dash_pattern.iter().map(f64::to_string).collect();
        println!(
            "  {:<16} length {:>9.2}  dash [{}] period {:.2}",
            path.id,
            path.total_length,
            pattern.join(" "),
            path.dash_length()
        );
    }
    println!(
        "speed:  {} ({})",
        cfg.animation.speed,
        format_speed(cfg.animation.speed)
    );
    println!(
        "cycle:  {} -> {} frames at {} fps, {} ms each",
        format_duration(cfg.speed.duration(cfg.animation.speed)),
        plan.frame_count,
        cfg.output.fps,
        plan.frame_delay_ms
    );
    println!("output: {}x{}", plan.width, plan.height);
    Ok(())
}

fn cmd_speed(args: SpeedArgs) -> anyhow::Result<()> {
    if args.fps == 0 {
        anyhow::bail!("fps must be > 0");
    }
    let cfg = dashflow::SpeedConfig::default();
    let speed = match (args.speed, args.slider) {
        (Some(s), _) => cfg.clamp_speed(s),
        (None, Some(slider)) => cfg.slider_to_speed(slider),
        (None, None) => cfg.default,
    };
    let preset = closest_preset(speed);

    println!("speed:    {speed:.3} ({})", format_speed(speed));
    println!("slider:   {}", cfg.speed_to_slider_rounded(speed));
    println!("duration: {}", format_duration(cfg.duration(speed)));
    println!(
        "frames:   {} at {} fps ({} ms each)",
        cfg.frame_count(speed, args.fps),
        args.fps,
        frame_delay_ms(args.fps)
    );
    println!("preset:   {} ({})", preset.name, preset.description);
    Ok(())
}
