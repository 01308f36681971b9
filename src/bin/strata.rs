use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "strata", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one frame of a constant -> brightness -> viewer graph as a PNG.
    Frame(FrameArgs),
    /// Inspect or reset an on-disk cache directory.
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Straight-alpha color as `r,g,b,a` (0-255).
    #[arg(long, default_value = "255,128,0,255")]
    color: String,

    /// Brightness factor applied to the color.
    #[arg(long, default_value_t = 1.0)]
    brightness: f32,

    #[arg(long, default_value_t = 256)]
    width: u32,

    #[arg(long, default_value_t = 256)]
    height: u32,

    /// Frame index.
    #[arg(long, default_value_t = 1)]
    frame: i64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Engine options JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persist the disk caches after rendering.
    #[arg(long)]
    save_cache: bool,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Print layout health and usage of a cache directory.
    Info {
        #[arg(long)]
        root: PathBuf,
    },
    /// Delete every cache file and recreate an empty layout.
    Clear {
        #[arg(long)]
        root: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Cache(CacheCommand::Info { root }) => cmd_cache_info(&root),
        Command::Cache(CacheCommand::Clear { root }) => cmd_cache_clear(&root),
    }
}

fn parse_color(s: &str) -> anyhow::Result<strata::Rgba8Premul> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parse color '{s}'"))?;
    let [r, g, b, a] = parts[..] else {
        anyhow::bail!("color '{s}' must have exactly 4 components");
    };
    Ok(strata::Rgba8Premul::from_straight_rgba(r, g, b, a))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let color = parse_color(&args.color)?;
    if args.width == 0 || args.height == 0 {
        anyhow::bail!("--width and --height must be >= 1");
    }

    let mut opts = match &args.config {
        Some(path) => strata::EngineOpts::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => strata::EngineOpts::default(),
    };
    opts.threaded_playback = false;
    opts.timeline_first = opts.timeline_first.min(args.frame);
    opts.timeline_last = opts.timeline_last.max(args.frame);

    let engine = strata::Engine::new(opts)?;
    let rect = strata::RectI::from_xywh(0, 0, args.width, args.height);
    let constant = engine.create_node(
        "constant",
        strata::effects::ConstantColor::new(color, rect),
    );
    let brightness = engine.create_node(
        "brightness",
        strata::effects::Brightness::new(args.brightness),
    );
    let viewer = engine.create_node("viewer", strata::effects::Inspector::new(1));
    brightness.connect_input(0, &constant)?;
    viewer.connect_input(0, &brightness)?;

    let graph = Arc::new(strata::RenderGraph::new(Arc::clone(&engine), viewer));
    let (scheduler, events) = strata::PlaybackScheduler::new(graph)?;
    scheduler.seek(strata::FrameIndex(args.frame));
    scheduler.start(strata::PlaybackRequest::current_frame())?;

    let mut frame = None;
    for event in events.try_iter() {
        match event {
            strata::PlaybackEvent::FrameRendered { mut frames, .. } if !frames.is_empty() => {
                frame = Some(frames.swap_remove(0));
            }
            strata::PlaybackEvent::RenderFailed { time, message } => {
                anyhow::bail!("frame {} failed: {message}", time.0);
            }
            _ => {}
        }
    }
    let frame = frame.context("no frame was rendered")?;

    let mut pixels = frame.to_rgba8()?;
    unpremultiply(&mut pixels);

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &pixels,
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    if args.save_cache {
        let (nodes, frames) = engine.save_caches()?;
        eprintln!("saved {nodes} node images and {frames} frames");
    }
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn unpremultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

fn cmd_cache_info(root: &Path) -> anyhow::Result<()> {
    if !root.is_dir() {
        anyhow::bail!("'{}' is not a directory", root.display());
    }
    let layout = strata::cache::toc::DiskLayout::at(root);
    let (files, bytes) = layout.usage()?;
    println!("root:      {}", root.display());
    println!("intact:    {}", layout.is_intact());
    println!(
        "shards:    {}/{}",
        layout.shard_count(),
        strata::cache::toc::SHARD_COUNT
    );
    if let Ok(toc) = layout.read_toc::<serde_json::Value, serde_json::Value>() {
        println!("toc:       {} records", toc.records.len());
    } else {
        println!("toc:       unreadable");
    }
    println!("files:     {files}");
    println!("bytes:     {bytes}");
    Ok(())
}

fn cmd_cache_clear(root: &Path) -> anyhow::Result<()> {
    let layout = strata::cache::toc::DiskLayout::open(root)
        .with_context(|| format!("open cache '{}'", root.display()))?;
    layout.reset()?;
    eprintln!("cleared {}", root.display());
    Ok(())
}
