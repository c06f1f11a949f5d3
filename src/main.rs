use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tiny_skia::Pixmap;
use tracing::{info, Level};

use dom_intro::audio::{AudioSink, MusicPlayback, MusicStream, PcmFileSink, PsgTune};
use dom_intro::input::{KeyHold, ScriptedInput};
use dom_intro::intro::Intro;
use dom_intro::manifest::load_and_validate_manifest;
use dom_intro::output::open_sink;
use dom_intro::schema::{AudioSettings, Duration, Manifest};
use dom_intro::scroll::font_changes::FontChangeIndex;
use dom_intro::scroll::markup::{tokens, Token};
use dom_intro::scroll::tier::Tier;
use dom_intro::scroll::ScrollEngine;

const VERSION: &str = match option_env!("DOM_INTRO_GIT_HASH") {
    Some(hash) => hash,
    None => env!("CARGO_PKG_VERSION"),
};

#[derive(Debug, Parser)]
#[command(name = "dom-intro")]
#[command(about = "Multi-size raster scroller intro, rendered headlessly")]
#[command(version = VERSION)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the intro and write its frames
    Render {
        /// YAML manifest; built-in defaults when omitted
        manifest: Option<PathBuf>,
        /// Directory for a PNG sequence, or a video file encoded by ffmpeg
        #[arg(short = 'o', long = "out")]
        out: PathBuf,
        #[arg(long)]
        frames: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
        /// Tempo key hold, e.g. `120:faster` or `300-320:slower`
        #[arg(long = "press")]
        press: Vec<KeyHold>,
        /// Raw s16le stereo soundtrack
        #[arg(long = "audio-out")]
        audio_out: Option<PathBuf>,
    },
    /// Validate a manifest and summarize it
    Check { manifest: PathBuf },
    /// Print the font-change index and per-tier text stats
    Scan {
        manifest: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Render {
            manifest,
            out,
            frames,
            seed,
            press,
            audio_out,
        } => {
            let mut manifest = load_manifest(manifest.as_deref())?;
            if let Some(frames) = frames {
                manifest.environment.duration = Duration::Frames { frames };
                manifest.environment.validate()?;
            }
            if let Some(seed) = seed {
                manifest.seed = seed;
            }
            run_render(&manifest, &out, press, audio_out.as_deref())
        }
        Commands::Check { manifest } => run_check(&manifest),
        Commands::Scan { manifest, json } => run_scan(manifest.as_deref(), json),
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install logger")
}

fn load_manifest(path: Option<&Path>) -> Result<Manifest> {
    match path {
        Some(path) => load_and_validate_manifest(path),
        None => Ok(Manifest::default()),
    }
}

fn run_check(manifest_path: &Path) -> Result<()> {
    let manifest = load_and_validate_manifest(manifest_path)?;
    let index = FontChangeIndex::build_with_default(
        manifest.scroll.message().as_bytes(),
        manifest.scroll.default_tier()?,
    );

    println!(
        "OK: {} (768x540, {} fps, {} frames, tempo x{})",
        manifest_path.display(),
        manifest.environment.fps,
        manifest.environment.total_frames(),
        manifest.scroll.tempo
    );
    println!(
        "Message: {} glyphs, {} size changes",
        index.total_glyphs(),
        index.changes().len()
    );
    match &manifest.assets.dir {
        Some(dir) => println!("Assets: {}", dir.display()),
        None => println!("Assets: built-in"),
    }
    Ok(())
}

fn run_render(
    manifest: &Manifest,
    out: &Path,
    press: Vec<KeyHold>,
    audio_out: Option<&Path>,
) -> Result<()> {
    let fps = manifest.environment.fps;
    let total_frames = manifest.environment.total_frames();
    let music = open_music(&manifest.audio, audio_out)?;
    let mut intro = Intro::new(manifest, music)?;
    let input = ScriptedInput::new(press);

    let (width, height) = intro.layout();
    let mut surface = Pixmap::new(width, height).context("failed to allocate frame surface")?;
    let mut sink = open_sink(out, width, height, fps)?;
    let started = Instant::now();

    for frame_index in 0..total_frames {
        intro.update(&input)?;
        intro.render(&mut surface);
        sink.write_frame(&surface)?;
        intro.pump_audio(audio_frames_for(frame_index, manifest.audio.sample_rate, fps));

        if frame_index % fps == 0 {
            info!(
                frame = frame_index + 1,
                total = total_frames,
                tier = %intro.engine().active_tier(),
                "rendering"
            );
        }
    }

    sink.finish()?;
    info!(
        frames = total_frames,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "render finished"
    );
    println!("Wrote {}", out.display());
    Ok(())
}

fn open_music(settings: &AudioSettings, audio_out: Option<&Path>) -> Result<MusicPlayback> {
    let Some(path) = audio_out else {
        return Ok(MusicPlayback::disabled());
    };
    if !settings.enabled {
        info!("audio disabled in manifest, ignoring --audio-out");
        return Ok(MusicPlayback::disabled());
    }
    let tune = PsgTune::new(settings.sample_rate, settings.looping);
    let stream = MusicStream::new(tune, settings.looping, settings.volume);
    let sink: Box<dyn AudioSink> = Box::new(PcmFileSink::create(path, stream)?);
    Ok(MusicPlayback::new(Some(sink)))
}

/// Sample frames owed for video frame `frame_index`, spread so the running
/// total never drifts from `sample_rate / fps`.
fn audio_frames_for(frame_index: u32, sample_rate: u32, fps: u32) -> usize {
    let at = |frame: u64| frame * sample_rate as u64 / fps as u64;
    let frame = frame_index as u64;
    (at(frame + 1) - at(frame)) as usize
}

#[derive(Debug, Serialize)]
struct ScanReport<'a> {
    message_bytes: usize,
    index: &'a FontChangeIndex,
    tiers: Vec<TierStats>,
}

#[derive(Debug, Serialize)]
struct TierStats {
    tier: Tier,
    canvas: (u32, u32),
    scale: (f64, f64),
    shown_glyphs: usize,
    total_width: f64,
}

fn run_scan(manifest_path: Option<&Path>, json: bool) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let engine = ScrollEngine::new(
        manifest.scroll.message(),
        manifest.scroll.default_tier()?,
        manifest.scroll.tempo,
    )?;

    let tiers = engine
        .animators()
        .iter()
        .map(|animator| {
            let geometry = animator.geometry();
            TierStats {
                tier: animator.tier(),
                canvas: (geometry.canvas_width, geometry.canvas_height),
                scale: (geometry.scale_x, geometry.scale_y),
                shown_glyphs: tokens(animator.text())
                    .filter(|token| matches!(token, Token::Glyph { byte, .. } if *byte != b' '))
                    .count(),
                total_width: animator.total_width(),
            }
        })
        .collect::<Vec<_>>();
    let report = ScanReport {
        message_bytes: engine.message().len(),
        index: engine.index(),
        tiers,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} bytes, {} glyphs, default tier {}",
        report.message_bytes,
        report.index.total_glyphs(),
        report.index.default_tier()
    );
    for change in report.index.changes() {
        println!("  glyph {:>5} -> {}", change.position, change.tier);
    }
    for stats in &report.tiers {
        println!(
            "{:<6} {}x{} scale {}x{}: {} glyphs shown, {} px wide",
            stats.tier.to_string(),
            stats.canvas.0,
            stats.canvas.1,
            stats.scale.0,
            stats.scale.1,
            stats.shown_glyphs,
            stats.total_width
        );
    }
    Ok(())
}
