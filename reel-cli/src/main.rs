//! Reel CLI Tool
//!
//! Command-line interface for inspecting chapter timelines and for playing frame
//! sequences through a simulated scrolling page.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::RgbaImage;
use reel_core::{presets, Distance, FrameSequence, Timeline};
use reel_player::{
    navigator, DirSource, Ease, FrameStore, LoadOptions, PlaybackController, PlaybackState, Region,
    ScrollDriver, SeekOptions, SequenceConfig, Viewport,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// One simulated display refresh
const FRAME: Duration = Duration::from_millis(16);
/// Ticks that let scrub lag and seeks come to rest
const SETTLE_TICKS: usize = 240;

#[derive(Parser)]
#[command(name = "reel")]
#[command(about = "Reel - scroll-synchronized frame sequence playback")]
#[command(version)]
struct Cli {
    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a sequence and its chapters
    Info {
        /// Timeline JSON file (defaults to the showcase chapters)
        #[arg(long)]
        timeline: Option<PathBuf>,

        /// Number of frames in the sequence
        #[arg(long)]
        frames: Option<usize>,
    },

    /// Render the frame shown at a scroll progress
    Render {
        #[command(flatten)]
        playback: PlaybackArgs,

        /// Scroll progress of the pinned region (0-1)
        #[arg(long)]
        progress: f64,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Scroll through the whole pinned region, writing one frame per step
    Scrub {
        #[command(flatten)]
        playback: PlaybackArgs,

        /// Output directory for frames
        #[arg(short, long)]
        output: PathBuf,

        /// Number of scroll steps
        #[arg(long, default_value = "24")]
        steps: usize,
    },

    /// Jump to a chapter and render the frame it lands on
    Seek {
        #[command(flatten)]
        playback: PlaybackArgs,

        /// Chapter index
        #[arg(long)]
        segment: usize,

        /// Easing curve of the seek
        #[arg(long, value_enum, default_value = "in-out-cubic")]
        ease: SeekEase,

        /// Seek duration in milliseconds
        #[arg(long, default_value = "800")]
        duration_ms: u64,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SeekEase {
    Linear,
    OutQuad,
    InOutQuad,
    OutCubic,
    InOutCubic,
}

impl From<SeekEase> for Ease {
    fn from(ease: SeekEase) -> Self {
        match ease {
            SeekEase::Linear => Ease::Linear,
            SeekEase::OutQuad => Ease::OutQuad,
            SeekEase::InOutQuad => Ease::InOutQuad,
            SeekEase::OutCubic => Ease::OutCubic,
            SeekEase::InOutCubic => Ease::InOutCubic,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Showcase,
    Hero,
}

#[derive(Args)]
struct PlaybackArgs {
    /// Asset root holding the sequence directory
    assets: PathBuf,

    /// Sequence preset
    #[arg(long, value_enum, default_value = "showcase")]
    preset: Preset,

    /// Vehicle of the hero preset
    #[arg(long, default_value = "yacht")]
    vehicle: String,

    /// Replace the preset chapters with a timeline JSON file
    #[arg(long)]
    timeline: Option<PathBuf>,

    /// Override the number of frames
    #[arg(long)]
    frames: Option<usize>,

    /// Override the frame file extension
    #[arg(long)]
    extension: Option<String>,

    /// Override the pinned scroll distance (e.g. 1200vh, 800px)
    #[arg(long)]
    distance: Option<Distance>,

    /// Decoder threads (default: one per CPU)
    #[arg(long)]
    threads: Option<usize>,

    /// Viewport width in pixels
    #[arg(long, default_value = "1920")]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value = "1080")]
    height: f64,
}

impl PlaybackArgs {
    fn config(&self) -> Result<SequenceConfig> {
        let mut config = match self.preset {
            Preset::Showcase => SequenceConfig::showcase()?,
            Preset::Hero => SequenceConfig::hero(&self.vehicle)?,
        };

        if self.frames.is_some() || self.extension.is_some() {
            let sequence = &config.sequence;
            config.sequence = FrameSequence::with_extension(
                &sequence.name,
                self.frames.unwrap_or(sequence.frame_count),
                self.extension.as_deref().unwrap_or(&sequence.extension),
            )?;
        }
        if let Some(distance) = self.distance {
            config.distance = distance;
        }
        if let Some(path) = &self.timeline {
            config.timeline = Some(Arc::new(load_timeline(path)?));
        }
        Ok(config)
    }
}

/// A sequence playing on a simulated page
struct Stage {
    driver: ScrollDriver,
    controller: PlaybackController,
    region: Region,
    distance: f64,
}

impl Stage {
    fn mount(args: &PlaybackArgs) -> Result<Self> {
        let config = args.config()?;
        let viewport = Viewport::new(args.width, args.height);
        let distance = config.distance.to_pixels(viewport.height);

        println!(
            "Loading {} frames from {}",
            config.sequence.frame_count,
            args.assets.join(&config.sequence.name).display()
        );
        let options = LoadOptions {
            threads: args.threads,
            ..LoadOptions::default()
        };
        let store = FrameStore::load(
            config.sequence.clone(),
            Arc::new(DirSource::new(&args.assets)),
            &options,
        )
        .context("Failed to start frame loading")?;

        let driver = ScrollDriver::new(viewport);
        let region = Region::new(0.0, viewport.height);
        let controller = PlaybackController::mount(&driver, region, config, store)
            .context("Failed to mount sequence")?;

        while controller.poll().context("Failed to load frames")? == PlaybackState::Loading {
            std::thread::sleep(Duration::from_millis(10));
        }
        driver.tick(FRAME);

        Ok(Self {
            driver,
            controller,
            region,
            distance,
        })
    }

    fn scroll_to_progress(&self, progress: f64) {
        self.driver
            .user_scroll_to(self.region.top + self.distance * progress);
    }

    fn run(&self, ticks: usize) {
        for _ in 0..ticks {
            self.driver.tick(FRAME);
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        let snapshot: RgbaImage = self
            .controller
            .snapshot()
            .context("Nothing has been drawn")?;
        snapshot
            .save(path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        match self.controller.current_label() {
            Some(label) => format!("frame {} ({label})", self.controller.current_frame()),
            None => format!("frame {}", self.controller.current_frame()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Info { timeline, frames } => show_info(timeline, frames)?,

        Commands::Render {
            playback,
            progress,
            output,
        } => render_frame(&playback, progress, &output)?,

        Commands::Scrub {
            playback,
            output,
            steps,
        } => scrub_sequence(&playback, &output, steps)?,

        Commands::Seek {
            playback,
            segment,
            ease,
            duration_ms,
            output,
        } => {
            let options = SeekOptions {
                duration: Duration::from_millis(duration_ms),
                ease: ease.into(),
            };
            seek_segment(&playback, segment, options, &output)?
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_timeline(path: &Path) -> Result<Timeline> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open timeline {}", path.display()))?;
    Timeline::from_json(BufReader::new(file))
        .with_context(|| format!("Failed to read timeline {}", path.display()))
}

fn show_info(timeline: Option<PathBuf>, frames: Option<usize>) -> Result<()> {
    let timeline = match timeline {
        Some(path) => load_timeline(&path)?,
        None => presets::showcase_timeline()?,
    };
    let frame_count = frames.unwrap_or(timeline.end_frame());
    let sequence = FrameSequence::new("sequence", frame_count)?;

    println!("\n=== Sequence ===");
    println!("Frames: {}", sequence.frame_count);
    println!(
        "Assets: {} .. {}",
        sequence.frame_uri(0),
        sequence.frame_uri(sequence.last_index())
    );

    println!("\n=== Timeline ({} segments) ===", timeline.len());
    print!("{timeline}");
    match timeline.check_covers(frame_count) {
        Ok(()) => println!("Covers all {} frames", frame_count),
        Err(err) => println!("Warning: {err}"),
    }

    println!("\n=== Navigation targets ===");
    for (i, segment) in timeline.segments().iter().enumerate() {
        let progress = navigator::target_progress(segment, frame_count);
        println!(
            "  [{:>2}] progress {:.4} -> frame {}",
            i,
            progress,
            sequence.frame_index(progress)
        );
    }

    Ok(())
}

fn render_frame(args: &PlaybackArgs, progress: f64, output: &Path) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&progress),
        "Progress must be between 0 and 1, got {progress}"
    );

    let stage = Stage::mount(args)?;
    stage.scroll_to_progress(progress);
    stage.run(SETTLE_TICKS);

    stage.save(output)?;
    println!("Rendered {} to {}", stage.describe(), output.display());
    Ok(())
}

fn scrub_sequence(args: &PlaybackArgs, output: &Path, steps: usize) -> Result<()> {
    anyhow::ensure!(steps > 0, "At least one step is required");
    std::fs::create_dir_all(output).context("Failed to create output directory")?;

    let stage = Stage::mount(args)?;
    stage.controller.on_segment_change(|change| {
        println!("  -> segment {}: {} - {}", change.index, change.label, change.detail);
    });
    stage.controller.on_overlay_change(|visible| {
        println!("  -> overlay {}", if visible { "shown" } else { "hidden" });
    });

    println!("Scrubbing in {} steps to {}", steps, output.display());
    for step in 0..=steps {
        stage.scroll_to_progress(step as f64 / steps as f64);
        stage.run(if step == steps { SETTLE_TICKS } else { 4 });

        let path = output.join(format!("frame_{:04}.png", step));
        stage.save(&path)?;
        tracing::debug!(step, "{}", stage.describe());

        if (step + 1) % 10 == 0 {
            println!("Wrote {} / {} frames", step + 1, steps + 1);
        }
    }

    println!(
        "Finished on {} after {} draws",
        stage.describe(),
        stage.controller.draw_count()
    );
    Ok(())
}

fn seek_segment(
    args: &PlaybackArgs,
    segment: usize,
    options: SeekOptions,
    output: &Path,
) -> Result<()> {
    let stage = Stage::mount(args)?;
    let progress = stage
        .controller
        .seek_to_segment_with(segment, options)
        .with_context(|| format!("Cannot navigate to segment {segment}"))?;

    println!("Seeking to segment {} (progress {:.4})", segment, progress);
    while stage.driver.is_seeking() {
        stage.driver.tick(FRAME);
    }
    stage.run(SETTLE_TICKS);

    stage.save(output)?;
    println!("Landed on {}, saved to {}", stage.describe(), output.display());
    Ok(())
}
