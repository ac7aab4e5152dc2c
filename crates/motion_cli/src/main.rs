//! Motion demo
//!
//! Runs a handful of spring animations on the process-wide animator and logs
//! the frame clock lifecycle until every animation has settled.

use anyhow::{bail, Context, Result};
use clap::Parser;
use motion_animator::{
    set_global_animator, Animator, AnimatorConfig, SharedAnimation, SpringAnimation, SpringConfig,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "motion-demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive spring animations on a frame clock", long_about = None)]
struct Cli {
    /// Animator config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frame clock rate, overrides the config file
    #[arg(long)]
    fps: Option<u32>,

    /// Number of spring animations to run
    #[arg(short = 'n', long, default_value = "3")]
    count: usize,

    /// Value every spring animates towards
    #[arg(short, long, default_value = "100.0")]
    target: f32,

    /// Log frame clock start/stop
    #[arg(long)]
    debug: bool,

    /// Give up if the springs haven't settled after this many seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn preset(index: usize) -> (&'static str, SpringConfig) {
    match index % 3 {
        0 => ("stiff", SpringConfig::stiff()),
        1 => ("wobbly", SpringConfig::wobbly()),
        _ => ("gentle", SpringConfig::gentle()),
    }
}

fn load_config(cli: &Cli) -> Result<AnimatorConfig> {
    let mut config = match &cli.config {
        Some(path) => AnimatorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AnimatorConfig::default(),
    };
    if let Some(fps) = cli.fps {
        config = config.with_target_fps(fps);
    }
    if cli.debug {
        config = config.with_debug(true);
    }
    config.validate().context("Invalid animator config")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = load_config(&cli)?;
    info!(
        "Starting animator at {} fps with {} springs",
        config.target_fps, cli.count
    );

    let animator = Animator::from_config(&config).context("Failed to create animator")?;
    set_global_animator(animator.clone()).context("Failed to install global animator")?;

    let frames = Arc::new(AtomicU64::new(0));
    let (done_tx, done_rx) = mpsc::channel();
    let f = Arc::clone(&frames);
    let observer = animator.add_update_observer(move |animator: &Animator, dt: f32| {
        let frame = f.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("frame {} dt={:.4}s", frame, dt);
        if animator.animation_count() == 0 {
            let _ = done_tx.send(frame);
        }
    });

    let springs: Vec<Arc<SpringAnimation>> = (0..cli.count)
        .map(|index| {
            let (name, spring_config) = preset(index);
            let spring = SpringAnimation::new(spring_config, 0.0, cli.target);
            spring.callbacks().set_on_completion(move |_| {
                info!("spring {} ({}) settled", index, name);
            });
            spring
        })
        .collect();

    let started = Instant::now();
    for spring in &springs {
        let spring: SharedAnimation = spring.clone();
        animator.add_animation(spring);
    }

    if springs.is_empty() {
        info!("Nothing to animate");
        return Ok(());
    }

    let total_frames = match done_rx.recv_timeout(Duration::from_secs(cli.timeout)) {
        Ok(frame) => frame,
        Err(_) => bail!(
            "Springs did not settle within {}s ({} still active)",
            cli.timeout,
            animator.animation_count()
        ),
    };
    animator.remove_update_observer_with_key(observer);

    info!(
        "All springs settled after {} frames in {:.2?} (clock running: {})",
        total_frames,
        started.elapsed(),
        animator.is_clock_running()
    );
    for (index, spring) in springs.iter().enumerate() {
        info!("spring {} final value {:.3}", index, spring.value());
    }

    Ok(())
}
