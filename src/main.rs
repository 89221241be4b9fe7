use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use phong_grid::{AppConfig, LookGate};

/// Interactive Blinn-Phong grid viewer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Window width in logical pixels.
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Render a single frame to --output and exit.
    #[arg(long)]
    offline: bool,

    /// PNG written in offline mode.
    #[arg(long, default_value = "output.png")]
    output: PathBuf,

    /// When pointer motion turns the camera.
    #[arg(long, value_enum, default_value_t = Look::Always)]
    look: Look,

    /// Seed for the random materials.
    #[arg(long)]
    seed: Option<u64>,

    /// Start with the pulse animation paused.
    #[arg(long)]
    still: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Look {
    /// Every pointer motion.
    Always,
    /// Only while the left button is held.
    Drag,
}

impl From<Look> for LookGate {
    fn from(look: Look) -> Self {
        match look {
            Look::Always => LookGate::Always,
            Look::Drag => LookGate::WhileDragging,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = AppConfig::new()
        .size(args.width, args.height)
        .offline(args.offline)
        .output(args.output)
        .look_gate(args.look.into())
        .animate(!args.still);
    if let Some(seed) = args.seed {
        config = config.seed(seed);
    }

    if let Err(e) = phong_grid::run(config) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
