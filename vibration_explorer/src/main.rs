//! vibration_explorer — interactive entry point.

use clap::Parser;
use vibration_explorer::app::{run, AppConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    width: usize,

    /// Window height in pixels
    #[arg(long, default_value_t = 800)]
    height: usize,

    /// Seconds per envelope pass
    #[arg(long, default_value_t = 2.0)]
    duration: f64,

    /// Ephemeral agents on screen
    #[arg(long, default_value_t = 75)]
    agents: usize,

    /// RNG seed for agents and target vibrations (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Run without an audio device
    #[arg(long, default_value_t = false)]
    mute: bool,

    /// Ignore the other options and start with defaults
    #[arg(long, default_value_t = false)]
    quick: bool,
}

impl Args {
    fn config(&self) -> AppConfig {
        AppConfig {
            width:             self.width.max(320),
            height:            self.height.max(240),
            envelope_duration: self.duration,
            agents:            self.agents,
            seed:              self.seed.unwrap_or_else(rand::random),
            mute:              self.mute,
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Vibration Explorer — pinch, shape, feel, save         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Mouse simulation  (use --features leap for hardware)");
    println!();

    let cfg = if args.quick {
        println!("  Quick-start: 1280x800, 2 s envelope, 75 agents\n");
        AppConfig::default()
    } else {
        args.config()
    };

    #[cfg(not(feature = "leap"))]
    {
        println!("  Left button = pinch   M = second hand   right button = its pinch");
        println!("  Esc / Q = quit");
        println!();
    }

    if let Err(e) = run(cfg) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
