use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use mask_smoke_lib::{
    run_smoke, BlendMode, FailureKind, OutputFormat, Outcome, RasterEngine, SmokeConfig,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output width in pixels, also used for the mask
    #[arg(long, env = "SMOKE_WIDTH", default_value = "200")]
    width: u32,

    /// Output height in pixels, also used for the mask
    #[arg(long, env = "SMOKE_HEIGHT", default_value = "200")]
    height: u32,

    /// Corner radius of the rounded-rectangle mask
    #[arg(long, env = "SMOKE_RADIUS", default_value = "50")]
    radius: u32,

    /// Blend mode used to composite the mask
    #[arg(long, env = "SMOKE_BLEND", default_value = "clear")]
    blend: BlendMode,

    /// Output encoding (png or jpeg)
    #[arg(long, env = "SMOKE_FORMAT", default_value = "png")]
    format: OutputFormat,

    /// Write the encoded result to this file after a successful run
    #[arg(long, env = "SMOKE_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the result metadata as JSON on success
    #[arg(long)]
    print_info: bool,
}

impl SmokeConfig for Args {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn corner_radius(&self) -> u32 {
        self.radius
    }

    fn blend(&self) -> BlendMode {
        self.blend
    }

    fn format(&self) -> OutputFormat {
        self.format
    }
}

fn main() -> ExitCode {
    // Load environment variables from .env file if present
    dotenv().ok();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(1);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    init_tracing();

    let outcome = run(&args)
        .unwrap_or_else(|e| Outcome::failed(FailureKind::Unexpected, format!("{:#}", e)));

    if let Some(diagnostic) = outcome.diagnostic() {
        eprintln!("mask-smoke: {}", diagnostic);
    }
    ExitCode::from(outcome.exit_code())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<Outcome> {
    // A single async boundary, so one thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let outcome = runtime.block_on(run_smoke(RasterEngine::new(), args));

    // Extras only apply to a passing run
    if let Outcome::Passed(output) = &outcome {
        if let Some(path) = &args.output {
            fs::write(path, &output.data)
                .with_context(|| format!("Failed to write result to {}", path.display()))?;
        }
        if args.print_info {
            let info = serde_json::to_string(&output.info)
                .context("Failed to serialize result metadata")?;
            println!("{}", info);
        }
    }

    Ok(outcome)
}
