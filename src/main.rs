//! CLI front end for the pdfverify crate.
//!
//! Each subcommand runs one assertion against a PDF and exits with status 0
//! when it passes and 1 when it fails or the document cannot be processed.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use pdfverify::{ActionKind, PdfVerifier, Rect, Result, Unit, Verdict, VerifierConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdfverify", version, about = "Assert facts about actions and images in a PDF")]
struct Args {
    /// PDF document to check
    pdf: PathBuf,

    /// Password for encrypted documents
    #[arg(long, global = true)]
    password: Option<String>,

    /// Maximum nesting of form XObjects while interpreting content
    #[arg(long, global = true, default_value_t = 32)]
    max_form_depth: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check for reachable actions of the given kinds
    Actions {
        /// Action kind, e.g. javascript, launch, uri, submit-form (repeatable)
        #[arg(long = "kind", required = true)]
        kinds: Vec<ActionKind>,

        /// Require that none of the kinds is present instead of at least one
        #[arg(long)]
        absent: bool,
    },
    /// Check that a reference image appears on a page
    Image {
        /// 1-based page number
        #[arg(long)]
        page: u32,

        /// Reference image (PNG or JPEG)
        #[arg(long)]
        image: PathBuf,

        /// Target region as X,Y,WIDTH,HEIGHT; without it only presence in the
        /// page resources is checked
        #[arg(long, value_parser = parse_region)]
        region: Option<[f64; 4]>,

        /// Unit of the region values
        #[arg(long, value_enum, default_value_t = UnitArg::Pt)]
        unit: UnitArg,
    },
    /// Write every image of the document as img-<n>.png
    ExtractImages {
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitArg {
    Pt,
    In,
    Mm,
}

impl From<UnitArg> for Unit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Pt => Unit::Point,
            UnitArg::In => Unit::Inch,
            UnitArg::Mm => Unit::Millimeter,
        }
    }
}

fn parse_region(value: &str) -> std::result::Result<[f64; 4], String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{p}': {e}")))
        .collect::<std::result::Result<_, _>>()?;
    <[f64; 4]>::try_from(parts).map_err(|p| format!("expected X,Y,WIDTH,HEIGHT, got {} values", p.len()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(Verdict::Pass) => println!("✅ pass"),
        Ok(Verdict::Fail(reason)) => {
            eprintln!("❌ fail: {reason}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Error: {e}");
            process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<Verdict> {
    let config = VerifierConfig {
        password: args.password,
        max_form_depth: args.max_form_depth,
        ..Default::default()
    };
    let verifier = PdfVerifier::with_config(&args.pdf, config)?;

    match args.command {
        Command::Actions { kinds, absent } => Ok(if absent {
            verifier.contains_no_actions_of_type(&kinds)
        } else {
            verifier.contains_actions_of_type(&kinds)
        }),
        Command::Image {
            page,
            image,
            region,
            unit,
        } => match region {
            Some([x, y, width, height]) => {
                let region = Rect::from_units(unit.into(), x, y, width, height);
                verifier.page_contains_image_in_region_file(page, &image, region)
            }
            None => verifier.page_contains_image_file(page, &image),
        },
        Command::ExtractImages { out } => {
            let written = verifier.export_images(&out)?;
            for path in &written {
                println!("💾 {}", path.display());
            }
            println!("📊 {} image(s) written to {}", written.len(), out.display());
            Ok(Verdict::Pass)
        }
    }
}
