use anyhow::{Context, Result};
use clap::Parser;
use odisvcplib::{Outcome, OutputMode, Pipeline, Replacement};
use std::fs::File;
use std::io::{BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Convert an ODIS XML dataset into a VCP document or a RAW binary.
#[derive(Parser, Debug)]
#[command(name = "odis2vcp", version, about, long_about = None)]
struct Cli {
    /// ODIS XML file
    input: PathBuf,

    /// Output file ('-' for stdout). Derived from the input name when omitted.
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Write the RAW binary payload instead of a VCP document
    #[arg(short, long)]
    raw: bool,

    /// Binary file replacing the dataset payload (CRC footer is recomputed)
    #[arg(short, long, value_name = "MODINPUT")]
    modinput: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    info!(input = %cli.input.display(), "Processing file");

    let document = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {}", cli.input.display()))?;
    let input_name = file_stem(&cli.input);

    let mut pipeline = Pipeline::new(&input_name).raw(cli.raw);
    if let Some(mod_path) = &cli.modinput {
        let payload = std::fs::read(mod_path)
            .with_context(|| format!("Failed to read modified input: {}", mod_path.display()))?;
        info!(modinput = %mod_path.display(), size = payload.len(), "Modifying data");
        pipeline = pipeline.replacement(Replacement {
            name: file_stem(mod_path),
            payload,
        });
    }

    let conversion = match pipeline.convert(&document)? {
        Outcome::NothingToDo { skipped } => {
            error!(skipped = skipped.len(), "No datasets found, exiting");
            return Ok(());
        }
        Outcome::Converted(conversion) => conversion,
    };

    let target = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(conversion.mode().default_file_name(&input_name)));

    let written = if target.as_os_str() == "-" {
        let stdout = std::io::stdout();
        conversion.emit(&mut stdout.lock())?
    } else {
        let file = File::create(&target)
            .with_context(|| format!("Failed to create output file: {}", target.display()))?;
        let mut writer = BufWriter::new(file);
        let written = conversion.emit(&mut writer)?;
        writer.flush()?;
        written
    };

    match (conversion.mode(), conversion.checksum()) {
        (OutputMode::Raw, _) => {
            info!(output = %target.display(), bytes = written, "Exported RAW binary file");
        }
        (OutputMode::VcpModified { .. }, Some(crc)) => {
            info!(
                output = %target.display(),
                crc = %format!("0x{crc:08x}"),
                "Exported modified VCP XML file"
            );
        }
        (OutputMode::VcpModified { .. }, None) => {
            info!(output = %target.display(), "Exported modified VCP XML file");
        }
        (OutputMode::Vcp, _) => {
            info!(output = %target.display(), "Exported VCP XML file");
        }
    }

    info!("Conversion completed successfully");
    Ok(())
}

// =============================== HELPER FUNCTIONS ===============================

/// File name without directories and extension
fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
