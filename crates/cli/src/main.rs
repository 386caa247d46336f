//! Binary entry point for the BCC to SRT converter.

use anyhow::{bail, Result};
use bcc2srt_core::batch::{collect_inputs, convert_batch, decode_source, read_source};
use bcc2srt_core::convert::DEFAULT_DURATION_SECS;
use bcc2srt_core::{convert_with, ConversionError, ConversionResult, ConvertOptions};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line options for the binary.
#[derive(Parser)]
#[command(version, about = "Convert BCC (JSON) subtitles to SRT")]
struct Cli {
    /// Write SRT files into this directory instead of next to each input.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Print the SRT of a single input to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// Seconds added to the start time of entries that have no end time.
    #[arg(long, default_value_t = DEFAULT_DURATION_SECS, value_parser = parse_duration)]
    default_duration: f64,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Enable verbose debug and trace logs.
    #[arg(long)]
    debug: bool,

    /// BCC files or directories to convert. Use `-` to read from stdin.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

/// Application entry point which parses CLI args and performs actions.
/// Logs go to stderr so stdout only carries SRT or JSON output.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::default()
            .add_directive("bcc2srt=trace".parse()?)
            .add_directive("bcc2srt_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("bcc2srt=info".parse()?)
            .add_directive("bcc2srt_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opts = ConvertOptions {
        default_duration: cli.default_duration,
    };
    if reads_stdin(&cli.inputs)? {
        let mut raw = Vec::new();
        tokio::io::stdin().read_to_end(&mut raw).await?;
        let text = decode_source(&raw);
        let result = report_failure(convert_with(text.as_str(), &opts))?;
        return print_result(&result, cli.json);
    }

    let inputs = collect_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        bail!("no .bcc, .json or .txt files found");
    }
    if cli.stdout {
        if inputs.len() != 1 {
            bail!("--stdout needs exactly one input file, got {}", inputs.len());
        }
        let text = read_source(&inputs[0]).await?;
        let result = report_failure(convert_with(text.as_str(), &opts))?;
        info!("converted {} entries from {}", result.entry_count, inputs[0].display());
        return print_result(&result, cli.json);
    }

    let report = convert_batch(&inputs, cli.out_dir.as_deref(), opts).await;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json()?)?);
    }
    if report.failed() > 0 {
        bail!("{}", report.summary());
    }
    Ok(())
}

/// Accept only finite, non-negative seconds.
fn parse_duration(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("expected a finite, non-negative number of seconds, got {raw}"));
    }
    Ok(secs)
}

/// Whether the inputs ask for stdin; `-` cannot be mixed with paths.
fn reads_stdin(inputs: &[PathBuf]) -> Result<bool> {
    let stdin = Path::new("-");
    if !inputs.iter().any(|p| p == stdin) {
        return Ok(false);
    }
    if inputs.len() > 1 {
        bail!("`-` (stdin) cannot be combined with other inputs");
    }
    Ok(true)
}

/// Log parser detail before handing the error back.
fn report_failure(
    res: Result<ConversionResult, ConversionError>,
) -> Result<ConversionResult, ConversionError> {
    if let Err(err) = &res {
        if let Some(diag) = err.diagnostic() {
            error!("{diag}");
        }
    }
    res
}

fn print_result(result: &ConversionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", result.content);
    }
    Ok(())
}
