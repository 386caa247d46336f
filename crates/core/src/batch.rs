//! File and folder conversion.
//! This module finds BCC files, converts each one independently and writes
//! the SRT output next to the input or into an output directory.

use crate::convert::{convert_with, ConvertOptions};
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

/// Extensions picked up when scanning a directory.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["bcc", "json", "txt"];

/// Summary of one file written to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConversion {
    pub input: PathBuf,
    pub output: PathBuf,
    pub entry_count: usize,
    /// Size of the written SRT in bytes.
    pub size: u64,
}

/// Result for one input of a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<FileConversion>,
}

/// Per-file outcomes, in the order the inputs were given.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// One-line tally such as `3 succeeded, 1 failed`.
    pub fn summary(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded(), self.failed())
    }

    /// Machine-readable form of the report.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let mut files = Vec::with_capacity(self.outcomes.len());
        for o in &self.outcomes {
            let file = match &o.result {
                Ok(done) => {
                    let mut value = serde_json::to_value(done)?;
                    value["success"] = Value::Bool(true);
                    value
                }
                Err(err) => json!({
                    "input": o.input,
                    "success": false,
                    "error": format!("{err:#}"),
                }),
            };
            files.push(file);
        }
        Ok(json!({
            "succeeded": self.succeeded(),
            "failed": self.failed(),
            "files": files,
        }))
    }
}

/// Whether `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Expand `paths` into the list of files to convert.
/// Files are kept as given; directories are walked recursively and only
/// supported files are taken from them.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    trace!("collect_inputs paths={}", paths.len());
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path) {
            let entry = entry.with_context(|| format!("scanning {}", path.display()))?;
            if entry.file_type().is_file() && is_supported(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    debug!("collect_inputs found {} files", files.len());
    Ok(files)
}

/// Output location for `input`: its stem with an `.srt` extension, beside
/// the input or inside `out_dir`.
pub fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let name = format!(
        "{}.srt",
        input.file_stem().unwrap_or_default().to_string_lossy()
    );
    match out_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

/// Decode raw document bytes, tolerating invalid UTF-8 and a leading BOM.
pub fn decode_source(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text: &str = &text;
    text.strip_prefix('\u{feff}').unwrap_or(text).to_string()
}

/// Read a BCC file as text, see [`decode_source`].
pub async fn read_source(input: &Path) -> Result<String> {
    let raw = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    Ok(decode_source(&raw))
}

/// Convert a single file and write the SRT next to it (or into `out_dir`).
pub async fn convert_file(
    input: &Path,
    out_dir: Option<&Path>,
    opts: &ConvertOptions,
) -> Result<FileConversion> {
    trace!("convert_file input={}", input.display());
    let output = output_path(input, out_dir);
    if output == input {
        bail!("refusing to overwrite input {}", input.display());
    }
    let text = read_source(input).await?;
    let result = convert_with(&text, opts)?;
    if let Some(dir) = out_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    tokio::fs::write(&output, &result.content)
        .await
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(FileConversion {
        input: input.to_path_buf(),
        output,
        entry_count: result.entry_count,
        size: result.content.len() as u64,
    })
}

/// Positions of inputs whose output path is shared with another input,
/// mapped to the contested output.
fn colliding_outputs(inputs: &[PathBuf], out_dir: Option<&Path>) -> BTreeMap<usize, PathBuf> {
    let mut by_output: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    for (pos, input) in inputs.iter().enumerate() {
        by_output
            .entry(output_path(input, out_dir))
            .or_default()
            .push(pos);
    }
    by_output
        .into_iter()
        .filter(|(_, positions)| positions.len() > 1)
        .flat_map(|(output, positions)| positions.into_iter().map(move |p| (p, output.clone())))
        .collect()
}

/// Convert every input in its own task.
/// A failing file is recorded in the report and never stops its siblings.
/// Inputs that would write the same output file all fail without writing.
pub async fn convert_batch(
    inputs: &[PathBuf],
    out_dir: Option<&Path>,
    opts: ConvertOptions,
) -> BatchReport {
    trace!("convert_batch inputs={}", inputs.len());
    let total = inputs.len();
    let mut collisions = colliding_outputs(inputs, out_dir);
    let (tx, mut rx) = mpsc::channel(total.max(1));
    for (pos, input) in inputs.iter().enumerate() {
        if let Some(output) = collisions.remove(&pos) {
            let res = Err(anyhow!(
                "output {} is shared with another input; convert these files separately",
                output.display()
            ));
            // capacity covers every input, so this never waits
            let _ = tx.try_send((pos, res));
            continue;
        }
        let tx = tx.clone();
        let input = input.clone();
        let out_dir = out_dir.map(Path::to_path_buf);
        tokio::spawn(async move {
            let res = convert_file(&input, out_dir.as_deref(), &opts).await;
            let _ = tx.send((pos, res)).await;
        });
    }
    drop(tx);

    let mut finished: BTreeMap<usize, Result<FileConversion>> = BTreeMap::new();
    while let Some((pos, res)) = rx.recv().await {
        let input = &inputs[pos];
        match &res {
            Ok(done) => info!(
                "converted {} -> {} ({} entries, {})",
                input.display(),
                done.output.display(),
                done.entry_count,
                format_file_size(done.size)
            ),
            Err(err) => warn!("failed {}: {err:#}", input.display()),
        }
        finished.insert(pos, res);
        debug!("progress {}/{}", finished.len(), total);
    }

    let outcomes = inputs
        .iter()
        .enumerate()
        .map(|(pos, input)| FileOutcome {
            input: input.clone(),
            result: finished
                .remove(&pos)
                .unwrap_or_else(|| Err(anyhow!("conversion task aborted"))),
        })
        .collect();
    let report = BatchReport { outcomes };
    info!("batch finished: {}", report.summary());
    report
}

/// Format a byte count as a short human-readable size, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[unit])
}
