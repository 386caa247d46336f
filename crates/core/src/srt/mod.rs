//! This module is responsible for rendering SubRip output.
//! It turns resolved entries into numbered blocks and can read them back.

use crate::bcc::BccEntry;
use crate::error::BccError;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Represents a single SRT block (index, time range, text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrtBlock {
    pub index: u32,
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
}

/// Build numbered blocks from entries that are already sorted.
/// Indices restart at 1 and skip nothing, even when entries are dropped.
pub fn serialize(entries: &[BccEntry]) -> Result<Vec<SrtBlock>, BccError> {
    trace!("serialize entries={}", entries.len());
    let mut blocks = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.text.is_empty() {
            debug!("serialize: skipping entry at {}s with empty text", entry.start);
            continue;
        }
        blocks.push(SrtBlock {
            index: blocks.len() as u32 + 1,
            start_ms: seconds_to_millis(entry.start),
            end_ms: seconds_to_millis(entry.end),
            text: entry.text.clone(),
        });
    }
    if blocks.is_empty() {
        return Err(BccError::NoEntries);
    }
    Ok(blocks)
}

/// Format SRT blocks to text.
/// Each block is the index, the time line, the text verbatim and a blank line.
pub fn format(blocks: &[SrtBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            block.index,
            format_millis(block.start_ms),
            format_millis(block.end_ms),
            block.text
        ));
    }
    out
}

/// Parse SRT text into a list of blocks.
/// Multi-line text is joined with `\n`.
pub fn parse(input: &str) -> Result<Vec<SrtBlock>> {
    let mut blocks = Vec::new();
    let mut lines = input.lines();
    loop {
        let index_line = match lines.next() {
            Some(l) if !l.trim().is_empty() => l.trim(),
            Some(_) => continue,
            None => break,
        };
        let index: u32 = index_line.parse()?;
        let time_line = lines.next().ok_or_else(|| anyhow!("missing time"))?;
        let (start_ms, end_ms) = parse_times(time_line)?;
        let mut text = Vec::new();
        for line in lines.by_ref() {
            if line.trim().is_empty() {
                break;
            }
            text.push(line);
        }
        blocks.push(SrtBlock {
            index,
            start_ms,
            end_ms,
            text: text.join("\n"),
        });
    }
    Ok(blocks)
}

/// Round fractional seconds to whole milliseconds, keeping the sign.
/// Rounding happens once on the full value, so `59.9995` becomes `60000`.
pub fn seconds_to_millis(seconds: f64) -> i64 {
    let ms = (seconds.abs() * 1000.0).round() as i64;
    if seconds < 0.0 {
        -ms
    } else {
        ms
    }
}

/// Format seconds as `HH:MM:SS,mmm`.
pub fn format_timestamp(seconds: f64) -> String {
    format_millis(seconds_to_millis(seconds))
}

/// Format milliseconds as `HH:MM:SS,mmm`, with a leading `-` when negative.
/// Hours widen past two digits instead of wrapping.
pub fn format_millis(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let ms = ms.unsigned_abs();
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let ms = ms % 1000;
    format!("{sign}{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Parse a time range like `00:00:01,000 --> 00:00:02,000` to milliseconds.
fn parse_times(line: &str) -> Result<(i64, i64)> {
    let mut parts = line.split(" --> ");
    let start = parts.next().ok_or_else(|| anyhow!("no start"))?;
    let end = parts.next().ok_or_else(|| anyhow!("no end"))?;
    Ok((parse_time(start.trim())?, parse_time(end.trim())?))
}

/// Parse `HH:MM:SS,mmm` (optionally prefixed with `-`) into milliseconds.
fn parse_time(t: &str) -> Result<i64> {
    let (negative, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let parts: Vec<&str> = t.split([':', ',']).collect();
    if parts.len() != 4 {
        return Err(anyhow!("bad time"));
    }
    let h: i64 = parts[0].parse()?;
    let m: i64 = parts[1].parse()?;
    let s: i64 = parts[2].parse()?;
    let ms: i64 = parts[3].parse()?;
    let total = ((h * 60 + m) * 60 + s) * 1000 + ms;
    Ok(if negative { -total } else { total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: f64, end: f64, text: &str) -> BccEntry {
        BccEntry {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn formats_basic_timestamps() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(0.5), "00:00:00,500");
        assert_eq!(format_timestamp(7.12), "00:00:07,120");
        assert_eq!(format_timestamp(3723.004), "01:02:03,004");
    }

    #[test]
    fn rounding_carries_into_larger_fields() {
        assert_eq!(format_timestamp(59.9995), "00:01:00,000");
        assert_eq!(format_timestamp(3599.9996), "01:00:00,000");
        assert_eq!(format_timestamp(1.9996), "00:00:02,000");
    }

    #[test]
    fn negative_times_keep_sign() {
        assert_eq!(format_timestamp(-1.5), "-00:00:01,500");
        assert_eq!(format_timestamp(-3600.0), "-01:00:00,000");
    }

    #[test]
    fn hours_widen_past_two_digits() {
        assert_eq!(format_timestamp(360_000.0), "100:00:00,000");
    }

    #[test]
    fn timestamps_reparse_within_a_millisecond() {
        let mut s = 0.0;
        while s < 86_400.0 {
            let ms = parse_time(&format_timestamp(s)).unwrap();
            assert!((ms as f64 / 1000.0 - s).abs() <= 0.001, "s={s}");
            s += 1234.5678;
        }
        for s in [0.0004, 0.0005, 59.9995, 86_399.999] {
            let ms = parse_time(&format_timestamp(s)).unwrap();
            assert!((ms as f64 / 1000.0 - s).abs() <= 0.001, "s={s}");
        }
    }

    #[test]
    fn serialize_renumbers_and_skips_empty_text() {
        let blocks = serialize(&[entry(0.0, 1.0, "a"), entry(1.0, 2.0, ""), entry(2.0, 3.0, "c")])
            .unwrap();
        let indices: Vec<u32> = blocks.iter().map(|b| b.index).collect();
        assert_eq!(indices, [1, 2]);
        assert_eq!(blocks[1].text, "c");
        assert_eq!(blocks[1].start_ms, 2000);
    }

    #[test]
    fn serialize_without_text_fails() {
        let err = serialize(&[entry(0.0, 1.0, "")]).unwrap_err();
        assert!(matches!(err, BccError::NoEntries));
        assert!(matches!(serialize(&[]), Err(BccError::NoEntries)));
    }

    #[test]
    fn format_writes_text_verbatim() {
        let blocks = serialize(&[entry(1.0, 2.0, "line one\nline <b>two</b>")]).unwrap();
        assert_eq!(
            format(&blocks),
            "1\n00:00:01,000 --> 00:00:02,000\nline one\nline <b>two</b>\n\n"
        );
    }

    #[test]
    fn parse_reads_back_formatted_blocks() {
        let input = "1\n-00:00:01,000 --> 00:00:01,000\nHello\nthere\n\n";
        let blocks = parse(input).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_ms, -1000);
        assert_eq!(blocks[0].text, "Hello\nthere");
        assert_eq!(format(&blocks), input);
    }
}
