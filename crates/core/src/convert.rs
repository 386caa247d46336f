//! Top-level BCC to SRT conversion.

use crate::bcc::{self, BccSource};
use crate::error::{BccError, ConversionError};
use crate::srt::{self, SrtBlock};
use serde::Serialize;
use tracing::trace;

/// Seconds added to `start` when an entry carries no end time.
pub const DEFAULT_DURATION_SECS: f64 = 3.0;

/// Tunables for a conversion run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    pub default_duration: f64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_DURATION_SECS,
        }
    }
}

/// Outcome of converting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub content: String,
    pub entry_count: usize,
    pub blocks: Vec<SrtBlock>,
}

/// Convert a BCC document with default options.
pub fn convert<'a>(source: impl Into<BccSource<'a>>) -> Result<ConversionResult, ConversionError> {
    convert_with(source, &ConvertOptions::default())
}

/// Convert a BCC document: normalize, sort by start time, then render SRT.
/// Either the whole document converts or an error is returned.
pub fn convert_with<'a>(
    source: impl Into<BccSource<'a>>,
    opts: &ConvertOptions,
) -> Result<ConversionResult, ConversionError> {
    Ok(run(source.into(), opts)?)
}

fn run(source: BccSource<'_>, opts: &ConvertOptions) -> Result<ConversionResult, BccError> {
    let entries = bcc::normalize(source, opts.default_duration)?;
    let sorted = bcc::sort_entries(&entries);
    let blocks = srt::serialize(&sorted)?;
    let content = srt::format(&blocks);
    trace!("convert: rendered {} blocks", blocks.len());
    Ok(ConversionResult {
        entry_count: blocks.len(),
        content,
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    const SAMPLE: &str = r##"{
        "font_size": 0.4,
        "font_color": "#FFFFFF",
        "body": [
            {"from": 7.12, "to": 8.96, "location": 2, "content": "Welcome back"},
            {"from": 12.45, "to": 15.23, "location": 2, "content": "Today we look at subtitle formats"},
            {"from": 20.1, "to": 23.8, "location": 2, "content": "SRT is the common one"}
        ]
    }"##;

    #[test]
    fn sorts_and_renders_expected_layout() {
        let raw = r#"{"body":[{"from":1,"to":2,"content":"a"},{"from":0,"to":0.5,"content":"b"}]}"#;
        let res = convert(raw).unwrap();
        assert_eq!(
            res.content,
            "1\n00:00:00,000 --> 00:00:00,500\nb\n\n2\n00:00:01,000 --> 00:00:02,000\na\n\n"
        );
        assert_eq!(res.entry_count, 2);
    }

    #[test]
    fn empty_text_is_empty_result_error() {
        let err = convert(r#"{"events":[{"from":5,"content":""}]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
        let err = convert(r#"{"body":[]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
    }

    #[test]
    fn malformed_json_is_format_error() {
        let err = convert("{\"body\": [ {\"from\": 1,").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().starts_with("BCC conversion failed: malformed document"));
        assert!(err.diagnostic().is_some());
        assert_eq!(convert("not json").unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn unknown_layout_is_format_error() {
        let err = convert(r#"{"items":[{"content":"x"}]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.diagnostic().is_none());
    }

    #[test]
    fn alternate_field_names_default_end() {
        let res = convert(r#"{"subtitles":[{"start":10,"text":"x"}]}"#).unwrap();
        assert_eq!(res.content, "1\n00:00:10,000 --> 00:00:13,000\nx\n\n");
    }

    #[test]
    fn accepts_parsed_documents() {
        let doc = json!({"events": [{"from": 2, "to": 3, "text": "parsed"}]});
        let res = convert(&doc).unwrap();
        assert_eq!(res.blocks[0].text, "parsed");
        assert_eq!(res.blocks[0].start_ms, 2000);
    }

    #[test]
    fn custom_default_duration_applies() {
        let opts = ConvertOptions {
            default_duration: 0.5,
        };
        let res = convert_with(r#"{"body":[{"from":1,"content":"x"}]}"#, &opts).unwrap();
        assert_eq!(res.blocks[0].end_ms, 1500);
    }

    #[test]
    fn styling_fields_are_ignored() {
        let res = convert(SAMPLE).unwrap();
        assert_eq!(res.entry_count, 3);
        assert!(res.content.starts_with("1\n00:00:07,120 --> 00:00:08,960\nWelcome back\n\n"));
        assert!(!res.content.contains("location"));
    }

    #[test]
    fn output_blocks_match_retained_entries() {
        let raw = r#"{"body":[
            {"from":9,"content":"i"},
            {"from":3},
            {"from":1,"content":"ii"},
            {"from":5,"text":""},
            {"from":1,"content":"iii"},
            {"from":0.25,"text":"iv"}
        ]}"#;
        let res = convert(raw).unwrap();
        let parsed = srt::parse(&res.content).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed, res.blocks);
        for (i, block) in parsed.iter().enumerate() {
            assert_eq!(block.index as usize, i + 1);
        }
        assert!(parsed.windows(2).all(|w| w[0].start_ms <= w[1].start_ms));
    }

    #[test]
    fn result_serializes_with_camel_case_keys() {
        let res = convert(r#"{"body":[{"from":0,"to":1,"content":"a"}]}"#).unwrap();
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["entryCount"], 1);
        assert_eq!(value["blocks"][0]["endMs"], 1000);
        assert!(value["content"].as_str().unwrap().ends_with("a\n\n"));
    }
}
