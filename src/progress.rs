//! Parser for yt-dlp's line-oriented console output
//!
//! yt-dlp has no machine-readable progress channel in the mode we run it in,
//! so the orchestrator feeds every output line through [`parse`] and acts on
//! the result. Recognised shapes:
//!
//! ```text
//! [download] Destination: downloads/Some title.f140.m4a
//! [download]  42.0% of 10.00MiB at  1.00MiB/s ETA 00:05
//! [Merger] Merging formats into "downloads/Some title.mp4"
//! ```
//!
//! Anything else, including malformed progress lines, yields no signal at all.

use crate::types::{Phase, StreamKind};

const DESTINATION_MARKER: &str = "[download] Destination:";
const PROGRESS_MARKER: &str = "[download]";
const MERGE_MARKERS: [&str; 2] = ["[Merger]", "Merging"];

const AUDIO_EXTENSIONS: [&str; 3] = [".m4a", ".webm", ".opus"];
const VIDEO_EXTENSIONS: [&str; 2] = [".mp4", ".webm"];

/// One signal carried by an output line
#[derive(Clone, Debug, PartialEq)]
pub enum ParseResult {
    /// A destination line announced a different kind of track
    StreamKindChanged(StreamKind),
    /// yt-dlp entered a new phase (currently only merging)
    PhaseChanged(Phase),
    /// Percent progress, with whichever companion tokens were present
    Progress {
        /// Percent complete in `0.0..=100.0`
        percent: f64,
        /// Token after `of`
        total_size: Option<String>,
        /// Token after `at`
        speed: Option<String>,
        /// Token after `ETA`
        eta: Option<String>,
    },
}

/// Interpret one line of output given the currently active stream kind
///
/// Returns the line's signals in the order they should be acted on; an empty
/// vector means the line carries no event. A destination line may report a
/// stream-kind change and a merge at once (the kind comes first). Progress is
/// only read from lines that are neither destination nor merge lines.
pub fn parse(line: &str, current: StreamKind) -> Vec<ParseResult> {
    let mut signals = Vec::new();

    let kind = detect_stream_kind(line);
    if let Some(kind) = kind.filter(|kind| *kind != current) {
        signals.push(ParseResult::StreamKindChanged(kind));
    }

    if MERGE_MARKERS.iter().any(|m| line.contains(m)) {
        signals.push(ParseResult::PhaseChanged(Phase::Merging));
    } else if kind.is_none() {
        signals.extend(parse_progress(line));
    }

    signals
}

/// Classify a destination line; `None` if the line is not one
pub fn detect_stream_kind(line: &str) -> Option<StreamKind> {
    if !line.contains(DESTINATION_MARKER) {
        return None;
    }

    let lower = line.to_lowercase();
    // .webm is ambiguous; audio wins because it is checked first
    let kind = if AUDIO_EXTENSIONS.iter().any(|ext| lower.contains(ext)) || lower.contains("audio")
    {
        StreamKind::Audio
    } else if VIDEO_EXTENSIONS.iter().any(|ext| lower.contains(ext)) || lower.contains("video") {
        StreamKind::Video
    } else {
        StreamKind::Unknown
    };
    Some(kind)
}

fn parse_progress(line: &str) -> Option<ParseResult> {
    if !line.contains(PROGRESS_MARKER) || !line.contains('%') {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let percent: f64 = tokens.get(1)?.trim_end_matches('%').parse().ok()?;
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return None;
    }

    Some(ParseResult::Progress {
        percent,
        total_size: token_after(&tokens, "of"),
        speed: token_after(&tokens, "at"),
        eta: token_after(&tokens, "ETA"),
    })
}

fn token_after(tokens: &[&str], key: &str) -> Option<String> {
    let idx = tokens.iter().position(|t| *t == key)?;
    tokens.get(idx + 1).map(|t| t.to_string())
}
