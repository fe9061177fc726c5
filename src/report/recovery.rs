//! Recovery of a JSON object from raw model output.
//!
//! Three tiers are tried in order: a strict parse of the text as-is, a strict
//! parse of the `{...}` block left after stripping code fences and prose, and
//! finally a repair of truncated output that cuts back to the last complete
//! element and closes every bracket still open.

use regex::Regex;
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTier {
    Direct,
    Extracted,
    Repaired,
}

impl RecoveryTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryTier::Direct => "direct",
            RecoveryTier::Extracted => "extracted",
            RecoveryTier::Repaired => "repaired",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recovered {
    /// Always a JSON object carrying `is_car`, `notes` and `parts`.
    pub value: Value,
    pub tier: RecoveryTier,
}

#[derive(Debug, Error)]
#[error("model output is not recoverable JSON: {reason}")]
pub struct UnrecoverableFormat {
    pub reason: String,
    /// Leading slice of the raw model text, for diagnostics.
    pub excerpt: String,
}

impl UnrecoverableFormat {
    pub fn new(raw: &str, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
        }
    }
}

pub fn recover(raw: &str) -> Result<Recovered, UnrecoverableFormat> {
    let (map, tier) = recover_object(raw)?;

    match tier {
        RecoveryTier::Direct => debug!("Model output parsed directly"),
        RecoveryTier::Extracted => info!("Model output parsed after stripping fences/prose"),
        RecoveryTier::Repaired => warn!(
            "Model output was truncated or malformed; recovered a partial report ({} chars)",
            raw.len()
        ),
    }

    Ok(Recovered {
        value: fill_defaults(map),
        tier,
    })
}

fn recover_object(raw: &str) -> Result<(Map<String, Value>, RecoveryTier), UnrecoverableFormat> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        return Ok((map, RecoveryTier::Direct));
    }

    let candidate = extract_block(raw)
        .ok_or_else(|| UnrecoverableFormat::new(raw, "no JSON object found"))?;

    let parse_error = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => return Ok((map, RecoveryTier::Extracted)),
        Ok(_) => return Err(UnrecoverableFormat::new(raw, "JSON value is not an object")),
        Err(e) => e,
    };

    let cut = error_cut(candidate, &parse_error);
    let repaired = repair_truncated(candidate, cut);

    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(map)) if !map.is_empty() => Ok((map, RecoveryTier::Repaired)),
        Ok(_) => Err(UnrecoverableFormat::new(
            raw,
            format!("{parse_error}; nothing survived repair"),
        )),
        Err(e) => Err(UnrecoverableFormat::new(
            raw,
            format!("{parse_error}; repair attempt failed: {e}"),
        )),
    }
}

fn fill_defaults(mut map: Map<String, Value>) -> Value {
    map.entry("is_car").or_insert(Value::Bool(false));
    map.entry("notes").or_insert_with(|| Value::String(String::new()));
    map.entry("parts").or_insert_with(|| Value::Array(Vec::new()));
    Value::Object(map)
}

fn open_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[A-Za-z0-9_+-]*").unwrap())
}

fn close_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```\s*$").unwrap())
}

/// Strips code fences and returns the text from the first `{` to the last `}`,
/// or to the end when no `}` follows the first `{`.
fn extract_block(raw: &str) -> Option<&str> {
    let mut text = raw.trim();
    if let Some(m) = open_fence().find(text) {
        text = &text[m.end()..];
    }
    if let Some(m) = close_fence().find(text) {
        text = &text[..m.start()];
    }
    let text = text.trim();

    let start = text.find('{')?;
    let end = match text.rfind('}') {
        Some(end) if end > start => end + 1,
        _ => text.len(),
    };
    Some(&text[start..end])
}

/// Byte offset to truncate at, derived from the parser's line/column.
///
/// serde_json counts columns in bytes. On end-of-input errors the position is
/// the end of the text; otherwise the column points one past the offending byte.
fn error_cut(text: &str, err: &serde_json::Error) -> usize {
    if err.classify() == Category::Eof || err.line() == 0 {
        return text.len();
    }

    let line_start: usize = text
        .split_inclusive('\n')
        .take(err.line() - 1)
        .map(str::len)
        .sum();
    let mut cut = (line_start + err.column().saturating_sub(1)).min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Default,
    InString,
    Escaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Opener {
    byte: u8,
    pos: usize,
}

#[derive(Debug)]
struct Scan {
    open: Vec<Opener>,
    state: ScanState,
    /// Position of the opening quote of the most recent string.
    last_string: Option<usize>,
}

/// Tracks unclosed `{`/`[` outside of string literals.
fn scan(text: &str) -> Scan {
    let mut open = Vec::new();
    let mut state = ScanState::Default;
    let mut last_string = None;

    for (i, b) in text.bytes().enumerate() {
        state = match state {
            ScanState::Default => match b {
                b'"' => {
                    last_string = Some(i);
                    ScanState::InString
                }
                b'{' | b'[' => {
                    open.push(Opener { byte: b, pos: i });
                    ScanState::Default
                }
                b'}' | b']' => {
                    open.pop();
                    ScanState::Default
                }
                _ => ScanState::Default,
            },
            ScanState::InString => match b {
                b'\\' => ScanState::Escaped,
                b'"' => ScanState::Default,
                _ => ScanState::InString,
            },
            ScanState::Escaped => ScanState::InString,
        };
    }

    Scan {
        open,
        state,
        last_string,
    }
}

fn repair_truncated(text: &str, cut: usize) -> String {
    let mut work = text[..cut].to_string();
    drop_incomplete_line(&mut work);
    trim_dangling(&mut work);

    let scanned = scan(&work);
    let mut open = scanned.open;

    if let Some(idx) = first_open_element(&open) {
        // Half-written array entry: drop it whole.
        work.truncate(open[idx].pos);
        open.truncate(idx);
        trim_dangling(&mut work);
    } else if scanned.state != ScanState::Default {
        if let Some(start) = scanned.last_string {
            if is_key_position(&work, start, &open) {
                work.truncate(start);
                trim_dangling(&mut work);
            } else {
                if scanned.state == ScanState::Escaped {
                    work.pop();
                }
                work.push('"');
            }
        }
    }

    finish_partial_scalar(&mut work);
    drop_dangling_key(&mut work);

    for opener in open.iter().rev() {
        work.push(if opener.byte == b'{' { '}' } else { ']' });
    }
    work
}

/// Cuts the last line unless it only holds closers and commas.
fn drop_incomplete_line(work: &mut String) {
    if let Some(nl) = work.rfind('\n') {
        let complete = work[nl + 1..]
            .trim()
            .chars()
            .all(|c| matches!(c, '}' | ']' | ','));
        if !complete {
            work.truncate(nl);
        }
    }
}

fn trim_dangling(work: &mut String) {
    loop {
        let trimmed = work.trim_end().len();
        work.truncate(trimmed);
        if work.ends_with(',') {
            work.pop();
        } else {
            break;
        }
    }
}

/// Index of the outermost unclosed object that is itself an array element.
fn first_open_element(open: &[Opener]) -> Option<usize> {
    (1..open.len()).find(|&i| open[i].byte == b'{' && open[i - 1].byte == b'[')
}

fn is_key_position(work: &str, string_start: usize, open: &[Opener]) -> bool {
    let in_object = open.last().map_or(false, |o| o.byte == b'{');
    let before = work[..string_start].trim_end();
    in_object && (before.ends_with('{') || before.ends_with(','))
}

/// Handles a number or literal cut off mid-token, such as `-`, `1e` or `tr`.
/// An unambiguous prefix of `true`, `false` or `null` is completed; anything
/// else that does not parse on its own is removed.
fn finish_partial_scalar(work: &mut String) {
    let start = work
        .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .len();
    if start == work.len() {
        return;
    }
    let before = work[..start].trim_end();
    if !before.ends_with(|c: char| matches!(c, ':' | ',' | '[')) {
        return;
    }

    let token = &work[start..];
    if serde_json::from_str::<Value>(token).is_ok() {
        return;
    }
    let literal = ["true", "false", "null"]
        .into_iter()
        .find(|l| l.starts_with(token));

    work.truncate(start);
    match literal {
        Some(literal) => work.push_str(literal),
        None => trim_dangling(work),
    }
}

/// Removes a trailing `"key":` that never received a value.
fn drop_dangling_key(work: &mut String) {
    if !work.ends_with(':') {
        return;
    }
    work.pop();
    let trimmed = work.trim_end().len();
    work.truncate(trimmed);

    if work.ends_with('"') {
        if let Some(start) = scan(work).last_string {
            work.truncate(start);
        }
    }
    trim_dangling(work);
}
