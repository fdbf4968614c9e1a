//! Structured report produced at the end of every agent run.

use logan_core::{normalize_label, LlmError, Message, ModelGateway};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the four fixed report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportSection {
    Conclusion,
    RootCause,
    Timestamp,
    SuggestedFix,
}

impl ReportSection {
    pub const ALL: [ReportSection; 4] = [
        ReportSection::Conclusion,
        ReportSection::RootCause,
        ReportSection::Timestamp,
        ReportSection::SuggestedFix,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ReportSection::Conclusion => "Conclusion",
            ReportSection::RootCause => "Root Cause",
            ReportSection::Timestamp => "Timestamp",
            ReportSection::SuggestedFix => "Suggested Fix",
        }
    }

    /// Map a free-form section name onto a report section.
    ///
    /// ```
    /// use logan_log_agent::ReportSection;
    ///
    /// assert_eq!(ReportSection::from_name("root cause"), Some(ReportSection::RootCause));
    /// assert_eq!(ReportSection::from_name("Fix"), Some(ReportSection::SuggestedFix));
    /// assert_eq!(ReportSection::from_name("severity"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match normalize_label(name).as_str() {
            "conclusion" | "summary" | "finding" | "findings" => Some(ReportSection::Conclusion),
            "root_cause" | "cause" => Some(ReportSection::RootCause),
            "timestamp" | "time" | "when" => Some(ReportSection::Timestamp),
            "suggested_fix" | "fix" | "solution" | "recommendation" | "remediation" => {
                Some(ReportSection::SuggestedFix)
            }
            _ => None,
        }
    }
}

/// Header spellings recognized in model output, longest first so that
/// `timestamp` wins over `time`.
const HEADER_LABELS: &[(&str, ReportSection)] = &[
    ("recommendation", ReportSection::SuggestedFix),
    ("suggested fix", ReportSection::SuggestedFix),
    ("suggested_fix", ReportSection::SuggestedFix),
    ("conclusion", ReportSection::Conclusion),
    ("root cause", ReportSection::RootCause),
    ("root_cause", ReportSection::RootCause),
    ("timestamp", ReportSection::Timestamp),
    ("summary", ReportSection::Conclusion),
    ("time", ReportSection::Timestamp),
    ("fix", ReportSection::SuggestedFix),
];

/// Short labels that also occur as ordinary prose (`Time: 10:23 ...`).
/// Once a section is open they only start a new one when decorated.
const SHORT_ALIASES: &[&str] = &["summary", "time", "fix"];

/// The final, fixed-structure answer of a run.
///
/// All four fields are always present; a section the model did not write is
/// an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub conclusion: String,
    pub root_cause: String,
    pub timestamp: String,
    pub suggested_fix: String,
    /// Unparsed synthesis output
    pub raw: String,
}

/// The synthesis output had no recognizable section header.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportParseError {
    #[error("no report section headers found")]
    NoSections,
}

impl Report {
    /// Parse section headers out of `text`.
    ///
    /// Headers are matched case-insensitively and may be decorated with
    /// markdown (`## Root Cause`, `**Root Cause:**`, `- Root Cause:`).
    /// Content may follow the colon on the same line or on the lines below.
    pub fn parse(text: &str) -> Result<Self, ReportParseError> {
        let mut sections: [Vec<&str>; 4] = Default::default();
        let mut current: Option<ReportSection> = None;
        let mut found = false;

        for line in text.lines() {
            let header = parse_header(line)
                .filter(|h| current.is_none() || h.decorated || !h.short_alias);
            if let Some(header) = header {
                found = true;
                current = Some(header.section);
                if !header.inline.is_empty() {
                    sections[slot(header.section)].push(header.inline);
                }
            } else if let Some(section) = current {
                sections[slot(section)].push(line);
            }
        }

        if !found {
            return Err(ReportParseError::NoSections);
        }

        let join = |lines: &[&str]| lines.join("\n").trim().to_string();
        Ok(Self {
            conclusion: join(&sections[slot(ReportSection::Conclusion)]),
            root_cause: join(&sections[slot(ReportSection::RootCause)]),
            timestamp: join(&sections[slot(ReportSection::Timestamp)]),
            suggested_fix: join(&sections[slot(ReportSection::SuggestedFix)]),
            raw: text.to_string(),
        })
    }

    /// Parse `text`, falling back to putting all of it in `conclusion`.
    pub fn from_text(text: &str) -> Self {
        Self::parse(text).unwrap_or_else(|e| {
            log::debug!("Report parse fell back to conclusion-only: {}", e);
            Self {
                conclusion: text.trim().to_string(),
                raw: text.to_string(),
                ..Default::default()
            }
        })
    }

    pub fn section(&self, section: ReportSection) -> &str {
        match section {
            ReportSection::Conclusion => &self.conclusion,
            ReportSection::RootCause => &self.root_cause,
            ReportSection::Timestamp => &self.timestamp,
            ReportSection::SuggestedFix => &self.suggested_fix,
        }
    }

    /// Text searched by substring evaluators: the raw output, or the
    /// rendered sections when there is no raw text.
    pub fn full_text(&self) -> String {
        if !self.raw.trim().is_empty() {
            return self.raw.clone();
        }
        ReportSection::ALL
            .iter()
            .map(|s| format!("{}: {}", s.title(), self.section(*s)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn slot(section: ReportSection) -> usize {
    match section {
        ReportSection::Conclusion => 0,
        ReportSection::RootCause => 1,
        ReportSection::Timestamp => 2,
        ReportSection::SuggestedFix => 3,
    }
}

const DECORATION: &[char] = &['*', '_', '`'];

/// A section header found on one line.
#[derive(Debug, PartialEq, Eq)]
struct Header<'a> {
    section: ReportSection,
    /// Content after the colon on the same line
    inline: &'a str,
    /// Markdown heading, list marker or emphasis around the label
    decorated: bool,
    short_alias: bool,
}

fn parse_header(line: &str) -> Option<Header<'_>> {
    let trimmed = line.trim_start();
    let mut s = trimmed
        .trim_start_matches(|c: char| c == '#' || c == '>')
        .trim_start();

    // List markers: "-", "*", "+" followed by a space, or "1." / "1)".
    if let Some(rest) = s
        .strip_prefix("- ")
        .or_else(|| s.strip_prefix("* "))
        .or_else(|| s.strip_prefix("+ "))
    {
        s = rest.trim_start();
    }
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = s[digits..]
            .strip_prefix('.')
            .or_else(|| s[digits..].strip_prefix(')'))
        {
            s = rest.trim_start();
        }
    }
    s = s.trim_start_matches(DECORATION);
    let prefixed = s.len() != trimmed.len();

    for (label, section) in HEADER_LABELS {
        let Some(head) = s.get(..label.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(label) {
            continue;
        }
        let after = &s[label.len()..];
        let rest = after.trim_start_matches(DECORATION);
        let decorated = prefixed || rest.len() != after.len();
        let rest = rest.trim_start();
        let inline = if rest.is_empty() {
            ""
        } else if let Some(inline) = rest.strip_prefix(':') {
            inline.trim_matches(DECORATION).trim()
        } else {
            continue;
        };
        return Some(Header {
            section: *section,
            inline,
            decorated,
            short_alias: SHORT_ALIASES.contains(label),
        });
    }
    None
}

/// Turns a finished transcript into a [`Report`] with one extra model call.
#[derive(Debug, Clone)]
pub struct ReportSynthesizer {
    prompt: String,
}

impl ReportSynthesizer {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// Ask the model for the four-section report and parse it.
    ///
    /// The synthesis prompt and the model's reply are appended to
    /// `transcript`. No tools are offered on this call.
    ///
    /// # Errors
    ///
    /// Only gateway failures; unparseable output falls back to a
    /// conclusion-only report.
    pub async fn synthesize(
        &self,
        gateway: &dyn ModelGateway,
        transcript: &mut Vec<Message>,
        temperature: f32,
    ) -> Result<Report, LlmError> {
        transcript.push(Message::user(self.prompt.clone()));
        let response = gateway.complete(transcript, &[], temperature).await?;
        let report = Report::from_text(&response.content);
        transcript.push(Message::assistant(response.content));
        Ok(report)
    }
}
