//! Compiled patterns shared by the Issue Linker and Command Dispatcher.
//!
//! Centralizing these here, rather than inlining `Regex::new` calls at each
//! call site, means the patterns are compiled once per process.

use lazy_static::lazy_static;
use regex::Regex;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Default cap on a forge status check's summary text (spec §9, "the exact
/// numeric cap ... is forge-dependent ... defaulting to the minimum
/// commonly supported (~65 KB)").
pub const DEFAULT_CHECK_SUMMARY_CAP_BYTES: usize = 65 * 1024;

lazy_static! {
    /// A bare numeric PR title, e.g. `1234`.
    pub static ref BARE_NUMERIC_ID_REGEX: Regex =
        Regex::new(r"^\s*(\d+)\s*$").expect("failed to compile bare numeric id regex");

    /// An explicit `<PROJECT>-<id>` PR title.
    pub static ref PROJECT_PREFIXED_ID_REGEX: Regex =
        Regex::new(r"^\s*([A-Z][A-Z0-9]*)-(\d+)\b").expect("failed to compile project-prefixed id regex");

    /// A canonical `<numeric-id>: <title>` PR title, already normalized.
    pub static ref CANONICAL_TITLE_REGEX: Regex =
        Regex::new(r"^(\d+):\s*(.+)$").expect("failed to compile canonical title regex");

    /// Separator variants collapsed after the leading id during title
    /// canonicalization: `": "`, `" - "`, `"  "`, NBSP.
    pub static ref TITLE_SEPARATOR_REGEX: Regex =
        Regex::new(r"^(\d+)[\s\u{00A0}]*(?::|-)?[\s\u{00A0}]+(.*)$")
            .expect("failed to compile title separator regex");

    /// A `Merge [<source>:]<branch>` PR title.
    pub static ref MERGE_TITLE_REGEX: Regex =
        Regex::new(r"^Merge\s+(?:([\w./-]+):)?([\w./-]+)\s*$")
            .expect("failed to compile merge title regex");

    /// A `Backport <hash-or-id>` PR title.
    pub static ref BACKPORT_TITLE_REGEX: Regex =
        Regex::new(r"^Backport\s+([0-9a-fA-F]{7,40}|[A-Z][A-Z0-9]*-\d+)\s*$")
            .expect("failed to compile backport title regex");

    /// A leading `/<verb> ...` command line.
    pub static ref COMMAND_LINE_REGEX: Regex =
        Regex::new(r"(?m)^/(\w+)(?:\s+(.*))?$").expect("failed to compile command line regex");
}

/// The marker line delimiting user prose from the bot's auto-maintained
/// body sections.
pub const AUTO_SECTION_MARKER: &str =
    "<!-- Anything below this marker will be automatically updated -->";
