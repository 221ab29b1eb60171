//! CVS/RCS keyword expansion and unexpansion (`$Id$`, `$Log$`, etc.), applied
//! to checked-out fulltext before it reaches the CheckoutStore and undone
//! before deltas are computed against stored deltas, so that stored delta
//! text is keyword-free and stable regardless of expansion mode at checkout
//! time.
//!
//! `$Log$` expansion itself (rewriting the keyword into an accumulated
//! commit-log block) is out of scope; occurrences are substituted with a
//! fixed sentinel like every other unsupported keyword value.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::bytes::Regex;

const UNSUPPORTED_SENTINEL: &str = "not supported";

/// Whether keyword substitution should leave values expanded, strip them to
/// bare `$Keyword$` markers, or suppress them (`-kv`, `-kk`, `-ko` in `co(1)`
/// terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// `$Keyword: value $` — the default.
    Expand,
    /// `$Keyword$` — value stripped, marker kept.
    NameOnly,
    /// Keywords passed through untouched.
    Binary,
}

/// Which `$Date$` rendering to use. CVS switched its default format at
/// 1.12; `Legacy` keeps the slash-separated form some older checkouts still
/// expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    Default,
    Legacy,
}

impl DateStyle {
    fn format_str(self) -> &'static str {
        match self {
            DateStyle::Default => "%Y-%m-%d %H:%M:%S",
            DateStyle::Legacy => "%Y/%m/%d %H:%M:%S",
        }
    }
}

/// Everything a keyword substitution needs to know about the revision whose
/// text is being produced, independent of the RCS delta machinery itself.
#[derive(Debug, Clone)]
pub struct RevisionMetadata {
    pub revision: String,
    /// `basename,v` — the bare RCS filename, no path.
    pub rcs_basename: String,
    /// `<repo_root>/<module><file_cvs_path>,v` — full path as CVS would
    /// render it for `$Source$`.
    pub source_path: String,
    pub author: String,
    pub state: String,
    pub timestamp: DateTime<Utc>,
}

lazy_static! {
    static ref KEYWORD_RE: Regex =
        Regex::new(r"(?s)\$(Author|Date|Header|Id|Locker|Log|Name|RCSfile|Revision|Source|State)(:[^$\n]*)?\$")
            .expect("static keyword regex must compile");
}

/// Expands and unexpands RCS keyword strings in checked-out file content.
pub struct KeywordExpander {
    mode: FileMode,
    date_style: DateStyle,
}

impl KeywordExpander {
    pub fn new(mode: FileMode) -> Self {
        Self { mode, date_style: DateStyle::Default }
    }

    pub fn with_date_style(mode: FileMode, date_style: DateStyle) -> Self {
        Self { mode, date_style }
    }

    /// Rewrites every recognized `$Keyword$` / `$Keyword: ... $` occurrence
    /// in `text` according to this expander's mode and the given revision
    /// metadata. A no-op in `Binary` mode.
    pub fn substitute(&self, text: &[u8], metadata: &RevisionMetadata) -> Vec<u8> {
        if self.mode == FileMode::Binary {
            return text.to_vec();
        }
        KEYWORD_RE
            .replace_all(text, |caps: &regex::bytes::Captures| {
                let keyword = std::str::from_utf8(&caps[1]).unwrap_or("");
                match self.mode {
                    FileMode::NameOnly => format!("${}$", keyword).into_bytes(),
                    FileMode::Expand => {
                        format!("${}: {} $", keyword, self.expand(keyword, metadata)).into_bytes()
                    }
                    FileMode::Binary => unreachable!(),
                }
            })
            .into_owned()
    }

    /// Strips all keyword values back down to bare `$Keyword$` markers,
    /// regardless of this expander's own mode. Applied before computing a
    /// delta against stored text, so stored deltas never embed a prior
    /// checkout's expanded values.
    pub fn unexpand(text: &[u8]) -> Vec<u8> {
        KEYWORD_RE
            .replace_all(text, |caps: &regex::bytes::Captures| {
                format!("${}$", std::str::from_utf8(&caps[1]).unwrap_or("")).into_bytes()
            })
            .into_owned()
    }

    fn expand(&self, keyword: &str, metadata: &RevisionMetadata) -> String {
        let date = metadata.timestamp.format(self.date_style.format_str()).to_string();
        match keyword {
            "Author" => metadata.author.clone(),
            "Date" => date,
            "Header" => format!(
                "{} {} {} {} {}",
                metadata.source_path, metadata.revision, date, metadata.author, metadata.state,
            ),
            "Id" => format!(
                "{} {} {} {} {}",
                metadata.rcs_basename, metadata.revision, date, metadata.author, metadata.state,
            ),
            "Locker" => String::new(),
            "Log" | "Name" => UNSUPPORTED_SENTINEL.to_string(),
            "RCSfile" => metadata.rcs_basename.clone(),
            "Revision" => metadata.revision.clone(),
            "Source" => metadata.source_path.clone(),
            "State" => metadata.state.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_metadata() -> RevisionMetadata {
        RevisionMetadata {
            revision: "1.3".to_string(),
            rcs_basename: "file.c,v".to_string(),
            source_path: "/cvsroot/module/file.c,v".to_string(),
            author: "jdoe".to_string(),
            state: "Exp".to_string(),
            timestamp: Utc.ymd(2004, 3, 2).and_hms(10, 30, 0),
        }
    }

    #[test]
    fn expand_mode_fills_in_id_keyword() {
        let expander = KeywordExpander::new(FileMode::Expand);
        let out = expander.substitute(b"prefix $Id$ suffix", &sample_metadata());
        assert_eq!(out, b"prefix $Id: file.c,v 1.3 2004-03-02 10:30:00 jdoe Exp $ suffix".to_vec());
    }

    #[test]
    fn legacy_date_style_uses_slash_format() {
        let expander = KeywordExpander::with_date_style(FileMode::Expand, DateStyle::Legacy);
        let out = expander.substitute(b"$Date$", &sample_metadata());
        assert_eq!(out, b"$Date: 2004/03/02 10:30:00 $".to_vec());
    }

    #[test]
    fn header_uses_source_path_not_basename() {
        let expander = KeywordExpander::new(FileMode::Expand);
        let out = expander.substitute(b"$Header$", &sample_metadata());
        assert_eq!(
            out,
            b"$Header: /cvsroot/module/file.c,v 1.3 2004-03-02 10:30:00 jdoe Exp $".to_vec()
        );
    }

    #[test]
    fn log_and_name_substitute_fixed_sentinel() {
        let expander = KeywordExpander::new(FileMode::Expand);
        assert_eq!(expander.substitute(b"$Log$", &sample_metadata()), b"$Log: not supported $".to_vec());
        assert_eq!(expander.substitute(b"$Name$", &sample_metadata()), b"$Name: not supported $".to_vec());
    }

    #[test]
    fn name_only_mode_strips_value() {
        let expander = KeywordExpander::new(FileMode::NameOnly);
        let out = expander.substitute(b"$Id: file.c,v 1.2 2004/01/01 00:00:00 jdoe Exp $", &sample_metadata());
        assert_eq!(out, b"$Id$".to_vec());
    }

    #[test]
    fn unexpand_strips_regardless_of_keyword() {
        let out = KeywordExpander::unexpand(b"$Revision: 1.9 $ and $Author: jdoe $");
        assert_eq!(out, b"$Revision$ and $Author$".to_vec());
    }

    #[test]
    fn binary_mode_leaves_text_untouched() {
        let expander = KeywordExpander::new(FileMode::Binary);
        let out = expander.substitute(b"$Id: stays as-is $", &sample_metadata());
        assert_eq!(out, b"$Id: stays as-is $".to_vec());
    }
}
