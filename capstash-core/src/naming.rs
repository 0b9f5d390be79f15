use time::{OffsetDateTime, UtcOffset};

use crate::config::StashConfig;
use crate::domain::{Millis, Recording};

/// Render `ms` with a token pattern.
///
/// Tokens: `YYYY` year, `MM` month, `DD` day, `hh` hour modulo 12, `mm`
/// minute, `a` AM/PM, and `S` for successive millisecond digits (the first
/// `S` is hundreds, the second tens, the third units). Everything else is
/// copied as is.
pub fn format_timestamp(ms: Millis, pattern: &str, offset: UtcOffset) -> String {
    let dt = OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .to_offset(offset);
    let millis = format!("{:03}", dt.millisecond());
    let mut digits = millis.chars();

    let mut out = String::with_capacity(pattern.len() + 4);
    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        let (text, used) = if rest.starts_with("YYYY") {
            (format!("{:04}", dt.year()), 4)
        } else if rest.starts_with("MM") {
            (format!("{:02}", u8::from(dt.month())), 2)
        } else if rest.starts_with("DD") {
            (format!("{:02}", dt.day()), 2)
        } else if rest.starts_with("hh") {
            (format!("{:02}", dt.hour() % 12), 2)
        } else if rest.starts_with("mm") {
            (format!("{:02}", dt.minute()), 2)
        } else if c == 'a' {
            let meridiem = if dt.hour() >= 12 { "PM" } else { "AM" };
            (meridiem.to_string(), 1)
        } else if c == 'S' {
            (digits.next().map(String::from).unwrap_or_default(), 1)
        } else {
            (c.to_string(), c.len_utf8())
        };
        out.push_str(&text);
        rest = &rest[used..];
    }
    out
}

/// Export file naming: `<timestamp><suffix>.<ext>`.
#[derive(Clone, Debug)]
pub struct FileNaming {
    pub pattern: String,
    pub suffix: String,
    pub ext: String,
    pub offset: UtcOffset,
}

impl FileNaming {
    pub fn from_config(cfg: &StashConfig) -> Self {
        Self {
            pattern: cfg.file_pattern.clone(),
            suffix: cfg.file_suffix.clone(),
            ext: cfg.container_ext.clone(),
            offset: UtcOffset::from_whole_seconds(cfg.utc_offset_minutes * 60).unwrap_or(UtcOffset::UTC),
        }
    }

    /// Named after the last write; a recording that never received a
    /// fragment falls back to its start time.
    pub fn file_name(&self, rec: &Recording) -> String {
        let at = rec.finish_at.or(rec.start_at).unwrap_or(0);
        format!(
            "{}{}.{}",
            format_timestamp(at, &self.pattern, self.offset),
            self.suffix,
            self.ext
        )
    }
}
