//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;

/// Pattern for publication dates, e.g. "25 mar 2021"
pub const PUBLICATION_FORMAT: &str = "dd MMM yyyy";

/// Localized date formatting in the site's timezone
#[derive(Debug, Clone, Copy)]
pub struct DateFormatter {
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    /// Create a formatter for a language tag (`pt-BR`) and IANA timezone
    pub fn new(language: &str, timezone: &str) -> Self {
        let locale = parse_locale(language);
        let timezone = timezone.parse::<Tz>().unwrap_or_else(|_| {
            if !timezone.is_empty() {
                tracing::warn!("Unknown timezone {:?}, using UTC", timezone);
            }
            Tz::UTC
        });
        Self { locale, timezone }
    }

    /// Format a date using a date-fns style pattern
    ///
    /// # Examples
    /// ```ignore
    /// formatter.format(&date, "dd MMM yyyy") // -> "25 mar 2021"
    /// ```
    pub fn format(&self, date: &DateTime<FixedOffset>, pattern: &str) -> String {
        let chrono_format = datefns_to_chrono_format(pattern);
        date.with_timezone(&self.timezone)
            .format_localized(&chrono_format, self.locale)
            .to_string()
    }

    /// Format an optional date, `None` when there is no date
    pub fn format_opt(&self, date: Option<&DateTime<FixedOffset>>, pattern: &str) -> Option<String> {
        date.map(|d| self.format(d, pattern))
    }
}

/// Map a language tag to a chrono locale, POSIX when unknown
pub fn parse_locale(language: &str) -> Locale {
    let name = language.replace('-', "_");
    Locale::try_from(name.as_str()).unwrap_or_else(|_| {
        tracing::debug!("No locale data for {:?}, using POSIX", language);
        Locale::POSIX
    })
}

/// Generate a machine-readable `datetime` attribute value
pub fn date_xml(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Convert a date-fns format string to a chrono format string
///
/// Text between single quotes is copied literally (`''` is a quote).
fn datefns_to_chrono_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut result = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                result.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        result.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if c.is_ascii_alphabetic() {
            let mut run = 1;
            while chars.get(i + run) == Some(&c) {
                run += 1;
            }
            let token: String = std::iter::repeat(c).take(run).collect();
            match datefns_token(c, run) {
                Some(spec) => result.push_str(spec),
                None => token.chars().for_each(|t| push_literal(&mut result, t)),
            }
            i += run;
            continue;
        }

        push_literal(&mut result, c);
        i += 1;
    }

    result
}

fn datefns_token(letter: char, len: usize) -> Option<&'static str> {
    let spec = match (letter, len) {
        ('y', 2) => "%y",
        ('y', _) => "%Y",
        ('M', 1) => "%-m",
        ('M', 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('d', 1) => "%-d",
        ('d', _) => "%d",
        ('H', 1) => "%-H",
        ('H', _) => "%H",
        ('h', 1) => "%-I",
        ('h', _) => "%I",
        ('m', 1) => "%-M",
        ('m', _) => "%M",
        ('s', 1) => "%-S",
        ('s', _) => "%S",
        ('a', _) => "%p",
        ('E', 4) => "%A",
        ('E', _) => "%a",
        _ => return None,
    };
    Some(spec)
}

fn push_literal(result: &mut String, c: char) {
    if c == '%' {
        result.push_str("%%");
    } else {
        result.push(c);
    }
}
