//! Date helper functions

use chrono::format::Locale;
use chrono::{DateTime, FixedOffset, Utc};

/// Parse a publication timestamp as returned by the content API
///
/// Accepts both `2021-03-25T19:25:28+0000` and RFC 3339.
pub fn parse_publication_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::<FixedOffset>::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Format a date using Moment.js-compatible format tokens
///
/// The date is shown in `timezone` (an IANA name, UTC when empty or
/// unknown) and month names follow `lang`.
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", "pt-BR", "") // -> "25 mar 2021"
/// ```
pub fn format_date(date: &DateTime<Utc>, format: &str, lang: &str, timezone: &str) -> String {
    let chrono_format = moment_to_chrono_format(format);
    let locale = locale_for(lang);
    match timezone.parse::<chrono_tz::Tz>() {
        Ok(tz) => date
            .with_timezone(&tz)
            .format_localized(&chrono_format, locale)
            .to_string(),
        Err(_) => {
            if !timezone.is_empty() {
                tracing::debug!("Unknown timezone {:?}, using UTC", timezone);
            }
            date.format_localized(&chrono_format, locale).to_string()
        }
    }
}

/// Generate a <time> HTML element
pub fn time_tag(date: &DateTime<Utc>, format: &str, lang: &str, timezone: &str) -> String {
    format!(
        r#"<time datetime="{}">{}</time>"#,
        date.format("%Y-%m-%dT%H:%M:%SZ"),
        format_date(date, format, lang, timezone)
    )
}

/// Locale of a site language such as `pt-BR`, English when unknown
fn locale_for(lang: &str) -> Locale {
    let normalized = lang.replace('-', "_");
    Locale::try_from(normalized.as_str())
        .or_else(|_| match normalized.split('_').next() {
            Some("pt") => Ok(Locale::pt_BR),
            _ => Err(()),
        })
        .unwrap_or(Locale::en_US)
}

/// Convert Moment.js format tokens to a chrono format string
///
/// Text outside the tokens is kept, with `%` escaped.
fn moment_to_chrono_format(format: &str) -> String {
    const TOKENS: [(&str, &str); 12] = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("dddd", "%A"),
        ("ddd", "%a"),
    ];

    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;
    'scan: while let Some(c) = rest.chars().next() {
        for (from, to) in TOKENS {
            if let Some(tail) = rest.strip_prefix(from) {
                result.push_str(to);
                rest = tail;
                continue 'scan;
            }
        }
        if c == '%' {
            result.push_str("%%");
        } else {
            result.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_api_timestamp() {
        let date = parse_publication_date("2021-03-25T19:25:28+0000").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap());

        let rfc = parse_publication_date("2021-03-25T19:25:28Z").unwrap();
        assert_eq!(rfc, date);

        assert!(parse_publication_date("yesterday").is_none());
    }

    #[test]
    fn test_format_date_pt_br() {
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap();
        assert_eq!(format_date(&date, "DD MMM YYYY", "pt-BR", ""), "25 mar 2021");
        assert_eq!(format_date(&date, "DD/MMMM", "pt-BR", ""), "25/março");
    }

    #[test]
    fn test_format_date_en() {
        let date = Utc.with_ymd_and_hms(2024, 1, 5, 8, 3, 9).unwrap();
        assert_eq!(format_date(&date, "DD MMM YYYY", "en", ""), "05 Jan 2024");
        assert_eq!(format_date(&date, "YYYY-MM-DD HH:mm:ss", "en", ""), "2024-01-05 08:03:09");
    }

    #[test]
    fn test_format_date_in_timezone() {
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 1, 0, 0).unwrap();
        assert_eq!(
            format_date(&date, "DD MMM YYYY", "pt-BR", "America/Sao_Paulo"),
            "24 mar 2021"
        );
        assert_eq!(
            format_date(&date, "DD MMM YYYY", "pt-BR", "Not/AZone"),
            "25 mar 2021"
        );
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("DD MMM YYYY"), "%d %b %Y");
        assert_eq!(moment_to_chrono_format("YYYY-MM-DD HH:mm:ss"), "%Y-%m-%d %H:%M:%S");
        assert_eq!(moment_to_chrono_format("dddd, 100%"), "%A, 100%%");
    }

    #[test]
    fn test_locale_for() {
        assert_eq!(locale_for("pt-BR"), Locale::pt_BR);
        assert_eq!(locale_for("pt"), Locale::pt_BR);
        assert_eq!(locale_for("en"), Locale::en_US);
        assert_eq!(locale_for("xx"), Locale::en_US);
    }

    #[test]
    fn test_time_tag() {
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap();
        assert_eq!(
            time_tag(&date, "DD MMM YYYY", "pt-BR", ""),
            r#"<time datetime="2021-03-25T19:25:28Z">25 mar 2021</time>"#
        );
    }
}
