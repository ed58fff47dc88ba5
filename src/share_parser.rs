//! C1 — share-text parser.
//!
//! Converts a free-form, Czech-registry-flavored share fragment into a
//! fraction in `[0,1]`, applying the four-layer precedence from spec §4.1.
//! Decimal separators `,`, `.`, `;` are accepted interchangeably; `;` also
//! doubles as a fractional separator (`a;b` ≡ `a/b`) — disambiguated by
//! always extracting unambiguous percentage-marked spans (`x%` / `x
//! PROCENTA`) first and masking them out before looking for bare fractions.

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn splaceno_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)splaceno\s*:?\s*[0-9.,;]+\s*procenta").expect("valid regex")
    })
}

fn percentage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:[.,;]\d+)?)\s*(%|procenta\b)").expect("valid regex")
    })
}

fn fraction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*[/;]\s*(\d+)").expect("valid regex"))
}

fn effective_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)efektivn[eě]\s+(\d+(?:[.,;]\d+)?)\s*%?").expect("valid regex")
    })
}

/// Strips combining diacritics and lower-cases, for accent-insensitive
/// label matching. Digits and punctuation pass through untouched.
fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn parse_decimal(token: &str) -> Option<f64> {
    let normalized = token.trim().replace([',', ';'], ".");
    normalized.parse::<f64>().ok()
}

/// Finds all percentage-marked values (as fractions, already divided by
/// 100) and returns them along with the input string with those spans
/// blanked out, so a subsequent fraction search cannot double-count them.
fn extract_percentages(s: &str) -> (Vec<f64>, String) {
    let mut values = Vec::new();
    let mut masked = s.to_string();
    for caps in percentage_re().captures_iter(s) {
        if let Some(v) = parse_decimal(&caps[1]) {
            values.push(v / 100.0);
        }
        let whole = caps.get(0).unwrap();
        masked.replace_range(whole.range(), &" ".repeat(whole.len()));
    }
    (values, masked)
}

/// Finds all `a/b` or `a;b` fractional forms (`b == 0` is skipped).
fn extract_fractions(s: &str) -> Vec<f64> {
    fraction_re()
        .captures_iter(s)
        .filter_map(|caps| {
            let a: f64 = caps[1].parse().ok()?;
            let b: f64 = caps[2].parse().ok()?;
            if b == 0.0 {
                None
            } else {
                Some(a / b)
            }
        })
        .collect()
}

/// Strips the `splaceno: … PROCENTA` (paid-in percentage) clause, which is
/// never counted by any layer.
fn strip_splaceno(s: &str) -> String {
    splaceno_re().replace_all(s, " ").into_owned()
}

/// Parses a share fragment to a fraction in `[0,1]`, or `None` when no
/// layer produces a value.
pub fn parse_share(raw: &str) -> Option<f64> {
    let stripped = strip_splaceno(raw);
    let folded = fold(&stripped);

    let has_label = |needle: &str| folded.replace('_', " ").contains(needle);

    let sum = if has_label("obchodni podil") {
        let (pcts, masked) = extract_percentages(&stripped);
        let fracs = extract_fractions(&masked);
        if pcts.is_empty() && fracs.is_empty() {
            None
        } else {
            Some(pcts.iter().sum::<f64>() + fracs.iter().sum::<f64>())
        }
    } else if has_label("hlasovaci prava") {
        let (pcts, _) = extract_percentages(&stripped);
        if pcts.is_empty() {
            None
        } else {
            Some(pcts.iter().sum::<f64>())
        }
    } else {
        let (pcts, masked) = extract_percentages(&stripped);
        let fracs = extract_fractions(&masked);
        if !fracs.is_empty() {
            Some(fracs.iter().sum::<f64>())
        } else if !pcts.is_empty() {
            Some(pcts.iter().sum::<f64>())
        } else {
            None
        }
    };

    sum.map(|v| v.clamp(0.0, 1.0))
}

/// Parses a share fragment, failing when the caller requires a value.
pub fn parse_share_required(raw: &str) -> Result<f64, crate::error::UboError> {
    parse_share(raw).ok_or_else(|| crate::error::UboError::ShareUnparseable(raw.to_string()))
}

/// Extracts a standalone `efektivně X%` marker, independent of the
/// four-layer precedence — it denotes an already-multiplied value.
pub fn extract_effective_marker(raw: &str) -> Option<f64> {
    let caps = effective_re().captures(raw)?;
    let v = parse_decimal(&caps[1])?;
    Some((v / 100.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn percent_sign() {
        approx(parse_share("50 %").unwrap(), 0.5);
    }

    #[test]
    fn plain_fraction() {
        approx(parse_share("1/3").unwrap(), 1.0 / 3.0);
    }

    #[test]
    fn business_share_with_splaceno() {
        approx(
            parse_share("obchodni_podil: 1/2; splaceno:100 PROCENTA").unwrap(),
            0.5,
        );
    }

    #[test]
    fn semicolon_decimal_percentage() {
        approx(parse_share("velikost:2;25 PROCENTA").unwrap(), 0.0225);
    }

    #[test]
    fn empty_is_none() {
        assert_eq!(parse_share(""), None);
    }

    #[test]
    fn voting_rights_label_sums_percentages_only() {
        approx(
            parse_share("hlasovaci_prava: 10%; 1/2").unwrap(),
            0.10,
        );
    }

    #[test]
    fn division_by_zero_is_skipped() {
        assert_eq!(parse_share("5/0"), None);
    }

    #[test]
    fn effective_marker_independent_of_layers() {
        approx(extract_effective_marker("Novák — efektivně 40%").unwrap(), 0.4);
        assert_eq!(extract_effective_marker("Novák — 40%"), None);
    }

    #[test]
    fn accent_insensitive_business_share_label() {
        approx(parse_share("obchodní podíl: 3/4").unwrap(), 0.75);
    }

    #[test]
    fn clamps_to_one() {
        approx(parse_share("70% 80%").unwrap(), 1.0);
    }
}
