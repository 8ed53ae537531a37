// 🔤 Text Normalizer - Locale folding and numeric parsing
// Turkish ERP exports mix dotted/dotless i, cedilla and breve forms freely;
// everything that compares column names goes through normalize_text first.

use crate::table::Cell;

// ============================================================================
// LOCALE FOLDING
// ============================================================================

/// Substitution table for Turkish letter variants.
///
/// Applied after lowercasing, so the uppercase entries only matter for input
/// that Unicode lowercasing leaves alone (the combining-dot sequence that
/// `İ`.to_lowercase() produces is the important one).
const TURKISH_FOLD: [(&str, &str); 12] = [
    ("ı", "i"),
    ("i\u{0307}", "i"), // i + combining dot above, from lowercased 'İ'
    ("İ", "i"),
    ("I", "i"),
    ("ş", "s"),
    ("Ş", "s"),
    ("ç", "c"),
    ("Ç", "c"),
    ("ğ", "g"),
    ("Ğ", "g"),
    ("ü", "u"),
    ("Ü", "u"),
];

/// Fold text to a lowercase ASCII-ish comparison key.
///
/// Lowercases, trims, then maps Turkish letter variants to their closest
/// unaccented equivalent. Idempotent: folding a folded string is a no-op.
pub fn normalize_text(text: &str) -> String {
    let mut folded = text.trim().to_lowercase();
    for (from, to) in TURKISH_FOLD {
        if folded.contains(from) {
            folded = folded.replace(from, to);
        }
    }
    folded.replace('ö', "o").replace('Ö', "o")
}

/// Join-key normalization: trim + uppercase.
///
/// Distinct from `normalize_text` - identifiers are matched exactly after
/// this, with no diacritic folding, and it must be applied to BOTH tables
/// before any lookup.
pub fn join_key(text: &str) -> String {
    text.trim().to_uppercase()
}

// ============================================================================
// NUMERIC PARSING
// ============================================================================

/// Parse a cell into a number, or report that it cannot be parsed.
///
/// Numeric cells pass through unchanged. Text is stripped of the `₺` symbol
/// and `TL` suffix, then thousands vs. decimal separators are disambiguated:
/// if both `,` and `.` appear, whichever comes later is the decimal point;
/// a lone `,` is a decimal point.
pub fn parse_numeric_checked(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Cell::Empty => None,
        Cell::Text(raw) => parse_numeric_str(raw),
    }
}

/// Lossy variant of [`parse_numeric_checked`]: unparseable input yields 0.0.
///
/// This is analytic, not transactional, data - a garbled cell should cost us
/// one value, never the whole run. Callers that care count the failures via
/// the checked variant and log them in aggregate.
pub fn parse_numeric(cell: &Cell) -> f64 {
    parse_numeric_checked(cell).unwrap_or(0.0)
}

fn parse_numeric_str(raw: &str) -> Option<f64> {
    let mut value = raw.replace('₺', "").replace("TL", "").trim().to_string();

    if value.is_empty() {
        return None;
    }

    if value.contains(',') && value.contains('.') {
        // The later separator is the decimal point, the other is grouping
        if value.rfind(',') > value.rfind('.') {
            value = value.replace('.', "").replace(',', ".");
        } else {
            value = value.replace(',', "");
        }
    } else if value.contains(',') {
        value = value.replace(',', ".");
    }

    value.parse::<f64>().ok()
}

/// Round to two decimal places (prices and money amounts in the output).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_turkish_variants() {
        assert_eq!(normalize_text("Satış Miktarı"), "satis miktari");
        assert_eq!(normalize_text("ÇÖĞÜŞI"), "cogusi");
        assert_eq!(normalize_text("  Stok İsmi  "), "stok ismi");
    }

    #[test]
    fn test_normalize_dotted_capital_i() {
        // 'İ'.to_lowercase() yields i + U+0307; the fold must collapse it
        assert_eq!(normalize_text("İZMİR"), normalize_text("izmir"));
        assert_eq!(normalize_text("İZMİR"), "izmir");
    }

    #[test]
    fn test_normalize_idempotent() {
        for input in ["İZMİR BÖLGE", "Ort.Satış\nFiyat", "plain ascii", ""] {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_join_key_trim_upper() {
        assert_eq!(join_key("  cola zero "), "COLA ZERO");
        assert_eq!(join_key("ULUDAĞ GAZOZ"), "ULUDAĞ GAZOZ");
    }

    #[test]
    fn test_parse_numeric_separator_disambiguation() {
        assert_eq!(parse_numeric(&Cell::text("1.234,56")), 1234.56);
        assert_eq!(parse_numeric(&Cell::text("1,234.56")), 1234.56);
    }

    #[test]
    fn test_parse_numeric_lone_comma_is_decimal() {
        assert_eq!(parse_numeric(&Cell::text("250,00")), 250.0);
    }

    #[test]
    fn test_parse_numeric_currency_markers() {
        assert_eq!(parse_numeric(&Cell::text("₺250,00")), 250.0);
        assert_eq!(parse_numeric(&Cell::text("1.500,75 TL")), 1500.75);
    }

    #[test]
    fn test_parse_numeric_garbage_degrades_to_zero() {
        assert_eq!(parse_numeric(&Cell::text("abc")), 0.0);
        assert_eq!(parse_numeric_checked(&Cell::text("abc")), None);
        assert_eq!(parse_numeric_checked(&Cell::Empty), None);
    }

    #[test]
    fn test_parse_numeric_passthrough() {
        assert_eq!(parse_numeric(&Cell::Number(42.5)), 42.5);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.456), 10.46);
        assert_eq!(round2(10.454), 10.45);
    }
}
