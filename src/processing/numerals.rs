//! Numeral conversion and the birth date encoded in a national ID number.
//!
//! The 14-digit Egyptian national ID starts with a century code (`2` for the
//! 1900s, `3` for the 2000s) followed by `YYMMDD`. The remaining seven digits
//! (governorate, sequence, check digit) are not read here.

use chrono::NaiveDate;

const EASTERN_ARABIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// Replace Western digits with their Eastern Arabic glyphs.
pub fn to_eastern_arabic_numerals(text: &str) -> String {
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => EASTERN_ARABIC_DIGITS[d as usize],
            _ => c,
        })
        .collect()
}

/// Replace Eastern Arabic digit glyphs with Western digits.
pub fn to_english_numerals(text: &str) -> String {
    text.chars()
        .map(|c| {
            EASTERN_ARABIC_DIGITS
                .iter()
                .position(|e| *e == c)
                .and_then(|d| char::from_digit(d as u32, 10))
                .unwrap_or(c)
        })
        .collect()
}

/// Normalize numerals and keep only the Western digits.
pub fn extract_digits(text: &str) -> String {
    to_english_numerals(text.trim())
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Derive `DD/MM/YYYY` from the first seven digits of a national ID.
///
/// Returns `None` for short input, an unknown century code, or a date that
/// does not exist on the calendar.
pub fn derive_birth_date(national_id: &str) -> Option<String> {
    let head = national_id.get(..7)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let century = match &head[0..1] {
        "2" => 1900,
        "3" => 2000,
        _ => return None,
    };
    let year: i32 = head[1..3].parse().ok()?;
    let month: u32 = head[3..5].parse().ok()?;
    let day: u32 = head[5..7].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(century + year, month, day)?;
    Some(date.format("%d/%m/%Y").to_string())
}

/// Birth date from raw OCR text of the national ID number field.
pub fn birth_date_from_text(text: &str) -> Option<String> {
    let digits = extract_digits(text);
    if digits.len() < 7 {
        log::debug!("National ID has only {} digits, no birth date", digits.len());
        return None;
    }
    let date = derive_birth_date(&digits);
    if date.is_none() {
        log::debug!("National ID prefix {} does not encode a valid date", &digits[..7]);
    }
    date
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_birth_date_both_centuries() {
        assert_eq!(derive_birth_date("29010011234567").as_deref(), Some("01/10/1990"));
        assert_eq!(derive_birth_date("30512310101234").as_deref(), Some("31/12/2005"));
    }

    #[test]
    fn test_derive_birth_date_leap_years() {
        // 2000 is a leap year, 1900 is not.
        assert_eq!(derive_birth_date("3000229").as_deref(), Some("29/02/2000"));
        assert_eq!(derive_birth_date("2000229"), None);
        assert_eq!(derive_birth_date("2960229").as_deref(), Some("29/02/1996"));
        assert_eq!(derive_birth_date("2970229"), None);
    }

    #[test]
    fn test_derive_birth_date_rejects_invalid() {
        assert_eq!(derive_birth_date("1900101"), None); // century code 1
        assert_eq!(derive_birth_date("4900101"), None); // century code 4
        assert_eq!(derive_birth_date("2900001"), None); // month 00
        assert_eq!(derive_birth_date("2901301"), None); // month 13
        assert_eq!(derive_birth_date("2900100"), None); // day 00
        assert_eq!(derive_birth_date("2900132"), None); // day 32
        assert_eq!(derive_birth_date("2900230"), None); // Feb 30
        assert_eq!(derive_birth_date("290010"), None); // too short
        assert_eq!(derive_birth_date(""), None);
        assert_eq!(derive_birth_date("29A0101"), None);
    }

    #[test]
    fn test_derive_birth_date_roundtrips_calendar_dates() {
        for (century_code, base) in [('2', 1900), ('3', 2000)] {
            for year in [0, 47, 99] {
                for (month, day) in [(1, 1), (4, 30), (7, 15), (12, 31)] {
                    let digits = format!("{}{:02}{:02}{:02}0101234", century_code, year, month, day);
                    let expected = format!("{:02}/{:02}/{:04}", day, month, base + year);
                    assert_eq!(derive_birth_date(&digits), Some(expected));
                }
            }
        }
    }

    #[test]
    fn test_numeral_conversion() {
        assert_eq!(to_english_numerals("٢٩٠٠١٠١"), "2900101");
        assert_eq!(to_eastern_arabic_numerals("2900101"), "٢٩٠٠١٠١");
        assert_eq!(to_english_numerals("رقم ٣ abc"), "رقم 3 abc");
        assert_eq!(to_eastern_arabic_numerals("abc-"), "abc-");

        let digits = "0123456789";
        assert_eq!(to_english_numerals(&to_eastern_arabic_numerals(digits)), digits);
    }

    #[test]
    fn test_birth_date_from_ocr_text() {
        assert_eq!(birth_date_from_text(" ٢٩٠ ٠١٠١-١٢٣٤٥٦٧ ").as_deref(), Some("01/01/1990"));
        assert_eq!(birth_date_from_text("٢٩٠٠١"), None);
        assert_eq!(birth_date_from_text("no digits"), None);
        assert_eq!(birth_date_from_text("19001011234567"), None);
    }
}
