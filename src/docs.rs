use chrono::{Datelike, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;

/// Gendered substitutions for the transfer certificate. `female` selects the
/// daughter set; any other value (including missing) selects the son set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PronounSet {
    pub child: &'static str,
    pub subject: &'static str,
    pub possessive: &'static str,
    pub possessive_lower: &'static str,
}

pub fn pronoun_set(gender: Option<&str>) -> PronounSet {
    match gender.map(|g| g.trim().to_ascii_lowercase()).as_deref() {
        Some("female") => PronounSet {
            child: "Daughter",
            subject: "She",
            possessive: "Her",
            possessive_lower: "her",
        },
        _ => PronounSet {
            child: "Son",
            subject: "He",
            possessive: "His",
            possessive_lower: "his",
        },
    }
}

const BELOW_TWENTY: [&str; 20] = [
    "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn two_digits(n: u64, out: &mut Vec<String>) {
    if n == 0 {
        return;
    }
    if n < 20 {
        out.push(BELOW_TWENTY[n as usize].to_string());
    } else {
        out.push(TENS[(n / 10) as usize].to_string());
        if n % 10 != 0 {
            out.push(BELOW_TWENTY[(n % 10) as usize].to_string());
        }
    }
}

fn three_digits(n: u64, out: &mut Vec<String>) {
    if n >= 100 {
        out.push(BELOW_TWENTY[(n / 100) as usize].to_string());
        out.push("Hundred".to_string());
    }
    two_digits(n % 100, out);
}

/// Number in words using the Indian grouping (crore, lakh, thousand).
pub fn number_in_words(n: u64) -> String {
    if n == 0 {
        return "Zero".to_string();
    }
    let mut parts: Vec<String> = Vec::new();
    let crore = n / 10_000_000;
    let lakh = (n / 100_000) % 100;
    let thousand = (n / 1_000) % 100;
    let rest = n % 1_000;

    if crore > 0 {
        // Crore counts can themselves exceed two digits.
        parts.push(number_in_words(crore));
        parts.push("Crore".to_string());
    }
    if lakh > 0 {
        two_digits(lakh, &mut parts);
        parts.push("Lakh".to_string());
    }
    if thousand > 0 {
        two_digits(thousand, &mut parts);
        parts.push("Thousand".to_string());
    }
    three_digits(rest, &mut parts);
    parts.join(" ")
}

/// "Nine Hundred Fifty Rupees Only", with paise when the amount is fractional.
pub fn amount_in_words(amount: f64) -> String {
    let paise_total = (amount * 100.0).round() as u64;
    let rupees = paise_total / 100;
    let paise = paise_total % 100;
    if paise == 0 {
        format!("{} Rupees Only", number_in_words(rupees))
    } else {
        format!(
            "{} Rupees and {} Paise Only",
            number_in_words(rupees),
            number_in_words(paise)
        )
    }
}

/// "Fifteen March Two Thousand Fourteen" for a `YYYY-MM-DD` date; the input is
/// echoed back when it does not parse.
pub fn date_in_words(iso: &str) -> String {
    let Ok(d) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") else {
        return iso.to_string();
    };
    let month = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ][(d.month() - 1) as usize];
    format!(
        "{} {} {}",
        number_in_words(d.day() as u64),
        month,
        number_in_words(d.year().max(0) as u64)
    )
}

/// Receipt numbers are timestamp-derived with a short random suffix.
pub fn receipt_number() -> String {
    let secs = Utc::now().timestamp();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("RCP-{}-{:04}", secs, suffix)
}

/// Transfer-certificate serial: issue year plus a low-entropy timestamp/random
/// tail.
pub fn tc_serial_number() -> String {
    let now = Utc::now();
    let tail = now.timestamp() % 100_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..100);
    format!("TC-{}-{:05}{:02}", now.year(), tail, suffix)
}

/// Suggested download name for a rendered document.
pub fn document_file_name(person: &str, serial: &str) -> String {
    let safe: String = person
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}-{}.pdf", safe.trim_matches('-'), serial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn female_gets_daughter_set_everything_else_male() {
        let f = pronoun_set(Some("female"));
        assert_eq!(
            (f.child, f.subject, f.possessive, f.possessive_lower),
            ("Daughter", "She", "Her", "her")
        );
        for g in [Some("male"), Some("MALE"), Some("x"), None] {
            let m = pronoun_set(g);
            assert_eq!(
                (m.child, m.subject, m.possessive, m.possessive_lower),
                ("Son", "He", "His", "his")
            );
        }
        // Case-insensitive on the female match too.
        assert_eq!(pronoun_set(Some("Female")).child, "Daughter");
    }

    #[test]
    fn indian_grouping_in_words() {
        assert_eq!(number_in_words(0), "Zero");
        assert_eq!(number_in_words(950), "Nine Hundred Fifty");
        assert_eq!(number_in_words(1_000), "One Thousand");
        assert_eq!(number_in_words(100_000), "One Lakh");
        assert_eq!(
            number_in_words(2_50_000),
            "Two Lakh Fifty Thousand"
        );
        assert_eq!(
            number_in_words(12_34_567),
            "Twelve Lakh Thirty Four Thousand Five Hundred Sixty Seven"
        );
        assert_eq!(number_in_words(1_00_00_000), "One Crore");
    }

    #[test]
    fn amount_words_handle_paise() {
        assert_eq!(amount_in_words(950.0), "Nine Hundred Fifty Rupees Only");
        assert_eq!(
            amount_in_words(675.50),
            "Six Hundred Seventy Five Rupees and Fifty Paise Only"
        );
    }

    #[test]
    fn date_words_spell_day_month_year() {
        assert_eq!(
            date_in_words("2014-03-15"),
            "Fifteen March Two Thousand Fourteen"
        );
        assert_eq!(date_in_words("garbage"), "garbage");
    }

    #[test]
    fn document_names_are_filesystem_safe() {
        assert_eq!(
            document_file_name("Asha Rao", "TC-2025-1234567"),
            "Asha-Rao-TC-2025-1234567.pdf"
        );
    }
}
