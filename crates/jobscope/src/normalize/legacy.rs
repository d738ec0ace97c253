//! Parsers for the free-text fields of the first extraction revision.
//!
//! That revision asked the model for prose ("5+ years", "$120k - $150k",
//! a list of benefit sentences) where the current one asks for numbers and
//! flags. These functions recover the structured values.

use std::sync::LazyLock;

use regex::Regex;

static RE_YEARS_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:-|–|—|to)\s*(\d+)").unwrap());
static RE_YEARS_FLOOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(\d+)\s*(?:\+|plus|or more))|(?:(?:at least|minimum|min\.?)\s*(\d+))")
        .unwrap()
});
static RE_FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static RE_MONEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*([kK])?").unwrap());
static RE_CURRENCY_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(USD|EUR|GBP|CAD|AUD|CHF|INR|JPY|SEK|NOK|DKK|PLN|BRL|SGD)\b").unwrap()
});

/// Parses an experience phrase into `(min, max)` years. `max == 0` means
/// no upper bound was stated.
///
/// - "3-5 years" → (3, 5)
/// - "5+ years" / "at least 5 years" → (5, 0)
/// - "2 years" → (2, 2)
/// - "" → (0, 0)
pub fn parse_experience_range(text: &str) -> (i64, i64) {
    if let Some(caps) = RE_YEARS_RANGE.captures(text) {
        let min = caps[1].parse().unwrap_or(0);
        let max = caps[2].parse().unwrap_or(0);
        return (min, max);
    }
    if let Some(caps) = RE_YEARS_FLOOR.captures(text) {
        let min = caps
            .get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return (min, 0);
    }
    match RE_FIRST_NUMBER.find(text).and_then(|m| m.as_str().parse().ok()) {
        Some(n) => (n, n),
        None => (0, 0),
    }
}

/// Structured salary parsed from a free-text range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalaryRange {
    pub min: i64,
    pub max: i64,
    pub currency: String,
}

/// Parses a salary phrase such as "$120,000 - $150,000" or "€60k–80k".
///
/// A single amount sets both bounds. A `k` suffix on either bound multiplies
/// by a thousand; when only the upper bound carries it ("60-80k"), both do.
pub fn parse_salary_range(text: &str) -> SalaryRange {
    let amounts: Vec<(f64, bool)> = RE_MONEY
        .captures_iter(text)
        .filter_map(|caps| {
            let number: f64 = caps[1].replace(',', "").parse().ok()?;
            Some((number, caps.get(2).is_some()))
        })
        .take(2)
        .collect();

    let any_thousands = amounts.iter().any(|(_, k)| *k);
    let scale = |(n, k): (f64, bool)| -> i64 {
        let n = if k || (any_thousands && n < 1000.0) {
            n * 1000.0
        } else {
            n
        };
        n.round() as i64
    };

    let (min, max) = match amounts.as_slice() {
        [] => (0, 0),
        [one] => (scale(*one), scale(*one)),
        [low, high, ..] => (scale(*low), scale(*high)),
    };

    SalaryRange {
        min,
        max,
        currency: detect_currency(text),
    }
}

fn detect_currency(text: &str) -> String {
    if let Some(m) = RE_CURRENCY_CODE.find(text) {
        return m.as_str().to_string();
    }
    let code = if text.contains('€') {
        "EUR"
    } else if text.contains('£') {
        "GBP"
    } else if text.contains('₹') {
        "INR"
    } else if text.contains('$') {
        "USD"
    } else {
        ""
    };
    code.to_string()
}

/// Benefit flags inferred from benefit descriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BenefitFlags {
    pub health_insurance: bool,
    pub pto: bool,
    pub visa_sponsorship: bool,
    pub professional_development: bool,
    pub retirement: bool,
    pub remote_stipend: bool,
    pub equity: bool,
}

/// Scans benefit lines for known keywords.
///
/// Short abbreviations ("pto", "rsu") must match a whole word; longer
/// phrases match anywhere in the line.
pub fn benefit_flags<S: AsRef<str>>(benefits: &[S]) -> BenefitFlags {
    let mut flags = BenefitFlags::default();
    for benefit in benefits {
        let b = benefit.as_ref().to_lowercase();
        let words: Vec<&str> = b
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |phrases: &[&str]| phrases.iter().any(|p| b.contains(p));
        let has_word = |tokens: &[&str]| tokens.iter().any(|t| words.contains(t));

        flags.health_insurance |= has(&["health", "medical", "dental", "vision insurance"]);
        flags.pto |= has(&["paid time off", "vacation", "holiday", "annual leave"])
            || has_word(&["pto"]);
        flags.visa_sponsorship |= has(&["visa", "relocation", "sponsorship"]);
        flags.professional_development |= has(&[
            "learning",
            "training",
            "education",
            "conference",
            "professional development",
            "course",
        ]);
        flags.retirement |= has(&["401(k)", "pension", "retirement"]) || has_word(&["401k"]);
        flags.remote_stipend |= has(&["stipend", "home office", "remote allowance"])
            || has_word(&["wfh"]);
        flags.equity |= has(&["equity", "stock option", "share option", "stock grant"])
            || has_word(&["rsu", "rsus", "esop"]);
    }
    flags
}

/// Equity is offered when the legacy text says anything but "no"/"none".
pub fn equity_offered(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    !t.is_empty() && !matches!(t.as_str(), "no" | "none" | "n/a" | "not mentioned" | "false")
}

/// Splits "City, Region, Country" into `(city, country)`.
///
/// A single component is ambiguous, so both parts stay empty.
pub fn split_location(full: &str) -> (String, String) {
    let parts: Vec<&str> = full
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [first, .., last] => (first.to_string(), last.to_string()),
        _ => (String::new(), String::new()),
    }
}

/// Interview signals derived from a list of process steps.
pub fn interview_signals<S: AsRef<str>>(steps: &[S]) -> (i64, bool, bool) {
    let lowered: Vec<String> = steps.iter().map(|s| s.as_ref().to_lowercase()).collect();
    let take_home = lowered
        .iter()
        .any(|s| s.contains("take-home") || s.contains("take home") || s.contains("assignment"));
    let pairing = lowered.iter().any(|s| s.contains("pair"));
    (steps.len() as i64, take_home, pairing)
}
