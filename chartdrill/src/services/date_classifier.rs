//! Date recognition for chart labels.
//!
//! Two label formats count as dates:
//! - monthly: "MMM yyyy" (e.g. "Feb 2023", "Sept 2023")
//! - daily: "yyyy-mm-dd" (e.g. "2023-02-28")
//!
//! Both are validated for calendar existence, so "Xyz 2023" and "2023-02-30"
//! are not dates.

use chrono::NaiveDate;

use crate::api::YearMonth;

/// Classification of a single label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateClass {
    NotADate,
    MonthlyDate(YearMonth),
    DailyDate(NaiveDate),
}

impl DateClass {
    /// Calendar month the label falls in, if it is a date.
    pub fn month(&self) -> Option<YearMonth> {
        match self {
            DateClass::NotADate => None,
            DateClass::MonthlyDate(ym) => Some(*ym),
            DateClass::DailyDate(date) => Some(YearMonth::of(*date)),
        }
    }

    /// Date used for ordering; monthly labels sort as their first day.
    pub fn sort_date(&self) -> Option<NaiveDate> {
        match self {
            DateClass::NotADate => None,
            DateClass::MonthlyDate(ym) => Some(ym.first_day()),
            DateClass::DailyDate(date) => Some(*date),
        }
    }

    pub fn is_date(&self) -> bool {
        !matches!(self, DateClass::NotADate)
    }
}

/// What a whole label sequence represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Arbitrary categories; no date handling applies.
    Category,
    /// Every label is a "MMM yyyy" month.
    Monthly,
    /// Every label is a "yyyy-mm-dd" day.
    Daily,
}

/// Classify one label.
pub fn classify(label: &str) -> DateClass {
    if let Some(date) = parse_daily(label) {
        return DateClass::DailyDate(date);
    }
    match label.parse::<YearMonth>() {
        Ok(ym) => DateClass::MonthlyDate(ym),
        Err(_) => DateClass::NotADate,
    }
}

/// Classify a label sequence with an all-or-nothing policy.
///
/// The sequence is date data only if every label is a date of the same
/// format. A single non-date label, or a mix of monthly and daily labels,
/// makes the whole sequence categorical. An empty sequence is categorical.
pub fn classify_labels<S: AsRef<str>>(labels: &[S]) -> LabelKind {
    let mut kind: Option<LabelKind> = None;
    for label in labels {
        let this = match classify(label.as_ref()) {
            DateClass::NotADate => return LabelKind::Category,
            DateClass::MonthlyDate(_) => LabelKind::Monthly,
            DateClass::DailyDate(_) => LabelKind::Daily,
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k != this => return LabelKind::Category,
            Some(_) => {}
        }
    }
    kind.unwrap_or(LabelKind::Category)
}

/// Whether the label sequence is uniformly date-classified.
pub fn is_date_sequence<S: AsRef<str>>(labels: &[S]) -> bool {
    classify_labels(labels) != LabelKind::Category
}

/// Strict `yyyy-mm-dd`: exactly 4-2-2 ASCII digits and a real calendar day.
fn parse_daily(label: &str) -> Option<NaiveDate> {
    let bytes = label.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    let year: i32 = label[0..4].parse().ok()?;
    let month: u32 = label[5..7].parse().ok()?;
    let day: u32 = label[8..10].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
#[path = "date_classifier_tests.rs"]
mod tests;
