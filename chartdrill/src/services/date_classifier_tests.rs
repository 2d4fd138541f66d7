use super::*;
use chrono::NaiveDate;
use proptest::prelude::*;

#[test]
fn test_monthly_labels() {
    let class = classify("Feb 2023");
    assert_eq!(class, DateClass::MonthlyDate(YearMonth::new(2023, 2).unwrap()));
    assert!(classify("Sept 2023").is_date());
    assert!(classify("jun 2021").is_date());
}

#[test]
fn test_daily_labels() {
    assert_eq!(
        classify("2023-02-28"),
        DateClass::DailyDate(NaiveDate::from_ymd_opt(2023, 2, 28).unwrap())
    );
    assert_eq!(
        classify("2024-02-29"),
        DateClass::DailyDate(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
    );
}

#[test]
fn test_rejects_impossible_dates() {
    assert_eq!(classify("2023-02-30"), DateClass::NotADate);
    assert_eq!(classify("2023-13-01"), DateClass::NotADate);
    assert_eq!(classify("2023-00-10"), DateClass::NotADate);
    assert_eq!(classify("Xyz 2023"), DateClass::NotADate);
}

#[test]
fn test_rejects_loose_shapes() {
    for label in [
        "2023-2-3",
        "2023/02/03",
        "23-02-03",
        "2023-02-03T00:00",
        " 2023-02-03",
        "Feb 2023 ",
        "North",
        "0",
        "",
    ] {
        assert_eq!(classify(label), DateClass::NotADate, "label {:?}", label);
    }
}

#[test]
fn test_month_of_daily_label() {
    let class = classify("2023-03-15");
    assert_eq!(class.month(), Some(YearMonth::new(2023, 3).unwrap()));
    assert_eq!(classify("Mar 2023").sort_date(), NaiveDate::from_ymd_opt(2023, 3, 1));
}

#[test]
fn test_sequence_all_or_nothing() {
    assert_eq!(classify_labels(&["Jan 2023", "Feb 2023"]), LabelKind::Monthly);
    assert_eq!(classify_labels(&["2023-01-01", "2023-01-02"]), LabelKind::Daily);
    assert_eq!(classify_labels(&["Jan 2023", "North"]), LabelKind::Category);
    assert_eq!(classify_labels(&["2023-01-01", "2023-02-30"]), LabelKind::Category);
}

#[test]
fn test_sequence_mixed_formats_is_category() {
    assert_eq!(classify_labels(&["Jan 2023", "2023-01-02"]), LabelKind::Category);
    assert!(!is_date_sequence(&["Jan 2023", "2023-01-02"]));
}

#[test]
fn test_empty_sequence_is_category() {
    let empty: [&str; 0] = [];
    assert!(!is_date_sequence(&empty));
}

fn daily_label() -> impl Strategy<Value = String> {
    (1990i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| format!("{:04}-{:02}-{:02}", y, m, d))
}

proptest! {
    #[test]
    fn prop_uniform_daily_sequences_are_dates(
        labels in prop::collection::vec(daily_label(), 1..20)
    ) {
        prop_assert!(is_date_sequence(&labels));
    }

    #[test]
    fn prop_one_category_label_spoils_sequence(
        labels in prop::collection::vec(daily_label(), 1..20),
        position in 0usize..20,
    ) {
        let mut labels = labels;
        let idx = position % (labels.len() + 1);
        labels.insert(idx, "Region North".to_string());
        prop_assert!(!is_date_sequence(&labels));
    }
}
