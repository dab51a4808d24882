use proptest::prelude::*;

use mortality_stats::{
    aggregate::{aggregate, partition},
    encode::{LabelOrder, encode, encode_with},
    error::CoreError,
    filter::filter_rows,
    frame::Table,
};

const SEXES: [&str; 3] = ["Male", "Female", "Unknown"];
const AGES: [&str; 4] = ["Under 1 year", "1-4 Years", "5-14 Years", "85 Years and Over"];

fn table_from(rows: &[(usize, usize, u32)]) -> Table {
    Table::from_raw(
        vec!["Sex".into(), "Age Group".into(), "COVID-19 Deaths".into()],
        rows.iter()
            .map(|(sex, age, deaths)| {
                vec![
                    SEXES[*sex].to_string(),
                    AGES[*age].to_string(),
                    deaths.to_string(),
                ]
            })
            .collect(),
    )
}

fn rows_strategy() -> impl Strategy<Value = Vec<(usize, usize, u32)>> {
    proptest::collection::vec((0..SEXES.len(), 0..AGES.len(), 0u32..500), 0..40)
}

#[test]
fn scenario_filter_keeps_male_rows_in_order() {
    let table = table_from(&[(0, 0, 1), (1, 1, 2), (0, 2, 3)]);
    let males = filter_rows(&table, "Sex", "Male", true).expect("filter");
    assert_eq!(males.rows(), &[table.rows()[0].clone(), table.rows()[2].clone()]);
}

#[test]
fn scenario_unknown_column() {
    let table = table_from(&[(0, 0, 1)]);
    assert_eq!(
        filter_rows(&table, "Race", "White", true).unwrap_err(),
        CoreError::UnknownColumn("Race".into())
    );
}

#[test]
fn scenario_reordered_partitions_keep_values() {
    let table = table_from(&[(0, 0, 10), (0, 1, 30)]);
    let forward = aggregate(
        &partition(&table, "Age Group", &[AGES[0], AGES[1]]).unwrap(),
        "COVID-19 Deaths",
    )
    .unwrap();
    let reversed = aggregate(
        &partition(&table, "Age Group", &[AGES[1], AGES[0]]).unwrap(),
        "COVID-19 Deaths",
    )
    .unwrap();

    assert_eq!(forward[0].category, reversed[1].category);
    assert_eq!(forward[0].total, reversed[1].total);
    assert_eq!(forward[0].percentage, reversed[1].percentage);
    assert_eq!(forward[1].percentage, reversed[0].percentage);
    assert_eq!(reversed[0].cumulative, 0.75);
    assert_eq!(forward[0].cumulative, 0.25);
}

proptest! {
    #[test]
    fn include_and_exclude_partition_rows(
        rows in rows_strategy(),
        picks in proptest::collection::vec(0..SEXES.len(), 1..3),
    ) {
        let table = table_from(&rows);
        let accepted: Vec<&str> = picks.iter().map(|i| SEXES[*i]).collect();
        let kept = filter_rows(&table, "Sex", accepted.as_slice(), true).unwrap();
        let dropped = filter_rows(&table, "Sex", accepted.as_slice(), false).unwrap();

        prop_assert_eq!(kept.len() + dropped.len(), table.len());
        let mut kept_iter = kept.rows().iter().peekable();
        let mut dropped_iter = dropped.rows().iter().peekable();
        for row in table.rows() {
            if kept_iter.peek() == Some(&row) {
                kept_iter.next();
            } else {
                prop_assert_eq!(dropped_iter.next(), Some(row));
            }
        }
        prop_assert!(kept_iter.next().is_none());
    }

    #[test]
    fn encoding_is_a_deterministic_bijection(
        labels in proptest::collection::vec("[a-z]{1,4}", 1..30),
    ) {
        let (first, encoded) = encode(&labels).unwrap();
        let (second, again) = encode(&labels).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&encoded, &again);
        prop_assert_eq!(encoded.len(), labels.len());
        for (label, code) in labels.iter().zip(&encoded) {
            prop_assert_eq!(first.decode(*code), Some(label.as_str()));
            prop_assert_eq!(first.code(label), Some(*code));
        }
        let classes: Vec<&str> = first.iter().map(|(_, label)| label).collect();
        let mut sorted = classes.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(classes, sorted);
    }

    #[test]
    fn numeric_codes_follow_numeric_order(weeks in proptest::collection::vec(1u32..=53, 1..40)) {
        let labels: Vec<String> = weeks.iter().map(u32::to_string).collect();
        let (_, encoded) = encode_with(&labels, LabelOrder::Numeric).unwrap();
        for (i, j) in (0..weeks.len()).flat_map(|i| (0..weeks.len()).map(move |j| (i, j))) {
            prop_assert_eq!(weeks[i].cmp(&weeks[j]), encoded[i].cmp(&encoded[j]));
        }
    }

    #[test]
    fn shares_sum_to_one_and_cdf_is_monotonic(rows in rows_strategy()) {
        let table = table_from(&rows);
        let partitions = partition(&table, "Age Group", &AGES).unwrap();
        match aggregate(&partitions, "COVID-19 Deaths") {
            Ok(records) => {
                prop_assert_eq!(records.len(), AGES.len());
                let share_sum: f64 = records.iter().map(|r| r.percentage).sum();
                prop_assert!((share_sum - 1.0).abs() < 1e-9);
                prop_assert!(records.windows(2).all(|w| w[0].cumulative <= w[1].cumulative));
                prop_assert!((records.last().unwrap().cumulative - 1.0).abs() < 1e-9);
            }
            Err(err) => {
                prop_assert_eq!(err, CoreError::DivisionByZero("COVID-19 Deaths".into()));
                prop_assert!(rows.iter().all(|(_, _, deaths)| *deaths == 0));
            }
        }
    }
}
