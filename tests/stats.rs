use proptest::prelude::*;
use sheet_insights::{AbsencePolicy, AggregateResult, Record, compute_aggregate, compute_aggregate_with};

fn amounts(values: &[&str]) -> Vec<Record> {
    values
        .iter()
        .map(|value| Record::from_iter([("amt", *value)]))
        .collect()
}

#[test]
fn zero_and_non_numeric_values_are_absent() {
    let result = compute_aggregate(&amounts(&["100", "0", "abc", "50"]), "amt");

    assert_eq!(
        result,
        AggregateResult {
            sum: 150.0,
            avg: 75.0,
            max: 100.0,
            min: 50.0,
            count: 2,
        }
    );
}

#[test]
fn no_usable_values_yield_all_zero() {
    assert_eq!(compute_aggregate(&[], "amt"), AggregateResult::default());
    assert_eq!(
        compute_aggregate(&amounts(&["", "n/a", "0"]), "amt"),
        AggregateResult::default()
    );
}

#[test]
fn custom_absence_predicate_is_honoured() {
    let records = amounts(&["0", "-1", "5", "999"]);

    let keep_zero = compute_aggregate_with(&records, "amt", |v| AbsencePolicy::None.is_absent(v));
    assert_eq!(keep_zero.count, 4);

    let drop_sentinel = compute_aggregate_with(&records, "amt", |v| v == 999.0 || v < 0.0);
    assert_eq!(drop_sentinel.count, 2);
    assert_eq!(drop_sentinel.sum, 5.0);
    assert_eq!(drop_sentinel.min, 0.0);
}

proptest! {
    #[test]
    fn sum_is_partition_additive(
        values in proptest::collection::vec(-1000i32..1000, 0..40),
        split in 0usize..40,
    ) {
        let records = values
            .iter()
            .map(|value| Record::from_iter([("amt", value.to_string())]))
            .collect::<Vec<_>>();
        let split = split.min(records.len());
        let (left, right) = records.split_at(split);

        let whole = compute_aggregate(&records, "amt");
        let a = compute_aggregate(left, "amt");
        let b = compute_aggregate(right, "amt");

        prop_assert_eq!(whole.sum, a.sum + b.sum);
        prop_assert_eq!(whole.count, a.count + b.count);
    }
}
