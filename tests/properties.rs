use proptest::prelude::*;

use rowsieve::data::codec::{decode, encode};
use rowsieve::data::filter::apply;
use rowsieve::{FilterExpression, Format, TabularDataset, Value};

#[derive(Debug, Clone, Copy)]
enum Kind {
    Int,
    Float,
    Text,
    Flag,
}

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::Int),
        Just(Kind::Float),
        Just(Kind::Text),
        Just(Kind::Flag)
    ]
}

/// Cells every encoding represents unambiguously for a column of `kind`.
fn cell(kind: Kind) -> BoxedStrategy<Value> {
    let value = match kind {
        Kind::Int => any::<i64>().prop_map(Value::Integer).boxed(),
        // quarter steps are exact in binary
        Kind::Float => (-4000i32..4000)
            .prop_map(|q| Value::Float(f64::from(q) / 4.0))
            .boxed(),
        Kind::Text => "s_[a-z ,\"]{0,6}".prop_map(Value::String).boxed(),
        Kind::Flag => any::<bool>().prop_map(Value::Bool).boxed(),
    };
    prop_oneof![4 => value, 1 => Just(Value::Null)].boxed()
}

fn dataset() -> impl Strategy<Value = TabularDataset> {
    (prop::collection::vec(kind(), 1..4), 1usize..12).prop_flat_map(|(kinds, rows)| {
        let columns: Vec<String> = (0..kinds.len()).map(|i| format!("c{i}")).collect();
        let row = kinds.into_iter().map(cell).collect::<Vec<_>>();
        prop::collection::vec(row, rows).prop_map(move |rows| {
            TabularDataset::try_new(columns.clone(), rows).unwrap()
        })
    })
}

fn numbers() -> impl Strategy<Value = TabularDataset> {
    prop::collection::vec((-50i64..50, -50i64..50), 0..30).prop_map(|pairs| {
        let rows = pairs
            .into_iter()
            .map(|(a, b)| vec![Value::Integer(a), Value::Integer(b)])
            .collect();
        TabularDataset::try_new(vec!["a".into(), "b".into()], rows).unwrap()
    })
}

fn filters(texts: &[String]) -> Vec<FilterExpression> {
    texts
        .iter()
        .map(|t| FilterExpression::new(t).unwrap())
        .collect()
}

proptest! {
    #[test]
    fn round_trips_every_format(ds in dataset()) {
        for format in Format::ALL {
            let bytes = encode(&ds, format).unwrap();
            prop_assert_eq!(&decode(&bytes, format).unwrap(), &ds, "format {}", format);
        }
    }

    #[test]
    fn chain_is_deterministic_and_intersective(
        ds in numbers(),
        x in -50i64..50,
        y in -50i64..50,
    ) {
        let e1 = format!("a >= {x}");
        let e2 = format!("b < {y} or a == {y}");

        let both = apply(&ds, &filters(&[e1.clone(), e2.clone()])).unwrap();
        let again = apply(&ds, &filters(&[e1.clone(), e2.clone()])).unwrap();
        prop_assert_eq!(&both, &again);

        let first = apply(&ds, &filters(&[e1])).unwrap();
        let staged = apply(&first, &filters(&[e2])).unwrap();
        prop_assert_eq!(&both, &staged);

        // every surviving row is also a row of the first stage, in the same order
        let mut it = first.rows().iter();
        for row in both.rows() {
            prop_assert!(it.any(|r| r == row));
        }

        // an already-satisfied chain removes nothing more
        let reapplied = apply(&both, &filters(&[format!("a >= {x}")])).unwrap();
        prop_assert_eq!(&reapplied, &both);
    }
}
