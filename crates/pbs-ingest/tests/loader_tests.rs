//! Property tests for schema-on-write table loading

use std::collections::BTreeSet;

use pbs_ingest::api::{load_table, API_TABLES};
use pbs_ingest::schema::Record;
use pbs_ingest::storage::{table, SqliteSink};
use proptest::prelude::*;
use serde_json::Value;

// None of these is a declared key column, so generated rows never collide on
// a primary key.
const KEY_POOL: &[&str] = &["brand_name", "pack_size", "note", "determined_price", "manner_of_administration"];

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i32>().prop_map(Value::from),
        (-1.0e6..1.0e6f64).prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

fn record_strategy() -> impl Strategy<Value = Record> {
    proptest::collection::btree_map(proptest::sample::select(KEY_POOL), value_strategy(), 0..KEY_POOL.len())
        .prop_map(|fields| fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_loaded_table_covers_keys_and_records(
        table_index in 0..API_TABLES.len(),
        records in proptest::collection::vec(record_strategy(), 0..150),
    ) {
        let declaration = &API_TABLES[table_index];
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        let (columns, rows) = runtime.block_on(async {
            let mut sink = SqliteSink::open_in_memory().await.unwrap();
            let loaded = load_table(&mut sink, declaration, &records).await.unwrap();
            let columns = table::table_columns(sink.connection(), &declaration.table_name()).await.unwrap();
            (columns, loaded)
        });

        let names: BTreeSet<String> = columns.into_iter().map(|c| c.name).collect();
        for key in declaration.key_columns() {
            prop_assert!(names.contains(key), "key column {} missing", key);
        }
        for record in &records {
            for key in record.keys() {
                prop_assert!(names.contains(key), "record column {} missing", key);
            }
        }
        prop_assert_eq!(rows, records.len() as u64);
    }
}
