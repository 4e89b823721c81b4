// tests/record_property.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use proptest::prelude::*;

use dib2cloud::record::{JobId, JobKind, JobRecord, RecordStore};
use dib2cloud::tracker::build::BuildJob;

fn build_job() -> impl Strategy<Value = BuildJob> {
    (
        "[a-zA-Z0-9_.-]{1,24}",
        prop::collection::vec("\\PC{1,16}", 1..5),
        prop::collection::vec("(qcow2|raw|vhd|tar)", 1..4),
        prop::option::of("\\PC{0,12}"),
        prop::collection::btree_map("[A-Z_]{1,12}", "\\PC{0,20}", 0..4),
    )
        .prop_map(|(name, elements, output_formats, release, env_vars)| BuildJob {
            name,
            elements,
            output_formats,
            release,
            log_dir: PathBuf::from("/var/log/dib2cloud"),
            images_dir: PathBuf::from("/var/lib/dib2cloud/images"),
            env_vars: env_vars.into_iter().collect::<BTreeMap<_, _>>(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stored_records_read_back_unchanged(job in build_job(), pid in prop::option::of(1u32..4_000_000)) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());

        let mut record = JobRecord::new(JobId::generate(), store.dir(), JobKind::Build(job));
        record.pid = pid;
        store.save(&record).unwrap();

        prop_assert_eq!(store.read(&record.id).unwrap(), record.clone());
        prop_assert!(store.list().unwrap().contains(&record.id));
    }
}
