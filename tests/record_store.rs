// tests/record_store.rs

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use dib2cloud::config::Provider;
use dib2cloud::errors::Dib2CloudError;
use dib2cloud::record::{JobId, JobKind, JobRecord, RecordStore};
use dib2cloud::tracker::build::BuildJob;
use dib2cloud::tracker::upload::UploadJob;

fn build_record(dir: &std::path::Path) -> JobRecord {
    let mut env_vars = BTreeMap::new();
    env_vars.insert("var1".to_string(), "val1".to_string());
    JobRecord::new(
        JobId::generate(),
        dir,
        JobKind::Build(BuildJob {
            name: "test_diskimage".to_string(),
            elements: vec!["element1".to_string(), "element2".to_string()],
            output_formats: vec!["qcow2".to_string(), "raw".to_string()],
            release: Some("releaseno".to_string()),
            env_vars,
            log_dir: PathBuf::from("/var/log/dib2cloud"),
            images_dir: PathBuf::from("/var/lib/dib2cloud/images"),
        }),
    )
}

#[test]
fn build_record_round_trips_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("builds"));

    let mut record = build_record(store.dir());
    record.pid = Some(4242);
    store.save(&record).unwrap();

    let loaded = store.read(&record.id).unwrap();
    assert_eq!(loaded, record);
    assert_eq!(
        store.record_path(&record.id),
        store.dir().join(format!("{}.record", record.id))
    );
}

#[test]
fn upload_record_round_trips_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let build = build_record(dir.path());
    let provider = Provider {
        name: "test_provider".to_string(),
        cloud: "dib2cloud_test".to_string(),
    };
    let store = RecordStore::new(dir.path().join("uploads"));

    let mut job = UploadJob::for_build(&build, "qcow2", &provider).unwrap();
    job.remote_object_id = Some("glance-uuid-1234".to_string());
    let record = JobRecord::new(JobId::generate(), store.dir(), JobKind::Upload(job));
    store.save(&record).unwrap();

    assert_eq!(store.read(&record.id).unwrap(), record);
}

#[test]
fn unstarted_record_has_no_pid_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());
    let record = build_record(store.dir());
    store.save(&record).unwrap();

    assert_eq!(store.read(&record.id).unwrap().pid, None);
}

#[test]
fn missing_record_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());
    let id = JobId::generate();

    match store.read(&id) {
        Err(Dib2CloudError::RecordNotFound(missing)) => assert_eq!(missing, id),
        other => panic!("expected RecordNotFound, got {other:?}"),
    }
}

#[test]
fn truncated_record_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());
    let record = build_record(store.dir());
    store.save(&record).unwrap();

    let path = store.record_path(&record.id);
    let body = fs::read_to_string(&path).unwrap();
    fs::write(&path, &body[..body.len() / 2]).unwrap();

    assert!(matches!(
        store.read(&record.id),
        Err(Dib2CloudError::RecordCorrupt { .. })
    ));
}

#[test]
fn record_filed_under_the_wrong_id_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());
    let record = build_record(store.dir());
    store.save(&record).unwrap();

    let other = JobId::generate();
    fs::copy(store.record_path(&record.id), store.record_path(&other)).unwrap();

    assert!(matches!(
        store.read(&other),
        Err(Dib2CloudError::RecordCorrupt { .. })
    ));
}

#[test]
fn list_of_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("does").join("not").join("exist"));

    assert!(store.list().unwrap().is_empty());
    assert!(store.load_all().unwrap().is_empty());
    assert!(!store.dir().exists());
}

#[test]
fn list_only_reports_record_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());
    let a = build_record(store.dir());
    let b = build_record(store.dir());
    store.save(&a).unwrap();
    store.save(&b).unwrap();
    fs::write(dir.path().join("notes.txt"), "x").unwrap();

    let ids = store.list().unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a.id));
    assert!(ids.contains(&b.id));
}

#[test]
fn remove_deletes_record_and_lock() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());
    let record = build_record(store.dir());
    store.save(&record).unwrap();

    store.acquire(&record.id).unwrap().remove().unwrap();

    assert!(matches!(
        store.read(&record.id),
        Err(Dib2CloudError::RecordNotFound(_))
    ));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn concurrent_updates_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RecordStore::new(dir.path()));
    let record = build_record(store.dir());
    store.save(&record).unwrap();

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let id = record.id.clone();
            thread::spawn(move || {
                store
                    .update(&id, |r| {
                        if let JobKind::Build(job) = &mut r.job {
                            job.env_vars.insert(format!("writer{i}"), i.to_string());
                        }
                    })
                    .unwrap();
            })
        })
        .collect();
    for w in writers {
        w.join().unwrap();
    }

    let JobKind::Build(job) = store.read(&record.id).unwrap().job else {
        panic!("record changed kind");
    };
    for i in 0..8 {
        assert_eq!(job.env_vars.get(&format!("writer{i}")), Some(&i.to_string()));
    }
}

#[test]
fn writer_blocked_across_a_remove_does_not_share_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RecordStore::new(dir.path()));
    let record = build_record(store.dir());
    store.save(&record).unwrap();

    let holder = store.acquire(&record.id).unwrap();

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let waiter = {
        let store = Arc::clone(&store);
        let id = record.id.clone();
        thread::spawn(move || {
            let locked = store.acquire(&id).unwrap();
            locked_tx.send(locked.read().is_ok()).unwrap();
            release_rx.recv().unwrap();
        })
    };

    // Let the waiter block on the lock file that is about to be unlinked.
    thread::sleep(Duration::from_millis(200));
    holder.remove().unwrap();

    let record_still_there = locked_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(!record_still_there);

    let (third_tx, third_rx) = mpsc::channel();
    let third = {
        let store = Arc::clone(&store);
        let id = record.id.clone();
        thread::spawn(move || {
            let _locked = store.acquire(&id).unwrap();
            third_tx.send(()).unwrap();
        })
    };

    assert!(
        third_rx.recv_timeout(Duration::from_millis(300)).is_err(),
        "a second writer got the lock while the first still held it"
    );

    release_tx.send(()).unwrap();
    third_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    waiter.join().unwrap();
    third.join().unwrap();
}
