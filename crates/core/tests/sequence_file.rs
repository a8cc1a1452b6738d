use chrono::NaiveDate;
use epay_core::{AccountNumberGenerator, FileSequenceStore, SequenceStore};

#[test]
fn missing_file_starts_at_one_and_persists_last_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_account.txt");
    let gen = AccountNumberGenerator::new(FileSequenceStore::new(&path));
    let today = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();

    assert_eq!(gen.next_for(today).unwrap().as_str(), "301025001");
    assert_eq!(gen.next_for(today).unwrap().as_str(), "301025002");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "301025002");
}

#[test]
fn a_fresh_generator_continues_from_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_account.txt");
    std::fs::write(&path, "301025041\n").unwrap();

    let gen = AccountNumberGenerator::new(FileSequenceStore::new(&path));
    let today = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
    assert_eq!(gen.next_for(today).unwrap().as_str(), "301025042");
}

#[test]
fn yesterdays_value_is_replaced_not_appended() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_account.txt");
    let store = FileSequenceStore::new(&path);
    store.save("291025017").unwrap();

    let gen = AccountNumberGenerator::new(store);
    let today = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
    assert_eq!(gen.next_for(today).unwrap().as_str(), "301025001");
    assert_eq!(gen.store().load().unwrap(), "301025001");
}
