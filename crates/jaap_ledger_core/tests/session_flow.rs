use jaap_ledger_core::db::open_db_in_memory;
use jaap_ledger_core::{
    EntryDate, Ledger, LedgerEntry, LedgerSession, LedgerStore, LoadSource, MilestoneCalendar,
    PersistenceGateway, RepoError, RepoResult, RestoreOutcome, SessionError, SqliteLedgerStore,
    UpdateOutcome, CRORE,
};
use std::cell::{Cell, RefCell};

fn date(value: &str) -> EntryDate {
    EntryDate::parse(value).unwrap()
}

fn today() -> EntryDate {
    date("2024-06-15")
}

/// In-memory store with switchable write failures.
#[derive(Default)]
struct FlakyStore {
    primary: RefCell<Option<String>>,
    backup: RefCell<Option<String>>,
    fail_primary_writes: Cell<bool>,
    fail_backup_writes: Cell<bool>,
    fail_reads: Cell<bool>,
}

impl LedgerStore for FlakyStore {
    fn read_primary(&self) -> RepoResult<Option<String>> {
        if self.fail_reads.get() {
            return Err(RepoError::Backend("primary read failed".to_string()));
        }
        Ok(self.primary.borrow().clone())
    }

    fn write_primary(&self, payload: &str) -> RepoResult<()> {
        if self.fail_primary_writes.get() {
            return Err(RepoError::Backend("disk full".to_string()));
        }
        *self.primary.borrow_mut() = Some(payload.to_string());
        Ok(())
    }

    fn clear_primary(&self) -> RepoResult<()> {
        *self.primary.borrow_mut() = None;
        Ok(())
    }

    fn read_backup(&self) -> RepoResult<Option<String>> {
        if self.fail_reads.get() {
            return Err(RepoError::Backend("backup read failed".to_string()));
        }
        Ok(self.backup.borrow().clone())
    }

    fn write_backup(&self, payload: &str) -> RepoResult<()> {
        if self.fail_backup_writes.get() {
            return Err(RepoError::Backend("backup slot locked".to_string()));
        }
        *self.backup.borrow_mut() = Some(payload.to_string());
        Ok(())
    }
}

fn stored_primary(store: &FlakyStore) -> Option<Ledger> {
    store
        .primary
        .borrow()
        .as_deref()
        .map(|raw| serde_json::from_str(raw).unwrap())
}

#[test]
fn start_synthesizes_today_without_persisting_it() {
    let store = FlakyStore::default();
    let session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );

    assert_eq!(session.load_source(), LoadSource::Empty);
    let entry = session.ledger().get(&today()).expect("today synthesized");
    assert_eq!(entry.count, None);
    assert!(entry.notes.is_empty());
    assert!(store.primary.borrow().is_none());
    assert!(store.backup.borrow().is_none());
}

#[test]
fn update_entry_saves_primary_then_backup() {
    let store = FlakyStore::default();
    let mut session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );

    let outcome = session
        .update_entry(&today(), Some(1_080), "morning mala")
        .unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Saved(LedgerEntry::new(today(), Some(1_080), "morning mala"))
    );

    let primary = stored_primary(&store).expect("primary written");
    assert_eq!(primary.get(&today()).and_then(|entry| entry.count), Some(1_080));

    let backup = session.gateway().latest_backup().expect("backup written");
    assert_eq!(backup.entries, primary);
    assert!(backup.backed_up_at.is_some());
}

#[test]
fn update_entry_within_window_creates_missing_past_entry() {
    let store = FlakyStore::default();
    let mut session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );

    let outcome = session
        .update_entry(&date("2024-06-08"), Some(54), "")
        .unwrap();
    assert!(matches!(outcome, UpdateOutcome::Saved(_)));
    assert_eq!(session.ledger().len(), 2);
}

#[test]
fn locked_entries_are_rejected_without_state_change() {
    let store = FlakyStore::default();
    let seeded = Ledger::from_entries(vec![LedgerEntry::new(date("2024-06-01"), Some(7), "old")])
        .unwrap();
    *store.primary.borrow_mut() = Some(serde_json::to_string(&seeded).unwrap());

    let mut session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );
    let before = session.ledger().clone();
    let raw_before = store.primary.borrow().clone();

    let outcome = session
        .update_entry(&date("2024-06-07"), Some(1), "too late")
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Rejected);
    let outcome = session
        .update_entry(&date("2024-06-01"), Some(99), "rewrite")
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Rejected);

    assert_eq!(session.ledger(), &before);
    assert_eq!(*store.primary.borrow(), raw_before);
    assert!(store.backup.borrow().is_none());
}

#[test]
fn failed_primary_save_surfaces_error_and_keeps_memory_edit() {
    let store = FlakyStore::default();
    let mut session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );
    store.fail_primary_writes.set(true);

    let err = session
        .update_entry(&today(), Some(11), "")
        .expect_err("write failure must surface");
    assert!(matches!(err, SessionError::Persist(_)));
    assert_eq!(session.ledger().get(&today()).and_then(|e| e.count), Some(11));
    assert!(store.primary.borrow().is_none());
    assert!(store.backup.borrow().is_none());
}

#[test]
fn failed_backup_surfaces_error_after_primary_succeeds() {
    let store = FlakyStore::default();
    let mut session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );
    store.fail_backup_writes.set(true);

    let err = session.update_entry(&today(), Some(21), "").unwrap_err();
    assert!(matches!(err, SessionError::Persist(_)));
    assert!(stored_primary(&store).is_some());
    assert!(store.backup.borrow().is_none());
}

#[test]
fn read_failures_fall_through_to_empty() {
    let store = FlakyStore::default();
    *store.primary.borrow_mut() = Some("[]".to_string());
    store.fail_reads.set(true);

    let session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );
    assert_eq!(session.load_source(), LoadSource::Empty);
    assert_eq!(session.ledger().len(), 1);
}

#[test]
fn edit_after_loading_a_partly_bad_payload_keeps_history() {
    let store = FlakyStore::default();
    let stored = r#"[{"date":"2024-06-01","jaap":5000,"notes":""},{"date":"2024-06-02","jaap":7000,"notes":null}]"#;
    *store.primary.borrow_mut() = Some(stored.to_string());

    let mut session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );
    assert_eq!(session.load_source(), LoadSource::Primary);
    assert_eq!(session.ledger().len(), 3);

    session.update_entry(&today(), Some(1), "").unwrap();

    let primary = stored_primary(&store).expect("primary written");
    assert_eq!(primary.get(&date("2024-06-01")).and_then(|e| e.count), Some(5_000));
    assert_eq!(primary.get(&date("2024-06-02")).and_then(|e| e.count), Some(7_000));
    let backup = session.gateway().latest_backup().expect("backup written");
    assert_eq!(backup.entries, primary);
}

#[test]
fn failed_repair_still_loads_from_backup() {
    let store = FlakyStore::default();
    let gateway = PersistenceGateway::new(&store);
    let backed_up = Ledger::from_entries(vec![LedgerEntry::new(date("2024-06-10"), Some(5), "")])
        .unwrap();
    gateway.backup(&backed_up).unwrap();
    store.fail_primary_writes.set(true);

    let outcome = gateway.load();
    assert_eq!(outcome.source, LoadSource::Backup);
    assert_eq!(outcome.ledger, backed_up);
    assert!(store.primary.borrow().is_none());
}

#[test]
fn restore_with_failing_primary_save_replaces_memory_and_surfaces_error() {
    let store = FlakyStore::default();
    let gateway = PersistenceGateway::new(&store);
    let backed_up = Ledger::from_entries(vec![LedgerEntry::new(date("2024-06-10"), Some(5), "")])
        .unwrap();
    gateway.backup(&backed_up).unwrap();
    gateway
        .save(
            &Ledger::from_entries(vec![LedgerEntry::new(date("2024-06-12"), Some(500), "")])
                .unwrap(),
        )
        .unwrap();

    let mut session = LedgerSession::start(gateway, MilestoneCalendar::empty(), today());
    assert_eq!(session.load_source(), LoadSource::Primary);
    store.fail_primary_writes.set(true);

    let err = session
        .restore_from_backup(|_| true)
        .expect_err("primary write failure must surface");
    assert!(matches!(err, SessionError::Persist(_)));
    assert!(session.ledger().contains(&date("2024-06-10")));
    assert!(!session.ledger().contains(&date("2024-06-12")));
    let placeholder = session.ledger().get(&today()).expect("today placeholder");
    assert_eq!(placeholder.count, None);

    let primary = stored_primary(&store).expect("old primary kept");
    assert!(primary.contains(&date("2024-06-12")));
}

#[test]
fn restore_without_backup_reports_no_backup() {
    let store = FlakyStore::default();
    let mut session = LedgerSession::start(
        PersistenceGateway::new(&store),
        MilestoneCalendar::empty(),
        today(),
    );

    let outcome = session
        .restore_from_backup(|_| panic!("confirmation must not be requested"))
        .unwrap();
    assert_eq!(outcome, RestoreOutcome::NoBackup);
}

#[test]
fn restore_requires_confirmation() {
    let store = FlakyStore::default();
    let gateway = PersistenceGateway::new(&store);
    let backed_up = Ledger::from_entries(vec![LedgerEntry::new(date("2024-06-10"), Some(5), "")])
        .unwrap();
    gateway.backup(&backed_up).unwrap();

    let mut session = LedgerSession::start(gateway, MilestoneCalendar::empty(), today());
    assert_eq!(session.load_source(), LoadSource::Backup);
    session.update_entry(&today(), Some(9), "newer").unwrap();
    let before = session.ledger().clone();

    let mut asked = false;
    let outcome = session
        .restore_from_backup(|summary| {
            asked = true;
            assert_eq!(summary.entry_count, 2);
            false
        })
        .unwrap();
    assert!(asked);
    assert_eq!(outcome, RestoreOutcome::Declined);
    assert_eq!(session.ledger(), &before);
}

#[test]
fn confirmed_restore_replaces_memory_and_primary() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();
    let gateway = PersistenceGateway::new(&store);
    let backed_up = Ledger::from_entries(vec![LedgerEntry::new(date("2024-06-10"), Some(5), "")])
        .unwrap();
    gateway.backup(&backed_up).unwrap();
    gateway
        .save(
            &Ledger::from_entries(vec![LedgerEntry::new(date("2024-06-12"), Some(500), "")])
                .unwrap(),
        )
        .unwrap();

    let mut session = LedgerSession::start(gateway, MilestoneCalendar::empty(), today());
    assert_eq!(session.load_source(), LoadSource::Primary);

    let outcome = session.restore_from_backup(|_| true).unwrap();
    assert_eq!(outcome, RestoreOutcome::Restored { entry_count: 1 });
    assert!(session.ledger().contains(&date("2024-06-10")));
    assert!(!session.ledger().contains(&date("2024-06-12")));
    assert!(session.ledger().contains(&today()));

    let reloaded = session.gateway().load();
    assert_eq!(reloaded.ledger, backed_up);
}

#[test]
fn snapshot_lists_past_rows_newest_first_with_annotations() {
    let store = FlakyStore::default();
    let seeded = Ledger::from_entries(vec![
        LedgerEntry::new(date("2024-06-01"), Some(CRORE - 1), ""),
        LedgerEntry::new(date("2024-06-09"), Some(1), "Poornima vrat"),
        LedgerEntry::new(date("2024-06-20"), Some(3), "future"),
    ])
    .unwrap();
    *store.primary.borrow_mut() = Some(serde_json::to_string(&seeded).unwrap());
    let calendar = MilestoneCalendar::from_dates([date("2024-06-15")]);

    let session = LedgerSession::start(PersistenceGateway::new(&store), calendar, today());
    let snapshot = session.snapshot();

    let dates = snapshot
        .rows
        .iter()
        .map(|row| row.date.as_str())
        .collect::<Vec<_>>();
    assert_eq!(dates, vec!["2024-06-15", "2024-06-09", "2024-06-01"]);

    let today_row = &snapshot.rows[0];
    assert!(today_row.editable);
    assert!(today_row.poornima);
    assert!(snapshot.today_is_poornima);
    assert_eq!(snapshot.today.date, today());

    let crossing = &snapshot.rows[1];
    assert_eq!(crossing.milestone, Some(1));
    assert!(crossing.poornima);
    assert!(crossing.editable);

    let locked = &snapshot.rows[2];
    assert!(!locked.editable);
    assert_eq!(locked.milestone, None);
    assert!(!locked.sunday);

    assert_eq!(snapshot.summary.total, CRORE + 3);
    assert_eq!(snapshot.summary.progress.completed, 1);
    assert_eq!(snapshot.summary.yearly_totals.get("2024"), Some(&(CRORE + 3)));
    assert_eq!(snapshot.load_source, LoadSource::Primary);
}
