use rustmemorm::prelude::*;
use rustmemorm::{ChangeKind, MarshalError, QueryBuildError, Storage};

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Note {
    id: Identity,
    title: String,
    pinned: bool,
}

#[derive(Entity, Debug, Default, Clone)]
#[entity(table = "archived_notes", id = "note_id")]
struct ArchivedNote {
    key: Identity,
    #[column(name = "heading")]
    title: String,
    #[column(skip)]
    scratch: String,
}

fn session() -> Session {
    let session = Session::memory().unwrap();
    session.create_table::<Note>().unwrap();
    session
}

fn note(title: &str, pinned: bool) -> Note {
    Note {
        title: title.to_string(),
        pinned,
        ..Default::default()
    }
}

#[test]
fn test_note_lifecycle() {
    let session = session();

    let mut first = note("a", true);
    assert_eq!(session.save(&mut first).unwrap(), 1);
    assert_eq!(first.id.get(), Some(1));

    let loaded = session.load::<Note>(1).unwrap().unwrap();
    assert_eq!(loaded.id.get(), Some(1));
    assert_eq!(loaded.title, "a");
    assert!(loaded.pinned);

    let changed = session
        .update::<Note>()
        .unwrap()
        .set("pinned = ?", params![false])
        .filter("id = ?", params![1])
        .execute()
        .unwrap();
    assert_eq!(changed, 1);
    assert!(!session.load::<Note>(1).unwrap().unwrap().pinned);

    assert_eq!(session.delete_by_id::<Note>(1).unwrap(), 1);
    assert!(session.load::<Note>(1).unwrap().is_none());
}

#[test]
fn test_save_existing_updates_in_place() {
    let session = session();

    let mut n = note("draft", false);
    let id = session.save(&mut n).unwrap();

    n.title = "final".to_string();
    assert_eq!(session.save(&mut n).unwrap(), id);
    assert_eq!(n.id.get(), Some(id));

    let all = session.select().from::<Note>().unwrap().fetch_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "final");
}

#[test]
fn test_delete_keeps_identity() {
    let session = session();

    let mut n = note("gone", false);
    session.save(&mut n).unwrap();
    assert_eq!(session.delete(&n).unwrap(), 1);
    assert!(n.id.is_assigned());
    assert_eq!(session.delete(&n).unwrap(), 0);

    let unsaved = note("never", false);
    assert_eq!(session.delete(&unsaved).unwrap(), 0);
}

#[test]
fn test_load_missing_row_is_none() {
    let session = session();
    assert!(session.load::<Note>(42).unwrap().is_none());
}

#[test]
fn test_invalid_utf8_column_fails_alone() {
    let session = session();
    let id = session.save(&mut note("ok", true)).unwrap();
    session
        .storage()
        .execute_write(
            "UPDATE note SET title = CAST(X'66FF' AS TEXT) WHERE id = ?",
            &[SqlValue::Integer(id)],
        )
        .unwrap();

    let descriptor = session.describe::<Note>().unwrap();
    let row = session
        .storage()
        .query("SELECT * FROM note WHERE id = ?", &[SqlValue::Integer(id)])
        .unwrap()
        .next()
        .unwrap();
    let decoded = rustmemorm::marshal::from_row::<Note>(&row, &descriptor).unwrap();
    assert_eq!(decoded.errors.len(), 1);
    assert!(matches!(
        &decoded.errors[0],
        MarshalError::Decode { column, .. } if column == "title"
    ));

    let loaded = session.load::<Note>(id).unwrap().unwrap();
    assert_eq!(loaded.title, "");
    assert!(loaded.pinned);
}

#[test]
fn test_truncate_resets_identity_counter() {
    let session = session();
    for title in ["a", "b", "c"] {
        session.save(&mut note(title, false)).unwrap();
    }

    assert_eq!(session.truncate::<Note>().unwrap(), 3);
    assert_eq!(session.select().from::<Note>().unwrap().count().unwrap(), 0);

    let mut again = note("d", false);
    assert_eq!(session.save(&mut again).unwrap(), 1);
}

#[test]
fn test_custom_table_and_columns() {
    let session = Session::memory().unwrap();
    assert_eq!(session.table_name_of::<ArchivedNote>().unwrap(), "archived_notes");

    let descriptor = session.describe::<ArchivedNote>().unwrap();
    assert_eq!(descriptor.id_column(), "note_id");
    assert_eq!(descriptor.column_names(), vec!["heading"]);

    session.create_table::<ArchivedNote>().unwrap();
    let mut archived = ArchivedNote {
        title: "old".into(),
        scratch: "not stored".into(),
        ..Default::default()
    };
    let id = session.save(&mut archived).unwrap();

    let loaded = session.load::<ArchivedNote>(id).unwrap().unwrap();
    assert_eq!(loaded.title, "old");
    assert_eq!(loaded.scratch, "");
    assert_eq!(loaded.key.get(), Some(id));
}

#[test]
fn test_transaction_rolls_back_on_error() {
    let session = session();

    let result: rustmemorm::Result<()> = session.transaction(|s| {
        s.save(&mut note("inside", false))?;
        Err(QueryBuildError::MissingTable.into())
    });
    assert!(result.is_err());
    assert!(!session.in_transaction().unwrap());
    assert_eq!(session.select().from::<Note>().unwrap().count().unwrap(), 0);

    let id = session
        .transaction(|s| s.save(&mut note("kept", true)))
        .unwrap();
    assert!(session.load::<Note>(id).unwrap().is_some());
}

#[test]
fn test_manual_transaction_control() {
    let session = session();

    session.begin().unwrap();
    assert!(session.in_transaction().unwrap());
    session.save(&mut note("temp", false)).unwrap();
    session.rollback().unwrap();

    assert!(!session.in_transaction().unwrap());
    assert!(session.load::<Note>(1).unwrap().is_none());
}

#[test]
fn test_change_events() {
    let session = session();
    let events = session.subscribe().unwrap();

    let mut n = note("watched", false);
    session.save(&mut n).unwrap();
    n.pinned = true;
    session.save(&mut n).unwrap();
    session.delete(&n).unwrap();
    session.truncate::<Note>().unwrap();

    let kinds: Vec<_> = events.try_iter().map(|event| (event.kind, event.identity)).collect();
    assert_eq!(
        kinds,
        vec![
            (ChangeKind::Insert, Some(1)),
            (ChangeKind::Update, Some(1)),
            (ChangeKind::Delete, Some(1)),
            (ChangeKind::Truncate, None),
        ]
    );
}

#[test]
fn test_same_entity() {
    let session = session();

    let mut a = note("x", false);
    let b = note("x", false);
    assert!(same_entity(&a, &a));
    assert!(!same_entity(&a, &b));

    session.save(&mut a).unwrap();
    let loaded = session.load::<Note>(1).unwrap().unwrap();
    assert!(same_entity(&a, &loaded));
    assert_eq!(a.id, loaded.id);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_open_url() {
    let session = Session::open_url("sqlite::memory:?").err();
    assert!(session.is_some());

    let session = Session::open_url("sqlite::memory:").unwrap();
    assert!(session.config().is_memory());
}
