use rustmemorm::prelude::*;

#[derive(Entity, Debug, Default, Clone)]
struct Author {
    id: Identity,
    name: String,
}

#[derive(Entity, Debug, Default, Clone)]
struct Book {
    id: Identity,
    title: String,
    author: ForeignKey<Author>,
}

#[derive(Entity, Debug, Default, Clone)]
struct Employee {
    id: Identity,
    name: String,
    manager: ForeignKey<Employee>,
}

fn open(depth: usize) -> Session {
    let session = Session::open(SessionConfig::memory().reference_depth(depth)).unwrap();
    session.create_table::<Author>().unwrap();
    session.create_table::<Book>().unwrap();
    session.create_table::<Employee>().unwrap();
    session
}

fn employee(session: &Session, name: &str, manager: Option<&Employee>) -> Employee {
    let mut e = Employee {
        name: name.into(),
        manager: manager.map(ForeignKey::to).unwrap_or_default(),
        ..Default::default()
    };
    session.save(&mut e).unwrap();
    e
}

#[test]
fn test_reference_column_sql() {
    let session = open(0);
    let sql = session.describe::<Book>().unwrap().create_table_sql();
    assert_eq!(
        sql,
        "CREATE TABLE IF NOT EXISTS book (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT, author INTEGER REFERENCES author(id))"
    );
}

#[test]
fn test_reference_is_stored_as_identity() {
    let session = open(0);
    let mut author = Author {
        name: "Herbert".into(),
        ..Default::default()
    };
    session.save(&mut author).unwrap();

    let mut book = Book {
        title: "Dune".into(),
        author: ForeignKey::to(&author),
        ..Default::default()
    };
    session.save(&mut book).unwrap();

    let mut loaded = session.load::<Book>(1).unwrap().unwrap();
    assert_eq!(loaded.author.id(), author.id.get());
    assert!(!loaded.author.is_loaded());

    let fetched = loaded.author.load(&session).unwrap().unwrap();
    assert_eq!(fetched.name, "Herbert");
    assert!(loaded.author.is_loaded());
}

#[test]
fn test_opt_in_depth_loads_references() {
    let session = open(1);
    let mut author = Author {
        name: "Herbert".into(),
        ..Default::default()
    };
    session.save(&mut author).unwrap();
    session
        .save(&mut Book {
            title: "Dune".into(),
            author: ForeignKey::to(&author),
            ..Default::default()
        })
        .unwrap();

    let book = session.load::<Book>(1).unwrap().unwrap();
    assert_eq!(book.author.get().map(|a| a.name.as_str()), Some("Herbert"));
}

#[test]
fn test_null_reference() {
    let session = open(3);
    session
        .save(&mut Book {
            title: "Anonymous".into(),
            ..Default::default()
        })
        .unwrap();

    let book = session.load::<Book>(1).unwrap().unwrap();
    assert_eq!(book.author.id(), None);
    assert!(book.author.get().is_none());
}

#[test]
fn test_depth_bounds_chain() {
    let session = open(1);
    let ceo = employee(&session, "ceo", None);
    let cto = employee(&session, "cto", Some(&ceo));
    let dev = employee(&session, "dev", Some(&cto));

    let loaded = session.load::<Employee>(dev.id.get().unwrap()).unwrap().unwrap();
    let manager = loaded.manager.get().unwrap();
    assert_eq!(manager.name, "cto");
    assert_eq!(manager.manager.id(), ceo.id.get());
    assert!(!manager.manager.is_loaded());
}

#[test]
fn test_cyclic_references_terminate() {
    let session = open(10);
    let mut alice = employee(&session, "alice", None);
    let bob = employee(&session, "bob", Some(&alice));
    alice.manager = ForeignKey::from_id(bob.id.get().unwrap());
    session.save(&mut alice).unwrap();

    let loaded = session.load::<Employee>(alice.id.get().unwrap()).unwrap().unwrap();
    let manager = loaded.manager.get().unwrap();
    assert_eq!(manager.name, "bob");
    // bob -> alice closes the cycle and is left unloaded
    assert_eq!(manager.manager.id(), alice.id.get());
    assert!(!manager.manager.is_loaded());
}

#[test]
fn test_dangling_reference_is_a_storage_error() {
    let session = open(0);
    let mut book = Book {
        title: "Orphan".into(),
        author: ForeignKey::from_id(99),
        ..Default::default()
    };
    assert!(matches!(session.save(&mut book), Err(OrmError::Storage(_))));
    assert!(!book.id.is_assigned());
}

#[test]
fn test_self_join_through_reference() {
    let session = open(0);
    let boss = employee(&session, "boss", None);
    employee(&session, "a", Some(&boss));
    employee(&session, "b", Some(&boss));

    let reports: Vec<Employee> = session.many(&boss, "manager").unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|e| e.manager.id() == boss.id.get()));
}
