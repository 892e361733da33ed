use rustmemorm::prelude::*;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Entity, Debug, Default, Clone)]
struct Task {
    id: Identity,
    title: String,
    done: bool,
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.db");
    let config = SessionConfig::new(path.to_str().unwrap()).busy_timeout(Duration::from_millis(500));

    {
        let session = Session::open(config.clone()).unwrap();
        session.create_table::<Task>().unwrap();
        for title in ["write", "review", "ship"] {
            session
                .save(&mut Task {
                    title: title.into(),
                    ..Default::default()
                })
                .unwrap();
        }
        session
            .update::<Task>()
            .unwrap()
            .set_value("done", true)
            .filter("title = ?", params!["write"])
            .execute()
            .unwrap();
    }

    let session = Session::open(config).unwrap();
    session.create_table::<Task>().unwrap();

    let done = session
        .select()
        .from::<Task>()
        .unwrap()
        .filter("done = ?", params![true])
        .fetch_all()
        .unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].title, "write");

    let mut next = Task {
        title: "celebrate".into(),
        ..Default::default()
    };
    assert_eq!(session.save(&mut next).unwrap(), 4);
}

#[test]
fn test_open_from_url() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("url.db");
    let url = format!("sqlite://{}?reference_depth=2&log_statements=true", path.display());

    let session = Session::open_url(&url).unwrap();
    assert_eq!(session.config().reference_depth, 2);
    assert!(session.config().log_statements);

    session.create_table::<Task>().unwrap();
    session
        .save(&mut Task {
            title: "from url".into(),
            ..Default::default()
        })
        .unwrap();
    assert!(path.exists());
}

#[test]
fn test_bad_url_is_a_config_error() {
    assert!(matches!(
        Session::open_url("mysql://localhost/db"),
        Err(OrmError::Config(_))
    ));
}
