//! Small note-taking walkthrough: save, query, update, follow references.
//!
//! Run with `cargo run --example notes`.

use anyhow::{Context, Result};
use rustmemorm::prelude::*;

#[derive(Entity, Debug, Default, Clone)]
#[entity(table = "notebooks")]
struct Notebook {
    id: Identity,
    name: String,
}

#[derive(ColumnEnum, Debug, Default, Clone, Copy, PartialEq)]
enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Entity, Debug, Default, Clone)]
#[entity(table = "notes")]
struct Note {
    id: Identity,
    title: String,
    pinned: bool,
    priority: Priority,
    notebook: ForeignKey<Notebook>,
    created_at: chrono::DateTime<chrono::Utc>,
}

fn main() -> Result<()> {
    let session = Session::open(SessionConfig::memory().reference_depth(1))?;
    session.create_table::<Notebook>()?;
    session.create_table::<Note>()?;

    let changes = session.subscribe()?;

    let mut work = Notebook {
        name: "work".into(),
        ..Default::default()
    };
    session.save(&mut work)?;

    for (title, priority) in [
        ("Quarterly report", Priority::High),
        ("Team lunch", Priority::Low),
        ("Review PRs", Priority::Normal),
    ] {
        let mut note = Note {
            title: title.into(),
            priority,
            notebook: ForeignKey::to(&work),
            created_at: chrono::Utc::now(),
            ..Default::default()
        };
        session.save(&mut note)?;
    }

    session
        .update::<Note>()?
        .set("pinned = ?", params![true])
        .filter("priority = ?", params!["High"])
        .execute()?;

    let pinned = session
        .select()
        .from::<Note>()?
        .filter("pinned = ?", params![true])
        .execute_single()?
        .context("expected a pinned note")?;
    println!(
        "Pinned: {} in notebook {:?}",
        pinned.title,
        pinned.notebook.get().map(|n| n.name.as_str())
    );

    for note in session.select().from::<Note>()?.order_by("title").execute()? {
        let note = note?;
        println!("#{} {:<20} {:?}", note.id, note.title, note.priority);
    }

    let removed = session
        .delete_query()
        .from::<Note>()?
        .filter("priority = ?", params!["Low"])
        .execute()?;
    println!("Removed {} low-priority note(s)", removed);

    for event in changes.try_iter() {
        println!("change: {:?} {} {:?}", event.kind, event.table, event.identity);
    }

    Ok(())
}
