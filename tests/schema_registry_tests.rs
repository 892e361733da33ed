use rustmemorm::core::{FieldMismatch, FieldValue};
use rustmemorm::prelude::*;
use rustmemorm::{EntityDecl, FieldType, SchemaError, SchemaRegistry};
use std::sync::Arc;

#[derive(Entity, Debug, Default, Clone)]
struct BlogPost {
    id: Identity,
    title: String,
    body: Option<String>,
    views: u32,
    rating: f32,
    cover: Vec<u8>,
}

/// Hand-written entity whose declaration can be made invalid.
#[derive(Debug, Default)]
struct Raw {
    id: Identity,
}

macro_rules! raw_entity {
    ($name:ident, $decl:expr) => {
        #[derive(Debug, Default)]
        struct $name(Raw);

        impl Entity for $name {
            fn declaration() -> EntityDecl {
                $decl
            }

            fn identity(&self) -> &Identity {
                &self.0.id
            }

            fn identity_mut(&mut self) -> &mut Identity {
                &mut self.0.id
            }

            fn field_values(&self) -> Vec<(&'static str, FieldValue)> {
                Vec::new()
            }

            fn set_field(&mut self, _column: &str, _value: FieldValue) -> Result<bool, FieldMismatch> {
                Ok(false)
            }
        }
    };
}

raw_entity!(
    BadTable,
    EntityDecl::new::<BadTable>().table("drop table; --")
);
raw_entity!(
    DuplicateColumns,
    EntityDecl::new::<DuplicateColumns>()
        .field::<String>("a", "name")
        .field::<String>("b", "name")
);
raw_entity!(
    IdClash,
    EntityDecl::new::<IdClash>().field::<i64>("other", "id")
);
raw_entity!(Bare, EntityDecl::new::<Bare>());

#[derive(Entity, Debug, Default)]
struct Group {
    id: Identity,
    name: String,
}

#[derive(Entity, Debug, Default)]
struct Shipment {
    id: Identity,
    from: String,
}

#[derive(Entity, Debug, Default)]
#[entity(table = "ledger")]
struct LedgerLine {
    id: Identity,
    #[column(name = "order")]
    position: i64,
}

#[derive(Entity, Debug, Default)]
#[entity(table = "groups_", id = "key")]
struct KeyedGroup {
    id: Identity,
}

#[test]
fn test_describe_is_idempotent() {
    let registry = SchemaRegistry::default();
    let first = registry.describe::<BlogPost>().unwrap();
    let second = registry.describe::<BlogPost>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.table_name(), "blog_post");
    assert_eq!(first.id_column(), "id");
    assert_eq!(
        first.column_names(),
        vec!["title", "body", "views", "rating", "cover"]
    );
    assert_eq!(registry.descriptors().unwrap().len(), 1);
}

#[test]
fn test_field_types_and_kinds() {
    let registry = SchemaRegistry::default();
    let descriptor = registry.describe::<BlogPost>().unwrap();

    let views = descriptor.field("views").unwrap();
    assert_eq!(views.field_type(), FieldType::U32);
    assert_eq!(views.field_name(), "views");
    assert!(views.codec().is_none());

    assert_eq!(
        descriptor.create_table_sql(),
        "CREATE TABLE IF NOT EXISTS blog_post (id INTEGER PRIMARY KEY AUTOINCREMENT, \
         title TEXT, body TEXT, views INTEGER, rating REAL, cover BLOB)"
    );
}

#[test]
fn test_concurrent_first_use() {
    let registry = SchemaRegistry::default();
    let descriptors: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.describe::<BlogPost>().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(descriptors.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn test_invalid_declarations() {
    let registry = SchemaRegistry::default();

    assert!(matches!(
        registry.describe::<BadTable>().unwrap_err(),
        OrmError::Schema(SchemaError::InvalidIdentifier(name)) if name == "drop table; --"
    ));
    assert!(matches!(
        registry.describe::<DuplicateColumns>().unwrap_err(),
        OrmError::Schema(SchemaError::DuplicateColumn { column, .. }) if column == "name"
    ));
    assert!(matches!(
        registry.describe::<IdClash>().unwrap_err(),
        OrmError::Schema(SchemaError::AmbiguousIdentity { .. })
    ));
    assert!(!registry.is_described::<IdClash>().unwrap());
}

#[test]
fn test_keyword_names_are_rejected_at_first_use() {
    let session = Session::memory().unwrap();

    assert!(matches!(
        session.describe::<Group>().unwrap_err(),
        OrmError::Schema(SchemaError::InvalidIdentifier(name)) if name == "group"
    ));
    assert!(matches!(
        session.create_table::<Group>().unwrap_err(),
        OrmError::Schema(SchemaError::InvalidIdentifier(_))
    ));
    assert!(matches!(
        session.describe::<Shipment>().unwrap_err(),
        OrmError::Schema(SchemaError::InvalidIdentifier(name)) if name == "from"
    ));
    assert!(matches!(
        session.describe::<LedgerLine>().unwrap_err(),
        OrmError::Schema(SchemaError::InvalidIdentifier(name)) if name == "order"
    ));
    assert!(matches!(
        session.describe::<KeyedGroup>().unwrap_err(),
        OrmError::Schema(SchemaError::InvalidIdentifier(name)) if name == "key"
    ));
    assert!(!session.registry().is_described::<Group>().unwrap());
}

#[test]
fn test_entity_without_fields() {
    let session = Session::memory().unwrap();
    session.create_table::<Bare>().unwrap();

    let mut bare = Bare::default();
    assert_eq!(session.save(&mut bare).unwrap(), 1);
    assert!(session.load::<Bare>(1).unwrap().is_some());
}

#[test]
fn test_full_row_round_trip() {
    let session = Session::memory().unwrap();
    session.create_table::<BlogPost>().unwrap();

    let mut post = BlogPost {
        title: "Hello".into(),
        body: Some("First post".into()),
        views: 4_000_000_000,
        rating: 4.5,
        cover: vec![0xde, 0xad, 0xbe, 0xef],
        ..Default::default()
    };
    let id = session.save(&mut post).unwrap();

    let loaded = session.load::<BlogPost>(id).unwrap().unwrap();
    assert_eq!(loaded.title, post.title);
    assert_eq!(loaded.body, post.body);
    assert_eq!(loaded.views, post.views);
    assert_eq!(loaded.rating, post.rating);
    assert_eq!(loaded.cover, post.cover);
}
