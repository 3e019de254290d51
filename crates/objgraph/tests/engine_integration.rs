//! Integration tests for the engine against a library-domain schema.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use objgraph::{
    DebugCollector, Engine, EntityDescriptor, EntityType, Error, Key, KeyValue, LoaderRegistry,
    Query, Schema,
};

#[derive(Debug, Clone)]
struct Author {
    id: String,
}

#[derive(Debug, Clone)]
struct Genre {
    id: String,
}

#[derive(Debug, Clone)]
struct User {
    id: String,
    name: String,
    favorite_author_ids: Vec<String>,
}

#[derive(Debug, Clone)]
struct Library {
    id: String,
    librarian_user_id: String,
}

#[derive(Debug, Clone)]
struct Book {
    id: String,
    author_id: String,
    co_author_id: Option<String>,
    genre_id: String,
    library_id: String,
    error_book_id: Option<String>,
}

#[derive(Debug, Clone)]
struct Checkout {
    id: String,
    user_id: String,
    book_id: String,
}

#[derive(Debug, Clone)]
struct UserFollow {
    from_user_id: String,
    to_user_id: String,
}

/// Purposefully never gets a loader.
#[derive(Debug, Clone)]
struct ErrorBook {
    book_id: String,
}

/// Argument gating whether favorite authors are followed.
#[derive(Debug, Clone)]
struct Flags {
    load_favorites: bool,
}

fn t<T: 'static>() -> EntityType {
    EntityType::of::<T>()
}

fn library_schema() -> Schema {
    let mut schema = Schema::new()
        .with_entity(
            EntityDescriptor::of::<Author>().with_primary_key(Key::new(|a: &Author| a.id.clone())),
        )
        .with_entity(
            EntityDescriptor::of::<Genre>().with_primary_key(Key::new(|g: &Genre| g.id.clone())),
        )
        .with_entity(
            EntityDescriptor::of::<User>()
                .with_primary_key(Key::new(|u: &User| u.id.clone()))
                .with_conditional_foreign_key::<Author, Flags, _>(
                    Key::many(|u: &User| u.favorite_author_ids.clone()),
                    |flags| flags.load_favorites,
                ),
        )
        .with_entity(
            EntityDescriptor::of::<Library>()
                .with_primary_key(Key::new(|l: &Library| l.id.clone()))
                .with_foreign_key::<User>(Key::new(|l: &Library| l.librarian_user_id.clone())),
        )
        .with_entity(
            EntityDescriptor::of::<Book>()
                .with_primary_key(Key::new(|b: &Book| b.id.clone()))
                .with_foreign_key::<Author>(Key::new(|b: &Book| b.author_id.clone()))
                .with_foreign_key::<Author>(Key::optional(|b: &Book| b.co_author_id.clone()))
                .with_foreign_key::<Genre>(Key::new(|b: &Book| b.genre_id.clone()))
                .with_foreign_key::<Library>(Key::new(|b: &Book| b.library_id.clone()))
                .with_foreign_key::<ErrorBook>(Key::optional(|b: &Book| b.error_book_id.clone())),
        )
        .with_entity(
            EntityDescriptor::of::<Checkout>()
                .with_primary_key(Key::new(|c: &Checkout| c.id.clone()))
                .with_foreign_key::<User>(Key::new(|c: &Checkout| c.user_id.clone()))
                .with_foreign_key::<Book>(Key::new(|c: &Checkout| c.book_id.clone())),
        )
        .with_entity(
            EntityDescriptor::of::<UserFollow>()
                .with_primary_key(Key::composite([
                    Key::new(|f: &UserFollow| f.from_user_id.clone()),
                    Key::new(|f: &UserFollow| f.to_user_id.clone()),
                ]))
                .with_foreign_key::<User>(Key::new(|f: &UserFollow| f.from_user_id.clone()))
                .with_foreign_key::<User>(Key::new(|f: &UserFollow| f.to_user_id.clone())),
        )
        .with_entity(
            EntityDescriptor::of::<ErrorBook>()
                .with_primary_key(Key::new(|e: &ErrorBook| e.book_id.clone())),
        );
    schema.validate().unwrap();
    schema
}

/// Loader invocation counters, shared with the test body.
#[derive(Default)]
struct LoadCounts {
    authors: AtomicUsize,
    author_ids: AtomicUsize,
}

struct TestContext {
    engine: Engine,
    counts: Arc<LoadCounts>,
}

fn book(id: &str, author: &str, genre: &str, library: &str) -> Book {
    Book {
        id: id.into(),
        author_id: author.into(),
        co_author_id: None,
        genre_id: genre.into(),
        library_id: library.into(),
        error_book_id: None,
    }
}

fn user(id: &str, name: &str, favorites: &[&str]) -> User {
    User {
        id: id.into(),
        name: name.into(),
        favorite_author_ids: favorites.iter().map(|s| s.to_string()).collect(),
    }
}

fn keyed<T: Clone, F: Fn(&T) -> String>(items: &[T], id: F) -> HashMap<KeyValue, T> {
    items
        .iter()
        .map(|item| (KeyValue::from(id(item)), item.clone()))
        .collect()
}

impl TestContext {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt::try_init();
        let counts = Arc::new(LoadCounts::default());

        let authors = keyed(
            &[
                Author { id: "a1".into() },
                Author { id: "a2".into() },
                Author { id: "a9".into() },
            ],
            |a| a.id.clone(),
        );
        let genres = keyed(
            &[Genre { id: "g1".into() }, Genre { id: "g9".into() }],
            |g| g.id.clone(),
        );
        let users = keyed(
            &[
                user("u1", "Ada", &[]),
                user("u2", "Grace", &["a1"]),
                user("u3", "Kay", &["a2"]),
            ],
            |u| u.id.clone(),
        );
        let libraries = keyed(
            &[
                Library {
                    id: "l1".into(),
                    librarian_user_id: "u3".into(),
                },
                Library {
                    id: "l9".into(),
                    librarian_user_id: "u1".into(),
                },
            ],
            |l| l.id.clone(),
        );
        let books = keyed(
            &[
                book("book1", "a1", "g1", "l1"),
                book("book2", "a1", "g1", "l1"),
                book("book9", "a9", "g9", "l9"),
            ],
            |b| b.id.clone(),
        );
        let follows = keyed(
            &[UserFollow {
                from_user_id: "u1".into(),
                to_user_id: "u2".into(),
            }],
            |f| format!("{}|{}", f.from_user_id, f.to_user_id),
        );

        let author_counts = counts.clone();
        let registry = LoaderRegistry::new()
            .with_loader(move |ids: &[KeyValue]| {
                author_counts.authors.fetch_add(1, Ordering::SeqCst);
                author_counts.author_ids.fetch_add(ids.len(), Ordering::SeqCst);
                Ok(lookup(&authors, ids))
            })
            .with_loader(move |ids: &[KeyValue]| Ok(lookup(&genres, ids)))
            .with_loader(move |ids: &[KeyValue]| Ok(lookup(&users, ids)))
            .with_loader(move |ids: &[KeyValue]| Ok(lookup(&libraries, ids)))
            .with_loader(move |ids: &[KeyValue]| Ok(lookup(&books, ids)))
            .with_loader(move |ids: &[KeyValue]| {
                let follows: Vec<UserFollow> = ids
                    .iter()
                    .filter_map(|id| match id {
                        KeyValue::Composite(parts) => {
                            let joined = parts
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join("|");
                            follows.get(&KeyValue::from(joined)).cloned()
                        }
                        _ => None,
                    })
                    .collect();
                Ok(follows)
            });

        let engine = Engine::new(library_schema(), registry).unwrap();
        Self { engine, counts }
    }
}

fn lookup<T: Clone>(db: &HashMap<KeyValue, T>, ids: &[KeyValue]) -> Vec<T> {
    ids.iter().filter_map(|id| db.get(id).cloned()).collect()
}

fn id(value: &str) -> KeyValue {
    KeyValue::from(value)
}

#[test]
fn test_end_to_end_book_graph() {
    let ctx = TestContext::new();
    let graph = ctx
        .engine
        .execute_for_root(book("book1", "a1", "g1", "l1"))
        .unwrap();

    assert!(graph.get_as::<Book>(&id("book1")).is_some());
    assert!(graph.get_as::<Author>(&id("a1")).is_some());
    assert!(graph.get_as::<Genre>(&id("g1")).is_some());
    assert!(graph.get_as::<Library>(&id("l1")).is_some());
    let librarian = graph.get_as::<User>(&id("u3")).unwrap();
    assert_eq!(librarian.name, "Kay");

    // Nothing unrelated came along.
    assert!(graph.get_as::<Author>(&id("a9")).is_none());
    assert!(graph.get_as::<Genre>(&id("g9")).is_none());
    assert!(graph.get_as::<Library>(&id("l9")).is_none());
    assert!(graph.get_as::<User>(&id("u1")).is_none());
    assert_eq!(graph.len(), 5);
}

#[test]
fn test_optional_co_author_followed_when_present() {
    let ctx = TestContext::new();
    let mut root = book("book1", "a1", "g1", "l1");
    root.co_author_id = Some("a2".into());

    let graph = ctx.engine.execute_for_root(root).unwrap();
    assert!(graph.get_as::<Author>(&id("a1")).is_some());
    assert!(graph.get_as::<Author>(&id("a2")).is_some());
}

#[test]
fn test_shared_foreign_ids_deduplicated_into_one_load() {
    let ctx = TestContext::new();
    let graph = ctx
        .engine
        .execute_for_roots([
            book("book1", "a1", "g1", "l1"),
            book("book2", "a1", "g1", "l1"),
        ])
        .unwrap();

    assert!(graph.get_as::<Author>(&id("a1")).is_some());
    // Both books reference a1: a single loader call with a single id.
    assert_eq!(ctx.counts.authors.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.counts.author_ids.load(Ordering::SeqCst), 1);
}

#[test]
fn test_already_known_ids_not_reloaded() {
    let ctx = TestContext::new();
    let existing = ctx.engine.create_empty_graph();
    existing.insert("a1", Author { id: "a1".into() });

    let graph = ctx
        .engine
        .execute(
            Query::new()
                .with_root_entity(book("book1", "a1", "g1", "l1"))
                .with_existing_graph(existing),
        )
        .unwrap();

    assert!(graph.get_as::<Author>(&id("a1")).is_some());
    assert_eq!(ctx.counts.authors.load(Ordering::SeqCst), 0);
}

#[test]
fn test_predicate_gated_favorites() {
    let ctx = TestContext::new();

    // No arguments: the gated foreign key is not followed.
    let graph = ctx
        .engine
        .execute_for_root(user("u2", "Grace", &["a1"]))
        .unwrap();
    assert!(graph.get_as::<Author>(&id("a1")).is_none());

    // An argument of the wrong type changes nothing.
    let graph = ctx
        .engine
        .execute(
            Query::new()
                .with_root_entity(user("u2", "Grace", &["a1"]))
                .with_argument("unrelated".to_owned()),
        )
        .unwrap();
    assert!(graph.get_as::<Author>(&id("a1")).is_none());

    // Flags with the gate off.
    let graph = ctx
        .engine
        .execute(
            Query::new()
                .with_root_entity(user("u2", "Grace", &["a1"]))
                .with_argument(Flags {
                    load_favorites: false,
                }),
        )
        .unwrap();
    assert!(graph.get_as::<Author>(&id("a1")).is_none());

    // Flags with the gate on.
    let graph = ctx
        .engine
        .execute(
            Query::new()
                .with_root_entity(user("u2", "Grace", &["a1"]))
                .with_argument(Flags {
                    load_favorites: true,
                }),
        )
        .unwrap();
    assert!(graph.get_as::<Author>(&id("a1")).is_some());
}

#[test]
fn test_to_many_favorites_load_every_id() {
    let ctx = TestContext::new();
    let graph = ctx
        .engine
        .execute(
            Query::new()
                .with_root_entity(user("u9", "Test", &["a1", "a2"]))
                .with_argument(Flags {
                    load_favorites: true,
                }),
        )
        .unwrap();

    assert!(graph.get_as::<Author>(&id("a1")).is_some());
    assert!(graph.get_as::<Author>(&id("a2")).is_some());
    assert_eq!(ctx.counts.author_ids.load(Ordering::SeqCst), 2);
}

#[test]
fn test_missing_loader_identifies_type() {
    let ctx = TestContext::new();
    let mut root = book("book1", "a1", "g1", "l1");
    root.error_book_id = Some("eb1".into());

    let err = ctx.engine.execute_for_root(root).unwrap_err();
    match err {
        Error::UnconfiguredLoader { entity } => assert!(entity.contains("ErrorBook")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unreferenced_type_without_loader_is_harmless() {
    // ErrorBook is reachable in the schema but no book references one, so
    // its load is a no-op and the missing loader never resolves.
    let ctx = TestContext::new();
    assert!(ctx
        .engine
        .execute_for_root(book("book1", "a1", "g1", "l1"))
        .is_ok());
}

#[test]
fn test_unknown_root_type_rejected() {
    struct Stranger;

    let ctx = TestContext::new();
    let err = ctx
        .engine
        .execute(Query::new().with_root_entity(Stranger))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownEntityDescriptor { .. }));
}

#[test]
fn test_composite_key_entity() {
    let ctx = TestContext::new();
    let graph = ctx
        .engine
        .execute_for_root(UserFollow {
            from_user_id: "u1".into(),
            to_user_id: "u2".into(),
        })
        .unwrap();

    let follow_id = KeyValue::composite([id("u1"), id("u2")]);
    assert!(graph.get_as::<UserFollow>(&follow_id).is_some());
    assert!(graph.get_as::<User>(&id("u1")).is_some());
    assert!(graph.get_as::<User>(&id("u2")).is_some());
}

#[test]
fn test_supplement_keeps_existing_instance() {
    let ctx = TestContext::new();
    let existing = ctx.engine.create_empty_graph();
    existing.insert("u1", user("u1", "Ada (original)", &[]));

    let graph = ctx
        .engine
        .supplement::<User>(existing, ["u1", "u2"])
        .unwrap();

    // u1 was already present: the first writer wins.
    assert_eq!(graph.get_as::<User>(&id("u1")).unwrap().name, "Ada (original)");
    // u2 was loaded fresh.
    assert_eq!(graph.get_as::<User>(&id("u2")).unwrap().name, "Grace");
}

#[test]
fn test_supplement_with_unknown_ids_returns_graph_unchanged() {
    let ctx = TestContext::new();
    let existing = ctx.engine.create_empty_graph();
    existing.insert("u1", user("u1", "Ada", &[]));

    let graph = ctx.engine.supplement::<User>(existing, ["nope"]).unwrap();
    assert_eq!(graph.len(), 1);
}

#[test]
fn test_supplement_accumulates_across_requests() {
    let ctx = TestContext::new();
    let graph = ctx
        .engine
        .execute_for_root(book("book1", "a1", "g1", "l1"))
        .unwrap();
    let before = graph.len();

    let graph = ctx
        .engine
        .execute(
            Query::new()
                .with_root_entity(book("book9", "a9", "g9", "l9"))
                .with_existing_graph(graph),
        )
        .unwrap();

    assert!(graph.len() > before);
    assert!(graph.get_as::<Book>(&id("book1")).is_some());
    assert!(graph.get_as::<Book>(&id("book9")).is_some());
    assert!(graph.get_as::<Author>(&id("a9")).is_some());
}

#[test]
fn test_execute_is_idempotent_per_context() {
    let ctx = TestContext::new();
    let mut context = ctx.engine.execution_context(
        Query::new().with_root_entity(book("book1", "a1", "g1", "l1")),
    );

    let first = context.execute().unwrap();
    let calls = ctx.counts.authors.load(Ordering::SeqCst);
    let second = context.execute().unwrap();

    assert_eq!(ctx.counts.authors.load(Ordering::SeqCst), calls);
    assert_eq!(first.len(), second.len());
}

#[test]
fn test_cycle_rejected_at_plan_time() {
    #[derive(Debug, Clone)]
    struct X {
        id: u64,
        y_id: u64,
    }
    #[derive(Debug, Clone)]
    struct Y {
        id: u64,
        x_id: u64,
    }

    let mut schema = Schema::new()
        .with_entity(
            EntityDescriptor::of::<X>()
                .with_primary_key(Key::new(|x: &X| x.id))
                .with_foreign_key::<Y>(Key::new(|x: &X| x.y_id)),
        )
        .with_entity(
            EntityDescriptor::of::<Y>()
                .with_primary_key(Key::new(|y: &Y| y.id))
                .with_foreign_key::<X>(Key::new(|y: &Y| y.x_id)),
        );
    schema.validate().unwrap();
    let engine = Engine::new(schema, LoaderRegistry::new()).unwrap();

    let err = engine.execute_for_root(X { id: 1, y_id: 2 }).unwrap_err();
    assert!(matches!(err, Error::CircularDependency { .. }));
}

#[test]
fn test_debug_collector_captures_request() {
    let ctx = TestContext::new();
    let collector = DebugCollector::new();

    ctx.engine
        .execute(
            Query::new()
                .with_root_entity(book("book1", "a1", "g1", "l1"))
                .with_debug_collector(&collector),
        )
        .unwrap();

    let info = collector.take();
    assert_eq!(info.plans.len(), 1);
    assert_eq!(info.object_graphs.len(), 1);
    assert!(!info.loader_calls.is_empty());
    assert!(info
        .loader_calls
        .iter()
        .any(|call| call.entity_type == t::<Author>()));
}

#[test]
fn test_graph_key_alias_unifies_storage() {
    #[derive(Debug, Clone)]
    struct BookRecord;
    #[derive(Debug, Clone)]
    struct Paperback {
        id: String,
        author_id: String,
    }
    #[derive(Debug, Clone)]
    struct Hardcover {
        id: String,
        author_id: String,
    }

    let mut schema = Schema::new()
        .with_entity(
            EntityDescriptor::of::<Author>().with_primary_key(Key::new(|a: &Author| a.id.clone())),
        )
        .with_entity(
            EntityDescriptor::of::<Paperback>()
                .with_primary_key(Key::new(|p: &Paperback| p.id.clone()))
                .with_graph_key::<BookRecord>()
                .with_foreign_key::<Author>(Key::new(|p: &Paperback| p.author_id.clone())),
        )
        .with_entity(
            EntityDescriptor::of::<Hardcover>()
                .with_primary_key(Key::new(|h: &Hardcover| h.id.clone()))
                .with_graph_key::<BookRecord>()
                .with_foreign_key::<Author>(Key::new(|h: &Hardcover| h.author_id.clone())),
        );
    schema.validate().unwrap();

    let authors: HashMap<KeyValue, Author> = [
        (id("a1"), Author { id: "a1".into() }),
        (id("a2"), Author { id: "a2".into() }),
    ]
    .into_iter()
    .collect();
    let registry =
        LoaderRegistry::new().with_loader(move |ids: &[KeyValue]| Ok(lookup(&authors, ids)));

    let engine = Engine::new(schema, registry).unwrap();
    let graph = engine
        .execute(
            Query::new()
                .with_root_entity(Paperback {
                    id: "p1".into(),
                    author_id: "a1".into(),
                })
                .with_root_entity(Hardcover {
                    id: "h1".into(),
                    author_id: "a2".into(),
                }),
        )
        .unwrap();

    // Both variants share one storage bucket...
    assert_eq!(graph.get_all(t::<BookRecord>()).len(), 2);
    assert!(graph.has(t::<Paperback>(), &id("h1")));
    // ...and each variant's relationships were followed.
    assert!(graph.get_as::<Author>(&id("a1")).is_some());
    assert!(graph.get_as::<Author>(&id("a2")).is_some());
}
