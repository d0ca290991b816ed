use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use juniper::{GraphQLError, Variables};
use serde_json::{json, Value as Json};

use crate::{
    model::{Author, Book, Key, NewAuthor, NewBook},
    store::{Fixtures, MemoryStore, Store, StoreError, StoreResult},
};
use super::{root_node, Context};


/// The outcome of executing one GraphQL document.
struct Outcome {
    data: Json,
    errors: Json,
    store_calls: u32,
}

impl Outcome {
    /// The `extensions.kind` of all errors, in order.
    fn error_kinds(&self) -> Vec<&str> {
        self.errors.as_array().unwrap().iter()
            .map(|e| e["extensions"]["kind"].as_str().unwrap())
            .collect()
    }
}

async fn try_execute(store: Arc<dyn Store>, query: &str) -> Result<Outcome, GraphQLError> {
    let root = root_node();
    let context = Context::new(store);
    let (data, errors) = juniper::execute(query, None, &root, &Variables::new(), &context).await?;

    Ok(Outcome {
        data: serde_json::to_value(&data).unwrap(),
        errors: serde_json::to_value(&errors).unwrap(),
        store_calls: context.store.num_calls(),
    })
}

async fn execute(store: Arc<dyn Store>, query: &str) -> Outcome {
    match try_execute(store, query).await {
        Ok(outcome) => outcome,
        Err(e) => panic!("query failed: {e:?}"),
    }
}

/// Executes the query and asserts that no error occured.
async fn data(store: Arc<dyn Store>, query: &str) -> Json {
    let outcome = execute(store, query).await;
    assert_eq!(outcome.errors, json!([]), "unexpected errors");
    outcome.data
}

fn builtin() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::read_only(Fixtures::load(None).unwrap()))
}

fn writable() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::writable(Fixtures::load(None).unwrap()))
}

fn ids(list: &Json) -> Vec<&str> {
    list.as_array().unwrap().iter().map(|item| item["id"].as_str().unwrap()).collect()
}


// ===== Reads ===================================================================================

#[tokio::test]
async fn book_by_id_with_author() {
    let data = data(builtin(), r#"{
        book(id: 1) {
            title
            genre
            author { name age }
        }
    }"#).await;

    assert_eq!(data, json!({
        "book": {
            "title": "Name of the Wind",
            "genre": "Fantasy",
            "author": { "name": "Patrick Rothfuss", "age": 44 },
        },
    }));
}

#[tokio::test]
async fn id_as_string_or_int() {
    let from_int = data(builtin(), r#"{ book(id: 3) { id title } }"#).await;
    let from_string = data(builtin(), r#"{ book(id: "3") { id title } }"#).await;
    assert_eq!(from_int, from_string);
    assert_eq!(from_int, json!({ "book": { "id": "3", "title": "The Long Earth" } }));
}

#[tokio::test]
async fn book_by_title() {
    let data = data(builtin(), r#"{ book(title: "The Hero of Ages") { id author { id } } }"#).await;
    assert_eq!(data, json!({ "book": { "id": "4", "author": { "id": "2" } } }));
}

#[tokio::test]
async fn missing_records_are_null() {
    let data = data(builtin(), r#"{
        byId: book(id: 999) { title }
        byTitle: book(title: "Name of the wind") { title }
        byName: author(name: "Patrick") { name }
        malformed: book(id: "not-an-id") { title }
        negative: author(id: -1) { name }
    }"#).await;

    assert_eq!(data, json!({
        "byId": null,
        "byTitle": null,
        "byName": null,
        "malformed": null,
        "negative": null,
    }));
}

#[tokio::test]
async fn malformed_id_needs_no_store_call() {
    let outcome = execute(builtin(), r#"{ book(id: "x") { title } }"#).await;
    assert_eq!(outcome.data, json!({ "book": null }));
    assert_eq!(outcome.store_calls, 0);
}

#[tokio::test]
async fn ambiguous_lookups_are_rejected() {
    let outcome = execute(builtin(), r#"{
        both: book(id: 1, title: "Name of the Wind") { title }
        neither: author { name }
    }"#).await;

    assert_eq!(outcome.data, json!({ "both": null, "neither": null }));
    assert_eq!(outcome.error_kinds(), ["INVALID_INPUT", "INVALID_INPUT"]);
    assert_eq!(outcome.errors[0]["extensions"]["key"], "query.ambiguous-lookup");
    assert_eq!(outcome.store_calls, 0);
}

#[tokio::test]
async fn author_by_name_with_books() {
    let data = data(builtin(), r#"{
        author(name: "Brandon Sanderson") {
            age
            books { title }
        }
    }"#).await;

    assert_eq!(data, json!({
        "author": {
            "age": 42,
            "books": [
                { "title": "The Final Empire" },
                { "title": "The Hero of Ages" },
            ],
        },
    }));
}

#[tokio::test]
async fn author_by_id() {
    let data = data(builtin(), r#"{ author(id: "3") { name } }"#).await;
    assert_eq!(data, json!({ "author": { "name": "Terry Pratchett" } }));
}

#[tokio::test]
async fn listings_contain_every_record_once() {
    let data = data(builtin(), "{ books { id } authors { id } }").await;
    assert_eq!(ids(&data["books"]), ["1", "2", "3", "4", "5", "6"]);
    assert_eq!(ids(&data["authors"]), ["1", "2", "3"]);
}

#[tokio::test]
async fn empty_store() {
    let store = Arc::new(MemoryStore::read_only(Fixtures::from_yaml("{}").unwrap()));
    let data = data(store, "{ books { id } authors { id } }").await;
    assert_eq!(data, json!({ "books": [], "authors": [] }));
}

#[tokio::test]
async fn books_and_authors_agree() {
    let data = data(builtin(), r#"{
        authors { id books { id author { id } } }
        books { id author { id books { id } } }
    }"#).await;

    // Every book listed for an author names that author.
    for author in data["authors"].as_array().unwrap() {
        for book in author["books"].as_array().unwrap() {
            assert_eq!(book["author"]["id"], author["id"]);
        }
    }

    // Every book with an author is listed in that author's books.
    for book in data["books"].as_array().unwrap() {
        let author_books = ids(&book["author"]["books"]);
        assert!(author_books.contains(&book["id"].as_str().unwrap()));
    }

    // Each book appears under exactly one author.
    let mut seen = HashSet::new();
    for author in data["authors"].as_array().unwrap() {
        for id in ids(&author["books"]) {
            assert!(seen.insert(id.to_owned()), "book {id} listed twice");
        }
    }
    assert_eq!(seen.len(), 6);
}

#[tokio::test]
async fn dangling_author_and_author_without_books() {
    let store = Arc::new(MemoryStore::read_only(Fixtures::from_yaml("
        authors:
          - { id: 1, name: Lonely Writer, age: 30 }
        books:
          - { id: 1, title: Orphan, author: 42 }
    ").unwrap()));

    let data = data(store, r#"{
        book(id: 1) { title author { name } }
        author(name: "Lonely Writer") { books { title } }
    }"#).await;

    assert_eq!(data, json!({
        "book": { "title": "Orphan", "author": null },
        "author": { "books": [] },
    }));
}

#[tokio::test]
async fn nested_references_each_cost_a_store_call() {
    // 1 for the list of authors, 3 for their books and 6 for the author of
    // each of those books.
    let outcome = execute(builtin(), "{ authors { books { author { name } } } }").await;
    assert_eq!(outcome.errors, json!([]));
    assert_eq!(outcome.store_calls, 10);

    let outcome = execute(builtin(), "{ books { title genre } }").await;
    assert_eq!(outcome.store_calls, 1);
}


// ===== Writes ==================================================================================

#[tokio::test]
async fn add_author() {
    let store = writable();
    let data = data(store.clone(), r#"mutation {
        addAuthor(name: "Ursula K. Le Guin", age: 88) { id name age books { id } }
    }"#).await;

    assert_eq!(data, json!({
        "addAuthor": { "id": "4", "name": "Ursula K. Le Guin", "age": 88, "books": [] },
    }));
    assert_eq!(store.num_authors().await, 4);

    let data = self::data(store, r#"{ author(name: "Ursula K. Le Guin") { id } }"#).await;
    assert_eq!(data, json!({ "author": { "id": "4" } }));
}

#[tokio::test]
async fn add_author_without_age_fails_before_store() {
    let store = writable();
    let result = try_execute(store.clone(), r#"mutation {
        addAuthor(name: "Nobody") { id }
    }"#).await;

    assert!(matches!(result, Err(GraphQLError::ValidationError(_))));
    assert_eq!(store.num_authors().await, 3);
}

#[tokio::test]
async fn add_book() {
    let store = writable();
    let data = data(store.clone(), r#"mutation {
        addBook(title: "Mort", genre: "Fantasy", authorID: "3") {
            id title genre author { name }
        }
    }"#).await;

    assert_eq!(data, json!({
        "addBook": {
            "id": "7",
            "title": "Mort",
            "genre": "Fantasy",
            "author": { "name": "Terry Pratchett" },
        },
    }));
    assert_eq!(store.num_books().await, 7);

    let data = self::data(store, r#"{ author(id: 3) { books { title } } }"#).await;
    let titles = data["author"]["books"].as_array().unwrap().iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(titles, ["The Long Earth", "The Colour of Magic", "The Light Fantastic", "Mort"]);
}

#[tokio::test]
async fn add_book_with_unknown_author() {
    let store = writable();
    let data = data(store.clone(), r#"mutation {
        addBook(title: "Anonymous", authorID: 77) { id genre author { name } }
    }"#).await;

    assert_eq!(data, json!({
        "addBook": { "id": "7", "genre": null, "author": null },
    }));
    assert_eq!(store.num_books().await, 7);
}

#[tokio::test]
async fn add_book_without_author_fails_before_store() {
    let store = writable();
    let result = try_execute(store.clone(), r#"mutation { addBook(title: "X") { id } }"#).await;
    assert!(matches!(result, Err(GraphQLError::ValidationError(_))));
    assert_eq!(store.num_books().await, 6);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_store() {
    let queries = [
        r#"mutation { addAuthor(name: "  ", age: 3) { id } }"#,
        r#"mutation { addAuthor(name: "Young", age: -3) { id } }"#,
        r#"mutation { addBook(title: "", authorID: 1) { id } }"#,
        r#"mutation { addBook(title: "Fine", authorID: "one") { id } }"#,
    ];

    for query in queries {
        let store = writable();
        let outcome = execute(store.clone(), query).await;
        assert_eq!(outcome.data, Json::Null, "{query}");
        assert_eq!(outcome.error_kinds(), ["INVALID_INPUT"], "{query}");
        assert_eq!(outcome.store_calls, 0, "{query}");
        assert_eq!(store.num_authors().await, 3);
        assert_eq!(store.num_books().await, 6);
    }
}

#[tokio::test]
async fn fixture_store_is_read_only() {
    let store = builtin();
    let outcome = execute(store.clone(), r#"mutation {
        addAuthor(name: "Ursula K. Le Guin", age: 88) { id }
    }"#).await;

    assert_eq!(outcome.data, Json::Null);
    assert_eq!(outcome.error_kinds(), ["STORE_FAILURE"]);
    assert_eq!(outcome.errors[0]["extensions"]["key"], "store.read-only");
    assert_eq!(store.num_authors().await, 3);
}


// ===== Store failures ==========================================================================

/// Wraps the built-in fixtures, but fails every call of one store operation.
struct FaultyStore {
    inner: MemoryStore,
    failing: &'static str,
}

impl FaultyStore {
    fn new(failing: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::read_only(Fixtures::load(None).unwrap()),
            failing,
        })
    }

    fn check(&self, operation: &str) -> StoreResult<()> {
        if operation == self.failing {
            Err(StoreError::Pool(deadpool_postgres::PoolError::Closed))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for FaultyStore {
    fn name(&self) -> &'static str {
        "faulty"
    }

    async fn book_by_key(&self, key: Key) -> StoreResult<Option<Book>> {
        self.check("book_by_key")?;
        self.inner.book_by_key(key).await
    }

    async fn book_by_title(&self, title: &str) -> StoreResult<Option<Book>> {
        self.check("book_by_title")?;
        self.inner.book_by_title(title).await
    }

    async fn books(&self) -> StoreResult<Vec<Book>> {
        self.check("books")?;
        self.inner.books().await
    }

    async fn books_by_author(&self, author: Key) -> StoreResult<Vec<Book>> {
        self.check("books_by_author")?;
        self.inner.books_by_author(author).await
    }

    async fn author_by_key(&self, key: Key) -> StoreResult<Option<Author>> {
        self.check("author_by_key")?;
        self.inner.author_by_key(key).await
    }

    async fn author_by_name(&self, name: &str) -> StoreResult<Option<Author>> {
        self.check("author_by_name")?;
        self.inner.author_by_name(name).await
    }

    async fn authors(&self) -> StoreResult<Vec<Author>> {
        self.check("authors")?;
        self.inner.authors().await
    }

    async fn create_author(&self, author: NewAuthor) -> StoreResult<Author> {
        self.check("create_author")?;
        self.inner.create_author(author).await
    }

    async fn create_book(&self, book: NewBook) -> StoreResult<Book> {
        self.check("create_book")?;
        self.inner.create_book(book).await
    }
}

#[tokio::test]
async fn store_failure_only_affects_its_field() {
    let outcome = execute(FaultyStore::new("author_by_key"), r#"{
        book(id: 2) { title author { name } }
        author(name: "Terry Pratchett") { age }
    }"#).await;

    assert_eq!(outcome.data, json!({
        "book": { "title": "The Final Empire", "author": null },
        "author": { "age": 66 },
    }));
    assert_eq!(outcome.error_kinds(), ["STORE_FAILURE"]);
    assert_eq!(outcome.errors[0]["path"], json!(["book", "author"]));
}

#[tokio::test]
async fn failing_book_lists_stay_in_their_branch() {
    let outcome = execute(FaultyStore::new("books_by_author"), r#"{
        authors { name books { id } }
        book(id: 1) { title }
    }"#).await;

    assert_eq!(outcome.data, json!({
        "authors": [
            { "name": "Patrick Rothfuss", "books": null },
            { "name": "Brandon Sanderson", "books": null },
            { "name": "Terry Pratchett", "books": null },
        ],
        "book": { "title": "Name of the Wind" },
    }));
    assert_eq!(outcome.error_kinds(), ["STORE_FAILURE"; 3]);
    for error in outcome.errors.as_array().unwrap() {
        assert_eq!(error["path"], json!(["authors", "books"]));
    }
}

#[tokio::test]
async fn failing_root_listings_keep_siblings() {
    let outcome = execute(FaultyStore::new("books"), r#"{
        books { id }
        authors { id }
    }"#).await;
    assert_eq!(outcome.data, json!({
        "books": null,
        "authors": [{ "id": "1" }, { "id": "2" }, { "id": "3" }],
    }));
    assert_eq!(outcome.errors[0]["path"], json!(["books"]));

    let outcome = execute(FaultyStore::new("authors"), r#"{
        authors { id }
        author(name: "Brandon Sanderson") { books { title } }
    }"#).await;
    assert_eq!(outcome.data, json!({
        "authors": null,
        "author": { "books": [{ "title": "The Final Empire" }, { "title": "The Hero of Ages" }] },
    }));
    assert_eq!(outcome.error_kinds(), ["STORE_FAILURE"]);
}


// ===== Schema ==================================================================================

#[test]
fn schema_shape() {
    let sdl = root_node().as_sdl();
    assert!(sdl.contains("type RootQueryType"), "{sdl}");
    assert!(sdl.contains("type Mutation"), "{sdl}");
    assert!(sdl.contains("authorID: ID!"), "{sdl}");
    assert!(sdl.contains("age: Int!"), "{sdl}");

    // Lists may be `null` so that a store failure stops at the list.
    assert!(sdl.contains("[Book!]"), "{sdl}");
    assert!(!sdl.contains("[Book!]!"), "{sdl}");
    assert!(!sdl.contains("[Author!]!"), "{sdl}");
    assert!(!sdl.contains("Subscription"), "{sdl}");
}
