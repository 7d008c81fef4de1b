use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ItemId>,
    first_name: String,
    last_name: String,
}

impl Customer {
    fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }
}

fn customer_id(customer: &Customer) -> Option<ItemId> {
    customer.id
}

fn bind_customer_id(customer: &mut Customer, id: ItemId) {
    customer.id = Some(id);
}

impl Document for Customer {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::with_default()
            .with_id_slot(IdSlot::read_write("id", customer_id, bind_customer_id))
    }
}

const SEED: [(&str, &str); 7] = [
    ("Austin", "Carlson"),
    ("Austin", "Scott"),
    ("Cordelia", "McDaniel"),
    ("Herbert", "Harris"),
    ("Jimmy", "Simpson"),
    ("Keith", "George"),
    ("Susan", "Long"),
];

/// Repository decorator that counts round-trips to the store.
struct CountingRepo {
    inner: SqliteDocumentStore,
    counts: AtomicUsize,
    page_fetches: AtomicUsize,
}

impl CountingRepo {
    fn new(inner: SqliteDocumentStore) -> Self {
        Self {
            inner,
            counts: AtomicUsize::new(0),
            page_fetches: AtomicUsize::new(0),
        }
    }

    fn counts(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }
}

impl DocumentRepository for CountingRepo {
    fn init(&self) -> Result<(), RepoError> {
        self.inner.init()
    }

    fn count(&self, criteria: Option<&Criteria>) -> Result<usize, RepoError> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count(criteria)
    }

    fn fetch_page(&self, query: PageQuery<'_>) -> Result<Vec<StoredDocument>, RepoError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_page(query)
    }

    fn fetch_ids(&self, query: PageQuery<'_>) -> Result<Vec<ItemId>, RepoError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_ids(query)
    }

    fn fetch_by_id(&self, id: &ItemId) -> Result<Option<Value>, RepoError> {
        self.inner.fetch_by_id(id)
    }

    fn position_of(
        &self,
        criteria: Option<&Criteria>,
        sort: &SortSpec,
        id: &ItemId,
    ) -> Result<Option<usize>, RepoError> {
        self.inner.position_of(criteria, sort, id)
    }

    fn matches(&self, criteria: Option<&Criteria>, id: &ItemId) -> Result<bool, RepoError> {
        self.inner.matches(criteria, id)
    }

    fn insert(&self, id: ItemId, body: &Value) -> Result<ItemId, RepoError> {
        self.inner.insert(id, body)
    }

    fn delete_by_id(&self, id: &ItemId) -> Result<bool, RepoError> {
        self.inner.delete_by_id(id)
    }
}

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("docview-{prefix}-{nanos}"))
}

fn seed_customers(repo: &dyn DocumentRepository) -> Vec<ItemId> {
    SEED.iter()
        .map(|(first_name, last_name)| {
            let id = ItemId::generate();
            let mut customer = Customer::new(first_name, last_name);
            customer.id = Some(id);
            let body = serde_json::to_value(&customer).expect("customer should serialize");
            repo.insert(id, &body).expect("customer should insert")
        })
        .collect()
}

fn seeded_store() -> Arc<dyn DocumentRepository> {
    let store = SqliteDocumentStore::open_in_memory("customers").expect("store should open");
    seed_customers(&store);
    Arc::new(store)
}

fn builder(repo: Arc<dyn DocumentRepository>) -> Builder<Customer> {
    IdContainer::<Customer>::builder(repo)
        .with_page_size(3)
        .sorted_by(SortSpec::by("firstName", SortDirection::Asc))
}

fn customers() -> IdContainer<Customer> {
    builder(seeded_store()).build().expect("container should build")
}

fn first_name(container: &IdContainer<Customer>, id: &ItemId) -> String {
    container
        .get_item(id)
        .expect("item should load")
        .first_name
}

#[test]
fn size_counts_seeded_customers() {
    let mut container = customers();

    assert_eq!(container.size().expect("size should load"), 7);
}

#[test]
fn first_item_is_first_alphabetically() {
    let mut container = customers();

    let first_id = container
        .first_id()
        .expect("first id should load")
        .expect("view should not be empty");

    assert_eq!(first_name(&container, &first_id), "Austin");
    assert_eq!(container.id_at(0).expect("index 0 should resolve"), first_id);
    assert!(container.is_first(&first_id).expect("is_first should work"));
    assert!(!container.is_last(&first_id).expect("is_last should work"));
}

#[test]
fn last_item_is_last_alphabetically() {
    let mut container = customers();

    let last_id = container
        .last_id()
        .expect("last id should load")
        .expect("view should not be empty");

    assert_eq!(first_name(&container, &last_id), "Susan");
    assert_eq!(container.id_at(6).expect("index 6 should resolve"), last_id);
    assert!(!container.is_first(&last_id).expect("is_first should work"));
    assert!(container.is_last(&last_id).expect("is_last should work"));
}

#[test]
fn is_first_and_is_last_are_false_for_middle_and_foreign_ids() {
    let mut container = customers();
    let middle = container.id_at(3).expect("index 3 should resolve");
    let foreign = ItemId::generate();

    for _ in 0..2 {
        assert!(!container.is_first(&middle).expect("is_first should work"));
        assert!(!container.is_last(&middle).expect("is_last should work"));
        assert!(!container.is_first(&foreign).expect("is_first should work"));
        assert!(!container.is_last(&foreign).expect("is_last should work"));
    }
}

#[test]
fn id_at_resolves_across_pages() {
    let mut container = customers();

    let id = container.id_at(5).expect("index 5 should resolve");

    assert_eq!(first_name(&container, &id), "Keith");
}

#[test]
fn id_at_rejects_index_past_the_end() {
    let mut container = customers();

    let err = container.id_at(7).expect_err("index 7 should be out of range");

    assert!(
        matches!(err, ContainerError::IndexOutOfRange { index: 7, size: 7 }),
        "unexpected error: {err}"
    );
}

#[test]
fn empty_view_has_no_first_or_last() {
    let store = SqliteDocumentStore::open_in_memory("customers").expect("store should open");
    let mut container = builder(Arc::new(store)).build().expect("container should build");

    assert_eq!(container.size().expect("size should load"), 0);
    assert_eq!(container.first_id().expect("first id should load"), None);
    assert_eq!(container.last_id().expect("last id should load"), None);
    assert!(container.all_ids().expect("ids should load").is_empty());
}

#[test]
fn next_and_previous_follow_index_order() {
    let mut container = customers();
    let size = container.size().expect("size should load");

    for index in 0..size {
        let id = container.id_at(index).expect("index should resolve");
        let next = container.next_id(&id).expect("next should resolve");
        let previous = container.previous_id(&id).expect("previous should resolve");

        if index + 1 < size {
            assert_eq!(next, Some(container.id_at(index + 1).expect("next index")));
        } else {
            assert_eq!(next, None);
        }
        if index > 0 {
            assert_eq!(previous, Some(container.id_at(index - 1).expect("previous index")));
        } else {
            assert_eq!(previous, None);
        }
    }
}

#[test]
fn next_id_resolves_on_a_cold_cache() {
    let mut container = customers();
    let third = container.id_at(2).expect("index 2 should resolve");
    let fourth = container.id_at(3).expect("index 3 should resolve");

    container.refresh();

    assert_eq!(container.index_of(&third).expect("index_of should work"), Some(2));
    assert_eq!(container.next_id(&third).expect("next should resolve"), Some(fourth));
    assert_eq!(container.next_id(&ItemId::generate()).expect("next should resolve"), None);
}

#[test]
fn string_filter_narrows_and_remove_all_restores() {
    let store = seeded_store();
    let mut container = builder(store).build().expect("container should build");
    assert_eq!(container.size().expect("size should load"), 7);

    container
        .add_filter(FilterExpr::string_match("firstName", "d", false, false))
        .expect("filter should apply");

    assert_eq!(container.size().expect("size should load"), 1);
    let only = container.first_id().expect("first id").expect("one match");
    assert_eq!(first_name(&container, &only), "Cordelia");
    assert!(container.contains(&only).expect("contains should work"));

    container.remove_all_filters();

    assert_eq!(container.size().expect("size should load"), 7);
    assert!(container.filters().is_empty());
}

#[test]
fn multiple_filters_combine_under_and() {
    let mut container = customers();

    container
        .add_filter(FilterExpr::string_match("firstName", "au", true, true))
        .expect("filter should apply");
    assert_eq!(container.size().expect("size should load"), 2);

    container
        .add_filter(FilterExpr::equals("lastName", "Scott"))
        .expect("filter should apply");
    assert_eq!(container.size().expect("size should load"), 1);

    container.remove_all_filters();
    assert_eq!(container.size().expect("size should load"), 7);
}

#[test]
fn rejected_filter_leaves_view_unchanged() {
    let mut container = customers();

    let err = container
        .add_filter(FilterExpr::negate(FilterExpr::all(vec![
            FilterExpr::equals("firstName", "Austin"),
            FilterExpr::equals("lastName", "Scott"),
        ])))
        .expect_err("Not(And) should be rejected");

    assert!(matches!(
        err,
        ContainerError::Filter(FilterError::NegatedAndUnsupported)
    ));
    assert!(container.filters().is_empty());
    assert_eq!(container.size().expect("size should load"), 7);
}

#[test]
fn contains_is_idempotent() {
    let mut container = customers();
    let first_id = container.first_id().expect("first id").expect("not empty");
    let foreign = ItemId::generate();

    assert!(container.contains(&first_id).expect("first call should succeed"));
    assert!(container.contains(&first_id).expect("second call should succeed"));
    assert!(!container.contains(&foreign).expect("first call should succeed"));
    assert!(!container.contains(&foreign).expect("second call should succeed"));

    container
        .add_filter(FilterExpr::string_match("firstName", "Keith", false, true))
        .expect("filter should apply");

    assert!(!container.contains(&first_id).expect("filtered call should succeed"));
    assert!(!container.contains(&first_id).expect("filtered call should succeed"));
}

#[test]
fn descending_sort_by_last_name_is_non_increasing() {
    let mut container = customers();

    container.apply_sort(&["lastName"], &[false]);

    let ids = container.all_ids().expect("ids should load");
    let last_names: Vec<String> = ids
        .iter()
        .map(|id| container.get_item(id).expect("item should load").last_name)
        .collect();

    assert_eq!(ids.len(), 7);
    assert!(
        last_names.windows(2).all(|pair| pair[0] >= pair[1]),
        "last names should be non-increasing: {last_names:?}"
    );
    assert_eq!(last_names.first().map(String::as_str), Some("Simpson"));
    assert_eq!(last_names.last().map(String::as_str), Some("Carlson"));

    let mut cursor = container.first_id().expect("first id").expect("not empty");
    for index in 1..ids.len() {
        cursor = container
            .next_id(&cursor)
            .expect("next should resolve")
            .expect("next should exist");
        assert_eq!(cursor, container.id_at(index).expect("index should resolve"));
    }
}

#[test]
fn ids_in_range_clamps_to_view() {
    let mut container = customers();
    let size = container.size().expect("size should load");

    assert_eq!(container.ids_in_range(0, 1).expect("range").len(), 1);
    assert_eq!(container.ids_in_range(size - 1, 100).expect("range").len(), 1);
    assert_eq!(container.ids_in_range(3, 3).expect("range").len(), 3);
    assert!(container.ids_in_range(size, 5).expect("range").is_empty());
    assert!(matches!(
        container.ids_in_range(size + 1, 1),
        Err(ContainerError::IndexOutOfRange { .. })
    ));

    let window = container.ids_in_range(2, 4).expect("range");
    let expected: Vec<ItemId> = (2..6)
        .map(|index| container.id_at(index).expect("index should resolve"))
        .collect();
    assert_eq!(window, expected);
}

#[test]
fn all_ids_covers_the_view() {
    let mut container = customers();

    let ids = container.all_ids().expect("ids should load");

    assert_eq!(ids.len(), container.size().expect("size should load"));
    for (index, id) in ids.iter().enumerate() {
        assert_eq!(container.index_of(id).expect("index_of"), Some(index));
    }
}

#[test]
fn add_entity_appears_in_view() {
    let mut container = customers();
    assert_eq!(container.size().expect("size should load"), 7);

    let id = container
        .add_entity(Customer::new("Leroy", "Jenkins"))
        .expect("entity should be added");

    assert_eq!(container.size().expect("size should load"), 8);
    assert!(container.all_ids().expect("ids should load").contains(&id));
    let stored = container.get_item(&id).expect("item should load");
    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.first_name, "Leroy");
    assert_eq!(stored.last_name, "Jenkins");
}

#[test]
fn add_item_stores_a_default_instance() {
    let mut container = customers();

    let id = container.add_item().expect("item should be added");

    assert_eq!(container.size().expect("size should load"), 8);
    assert!(container.is_first(&id).expect("is_first should work"));
    assert_eq!(first_name(&container, &id), "");
}

#[test]
fn remove_first_shrinks_view() {
    let mut container = customers();
    let first_id = container.first_id().expect("first id").expect("not empty");

    assert!(container.remove_by_id(&first_id).expect("remove should work"));

    assert_eq!(container.size().expect("size should load"), 6);
    assert!(!container.all_ids().expect("ids should load").contains(&first_id));
    assert_ne!(container.first_id().expect("first id"), Some(first_id));
    assert!(!container.remove_by_id(&first_id).expect("second remove should work"));
    assert!(matches!(
        container.get_item(&first_id),
        Err(ContainerError::NotFound(id)) if id == first_id
    ));
}

#[test]
fn base_criteria_survive_filter_removal() {
    let criteria = FilterConverter::default()
        .convert(&FilterExpr::string_match("firstName", "d", false, false))
        .expect("filter should translate");
    let mut container = builder(seeded_store())
        .with_criteria(criteria)
        .build()
        .expect("container should build");

    let init_size = container.size().expect("size should load");
    let item_id = container.first_id().expect("first id").expect("one match");
    container.remove_by_id(&item_id).expect("remove should work");

    assert_eq!(init_size, 1);
    assert_ne!(container.first_id().expect("first id"), Some(item_id));
    assert_ne!(container.size().expect("size should load"), init_size);

    container.remove_all_filters();
    assert_eq!(container.size().expect("size should load"), 0);
}

#[test]
fn builder_filters_apply_from_the_start() {
    let filter = FilterExpr::from_json(&json!({
        "kind": "or",
        "filters": [
            { "kind": "compare", "field": "lastName", "op": "=", "value": "Long" },
            { "kind": "stringMatch", "field": "firstName", "text": "JIM", "ignoreCase": true, "prefixOnly": true }
        ]
    }))
    .expect("filter should decode");

    let mut container = builder(seeded_store())
        .with_filter(filter)
        .build()
        .expect("container should build");

    let names: Vec<String> = container
        .all_ids()
        .expect("ids should load")
        .iter()
        .map(|id| first_name(&container, id))
        .collect();
    assert_eq!(names, vec!["Jimmy", "Susan"]);
}

#[test]
fn builder_rejects_zero_page_size() {
    let result = builder(seeded_store()).with_page_size(0).build();

    assert!(matches!(result, Err(ContainerError::InvalidPageSize)));
}

#[test]
fn pages_are_cached_until_invalidated() {
    let store = SqliteDocumentStore::open_in_memory("customers").expect("store should open");
    seed_customers(&store);
    let counting = Arc::new(CountingRepo::new(store));
    let mut container = builder(counting.clone()).build().expect("container should build");

    for index in 0..3 {
        container.id_at(index).expect("index should resolve");
    }
    assert_eq!(counting.page_fetches(), 1, "one page should serve indices 0..3");
    assert_eq!(counting.counts(), 1, "size should be cached");

    container.id_at(4).expect("index 4 should resolve");
    container.first_id().expect("first id should load");
    assert_eq!(counting.page_fetches(), 2);

    container.apply_sort(&["lastName"], &[true]);
    container.id_at(0).expect("index 0 should resolve");
    assert_eq!(counting.page_fetches(), 3, "sort should drop cached pages");
    assert_eq!(counting.counts(), 1, "sort should keep the cached size");

    container
        .add_filter(FilterExpr::is_null("email"))
        .expect("filter should apply");
    container.id_at(0).expect("index 0 should resolve");
    assert_eq!(counting.page_fetches(), 4);
    assert_eq!(counting.counts(), 2, "filters should drop the cached size");
}

fn numbered_store(count: usize) -> SqliteDocumentStore {
    let store = SqliteDocumentStore::open_in_memory("customers").expect("store should open");
    for index in 0..count {
        let body = serde_json::to_value(Customer::new(&format!("Name{index:03}"), "Numbered"))
            .expect("customer should serialize");
        store
            .insert(ItemId::generate(), &body)
            .expect("customer should insert");
    }
    store
}

#[test]
fn scrolling_keeps_the_page_cache_bounded() {
    let counting = Arc::new(CountingRepo::new(numbered_store(60)));
    let mut container = IdContainer::<Customer>::builder(counting.clone())
        .with_page_size(5)
        .with_max_cached_pages(3)
        .sorted_by(SortSpec::by("firstName", SortDirection::Asc))
        .build()
        .expect("container should build");
    assert_eq!(container.page_size(), 5);
    assert_eq!(container.max_cached_pages(), 3);
    assert_eq!(
        container.sort_spec(),
        &SortSpec::by("firstName", SortDirection::Asc)
    );

    let size = container.size().expect("size should load");
    let first = container.id_at(0).expect("index 0 should resolve");
    for index in 0..size {
        container.id_at(index).expect("index should resolve");
        assert!(container.cached_pages() <= 3, "cache grew past its bound at {index}");
    }
    assert_eq!(size, 60);
    assert_eq!(container.cached_pages(), 3);
    assert_eq!(counting.page_fetches(), 12);

    assert_eq!(container.index_of(&first).expect("index_of should work"), Some(0));
    assert!(container.contains(&first).expect("contains should work"));
    assert_eq!(counting.page_fetches(), 12, "lookups by id should not load pages");

    container.id_at(0).expect("index 0 should resolve");
    assert_eq!(counting.page_fetches(), 13, "evicted page should be fetched again");
    assert_eq!(container.cached_pages(), 3);
}

#[test]
fn recently_used_pages_survive_eviction() {
    let counting = Arc::new(CountingRepo::new(numbered_store(20)));
    let mut container = IdContainer::<Customer>::builder(counting.clone())
        .with_page_size(5)
        .with_max_cached_pages(2)
        .build()
        .expect("container should build");

    container.id_at(0).expect("page 0 should load");
    container.id_at(5).expect("page 1 should load");
    container.id_at(1).expect("page 0 should be cached");
    container.id_at(10).expect("page 2 should load and evict page 1");
    assert_eq!(counting.page_fetches(), 3);

    container.id_at(2).expect("page 0 should still be cached");
    assert_eq!(counting.page_fetches(), 3);
    container.id_at(6).expect("page 1 should be fetched again");
    assert_eq!(counting.page_fetches(), 4);
}

#[test]
fn builder_rejects_zero_cache_capacity() {
    let result = builder(seeded_store()).with_max_cached_pages(0).build();

    assert!(matches!(result, Err(ContainerError::InvalidCacheCapacity)));
}

#[test]
fn fetch_page_matches_fetch_ids() {
    let store = SqliteDocumentStore::open_in_memory("numbers").expect("store should open");
    for n in 0..5 {
        store
            .insert(ItemId::generate(), &json!({ "n": n }))
            .expect("document should insert");
    }
    let counting = Arc::new(CountingRepo::new(store));
    let query = QueryService::new(counting.clone());
    let sort = SortSpec::by("n", SortDirection::Desc);

    let documents = query
        .fetch_page(None, &sort, 1, 2)
        .expect("page should load");
    let ids = query.fetch_ids(None, &sort, 1, 2).expect("ids should load");

    let numbers: Vec<Value> = documents.iter().map(|doc| doc.body["n"].clone()).collect();
    assert_eq!(numbers, vec![json!(3), json!(2)]);
    assert_eq!(
        documents.iter().map(|doc| doc.id).collect::<Vec<_>>(),
        ids
    );

    let criteria = FilterConverter::default()
        .convert(&FilterExpr::compare("n", CompareOp::Less, 3))
        .expect("filter should translate");
    let filtered = query
        .fetch_page(Some(&criteria), &sort, 0, 10)
        .expect("page should load");
    assert_eq!(
        filtered.iter().map(|doc| doc.body["n"].clone()).collect::<Vec<_>>(),
        vec![json!(2), json!(1), json!(0)]
    );

    let fetches = counting.page_fetches();
    assert!(query
        .fetch_page(None, &sort, 0, 0)
        .expect("empty page should load")
        .is_empty());
    assert_eq!(counting.page_fetches(), fetches, "zero limit should not reach the store");
}

#[test]
fn propagated_negation_applies_through_the_container() {
    let options = TranslateOptions {
        single_operand_negation: SingleOperandNegation::Propagate,
    };
    let not_austin =
        FilterExpr::negate(FilterExpr::any(vec![FilterExpr::equals("firstName", "Austin")]));

    let mut propagating = builder(seeded_store())
        .with_translate_options(options)
        .build()
        .expect("container should build");
    propagating
        .add_filter(not_austin.clone())
        .expect("filter should apply");

    let mut dropping = customers();
    dropping.add_filter(not_austin).expect("filter should apply");

    assert_eq!(propagating.translate_options(), options);
    assert_eq!(propagating.size().expect("size should load"), 5);
    let first = propagating.first_id().expect("first id").expect("not empty");
    assert_eq!(first_name(&propagating, &first), "Cordelia");
    assert_eq!(dropping.translate_options(), TranslateOptions::default());
    assert_eq!(dropping.size().expect("size should load"), 2);
}

#[test]
fn custom_factory_controls_item_creation() {
    let factory = EntityFactory::new(
        EntityDescriptor::<Customer>::bare()
            .with_id_slot(IdSlot::read_write("id", customer_id, bind_customer_id)),
    );
    let mut container = builder(seeded_store())
        .with_factory(factory)
        .build()
        .expect("container should build");

    assert!(matches!(
        container.add_item(),
        Err(ContainerError::Entity(EntityError::UninstantiableType(_)))
    ));
    assert_eq!(container.size().expect("size should load"), 7);

    let id = container
        .add_entity(Customer::new("Ada", "Lovelace"))
        .expect("entity should be added");
    assert_eq!(container.size().expect("size should load"), 8);
    assert_eq!(first_name(&container, &id), "Ada");
}

#[test]
fn store_predicates_follow_document_semantics() {
    let store = SqliteDocumentStore::open_in_memory("people").expect("store should open");
    let people = [
        json!({ "name": "Ada", "age": 36, "tag": "a.b" }),
        json!({ "name": "bob", "age": 25, "tag": "axb" }),
        json!({ "name": "Cy", "tag": null }),
        json!({ "name": "Dee", "age": 41, "address": { "city": "Oslo" } }),
    ];
    for person in &people {
        store
            .insert(ItemId::generate(), person)
            .expect("document should insert");
    }
    let converter = FilterConverter::default();
    let count = |filter: FilterExpr| {
        let criteria = converter.convert(&filter).expect("filter should translate");
        store.count(Some(&criteria)).expect("count should run")
    };

    assert_eq!(count(FilterExpr::compare("age", CompareOp::Greater, 30)), 2);
    assert_eq!(count(FilterExpr::compare("age", CompareOp::LessOrEqual, 36)), 2);
    assert_eq!(
        count(FilterExpr::negate(FilterExpr::compare("age", CompareOp::Greater, 30))),
        2,
        "negation should include documents without the field"
    );
    assert_eq!(count(FilterExpr::is_null("age")), 1);
    assert_eq!(count(FilterExpr::is_null("tag")), 2);
    assert_eq!(count(FilterExpr::string_match("tag", "a.b", false, false)), 1);
    assert_eq!(count(FilterExpr::string_match("name", "B", true, true)), 1);
    assert_eq!(count(FilterExpr::string_match("name", "B", false, true)), 0);
    assert_eq!(count(FilterExpr::equals("address.city", "Oslo")), 1);
    assert_eq!(
        count(FilterExpr::negate(FilterExpr::any(vec![
            FilterExpr::is_null("age"),
            FilterExpr::compare("age", CompareOp::Less, 30),
        ]))),
        2
    );
}

#[test]
fn position_of_agrees_with_paging() {
    let store = seeded_store();
    let sort = SortSpec::by("lastName", SortDirection::Desc);
    let ids = store
        .fetch_ids(PageQuery {
            criteria: None,
            sort: &sort,
            skip: 0,
            limit: 100,
        })
        .expect("ids should load");

    for (index, id) in ids.iter().enumerate() {
        assert_eq!(
            store.position_of(None, &sort, id).expect("position should load"),
            Some(index)
        );
    }
    assert_eq!(
        store
            .position_of(None, &sort, &ItemId::generate())
            .expect("position should load"),
        None
    );
}

#[test]
fn ties_break_by_id() {
    let mut container = customers();

    let first = container.id_at(0).expect("index 0 should resolve");
    let second = container.id_at(1).expect("index 1 should resolve");

    assert_eq!(first_name(&container, &first), "Austin");
    assert_eq!(first_name(&container, &second), "Austin");
    assert!(first < second, "equal sort keys should order by id");
}

#[test]
fn duplicate_insert_is_rejected() {
    let store = SqliteDocumentStore::open_in_memory("customers").expect("store should open");
    let id = ItemId::generate();

    store.insert(id, &json!({ "firstName": "A" })).expect("first insert");
    let err = store
        .insert(id, &json!({ "firstName": "B" }))
        .expect_err("second insert should fail");

    assert_eq!(err, RepoError::DuplicateId(id));
}

#[test]
fn file_store_persists_between_opens() {
    let temp_dir = unique_test_dir("file-store");
    let db_path = temp_dir.join("nested").join("documents.sqlite");

    {
        let store = SqliteDocumentStore::open(&db_path, "customers").expect("store should open");
        seed_customers(&store);
    }
    let other = SqliteDocumentStore::open(&db_path, "orders").expect("store should reopen");
    assert_eq!(other.count(None).expect("count should run"), 0);

    let store = SqliteDocumentStore::open(&db_path, "customers").expect("store should reopen");
    store.init().expect("schema init should be repeatable");
    assert_eq!(store.collection(), "customers");
    assert_eq!(store.db_path.as_deref(), Some(db_path.as_path()));
    let mut container = builder(Arc::new(store)).build().expect("container should build");
    assert_eq!(container.size().expect("size should load"), 7);

    drop(container);
    drop(other);
    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn default_store_path_uses_app_directory() {
    let db_path = default_store_path().expect("default store path should resolve");

    assert_eq!(
        db_path.file_name().and_then(|name| name.to_str()),
        Some("documents.sqlite")
    );
}
