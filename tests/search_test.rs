//! End-to-end search tests: parameters in, ranked log entries out

use chrono::{DateTime, Duration, TimeZone, Utc};
use logbook_search::error::LogbookError;
use logbook_search::models::{Attachment, LogEntry, Property};
use logbook_search::query::SearchParameters;
use logbook_search::search::{SearchConfig, SearchService};

/// Helper to create a search service over the standard fixture
async fn create_test_service() -> SearchService {
    let service = SearchService::new(&SearchConfig::default()).await.unwrap();
    service.index_entries(&fixture()).await.unwrap();
    service
}

fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Three entries, oldest first
fn fixture() -> Vec<LogEntry> {
    let mut fox = LogEntry::new(
        "alice",
        "Morning shift",
        "The quick brown fox jumps over the lazy dog",
    )
    .with_logbook("operations")
    .with_tag("testTag1")
    .with_property(Property::new("propA").with_attribute("attr1", "val1"))
    .with_created_date(days_ago(3));
    fox.id = Some(1);

    let mut beam = LogEntry::new("alice", "Beam loss", "Beam dump at injection")
        .with_level("Problem")
        .with_logbook("operations")
        .with_tag("testTag2")
        .with_property(Property::new("propA").with_attribute("attr1", "val2"))
        .with_event("dump", days_ago(10))
        .with_created_date(days_ago(2));
    beam.id = Some(2);

    let mut quench = LogEntry::new("bob", "Magnet quench", "Sector 3-4 tripped")
        .with_logbook("magnets")
        .with_property(Property::new("propB"))
        .with_attachment(Attachment::new("trace.png", "image/png"))
        .with_created_date(days_ago(1));
    quench.id = Some(3);

    vec![fox, beam, quench]
}

fn params(pairs: &[(&str, &str)]) -> SearchParameters {
    pairs.iter().copied().collect()
}

fn ids(result: &logbook_search::models::SearchResult) -> Vec<i64> {
    result.logs.iter().filter_map(|entry| entry.id).collect()
}

#[tokio::test]
async fn test_description_word_matches() {
    let service = create_test_service().await;
    let result = service.search(&params(&[("desc", "quick")])).await.unwrap();
    assert_eq!(result.hit_count, 1);
    assert_eq!(ids(&result), vec![1]);
}

#[tokio::test]
async fn test_description_wildcard() {
    let service = create_test_service().await;
    let result = service.search(&params(&[("desc", "jump*")])).await.unwrap();
    assert_eq!(ids(&result), vec![1]);

    // no implicit wildcard: "jump" is not a stored token
    let exact = service.search(&params(&[("desc", "jump")])).await.unwrap();
    assert_eq!(exact.hit_count, 0);
}

#[tokio::test]
async fn test_phrase_respects_word_order() {
    let service = create_test_service().await;

    let wrong_order = service
        .search(&params(&[("phrase", "brown quick")]))
        .await
        .unwrap();
    assert_eq!(wrong_order.hit_count, 0);

    let right_order = service
        .search(&params(&[("phrase", "quick brown")]))
        .await
        .unwrap();
    assert_eq!(ids(&right_order), vec![1]);
}

#[tokio::test]
async fn test_quoted_description_is_phrase() {
    let service = create_test_service().await;
    let result = service
        .search(&params(&[("desc", "\"lazy dog\"")]))
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![1]);

    let reversed = service
        .search(&params(&[("desc", "\"dog lazy\"")]))
        .await
        .unwrap();
    assert_eq!(reversed.hit_count, 0);
}

#[tokio::test]
async fn test_tag_wildcard_and_exact() {
    let service = create_test_service().await;

    let both = service.search(&params(&[("tags", "testTag*")])).await.unwrap();
    assert_eq!(both.hit_count, 2);

    let one = service.search(&params(&[("tags", "testTag1")])).await.unwrap();
    assert_eq!(ids(&one), vec![1]);
}

#[tokio::test]
async fn test_property_addressing() {
    let service = create_test_service().await;

    let exact = service
        .search(&params(&[("properties", "propA.attr1.val1")]))
        .await
        .unwrap();
    assert_eq!(ids(&exact), vec![1]);

    let any_value = service
        .search(&params(&[("properties", "propA.attr1.*")]))
        .await
        .unwrap();
    assert_eq!(any_value.hit_count, 2);

    let missing_attribute = service
        .search(&params(&[("properties", "propA.noAttr")]))
        .await
        .unwrap();
    assert_eq!(missing_attribute.hit_count, 0);

    let name_only = service
        .search(&params(&[("properties", "propB")]))
        .await
        .unwrap();
    assert_eq!(ids(&name_only), vec![3]);
}

#[tokio::test]
async fn test_categories_are_anded() {
    let service = create_test_service().await;
    let result = service
        .search(&params(&[("logbooks", "operations"), ("level", "problem")]))
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![2]);
}

#[tokio::test]
async fn test_values_within_category_are_ored() {
    let service = create_test_service().await;
    let result = service
        .search(&params(&[("logbooks", "magnets|nonexistent"), ("logbooks", "operations")]))
        .await
        .unwrap();
    assert_eq!(result.hit_count, 3);
}

#[tokio::test]
async fn test_temporal_range() {
    let service = create_test_service().await;

    let recent = service
        .search(&params(&[("start", "36 hours")]))
        .await
        .unwrap();
    assert_eq!(ids(&recent), vec![3]);

    let window = service
        .search(&params(&[("start", "4 days"), ("end", "30 hours")]))
        .await
        .unwrap();
    assert_eq!(window.hit_count, 2);
}

#[tokio::test]
async fn test_include_events() {
    let service = create_test_service().await;
    let range = [("start", "12 days"), ("end", "8 days")];

    let created_only = service.search(&params(&range)).await.unwrap();
    assert_eq!(created_only.hit_count, 0);

    let mut with_events = params(&range);
    with_events.insert_flag("includeEvents");
    let result = service.search(&with_events).await.unwrap();
    assert_eq!(ids(&result), vec![2]);
}

#[tokio::test]
async fn test_start_after_end_is_rejected() {
    let service = create_test_service().await;
    let err = service
        .search(&params(&[("start", "1 day"), ("end", "3 days")]))
        .await
        .unwrap_err();
    assert!(matches!(err, LogbookError::InvalidTimeRange { .. }));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_unbalanced_quote_is_rejected() {
    let service = create_test_service().await;
    let err = service
        .search(&params(&[("desc", "\"quick brown")]))
        .await
        .unwrap_err();
    assert!(matches!(err, LogbookError::MalformedQuery(_)));
}

#[tokio::test]
async fn test_pagination_max_wins() {
    let service = create_test_service().await;
    let result = service
        .search(&params(&[("size", "1"), ("limit", "2")]))
        .await
        .unwrap();
    assert_eq!(result.hit_count, 3);
    assert_eq!(ids(&result), vec![3, 2]);

    let second_page = service
        .search(&params(&[("size", "2"), ("from", "0"), ("from", "2")]))
        .await
        .unwrap();
    assert_eq!(ids(&second_page), vec![1]);
}

#[tokio::test]
async fn test_sort_order() {
    let service = create_test_service().await;

    let newest_first = service.search(&SearchParameters::new()).await.unwrap();
    assert_eq!(ids(&newest_first), vec![3, 2, 1]);

    let oldest_first = service.search(&params(&[("sort", "UP")])).await.unwrap();
    assert_eq!(ids(&oldest_first), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_free_text_query() {
    let service = create_test_service().await;

    let by_title = service.search(&params(&[("query", "quench")])).await.unwrap();
    assert_eq!(ids(&by_title), vec![3]);

    let by_tag = service.search(&params(&[("query", "testTag1")])).await.unwrap();
    assert_eq!(ids(&by_tag), vec![1]);
}

#[tokio::test]
async fn test_free_text_title_outranks_description() {
    let service = SearchService::new(&SearchConfig::default()).await.unwrap();
    let mut in_title = LogEntry::new("carol", "Vacuum leak", "Pressure rising")
        .with_logbook("vacuum")
        .with_created_date(days_ago(2));
    in_title.id = Some(10);
    let mut in_description = LogEntry::new("carol", "Pressure report", "Small vacuum leak found")
        .with_logbook("vacuum")
        .with_created_date(days_ago(1));
    in_description.id = Some(11);
    service.index_entries(&[in_title, in_description]).await.unwrap();

    let result = service.search(&params(&[("query", "vacuum")])).await.unwrap();
    assert_eq!(ids(&result), vec![10, 11]);
}

#[tokio::test]
async fn test_attachments() {
    let service = create_test_service().await;

    let mut any = SearchParameters::new();
    any.insert_flag("attachments");
    assert_eq!(ids(&service.search(&any).await.unwrap()), vec![3]);

    let images = service
        .search(&params(&[("attachments", "image")]))
        .await
        .unwrap();
    assert_eq!(ids(&images), vec![3]);

    let plots = service.search(&params(&[("attachments", "plt")])).await.unwrap();
    assert_eq!(plots.hit_count, 0);
}

#[tokio::test]
async fn test_fuzzy_flag() {
    let service = create_test_service().await;

    let strict = service.search(&params(&[("desc", "quikc")])).await.unwrap();
    assert_eq!(strict.hit_count, 0);

    let mut fuzzy = params(&[("desc", "quikc")]);
    fuzzy.insert_flag("fuzzy");
    assert_eq!(ids(&service.search(&fuzzy).await.unwrap()), vec![1]);
}

#[tokio::test]
async fn test_unknown_keys_are_ignored() {
    let service = create_test_service().await;
    let result = service
        .search(&params(&[("colour", "blue"), ("owner", "bob")]))
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![3]);
}

#[tokio::test]
async fn test_timezone_parameter() {
    let service = SearchService::new(&SearchConfig::default()).await.unwrap();
    let mut entry = LogEntry::new("alice", "Shift handover", "All quiet")
        .with_logbook("operations")
        .with_created_date(Utc.with_ymd_and_hms(2024, 3, 10, 10, 30, 0).unwrap());
    entry.id = Some(1);
    service.index_entry(&entry).await.unwrap();

    let window = [("start", "2024-03-10 11:00:00"), ("end", "2024-03-10 12:00:00")];

    let utc = service.search(&params(&window)).await.unwrap();
    assert_eq!(utc.hit_count, 0);

    let mut stockholm = params(&window);
    stockholm.insert("tz", "Europe/Stockholm");
    assert_eq!(service.search(&stockholm).await.unwrap().hit_count, 1);

    let mut unknown = params(&window);
    unknown.insert("tz", "Mars/Olympus_Mons");
    assert!(matches!(
        service.search(&unknown).await,
        Err(LogbookError::MalformedQuery(_))
    ));
}

#[tokio::test]
async fn test_deleted_entries_disappear() {
    let service = create_test_service().await;
    service.delete_entry(1).await.unwrap();
    let result = service.search(&params(&[("tags", "testTag*")])).await.unwrap();
    assert_eq!(ids(&result), vec![2]);
}
