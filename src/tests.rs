//! Tests for the service facade.
//!
//! These tests cover:
//! - Record store semantics over the in-memory backend (round trip, partial
//!   updates, sort-key and index queries, open-task lookup, delete)
//! - Record/item conversion and DynamoDB expression building
//! - Date/time and encoding helpers
//! - Request shaping for events and invocations, and part planning for
//!   streamed uploads
//!
//! # Live AWS tests
//!
//! Tests marked `#[ignore]` talk to real services and need credentials in
//! your `.env` file:
//!
//! ```text
//! AWS_ACCESS_KEY_ID=your_access_key
//! AWS_SECRET_ACCESS_KEY=your_secret_key
//! AWS_REGION=your_preferred_region
//! SYSTEMTABLE=test-records
//! MESSAGE_BUCKET=your-test-bucket
//! FUNCTION_PREFIX=your-app-dev-
//! ```
//!
//! For DynamoDB Local, use dummy credentials and set
//! `AWS_ENDPOINT_URL=http://localhost:8000`.
//!
//! Run them with `cargo test -- --ignored`. They may incur AWS charges.

use crate::datetime::{
    add_hours, classify_day, combine_date_and_time, convert_24_to_12, date_after, extract_hours,
    shift_hour_backward, to_display, DayKind, INVALID_DATE,
};
use crate::dynamodb::{
    query_expression, update_expression, DynamoDb, InMemoryBackend, IndexKeys, Item, QueryTarget,
    Record, RecordQuery, RecordStore, RecordUpdate, ATTRIBUTES, INDEX1_KEY, INDEX1_SORT_KEY,
    INDEX2_KEY, INDEX3_KEY,
};
use crate::encoding::{camelize, encode_query_string, sanitize, to_iso_timestamp};
use crate::error::TimeFormatError;
use crate::events::event_entry;
use crate::lambda::FunctionInvoker;
use crate::s3::{plan_upload, read_part, UploadPlan, PART_SIZE};
use crate::{BlobStore, FacadeConfig};
use anyhow::Result;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{info, instrument};

const PHONE: &str = "+15551234567";

fn memory_store() -> RecordStore<InMemoryBackend> {
    RecordStore::new(InMemoryBackend::new())
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[derive(Serialize)]
struct Booking {
    guest: String,
    starts_at: DateTime<FixedOffset>,
    reminders: Vec<DateTime<Utc>>,
}

fn sample_booking() -> Booking {
    Booking {
        guest: "Ada".to_string(),
        starts_at: DateTime::parse_from_rfc3339("2024-03-01T09:30:00-05:00").unwrap(),
        reminders: vec![Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()],
    }
}

// --- Record store ---

#[tokio::test]
#[instrument]
async fn test_put_then_get_round_trip() -> Result<()> {
    let store = memory_store();
    let booking = sample_booking();

    info!("Testing put");
    store
        .put(PHONE, "booking#1", &booking, IndexKeys::new())
        .await?;

    info!("Testing get");
    let record = store.get(PHONE, "booking#1").await?.unwrap();
    assert_eq!(record.attributes, sanitize(&booking)?);
    assert_eq!(
        record.attributes["starts_at"],
        json!("2024-03-01T14:30:00.000Z")
    );
    assert_eq!(
        record.attributes["reminders"][0],
        json!("2024-02-29T12:00:00.000Z")
    );
    assert_eq!(record.index_keys, IndexKeys::default());
    Ok(())
}

#[tokio::test]
async fn test_get_missing_record_returns_none() -> Result<()> {
    let store = memory_store();
    assert!(store.get(PHONE, "task#missing").await?.is_none());
    assert!(store.query_by_sort_prefix(PHONE, "task#").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_put_overwrites_same_keys() -> Result<()> {
    let store = memory_store();
    store
        .put(
            PHONE,
            "task#1",
            &json!({ "status": "pending" }),
            IndexKeys::new().with_index2_key("venue#1"),
        )
        .await?;
    store
        .put(
            PHONE,
            "task#1",
            &json!({ "status": "done" }),
            IndexKeys::new(),
        )
        .await?;

    let record = store.get(PHONE, "task#1").await?.unwrap();
    assert_eq!(record.status(), Some("done"));
    assert_eq!(record.index_keys.index2_key, None);
    assert_eq!(store.backend().len().await, 1);
    Ok(())
}

#[tokio::test]
#[instrument]
async fn test_update_replaces_attributes_and_keeps_unset_index_keys() -> Result<()> {
    let store = memory_store();
    let keys = IndexKeys::new()
        .with_index1_key("venue#7")
        .with_index1_sort_key("2024-03-01")
        .with_index2_key("guest#ada");
    store
        .put(
            PHONE,
            "task#1",
            &json!({ "status": "pending", "note": "call back" }),
            keys,
        )
        .await?;

    info!("Testing update");
    let updated = store
        .update(
            PHONE,
            "task#1",
            &json!({ "status": "done" }),
            IndexKeys::new().with_index3_key("agent#4"),
        )
        .await?;

    assert_eq!(updated.attributes, json!({ "status": "done" }));
    assert_eq!(updated.index_keys.index1_key.as_deref(), Some("venue#7"));
    assert_eq!(updated.index_keys.index1_sort_key.as_deref(), Some("2024-03-01"));
    assert_eq!(updated.index_keys.index2_key.as_deref(), Some("guest#ada"));
    assert_eq!(updated.index_keys.index3_key.as_deref(), Some("agent#4"));
    assert_eq!(store.get(PHONE, "task#1").await?, Some(updated));
    Ok(())
}

#[tokio::test]
async fn test_update_missing_record_creates_it() -> Result<()> {
    let store = memory_store();
    let record = store
        .update(PHONE, "task#9", &json!({ "status": "pending" }), IndexKeys::new())
        .await?;
    assert_eq!(record.partition_key, PHONE);
    assert_eq!(record.sort_key, "task#9");
    assert_eq!(store.get(PHONE, "task#9").await?, Some(record));
    Ok(())
}

#[tokio::test]
async fn test_query_by_sort_prefix_in_sort_order() -> Result<()> {
    let store = memory_store();
    for sort_key in ["task#3", "task#1", "profile", "task#2"] {
        store
            .put(
                PHONE,
                sort_key,
                &json!({ "status": "pending" }),
                IndexKeys::new(),
            )
            .await?;
    }
    store
        .put("+15550000000", "task#1", &json!({}), IndexKeys::new())
        .await?;

    let tasks = store.query_by_sort_prefix(PHONE, "task#").await?;
    let sort_keys: Vec<&str> = tasks.iter().map(|r| r.sort_key.as_str()).collect();
    assert_eq!(sort_keys, ["task#1", "task#2", "task#3"]);
    Ok(())
}

#[tokio::test]
#[instrument]
async fn test_index_queries() -> Result<()> {
    let store = memory_store();
    store
        .put(
            "booking#1",
            "meta",
            &json!({ "guest": "Ada" }),
            IndexKeys::new()
                .with_index1_key("venue#7")
                .with_index1_sort_key("2024-03-02#booking#1")
                .with_index2_key("guest#ada"),
        )
        .await?;
    store
        .put(
            "booking#2",
            "meta",
            &json!({ "guest": "Grace" }),
            IndexKeys::new()
                .with_index1_key("venue#7")
                .with_index1_sort_key("2024-03-01#booking#2")
                .with_index3_key("agent#4"),
        )
        .await?;
    // No sort component, so it is absent from GSI1.
    store
        .put(
            "booking#3",
            "meta",
            &json!({ "guest": "Linus" }),
            IndexKeys::new().with_index1_key("venue#7"),
        )
        .await?;

    info!("Testing query_by_index1");
    let by_venue = store.query_by_index1("venue#7").await?;
    let partitions: Vec<&str> = by_venue.iter().map(|r| r.partition_key.as_str()).collect();
    assert_eq!(partitions, ["booking#2", "booking#1"]);

    info!("Testing query_by_index1_sort_prefix");
    let on_day = store
        .query_by_index1_sort_prefix("venue#7", "2024-03-02")
        .await?;
    assert_eq!(on_day.len(), 1);
    assert_eq!(on_day[0].partition_key, "booking#1");

    info!("Testing query_by_index2 and query_by_index3");
    let by_guest = store.query_by_index2("guest#ada").await?;
    assert_eq!(by_guest.len(), 1);
    assert_eq!(by_guest[0].attributes["guest"], json!("Ada"));
    let by_agent = store.query_by_index3("agent#4").await?;
    assert_eq!(by_agent.len(), 1);
    assert_eq!(by_agent[0].partition_key, "booking#2");
    assert!(store.query_by_index3("agent#5").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_prefix_on_equality_only_index_fails() {
    let store = memory_store();
    let query = RecordQuery::on(QueryTarget::Index2, "guest#ada").with_sort_prefix("x");
    assert!(store.query(query).await.is_err());
}

#[tokio::test]
#[instrument]
async fn test_open_tasks_by_phone() -> Result<()> {
    let store = memory_store();
    store
        .put(
            PHONE,
            "task#1",
            &json!({ "status": "pending", "kind": "callback" }),
            IndexKeys::new(),
        )
        .await?;
    store
        .put(
            PHONE,
            "task#2",
            &json!({ "status": "done" }),
            IndexKeys::new(),
        )
        .await?;
    store
        .put(
            PHONE,
            "reminder#1",
            &json!({ "status": "pending" }),
            IndexKeys::new(),
        )
        .await?;

    let open = store.query_open_tasks_by_phone(PHONE).await?;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].sort_key, "task#1");
    assert!(store
        .query_open_tasks_by_phone("+15550000000")
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_returns_removed_record() -> Result<()> {
    let store = memory_store();
    store
        .put(
            PHONE,
            "task#1",
            &json!({ "status": "pending" }),
            IndexKeys::new(),
        )
        .await?;

    let removed = store.delete(PHONE, "task#1").await?;
    assert_eq!(removed.map(|r| r.sort_key), Some("task#1".to_string()));
    assert!(store.get(PHONE, "task#1").await?.is_none());
    assert!(store.delete(PHONE, "task#1").await?.is_none());
    assert!(store.backend().is_empty().await);
    Ok(())
}

// --- Record/item conversion ---

#[test]
fn test_record_item_conversion() -> Result<()> {
    let record = Record::new(
        PHONE,
        "task#1",
        json!({ "status": "pending", "tags": ["a", "b"], "meta": { "vip": true, "note": null } }),
    )
    .with_index_keys(IndexKeys::new().with_index2_key("guest#ada"));

    let item = record.to_item()?;
    assert_eq!(item.get_string(INDEX2_KEY), Some(&"guest#ada".to_string()));
    assert_eq!(item.get_string(INDEX1_KEY), None);
    assert_eq!(item.get_string(INDEX3_KEY), None);
    assert_eq!(item.clone().into_attributes().len(), 4);

    let back = Record::from_item(item)?;
    assert_eq!(back, record);
    Ok(())
}

#[test]
fn test_record_from_item_requires_keys() {
    let item = Item::new().set_string("PK", PHONE);
    assert!(Record::from_item(item).is_err());

    let item = Item::key(PHONE, "task#1");
    let record = Record::from_item(item).unwrap();
    assert_eq!(record.attributes, Value::Null);
    assert!(record.index_keys.is_empty());
}

#[test]
fn test_item_nested_attributes() -> Result<()> {
    let item = Item::new().set_value(ATTRIBUTES, &json!({ "status": "pending" }))?;
    let attributes: Option<HashMap<String, String>> = item.get_value(ATTRIBUTES)?;
    assert_eq!(
        attributes.unwrap().get("status").map(String::as_str),
        Some("pending")
    );
    assert!(item.get_value::<Value>("missing")?.is_none());
    Ok(())
}

#[test]
fn test_index_keys_apply() {
    let mut stored = IndexKeys::new()
        .with_index1_key("venue#1")
        .with_index2_key("guest#1");
    stored.apply(&IndexKeys::new().with_index2_key("guest#2"));

    assert_eq!(stored.index1_key.as_deref(), Some("venue#1"));
    assert_eq!(stored.index2_key.as_deref(), Some("guest#2"));
    assert_eq!(stored.index3_key, None);
    let names: Vec<&str> = stored.fields().map(|(name, _)| name).collect();
    assert_eq!(names, [INDEX1_KEY, INDEX2_KEY]);
}

// --- DynamoDB expressions ---

fn sample_update(index_keys: IndexKeys) -> RecordUpdate {
    RecordUpdate {
        partition_key: PHONE.to_string(),
        sort_key: "task#1".to_string(),
        attributes: json!({ "status": "done" }),
        index_keys,
    }
}

fn string_value(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

#[test]
fn test_update_expression_without_index_keys() -> Result<()> {
    let expression = update_expression(&sample_update(IndexKeys::new()))?;

    assert_eq!(expression.update, "SET #attributes = :attributes");
    assert_eq!(
        expression.names,
        HashMap::from([("#attributes".to_string(), ATTRIBUTES.to_string())])
    );
    assert_eq!(expression.values.len(), 1);
    assert!(matches!(expression.values[":attributes"], AttributeValue::M(_)));
    Ok(())
}

#[test]
fn test_update_expression_sets_index_keys_in_fixed_order() -> Result<()> {
    let index_keys = IndexKeys::new()
        .with_index3_key("owner#3")
        .with_index1_sort_key("2024-03-01")
        .with_index2_key("guest#2")
        .with_index1_key("venue#1");
    let expression = update_expression(&sample_update(index_keys))?;

    assert_eq!(
        expression.update,
        "SET #attributes = :attributes, #idx0 = :idx0, #idx1 = :idx1, #idx2 = :idx2, \
         #idx3 = :idx3"
    );
    let bound: Vec<(&str, AttributeValue)> = (0..4)
        .map(|i| {
            (
                expression.names[&format!("#idx{i}")].as_str(),
                expression.values[&format!(":idx{i}")].clone(),
            )
        })
        .collect();
    assert_eq!(
        bound,
        [
            (INDEX1_KEY, string_value("venue#1")),
            (INDEX1_SORT_KEY, string_value("2024-03-01")),
            (INDEX2_KEY, string_value("guest#2")),
            (INDEX3_KEY, string_value("owner#3")),
        ]
    );
    Ok(())
}

#[test]
fn test_update_expression_binds_only_supplied_index_keys() -> Result<()> {
    let index_keys = IndexKeys::new().with_index2_key("guest#2");
    let expression = update_expression(&sample_update(index_keys))?;

    assert_eq!(expression.update, "SET #attributes = :attributes, #idx0 = :idx0");
    assert_eq!(expression.names.len(), 2);
    assert_eq!(expression.values.len(), 2);
    assert_eq!(expression.names["#idx0"], INDEX2_KEY);
    assert_eq!(expression.values[":idx0"], string_value("guest#2"));
    for omitted in [INDEX1_KEY, INDEX1_SORT_KEY, INDEX3_KEY] {
        assert!(!expression.names.values().any(|name| name == omitted));
    }
    Ok(())
}

#[test]
fn test_query_expression_on_table() -> Result<()> {
    let expression = query_expression(&RecordQuery::partition(PHONE))?;
    assert_eq!(expression.key_condition, "#pk = :pk");
    assert_eq!(expression.filter, None);
    assert_eq!(expression.names, HashMap::from([("#pk".to_string(), "PK".to_string())]));
    assert_eq!(
        expression.values,
        HashMap::from([(":pk".to_string(), string_value(PHONE))])
    );

    let expression = query_expression(&RecordQuery::partition(PHONE).with_sort_prefix("task#"))?;
    assert_eq!(expression.key_condition, "#pk = :pk AND begins_with(#sk, :sk)");
    assert_eq!(expression.names["#sk"], "SK");
    assert_eq!(expression.values[":sk"], string_value("task#"));
    Ok(())
}

#[test]
fn test_query_expression_on_indexes() -> Result<()> {
    let query = RecordQuery::on(QueryTarget::Index1, "venue#1").with_sort_prefix("2024-03");
    let expression = query_expression(&query)?;
    assert_eq!(expression.key_condition, "#pk = :pk AND begins_with(#sk, :sk)");
    assert_eq!(expression.names["#pk"], INDEX1_KEY);
    assert_eq!(expression.names["#sk"], INDEX1_SORT_KEY);

    let expression = query_expression(&RecordQuery::on(QueryTarget::Index3, "owner#3"))?;
    assert_eq!(expression.key_condition, "#pk = :pk");
    assert_eq!(expression.names["#pk"], INDEX3_KEY);
    Ok(())
}

#[test]
fn test_query_expression_status_filter() -> Result<()> {
    let query = RecordQuery::on(QueryTarget::Index2, PHONE).with_status("pending");
    let expression = query_expression(&query)?;

    assert_eq!(expression.key_condition, "#pk = :pk");
    assert_eq!(expression.filter.as_deref(), Some("#attributes.#status = :status"));
    assert_eq!(expression.names["#attributes"], ATTRIBUTES);
    assert_eq!(expression.names["#status"], "status");
    assert_eq!(expression.values[":status"], string_value("pending"));
    Ok(())
}

#[test]
fn test_query_expression_rejects_prefix_on_equality_only_index() {
    for target in [QueryTarget::Index2, QueryTarget::Index3] {
        let query = RecordQuery::on(target, "guest#2").with_sort_prefix("x");
        assert!(query_expression(&query).is_err());
    }
}

// --- Encoding helpers ---

#[test]
fn test_sanitize_is_idempotent() -> Result<()> {
    let once = sanitize(&sample_booking())?;
    let twice = sanitize(&once)?;
    assert_eq!(once, twice);
    assert_eq!(once["guest"], json!("Ada"));
    Ok(())
}

#[test]
fn test_sanitize_leaves_other_strings_alone() -> Result<()> {
    let payload = json!({ "day": "2024-03-01", "time": "14:30", "n": 3, "flag": false });
    assert_eq!(sanitize(&payload)?, payload);
    Ok(())
}

#[test]
fn test_sanitize_rewrites_instants_in_free_text() -> Result<()> {
    let payload = json!({ "note": "2024-03-01T09:30:00.123456789+05:00" });
    assert_eq!(
        sanitize(&payload)?,
        json!({ "note": "2024-03-01T04:30:00.123Z" })
    );

    let payload = json!({ "note": "call back at 2024-03-01T09:30:00Z" });
    assert_eq!(sanitize(&payload)?, payload);
    Ok(())
}

#[test]
fn test_to_iso_timestamp() {
    let expected = "2024-03-01T14:30:00.000Z";
    assert_eq!(to_iso_timestamp("2024-03-01T15:30:00+01:00").unwrap(), expected);
    assert_eq!(to_iso_timestamp("2024-03-01T14:30").unwrap(), expected);
    assert_eq!(
        to_iso_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()).unwrap(),
        expected
    );
    assert_eq!(to_iso_timestamp(1_709_303_400_000_i64).unwrap(), expected);
    assert_eq!(
        to_iso_timestamp(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).unwrap(),
        "2024-03-01T00:00:00.000Z"
    );
    assert!(matches!(
        to_iso_timestamp("next tuesday"),
        Err(TimeFormatError::InvalidTimestamp(_))
    ));
}

#[test]
fn test_encode_query_string() {
    let records = [object(json!({ "a": "1 2" })), object(json!({ "b": "x&y" }))];
    assert_eq!(encode_query_string(&records), "a=1%202&b=x%26y");

    let records = [object(json!({ "page": 2, "q": "café" }))];
    assert_eq!(encode_query_string(&records), "page=2&q=caf%C3%A9");
    assert_eq!(encode_query_string(&[]), "");
}

#[test]
fn test_encode_query_string_escapes_reserved_marks() {
    let records = [object(json!({ "msg": "it's (ok)!", "glob": "a*b", "safe": "a-b_c.d~e" }))];
    assert_eq!(
        encode_query_string(&records),
        "msg=it%27s%20%28ok%29%21&glob=a%2Ab&safe=a-b_c.d~e"
    );
}

#[test]
fn test_camelize() {
    // every word after the first is capitalized, not only the last
    assert_eq!(camelize("Hello big World"), "helloBigWorld");
    assert_eq!(camelize("  guest   name "), "guestName");
    assert_eq!(camelize(""), "");
}

// --- Date/time helpers ---

#[test]
fn test_shift_hour_backward() {
    assert_eq!(shift_hour_backward("00:15").as_deref(), Some("23:15"));
    assert_eq!(shift_hour_backward("01:00").as_deref(), Some("00:00"));
    assert_eq!(shift_hour_backward("14:45").as_deref(), Some("13:45"));
    assert_eq!(shift_hour_backward("noon"), None);
    assert_eq!(shift_hour_backward("25:00"), None);
}

#[test]
fn test_convert_24_to_12() {
    assert_eq!(convert_24_to_12("00:00").as_deref(), Some("12:00 AM"));
    assert_eq!(convert_24_to_12("13:05").as_deref(), Some("1:05 PM"));
    assert_eq!(convert_24_to_12("12:30").as_deref(), Some("12:30 PM"));
    assert_eq!(convert_24_to_12("09:07").as_deref(), Some("9:07 AM"));
    assert_eq!(convert_24_to_12("9am"), None);
}

#[test]
fn test_combine_date_and_time() {
    assert_eq!(
        combine_date_and_time("2024-03-01", "14:30").unwrap(),
        "2024-03-01T14:30:00.000Z"
    );
    assert_eq!(
        combine_date_and_time("2024-03-01", "14:30:15").unwrap(),
        "2024-03-01T14:30:15.000Z"
    );
    assert_eq!(
        combine_date_and_time("2024-3-1", "14:30"),
        Err(TimeFormatError::InvalidDate("2024-3-1".to_string()))
    );
    assert_eq!(
        combine_date_and_time("2024-03-01", "2:30"),
        Err(TimeFormatError::InvalidTime("2:30".to_string()))
    );
    assert!(matches!(
        combine_date_and_time("2024-02-30", "10:00"),
        Err(TimeFormatError::InvalidDate(_))
    ));
    assert!(matches!(
        combine_date_and_time("2024-03-01", "24:00"),
        Err(TimeFormatError::InvalidTime(_))
    ));
}

#[test]
fn test_classify_day() {
    // 2024-03-01 is a Friday.
    assert_eq!(classify_day("2024-03-01"), Some(DayKind::Weekend));
    assert_eq!(classify_day("2024-03-02"), Some(DayKind::Weekend));
    assert_eq!(classify_day("2024-03-03"), Some(DayKind::Weekend));
    assert_eq!(classify_day("2024-03-04"), Some(DayKind::Weekday));
    assert_eq!(classify_day("2024-02-29"), Some(DayKind::Weekday));
    assert_eq!(classify_day("2024-3-4"), None);
}

#[test]
fn test_date_after() {
    let leap_day = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
    assert_eq!(
        date_after(leap_day, 2),
        NaiveDate::from_ymd_opt(2024, 3, 1)
    );
    assert_eq!(
        date_after(leap_day, -28),
        NaiveDate::from_ymd_opt(2024, 1, 31)
    );
}

#[test]
fn test_extract_hours() {
    assert_eq!(extract_hours("about 3 hours"), 3);
    assert_eq!(extract_hours("12-14 hrs"), 12);
    assert_eq!(extract_hours("soon"), 0);
    assert_eq!(extract_hours(""), 0);
}

#[test]
fn test_add_hours() {
    assert_eq!(add_hours("23:30", 1.5).as_deref(), Some("01:00"));
    assert_eq!(add_hours("01:00", -2.0).as_deref(), Some("23:00"));
    assert_eq!(add_hours("09:15", 0.25).as_deref(), Some("09:30"));
    assert_eq!(
        add_hours("2024-03-01T23:30:00Z", 1.0).as_deref(),
        Some("2024-03-02T00:30:00.000Z")
    );
    assert_eq!(add_hours("whenever", 1.0), None);
    assert_eq!(add_hours("10:00", f64::NAN), None);
    assert_eq!(add_hours("10:00", 1e300), None);
    assert_eq!(add_hours("10:00", -1e300), None);
    assert_eq!(add_hours("2024-03-01T23:30:00Z", 1e300), None);
    assert_eq!(add_hours("2024-03-01T23:30:00Z", 1e12), None);
}

#[test]
fn test_to_display() {
    let utc = FixedOffset::east_opt(0).unwrap();
    let display = to_display("2024-03-01T14:30:00Z", &utc);
    assert_eq!(display.date, "March 1, 2024");
    assert_eq!(display.time, "2:30 PM");

    let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
    let display = to_display("2024-03-01T02:05:00Z", &new_york);
    assert_eq!(display.date, "February 29, 2024");
    assert_eq!(display.time, "9:05 PM");

    let display = to_display("not a date", &utc);
    assert_eq!(display.date, INVALID_DATE);
    assert_eq!(display.time, INVALID_DATE);
}

// --- Configuration and request shaping ---

#[test]
fn test_config_from_lookup() -> Result<()> {
    let vars = HashMap::from([
        ("SYSTEMTABLE", "records"),
        ("MESSAGE_BUCKET", "messages"),
        ("FUNCTION_PREFIX", "app-prod-"),
    ]);
    let config = FacadeConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))?;
    assert_eq!(config, FacadeConfig::new("records", "messages", "app-prod-"));
    assert_eq!(config.event_bus, "default");
    assert_eq!(config.event_source, "system");

    let missing = FacadeConfig::from_lookup(|name| {
        (name != "MESSAGE_BUCKET")
            .then(|| vars.get(name).map(|v| v.to_string()))
            .flatten()
    });
    assert!(missing.unwrap_err().to_string().contains("MESSAGE_BUCKET"));
    Ok(())
}

#[test]
fn test_event_entry() -> Result<()> {
    let entry = event_entry("default", "system", "TaskCreated", &json!({ "task": 1 }))?;
    assert_eq!(entry.source(), Some("system"));
    assert_eq!(entry.detail_type(), Some("TaskCreated"));
    assert_eq!(entry.detail(), Some(r#"{"task":1}"#));
    assert_eq!(entry.event_bus_name(), Some("default"));
    Ok(())
}

#[test]
fn test_function_name() {
    let config = aws_sdk_lambda::Config::builder()
        .behavior_version(aws_sdk_lambda::config::BehaviorVersion::latest())
        .region(aws_sdk_lambda::config::Region::new("us-east-1"))
        .build();
    let invoker =
        FunctionInvoker::from_client(aws_sdk_lambda::Client::from_conf(config), "app-prod-");
    assert_eq!(invoker.function_name("sendReminder"), "app-prod-sendReminder");
}

#[tokio::test]
async fn test_read_part_splits_stream() -> Result<()> {
    let data: Vec<u8> = (0..20).collect();
    let mut reader = data.as_slice();

    let mut sizes = Vec::new();
    loop {
        let part = read_part(&mut reader, 8).await?;
        if part.is_empty() {
            break;
        }
        sizes.push(part.len());
    }
    assert_eq!(sizes, [8, 8, 4]);
    Ok(())
}

#[tokio::test]
async fn test_plan_upload_empty_stream_is_single_put() -> Result<()> {
    let empty: &[u8] = &[];
    match plan_upload(empty, PART_SIZE).await? {
        UploadPlan::Single(body) => assert!(body.is_empty()),
        UploadPlan::Multipart(_) => panic!("empty stream planned as multipart"),
    }
    Ok(())
}

/// Drains a multipart plan and returns the size of each part.
async fn planned_part_sizes(data: &[u8], part_size: usize) -> Result<Option<Vec<usize>>> {
    let mut parts = match plan_upload(data, part_size).await? {
        UploadPlan::Single(_) => return Ok(None),
        UploadPlan::Multipart(parts) => parts,
    };
    let mut sizes = Vec::new();
    while let Some(part) = parts.next_part().await? {
        sizes.push(part.len());
    }
    Ok(Some(sizes))
}

#[tokio::test]
#[instrument]
async fn test_plan_upload_part_boundaries() -> Result<()> {
    const SMALL_PART: usize = 16;
    let data = vec![7_u8; 2 * SMALL_PART + 3];

    info!("Shorter than one part");
    assert_eq!(planned_part_sizes(&data[..SMALL_PART - 1], SMALL_PART).await?, None);

    info!("Exactly one part");
    assert_eq!(
        planned_part_sizes(&data[..SMALL_PART], SMALL_PART).await?,
        Some(vec![SMALL_PART])
    );

    info!("One byte over");
    assert_eq!(
        planned_part_sizes(&data[..SMALL_PART + 1], SMALL_PART).await?,
        Some(vec![SMALL_PART, 1])
    );

    info!("Several parts");
    assert_eq!(
        planned_part_sizes(&data, SMALL_PART).await?,
        Some(vec![SMALL_PART, SMALL_PART, 3])
    );
    Ok(())
}

#[tokio::test]
async fn test_plan_upload_at_default_part_size() -> Result<()> {
    let data = vec![0_u8; PART_SIZE + 1];
    assert_eq!(
        planned_part_sizes(&data[..PART_SIZE], PART_SIZE).await?,
        Some(vec![PART_SIZE])
    );
    assert_eq!(
        planned_part_sizes(&data, PART_SIZE).await?,
        Some(vec![PART_SIZE, 1])
    );
    Ok(())
}

#[test]
fn test_blob_store_part_size() {
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
        .region(aws_sdk_s3::config::Region::new("us-east-1"))
        .build();
    let store = BlobStore::from_client(aws_sdk_s3::Client::from_conf(config), "bucket");
    assert_eq!(store.part_size(), PART_SIZE);
    assert_eq!(store.clone().with_part_size(5 * 1024 * 1024).part_size(), 5 * 1024 * 1024);
    assert_eq!(store.with_part_size(0).part_size(), 1);
}

// --- Live AWS ---

#[instrument]
async fn setup_live_store() -> Result<RecordStore<DynamoDb>> {
    dotenv::dotenv().ok();
    let config = FacadeConfig::from_env()?;
    let sdk_config = aws_config::load_from_env().await;
    let ddb = DynamoDb::new(&sdk_config, &config.table_name);

    if ddb.create_table_if_not_exists().await?.is_some() {
        info!("Table created, waiting for it to become active");
        tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;
    }
    Ok(RecordStore::new(ddb))
}

#[tokio::test]
#[ignore]
#[instrument]
async fn test_dynamodb_record_lifecycle() -> Result<()> {
    info!("Starting test_dynamodb_record_lifecycle");
    let store = setup_live_store().await?;
    let phone = "+15559990000";

    info!("Testing put");
    store
        .put(
            phone,
            "task#1",
            &json!({ "status": "pending" }),
            IndexKeys::new().with_index2_key("it#guest"),
        )
        .await?;
    store
        .put(
            phone,
            "task#2",
            &json!({ "status": "done" }),
            IndexKeys::new(),
        )
        .await?;

    info!("Testing query_open_tasks_by_phone");
    let open = store.query_open_tasks_by_phone(phone).await?;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].sort_key, "task#1");

    info!("Testing update");
    let updated = store
        .update(phone, "task#1", &json!({ "status": "done" }), IndexKeys::new())
        .await?;
    assert_eq!(updated.index_keys.index2_key.as_deref(), Some("it#guest"));
    assert!(store.query_open_tasks_by_phone(phone).await?.is_empty());

    info!("Cleaning up test data");
    assert!(store.delete(phone, "task#1").await?.is_some());
    assert!(store.delete(phone, "task#2").await?.is_some());
    assert!(store.get(phone, "task#1").await?.is_none());
    Ok(())
}
