use csv_insights_service::catalog::{ColumnType, MISSING_SENTINEL};
use csv_insights_service::config::ServiceConfig;
use csv_insights_service::memory::MemoryRowStore;
use csv_insights_service::{InsightsEngine, InsightsError};
use std::io::Write;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

fn engine() -> InsightsEngine {
    init_test_logging();
    InsightsEngine::new(Arc::new(MemoryRowStore::new()), ServiceConfig::default())
}

/// 12 rows: `status` alternates open/closed, `id` is unique, `note` is blank.
fn tickets_csv() -> String {
    let mut csv = String::from("status,id,note\n");
    for i in 1..=12 {
        let status = if i % 3 == 0 { "closed" } else { "open" };
        csv.push_str(&format!("{},{},   \n", status, i));
    }
    csv
}

#[tokio::test]
async fn test_upload_classifies_columns_and_serves_insights() {
    // Given: An engine backed by the in-memory row store
    let engine = engine();

    // When: Uploading the tickets file
    let file = engine
        .upload_csv("tickets.csv", "text/csv", tickets_csv().as_bytes())
        .await
        .expect("upload should succeed");

    // Then: Columns are classified by cardinality
    assert_eq!(file.filename, "tickets.csv");
    assert_eq!(file.rows_count, 12);
    let config = &file.columns_config;
    assert_eq!(config.get("status").unwrap().column_type, ColumnType::Meta);
    assert_eq!(config.get("id").unwrap().column_type, ColumnType::Data);
    let note = config.get("note").unwrap();
    assert_eq!(note.column_type, ColumnType::Ignore);
    assert_eq!(note.empty_values_count, 12);
    assert_eq!(note.index, 2);

    // When: Requesting insights for the stored file
    let insights = engine
        .get_insights(&file.id.to_string())
        .await
        .expect("insights should be served");

    // Then: Missing values and meta breakdowns reflect the upload
    let note_missing = insights
        .missing_values
        .iter()
        .find(|m| m.header == "note")
        .unwrap();
    assert_eq!(note_missing.empty_values_percentage, 100.0);
    assert_eq!(note_missing.column_index, 2);
    assert!(insights
        .missing_values
        .iter()
        .filter(|m| m.header != "note")
        .all(|m| m.empty_values_percentage == 0.0));

    assert_eq!(insights.meta_value_counts.len(), 1);
    let status = &insights.meta_value_counts[0];
    assert_eq!(status.header, "status");
    assert_eq!(status.column_index, 0);
    let counts: Vec<_> = status
        .value_counts
        .iter()
        .map(|v| (v.value.as_str(), v.count))
        .collect();
    assert_eq!(counts, vec![("open", 8), ("closed", 4)]);
}

#[tokio::test]
async fn test_rows_are_paged_with_sentinel_values() {
    // Given: An uploaded file
    let engine = engine();
    let file = engine
        .upload_csv("tickets.csv", "text/csv", tickets_csv().as_bytes())
        .await
        .unwrap();

    // When: Fetching the second page of five rows
    let page = engine
        .get_rows(&file.id.to_string(), 5, Some(5))
        .await
        .unwrap();

    // Then: Rows 6..=10 come back in file order with the display sentinel
    assert_eq!(page.skip, 5);
    assert_eq!(page.limit, 5);
    assert_eq!(page.rows_count, 12);
    let numbers: Vec<u64> = page.rows.iter().map(|r| r.row_number).collect();
    assert_eq!(numbers, vec![6, 7, 8, 9, 10]);
    let first = &page.rows[0];
    assert_eq!(first.columns.len(), 3);
    assert_eq!(first.columns[1].input_value, "6");
    assert_eq!(first.columns[2].input_value, MISSING_SENTINEL);
    assert!(first.columns[2].is_missing);
    assert!(!first.columns[1].is_missing);
    assert_eq!(first.columns[2].column_type, ColumnType::Ignore);

    // And: The default page size applies without a limit
    let default_page = engine.get_rows(&file.id.to_string(), 0, None).await.unwrap();
    assert_eq!(default_page.limit, 10);
    assert_eq!(default_page.rows.len(), 10);

    // And: A zero limit returns every row up to the page cap
    let unlimited = engine.get_rows(&file.id.to_string(), 0, Some(0)).await.unwrap();
    assert_eq!(unlimited.limit, 1000);
    assert_eq!(unlimited.rows.len(), 12);
}

#[tokio::test]
async fn test_deleted_file_is_not_found_everywhere() {
    // Given: An uploaded file that is then deleted
    let engine = engine();
    let file = engine
        .upload_csv("tickets.csv", "text/csv", tickets_csv().as_bytes())
        .await
        .unwrap();
    let file_id = file.id.to_string();
    engine.delete_file(&file_id).await.unwrap();

    // Then: Every read of it reports NotFound
    assert!(engine.get_insights(&file_id).await.unwrap_err().is_not_found());
    assert!(engine
        .get_rows(&file_id, 0, None)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(engine
        .column_prompt(&file_id, "status")
        .await
        .unwrap_err()
        .is_not_found());
    assert!(engine.delete_file(&file_id).await.unwrap_err().is_not_found());
    assert!(engine.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_never_existing_and_malformed_ids() {
    let engine = engine();

    let missing = engine
        .get_insights("8c5f1c5e-3c1a-4a8e-9f5e-2b0d6f1e7a11")
        .await
        .unwrap_err();
    assert!(matches!(missing, InsightsError::FileNotFound { .. }));

    let malformed = engine.get_insights("not-an-id").await.unwrap_err();
    assert!(matches!(malformed, InsightsError::InvalidReference { .. }));

    let malformed_delete = engine.delete_file("42").await.unwrap_err();
    assert!(matches!(malformed_delete, InsightsError::InvalidReference { .. }));
}

#[tokio::test]
async fn test_column_prompt_only_for_meta_columns() {
    // Given: A file with two meta columns and one data column
    let engine = engine();
    let mut csv = String::from("status,region,id\n");
    for i in 0..12 {
        let status = if i % 2 == 0 { "open" } else { "closed" };
        let region = ["north", "south", "east"][i % 3];
        csv.push_str(&format!("{},{},{}\n", status, region, i));
    }
    let file = engine
        .upload_csv("tickets.csv", "text/csv; charset=utf-8", csv.as_bytes())
        .await
        .unwrap();
    let file_id = file.id.to_string();

    // When: Building the prompt for a meta column
    let prompt = engine.column_prompt(&file_id, "status").await.unwrap();

    // Then: It names the file, the values and the remaining meta columns
    assert!(prompt.user_message.contains("'tickets.csv' containing 12 rows"));
    assert!(prompt.user_message.contains("'closed': 6 occurrences"));
    assert!(prompt.user_message.contains("'open': 6 occurrences"));
    assert!(prompt.user_message.contains("The other meta columns are: region."));

    // And: Unknown and data columns are NotFound
    let unknown = engine.column_prompt(&file_id, "owner").await.unwrap_err();
    assert!(matches!(unknown, InsightsError::ColumnNotFound { .. }));
    let data = engine.column_prompt(&file_id, "id").await.unwrap_err();
    assert!(matches!(data, InsightsError::ColumnNotFound { .. }));
}

#[tokio::test]
async fn test_literal_sentinel_text_is_a_real_value() {
    // Given: A column whose source text is sometimes the display sentinel
    let engine = engine();
    let file = engine
        .upload_csv(
            "flags.csv",
            "text/csv",
            b"flag,note\nno_value,\nyes,x\nno_value,\nyes,x\n",
        )
        .await
        .unwrap();
    let file_id = file.id.to_string();

    // Then: The literal text counts as a value and only blanks are missing
    let flag = file.columns_config.get("flag").unwrap();
    assert_eq!(flag.column_type, ColumnType::Meta);
    assert_eq!(flag.empty_values_count, 0);

    let insights = engine.get_insights(&file_id).await.unwrap();
    let counts = &insights.meta_value_counts[0];
    assert_eq!(counts.header, "flag");
    assert_eq!(counts.total(), file.rows_count - flag.empty_values_count);
    let values: Vec<_> = counts
        .value_counts
        .iter()
        .map(|v| (v.value.as_str(), v.count))
        .collect();
    assert_eq!(values, vec![("no_value", 2), ("yes", 2)]);

    // And: Stored rows keep the two apart
    let page = engine.get_rows(&file_id, 0, None).await.unwrap();
    let first = &page.rows[0].columns;
    assert_eq!(first[0].input_value, MISSING_SENTINEL);
    assert!(!first[0].is_missing);
    assert_eq!(first[1].input_value, MISSING_SENTINEL);
    assert!(first[1].is_missing);
}

#[tokio::test]
async fn test_zero_row_upload_reports_zero_percentages() {
    let engine = engine();

    let file = engine
        .upload_csv("empty.csv", "text/csv", b"a,b,c\n")
        .await
        .unwrap();
    assert_eq!(file.rows_count, 0);
    assert!(file
        .columns_config
        .iter()
        .all(|c| c.column_type == ColumnType::Ignore));

    let insights = engine.get_insights(&file.id.to_string()).await.unwrap();
    assert_eq!(insights.missing_values.len(), 3);
    assert!(insights
        .missing_values
        .iter()
        .all(|m| m.empty_values_percentage == 0.0));
    assert!(insights.meta_value_counts.is_empty());

    let page = engine.get_rows(&file.id.to_string(), 0, None).await.unwrap();
    assert_eq!(page.rows_count, 0);
    assert!(page.rows.is_empty());
}

#[tokio::test]
async fn test_rejects_unsupported_uploads() {
    let engine = InsightsEngine::new(
        Arc::new(MemoryRowStore::new()),
        ServiceConfig {
            max_upload_bytes: 16,
            ..ServiceConfig::default()
        },
    );

    let wrong_type = engine
        .upload_csv("data.json", "application/json", b"{}")
        .await
        .unwrap_err();
    assert!(matches!(wrong_type, InsightsError::UnsupportedInput { .. }));

    let too_big = engine
        .upload_csv("big.csv", "text/csv", tickets_csv().as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(too_big, InsightsError::UnsupportedInput { .. }));

    let ragged = engine
        .upload_csv("bad.csv", "text/csv", b"a,b\n1\n")
        .await
        .unwrap_err();
    assert!(matches!(ragged, InsightsError::UnsupportedInput { .. }));

    assert!(engine.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_files_newest_first() {
    let engine = engine();
    let first = engine
        .upload_csv("first.csv", "text/csv", b"a\n1\n")
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = engine
        .upload_csv("second.csv", "text/csv", b"a\n1\n")
        .await
        .unwrap();

    let files = engine.list_files().await.unwrap();
    let ids: Vec<_> = files.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_analyze_local_file_matches_stored_insights() {
    // Given: The same CSV on disk and uploaded
    let engine = engine();
    let mut source = tempfile::NamedTempFile::new().unwrap();
    source.write_all(tickets_csv().as_bytes()).unwrap();
    let file = engine
        .upload_csv("tickets.csv", "text/csv", tickets_csv().as_bytes())
        .await
        .unwrap();

    // When: Analyzing the file in memory and reading stored insights
    let analyzed = engine
        .analyze_source(source.path().to_str().unwrap())
        .await
        .unwrap();
    let stored = engine.get_insights(&file.id.to_string()).await.unwrap();

    // Then: Both views agree
    assert_eq!(analyzed, stored);
}

#[tokio::test]
async fn test_health_check_on_memory_store() {
    assert!(engine().health_check().await.is_ok());
}
