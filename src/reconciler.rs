use crate::error::Error;
use crate::report::{CAMPAIGN_NAME, VOLATILE_COLUMNS};
use crate::sheets::{a1_range, sheet_range, SheetStore};
use crate::table::{Cell, Table};
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::collections::HashMap;

const TIMESTAMP_CELL: &str = "A1";
const TABLE_ORIGIN: &str = "A2";

/// Merges `fresh` into the previously published `prior` table, keyed by campaign name.
///
/// The prior table decides which rows exist and in what order. Matching rows
/// get their volatile columns replaced; everything else is kept as published.
/// Campaigns only present in `fresh` are dropped, and columns only present in
/// `fresh` are appended.
pub fn merge(prior: &Table, fresh: &Table) -> Result<Table, Error> {
    if prior.is_empty() {
        return Ok(fresh.clone());
    }
    if fresh.is_empty() {
        return Ok(prior.clone());
    }

    let prior_key = prior.require_column(CAMPAIGN_NAME)?;
    let fresh_key = fresh.require_column(CAMPAIGN_NAME)?;

    let mut by_name: HashMap<String, &[Cell]> = HashMap::with_capacity(fresh.len());
    for row in fresh.rows() {
        let name = row[fresh_key].normalize();
        if by_name.contains_key(&name) {
            warn!("Duplicate campaign '{}' in fresh report, keeping the first", name);
            continue;
        }
        by_name.insert(name, row.as_slice());
    }

    let mut columns = prior.columns().to_vec();
    // (merged column, fresh column) pairs copied on a name match
    let mut copied = Vec::new();

    for (fresh_idx, column) in fresh.columns().iter().enumerate() {
        match prior.column_index(column) {
            Some(prior_idx) if VOLATILE_COLUMNS.contains(&column.as_str()) => {
                copied.push((prior_idx, fresh_idx));
            }
            Some(_) => {}
            None => {
                copied.push((columns.len(), fresh_idx));
                columns.push(column.clone());
            }
        }
    }

    let mut merged = Table::new(columns);
    let mut matched = 0;

    for row in prior.rows() {
        let mut row = row.clone();
        row.resize(merged.columns().len(), Cell::Empty);

        if let Some(fresh_row) = by_name.get(&row[prior_key].normalize()) {
            for &(to, from) in &copied {
                row[to] = fresh_row[from].clone();
            }
            matched += 1;
        }
        merged.push_row(row);
    }

    debug!(
        "Merged {} of {} published rows with {} fresh rows",
        matched,
        prior.len(),
        fresh.len()
    );
    Ok(merged)
}

/// Reads the published table: row 1 is the timestamp, row 2 the header.
pub async fn load_published(store: &dyn SheetStore, sheet: &str) -> Result<Table, Error> {
    let values = store.get_values(&sheet_range(sheet)).await?;
    Ok(Table::from_values(values.into_iter().skip(1).collect()))
}

/// Writes the timestamp marker and the whole table in one bulk update.
pub async fn publish(
    store: &dyn SheetStore,
    sheet: &str,
    table: &Table,
    now: NaiveDateTime,
) -> Result<(), Error> {
    let stamp = format!("Last updated: {}", now.format("%Y-%m-%d %H:%M:%S"));
    store
        .update_values(&a1_range(sheet, TIMESTAMP_CELL), vec![vec![stamp]])
        .await?;
    store
        .update_values(&a1_range(sheet, TABLE_ORIGIN), table.to_values())
        .await?;

    info!(
        "Published {} rows to worksheet '{}' (timestamp in {}, table from {})",
        table.len(),
        sheet,
        TIMESTAMP_CELL,
        TABLE_ORIGIN
    );
    Ok(())
}

/// Load, merge and publish in one go. Returns the merged table.
pub async fn reconcile(
    store: &dyn SheetStore,
    sheet: &str,
    fresh: &Table,
    now: NaiveDateTime,
) -> Result<Table, Error> {
    let prior = load_published(store, sheet).await?;
    if prior.is_empty() {
        info!("Worksheet '{}' has no published rows, using fresh report as is", sheet);
    }

    let merged = merge(&prior, fresh)?;
    publish(store, sheet, &merged, now).await?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::MockSheetStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|v| Cell::text(*v)).collect());
        }
        table
    }

    fn value(table: &Table, row: usize, column: &str) -> String {
        table.cell(row, column).map(Cell::normalize).unwrap_or_default()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 15)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_merge_end_to_end_scenario() {
        let prior = table(
            &["Campaign Name", "Spend", "Leads", "CPL", "Notes"],
            &[&["A", "5", "1", "5", "x"]],
        );
        let fresh = table(
            &["Campaign Name", "Status", "Spend", "Leads", "CPL"],
            &[&["A", "ACTIVE", "20", "4", "5.0"]],
        );

        let merged = merge(&prior, &fresh).unwrap();

        assert_eq!(
            merged.columns(),
            &["Campaign Name", "Spend", "Leads", "CPL", "Notes", "Status"]
        );
        assert_eq!(value(&merged, 0, "Spend"), "20");
        assert_eq!(value(&merged, 0, "Leads"), "4");
        assert_eq!(value(&merged, 0, "CPL"), "5.0");
        assert_eq!(value(&merged, 0, "Status"), "ACTIVE");
        assert_eq!(value(&merged, 0, "Notes"), "x");
    }

    #[test]
    fn test_merge_preserves_non_volatile_columns() {
        let prior = table(
            &["Campaign Name", "Status", "Spend", "Notes"],
            &[&["A", "PAUSED", "1", "VIP"]],
        );
        let fresh = table(&["Campaign Name", "Status", "Spend"], &[&["A", "ACTIVE", "9"]]);

        let merged = merge(&prior, &fresh).unwrap();
        assert_eq!(value(&merged, 0, "Notes"), "VIP");
        assert_eq!(value(&merged, 0, "Status"), "ACTIVE");
    }

    #[test]
    fn test_merge_drops_orphan_fresh_rows() {
        let prior = table(&["Campaign Name", "Spend"], &[&["A", "1"]]);
        let fresh = table(&["Campaign Name", "Spend"], &[&["A", "2"], &["New", "3"]]);

        let merged = merge(&prior, &fresh).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(value(&merged, 0, "Campaign Name"), "A");
    }

    #[test]
    fn test_merge_keeps_unmatched_prior_rows() {
        let prior = table(
            &["Campaign Name", "Spend", "Leads"],
            &[&["A", "1", "1"], &["B", "7", "2"]],
        );
        let fresh = table(&["Campaign Name", "Spend", "Leads"], &[&["A", "3", "3"]]);

        let merged = merge(&prior, &fresh).unwrap();
        assert_eq!(value(&merged, 0, "Spend"), "3");
        assert_eq!(value(&merged, 1, "Campaign Name"), "B");
        assert_eq!(value(&merged, 1, "Spend"), "7");
        assert_eq!(value(&merged, 1, "Leads"), "2");
    }

    #[test]
    fn test_merge_keeps_prior_value_of_shared_non_volatile_column() {
        let prior = table(&["Campaign Name", "Campaign ID"], &[&["A", "old"]]);
        let fresh = table(&["Campaign Name", "Campaign ID"], &[&["A", "new"]]);

        let merged = merge(&prior, &fresh).unwrap();
        assert_eq!(value(&merged, 0, "Campaign ID"), "old");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let prior = table(
            &["Campaign Name", "Spend", "Notes"],
            &[&["A", "5", "x"], &["B", "6", ""]],
        );
        let fresh = table(
            &["Campaign ID", "Campaign Name", "Status", "Spend", "Leads", "CPL"],
            &[&["1", "A", "ACTIVE", "20", "4", "5.0"]],
        );

        let once = merge(&prior, &fresh).unwrap();
        let twice = merge(&once, &fresh).unwrap();
        assert_eq!(once.to_values(), twice.to_values());
    }

    #[test]
    fn test_merge_empty_prior_uses_fresh() {
        let fresh = table(&["Campaign Name", "Spend"], &[&["A", "2"]]);
        let merged = merge(&Table::default(), &fresh).unwrap();
        assert_eq!(merged, fresh);

        let header_only = table(&["Campaign Name", "Spend", "Notes"], &[]);
        assert_eq!(merge(&header_only, &fresh).unwrap(), fresh);
    }

    #[test]
    fn test_merge_empty_fresh_passes_prior_through() {
        let prior = table(&["Campaign Name", "Spend"], &[&["A", "2"]]);
        assert_eq!(merge(&prior, &Table::default()).unwrap(), prior);
    }

    #[test]
    fn test_merge_duplicate_fresh_names_first_wins() {
        let prior = table(&["Campaign Name", "Spend"], &[&["A", "1"]]);
        let fresh = table(&["Campaign Name", "Spend"], &[&["A", "2"], &["A", "3"]]);

        let merged = merge(&prior, &fresh).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(value(&merged, 0, "Spend"), "2");
    }

    #[test]
    fn test_merge_requires_key_column() {
        let prior = table(&["Name", "Spend"], &[&["A", "1"]]);
        let fresh = table(&["Campaign Name", "Spend"], &[&["A", "2"]]);
        assert!(matches!(
            merge(&prior, &fresh).unwrap_err(),
            Error::MissingColumn { column } if column == "Campaign Name"
        ));
    }

    #[test]
    fn test_merge_normalizes_on_output() {
        let prior = table(&["Campaign Name", "CPL", "Notes"], &[&["A", "1", "N/A"]]);
        let mut fresh = Table::new(vec!["Campaign Name".to_string(), "CPL".to_string()]);
        fresh.push_row(vec![Cell::text("A"), Cell::Decimal(f64::INFINITY)]);

        let values = merge(&prior, &fresh).unwrap().to_values();
        assert_eq!(values[1], vec!["A", "", ""]);
    }

    #[tokio::test]
    async fn test_load_published_skips_timestamp_row() {
        let mut store = MockSheetStore::new();
        store
            .expect_get_values()
            .withf(|range| range == "'October'")
            .returning(|_| {
                Ok(vec![
                    vec![json!("Last updated: 2024-10-01 08:00:00")],
                    vec![json!("Campaign Name"), json!("Spend")],
                    vec![json!("A"), json!("5")],
                ])
            });

        let prior = load_published(&store, "October").await.unwrap();
        assert_eq!(prior.columns(), &["Campaign Name", "Spend"]);
        assert_eq!(prior.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_writes_timestamp_then_table() {
        let mut store = MockSheetStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_update_values()
            .withf(|range, values| {
                range == "'October'!A1"
                    && values == &vec![vec!["Last updated: 2024-10-15 09:30:05".to_string()]]
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        store
            .expect_update_values()
            .withf(|range, values| range == "'October'!A2" && values.len() == 2)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let merged = table(&["Campaign Name", "Spend"], &[&["A", "5"]]);
        publish(&store, "October", &merged, now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_with_empty_sheet() {
        let mut store = MockSheetStore::new();
        store.expect_get_values().returning(|_| Ok(vec![]));
        store
            .expect_update_values()
            .times(2)
            .returning(|_, _| Ok(()));

        let fresh = table(&["Campaign Name", "Spend"], &[&["A", "2"]]);
        let merged = reconcile(&store, "Report", &fresh, now()).await.unwrap();
        assert_eq!(merged, fresh);
    }

    #[tokio::test]
    async fn test_reconcile_propagates_store_failure() {
        let mut store = MockSheetStore::new();
        store.expect_get_values().returning(|_| {
            Err(Error::SheetsApi {
                status: 403,
                message: "The caller does not have permission".to_string(),
            })
        });

        let fresh = table(&["Campaign Name", "Spend"], &[&["A", "2"]]);
        assert!(matches!(
            reconcile(&store, "Report", &fresh, now()).await.unwrap_err(),
            Error::SheetsApi { status: 403, .. }
        ));
    }
}
