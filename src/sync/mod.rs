pub mod credentials;
pub mod document;
pub mod firestore;

pub use credentials::ServiceAccountKey;
pub use firestore::FirestoreClient;

use std::collections::HashMap;
use std::path::Path;

use tracing::{error, info};

use crate::utils::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub updated: usize,
    pub errors: usize,
}

/// Push every consolidated row into the remote collection, one merge-upsert
/// per product. Per-row failures are logged and counted; the batch continues.
pub async fn sync_consolidated(
    client: &FirestoreClient,
    collection: &str,
    csv_path: &Path,
) -> Result<SyncStats> {
    info!("starting to process CSV file: {}", csv_path.display());
    info!("target collection: {collection}");

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut stats = SyncStats::default();

    // Row numbers match what a reviewer sees in a spreadsheet (row 1 is the
    // header).
    for (row_num, record) in reader.deserialize::<HashMap<String, String>>().enumerate() {
        let row_num = row_num + 2;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                error!("row {row_num}: error reading row - {e}");
                stats.errors += 1;
                continue;
            }
        };

        let product_id = row
            .get("product_id")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if product_id.is_empty() {
            error!("row {row_num}: skipping - no product_id found");
            stats.errors += 1;
            continue;
        }

        let fields = document::build_update(&row);
        match client.upsert(collection, &product_id, &fields).await {
            Ok(()) => {
                stats.updated += 1;
                let name = row.get("name").map(String::as_str).unwrap_or("");
                info!("row {row_num}: updated product_id: {product_id} - {name}");
            }
            Err(e) => {
                stats.errors += 1;
                error!("row {row_num}: error updating product - {e}");
            }
        }
    }

    info!("processing complete");
    info!("successfully updated: {} records", stats.updated);
    info!("errors: {}", stats.errors);
    Ok(stats)
}
