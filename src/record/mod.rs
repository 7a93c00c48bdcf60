//! Fixed-layout records: schema, slot geometry, per-block record pages, and
//! the table scan that threads them into a full-file cursor (spec.md §3,
//! §4.7). Grounded on go-rdb's `record` package.

pub mod layout;
pub mod record_id;
pub mod record_page;
pub mod schema;
pub mod table_scan;

pub use layout::Layout;
pub use record_id::RecordId;
pub use record_page::RecordPage;
pub use schema::{FieldType, Schema};
pub use table_scan::TableScan;
