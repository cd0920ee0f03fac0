pub mod credentials;
pub mod dataset;
pub mod format;
pub mod ndjson;
pub mod sniff;
pub mod table;

pub use credentials::{Credentials, CredentialsPatch, UserIdentity};
pub use dataset::{filter_datasets, sort_datasets, DatasetInfo};
pub use ndjson::{decode_response, RawResponse};
pub use table::{Column, ColumnType, DatasetSchema, DatasetTable};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
