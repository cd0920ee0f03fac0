//! Client-side session for the tenant query API: login lifecycle, dataset
//! catalog, and query execution, each observable through callbacks.

pub mod catalog;
pub mod login;
pub mod observers;
pub mod query;
pub mod store;

pub use catalog::DatasetCatalog;
pub use login::{
    ApprovalOpener, LoginOptions, LoginSession, SessionError, SessionEvent, SessionPhase,
};
pub use observers::{Observers, SubscriptionId};
pub use query::{QueryParams, QueryRunner};
pub use store::{CredentialSlot, FileSlot, MemorySlot};
