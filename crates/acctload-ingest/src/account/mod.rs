//! Account export documents
//!
//! - [`models`]: the decoded `<Account>` tree and its persisted projection
//! - [`xml`]: the XML record source

pub mod models;
pub mod xml;

pub use models::{Account, AccountRecord};
pub use xml::{parse_accounts, XmlAccountSource, DEFAULT_ACCOUNT_NAMESPACE};
