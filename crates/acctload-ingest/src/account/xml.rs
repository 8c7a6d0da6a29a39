//! XML record source
//!
//! Scans the document with a namespace-aware reader and decodes every
//! `<Account>` element in the configured namespace, at any depth, with
//! `quick_xml::de`. The whole document is decoded before anything is
//! dispatched, so a malformed account fails the run up front.

use acctload_common::{AcctloadError, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::models::{Account, AccountRecord};
use crate::config::SourceConfig;
use crate::pipeline::RecordSource;

/// Namespace of `<Account>` elements in the broker export
pub const DEFAULT_ACCOUNT_NAMESPACE: &str = "http://www.front.com";

const ACCOUNT_ELEMENT: &[u8] = b"Account";

/// Decode every `<Account>` element of `xml` in document order
///
/// With `namespace = None` accounts are matched by local name alone.
pub fn parse_accounts(xml: &str, namespace: Option<&str>) -> Result<Vec<Account>> {
    let mut reader = NsReader::from_str(xml);
    let mut accounts = Vec::new();

    loop {
        let position = reader.buffer_position();
        let (resolved, event) = reader.read_resolved_event().map_err(|e| {
            AcctloadError::parse(format!("malformed XML near byte {}: {}", position, e))
        })?;

        let in_namespace = match (namespace, resolved) {
            (None, _) => true,
            (Some(expected), ResolveResult::Bound(Namespace(ns))) => ns == expected.as_bytes(),
            (Some(_), _) => false,
        };

        match event {
            Event::Start(start)
                if in_namespace && start.local_name().as_ref() == ACCOUNT_ELEMENT =>
            {
                let body = reader.read_text(start.name()).map_err(|e| {
                    AcctloadError::parse(format!(
                        "unterminated account #{} near byte {}: {}",
                        accounts.len() + 1,
                        position,
                        e
                    ))
                })?;
                accounts.push(decode_account(&body, accounts.len() + 1)?);
            },
            Event::Empty(start)
                if in_namespace && start.local_name().as_ref() == ACCOUNT_ELEMENT =>
            {
                accounts.push(Account::default());
            },
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(accounts)
}

fn decode_account(body: &str, ordinal: usize) -> Result<Account> {
    let element = format!("<Account>{}</Account>", body);
    quick_xml::de::from_str(&element)
        .map_err(|e| AcctloadError::parse(format!("account #{}: {}", ordinal, e)))
}

/// Loads accounts from an XML export on disk
#[derive(Debug, Clone)]
pub struct XmlAccountSource {
    path: PathBuf,
    namespace: Option<String>,
}

impl XmlAccountSource {
    pub fn new(path: impl Into<PathBuf>, namespace: Option<String>) -> Self {
        Self {
            path: path.into(),
            namespace,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.path.clone(), config.namespace.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the full account tree
    pub async fn load_accounts(&self) -> Result<Vec<Account>> {
        let xml = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AcctloadError::DocumentNotFound(self.path.clone()),
                _ => AcctloadError::Io(e),
            })?;

        info!(path = %self.path.display(), size_bytes = xml.len(), "Opened account document");

        let namespace = self.namespace.clone();
        let accounts =
            tokio::task::spawn_blocking(move || parse_accounts(&xml, namespace.as_deref()))
                .await
                .map_err(|e| AcctloadError::parse(format!("decoder task failed: {}", e)))??;

        debug!(path = %self.path.display(), accounts = accounts.len(), "Decoded account document");
        Ok(accounts)
    }
}

#[async_trait]
impl RecordSource for XmlAccountSource {
    async fn load(&self) -> Result<Vec<AccountRecord>> {
        let accounts = self.load_accounts().await?;
        Ok(accounts.into_iter().map(AccountRecord::from).collect())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
