//! System-message tables and the textual system-message format.
//!
//! System messages travel as text: `@` followed by a message id, then
//! alternating key/value tokens separated by vertical tabs (0x0B). The id is
//! either a literal (recognized by a contained `:`) or a decimal code
//! resolved through the system-message table selected during version
//! negotiation.

use crate::config::SYSMSG_SEPARATOR;
use crate::error::{constants, DispatchError, Result};
use indexmap::IndexMap;

/// Contract for the external system-message table registry, keyed by the
/// patch-version tuple resolved from the protocol revision.
pub trait SysmsgTables {
    /// Whether a table exists for `version`.
    fn has_version(&self, version: u32) -> bool;

    /// Resolve a system-message name to its numeric code.
    fn code(&self, version: u32, name: &str) -> Option<u32>;

    /// Resolve a numeric code back to its system-message name.
    fn name(&self, version: u32, code: u32) -> Option<String>;
}

/// A decoded system message: resolved id plus ordered key/value tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemMessage {
    pub id: String,
    pub tokens: IndexMap<String, String>,
}

impl SystemMessage {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tokens: IndexMap::new(),
        }
    }

    pub fn with_token(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokens.insert(key.into(), value.into());
        self
    }
}

/// Parse a textual system message. Numeric ids are resolved to names through
/// the table at `version`; ids containing `:` pass through as literals.
pub fn parse(
    tables: &dyn SysmsgTables,
    version: Option<u32>,
    message: &str,
) -> Result<SystemMessage> {
    let body = message
        .strip_prefix('@')
        .ok_or_else(|| DispatchError::InvalidArgument(constants::ERR_SYSMSG_LEADING_AT.into()))?;

    let mut parts = body.split(SYSMSG_SEPARATOR);
    let id = parts
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DispatchError::InvalidArgument(constants::ERR_SYSMSG_EMPTY_ID.into()))?;

    let id = if id.contains(':') {
        id.to_string()
    } else {
        let code: u32 = id
            .parse()
            .map_err(|_| DispatchError::UnmappedName(format!("system message id {id:?}")))?;
        let version = version
            .ok_or_else(|| DispatchError::InvalidArgument(constants::ERR_SYSMSG_NO_TABLE.into()))?;
        tables
            .name(version, code)
            .ok_or_else(|| DispatchError::UnmappedName(format!("system message code {code}")))?
    };

    let mut tokens = IndexMap::new();
    while let Some(key) = parts.next() {
        let value = parts.next().ok_or_else(|| {
            DispatchError::InvalidArgument(format!("dangling system message token {key:?}"))
        })?;
        tokens.insert(key.to_string(), value.to_string());
    }

    Ok(SystemMessage {
        id,
        tokens,
    })
}

/// Render a system message back to text. Named ids are resolved to codes
/// through the table at `version`; ids containing `:` pass through as
/// literals. Token order follows the map's insertion order.
pub fn build(
    tables: &dyn SysmsgTables,
    version: Option<u32>,
    message: &SystemMessage,
) -> Result<String> {
    if message.id.is_empty() {
        return Err(DispatchError::InvalidArgument(
            constants::ERR_SYSMSG_EMPTY_ID.into(),
        ));
    }

    let id = if message.id.contains(':') {
        message.id.clone()
    } else {
        let version = version
            .ok_or_else(|| DispatchError::InvalidArgument(constants::ERR_SYSMSG_NO_TABLE.into()))?;
        tables
            .code(version, &message.id)
            .ok_or_else(|| {
                DispatchError::UnmappedName(format!("system message name {:?}", message.id))
            })?
            .to_string()
    };

    let mut out = format!("@{id}");
    for (key, value) in &message.tokens {
        out.push(SYSMSG_SEPARATOR);
        out.push_str(key);
        out.push(SYSMSG_SEPARATOR);
        out.push_str(value);
    }
    Ok(out)
}
