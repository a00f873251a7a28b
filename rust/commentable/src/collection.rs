use serde::Serialize;

use crate::Redaction;

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    pub items: Vec<T>,
    /// Total matching items, when the client asked for a count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub limit: u32,
    pub page: u32,
}

impl<T> Collection<T> {
    /// Whether another page may follow.
    ///
    /// Without a total, a full page is taken to mean there may be more.
    pub fn has_next_page(&self) -> bool {
        match self.total {
            Some(total) => u64::from(self.page) * u64::from(self.limit) < total,
            None => self.items.len() >= self.limit as usize,
        }
    }
}

impl<T: Redaction> Redaction for Collection<T> {
    fn is_redacted(&self) -> bool {
        self.items.iter().any(Redaction::is_redacted)
    }
}
