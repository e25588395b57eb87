use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Outcome of a single remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInfo {
    /// Chain (or external service) the call was issued against.
    pub chain: String,
    /// Full URL of the call.
    pub url: String,
    pub duration: Duration,
    /// `None` on success.
    pub error: Option<String>,
}

impl QueryInfo {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Append-only, request-scoped collector of [`QueryInfo`] records. Clones
/// share the same list.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryLog {
    records: Arc<Mutex<Vec<QueryInfo>>>,
}

impl QueryLog {
    pub fn extend(&self, queries: impl IntoIterator<Item = QueryInfo>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(queries);
    }

    pub fn take(&self) -> Vec<QueryInfo> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(chain: &str, error: Option<&str>) -> QueryInfo {
        QueryInfo {
            chain: chain.to_string(),
            url: format!("http://{chain}/cosmos/staking/v1beta1/params"),
            duration: Duration::from_millis(10),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_log_shared_between_clones() {
        let log = QueryLog::default();
        let clone = log.clone();

        log.extend([query("cosmos", None)]);
        clone.extend([query("osmosis", Some("timeout")), query("neutron", None)]);

        let records = log.take();
        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().filter(|q| !q.success()).count(), 1);
        assert!(clone.take().is_empty());
    }
}
