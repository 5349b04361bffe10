//! Runs one operation over many inputs, isolating failures per item.

use std::future::Future;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::AppError;

/// A failed item, serialized as `{"<key>": <value>, "error": "<message>"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkError {
    pub key: &'static str,
    pub value: Value,
    pub error: String,
}

impl Serialize for BulkError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.value)?;
        map.serialize_entry("error", &self.error)?;
        map.end()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BulkSummary<T> {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<T>,
    pub errors: Vec<BulkError>,
}

impl<T> Default for BulkSummary<T> {
    fn default() -> Self {
        Self {
            processed: 0,
            successful: 0,
            failed: 0,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Applies `op` to every item in order. A failing item is recorded under
/// `key` and processing continues with the next one.
pub async fn run<I, T, K, F, Fut>(
    key: &'static str,
    items: Vec<I>,
    key_of: K,
    mut op: F,
) -> BulkSummary<T>
where
    K: Fn(&I) -> Value,
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut summary = BulkSummary {
        processed: items.len(),
        ..BulkSummary::default()
    };

    for item in items {
        let value = key_of(&item);
        match op(item).await {
            Ok(result) => summary.results.push(result),
            Err(e) => {
                tracing::warn!(%key, %value, error = %e, "Bulk item failed");
                let error = match e {
                    AppError::Internal(_) => "Internal Server Error".to_string(),
                    other => other.to_string(),
                };
                summary.errors.push(BulkError { key, value, error });
            }
        }
    }

    summary.successful = summary.results.len();
    summary.failed = summary.errors.len();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[actix_web::test]
    async fn empty_input_yields_zeroes() {
        let summary = run("userId", Vec::<u64>::new(), |id| json!(id), |id| async move {
            Ok::<_, AppError>(id)
        })
        .await;

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.results.is_empty());
        assert!(summary.errors.is_empty());
    }

    #[actix_web::test]
    async fn failures_do_not_stop_later_items() {
        let summary = run("userId", vec![1u64, 2, 3, 4, 5], |id| json!(id), |id| async move {
            if id % 2 == 0 {
                Err(AppError::not_found(format!("User {id} not found")))
            } else {
                Ok(id * 10)
            }
        })
        .await;

        assert_eq!(summary.processed, 5);
        assert_eq!(summary.successful, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.results, vec![10, 30, 50]);
        assert_eq!(summary.errors[0].value, json!(2));
        assert_eq!(summary.errors[1].value, json!(4));
    }

    #[actix_web::test]
    async fn all_failures_produce_no_results() {
        let summary = run("username", vec!["a", "b"], |u| json!(u), |_| async move {
            Err::<(), _>(AppError::conflict("Username already taken"))
        })
        .await;

        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 2);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn errors_serialize_with_their_key() {
        let err = BulkError {
            key: "username",
            value: json!("jdoe"),
            error: "Username already taken".into(),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"username": "jdoe", "error": "Username already taken"})
        );
    }

    #[actix_web::test]
    async fn internal_errors_are_masked() {
        let summary = run("userId", vec![1u64], |id| json!(id), |_| async move {
            Err::<(), _>(AppError::internal("deadlock found"))
        })
        .await;
        assert_eq!(summary.errors[0].error, "Internal Server Error");
    }
}
