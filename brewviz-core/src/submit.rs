//! Order and feedback submission against a hosted insert endpoint.
//!
//! Input is validated locally first; nothing invalid reaches the network.
//! Remote failures are returned once, never retried or queued.

use serde::Serialize;

use crate::error::{RemoteError, SubmitError, ValidationError};

/// Destination table on the hosted database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Orders,
    Feedback,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Feedback => "feedback",
        }
    }
}

/// Row inserted when a drink is ordered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub drink_id: String,
    pub variant: String,
    /// ISO-8601 timestamp from the host clock
    pub ordered_at: String,
}

impl OrderRequest {
    pub fn new(drink_id: impl Into<String>, variant: impl Into<String>, ordered_at: impl Into<String>) -> Self {
        Self {
            drink_id: drink_id.into(),
            variant: variant.into(),
            ordered_at: ordered_at.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.drink_id.trim().is_empty() {
            return Err(ValidationError::MissingDrink);
        }
        if self.variant.trim().is_empty() {
            return Err(ValidationError::MissingVariant);
        }
        Ok(())
    }
}

/// Row inserted when a customer rates a drink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackRequest {
    pub drink_id: String,
    pub rating: u8,
}

impl FeedbackRequest {
    /// `rating` is `None` when the customer has not picked a star yet
    pub fn new(drink_id: &str, rating: Option<i64>) -> Result<Self, ValidationError> {
        if drink_id.trim().is_empty() {
            return Err(ValidationError::MissingDrink);
        }
        let rating = rating.ok_or(ValidationError::MissingRating)?;
        if !(1..=5).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange(rating));
        }
        Ok(Self {
            drink_id: drink_id.to_string(),
            rating: rating as u8,
        })
    }
}

/// Opaque remote insert endpoint
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn insert(&self, table: Table, row: serde_json::Value) -> Result<(), RemoteError>;
}

async fn insert_row<S, T>(store: Option<&S>, table: Table, row: &T) -> Result<(), SubmitError>
where
    S: RemoteStore,
    T: Serialize,
{
    let Some(store) = store else {
        log::warn!("remote store not ready, dropping {} insert", table.name());
        return Err(RemoteError::Unavailable.into());
    };
    let row = serde_json::to_value(row).map_err(|e| RemoteError::Schema(e.to_string()))?;
    store.insert(table, row).await.map_err(|e| {
        log::warn!("{} insert failed: {e}", table.name());
        SubmitError::from(e)
    })
}

/// Validate and insert an order. `store` is `None` while the client is loading.
pub async fn submit_order<S: RemoteStore>(store: Option<&S>, order: &OrderRequest) -> Result<(), SubmitError> {
    order.validate()?;
    insert_row(store, Table::Orders, order).await?;
    log::info!("order placed for `{}` ({})", order.drink_id, order.variant);
    Ok(())
}

/// Validate and insert a rating
pub async fn submit_feedback<S: RemoteStore>(
    store: Option<&S>,
    drink_id: &str,
    rating: Option<i64>,
) -> Result<(), SubmitError> {
    let feedback = FeedbackRequest::new(drink_id, rating)?;
    insert_row(store, Table::Feedback, &feedback).await?;
    log::info!("feedback {} for `{}` recorded", feedback.rating, feedback.drink_id);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pollster::block_on;
    use serde_json::json;
    use std::cell::RefCell;

    /// In-memory endpoint that records inserts and can be told to fail
    #[derive(Default)]
    pub(crate) struct RecordingStore {
        pub(crate) rows: RefCell<Vec<(Table, serde_json::Value)>>,
        pub(crate) failure: Option<RemoteError>,
    }

    impl RecordingStore {
        pub(crate) fn failing(error: RemoteError) -> Self {
            Self {
                failure: Some(error),
                ..Self::default()
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.rows.borrow().len()
        }
    }

    impl RemoteStore for RecordingStore {
        async fn insert(&self, table: Table, row: serde_json::Value) -> Result<(), RemoteError> {
            self.rows.borrow_mut().push((table, row));
            match &self.failure {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_order_payload_shape() {
        let store = RecordingStore::default();
        let order = OrderRequest::new("espresso", "double", "2024-05-01T09:30:00.000Z");
        block_on(submit_order(Some(&store), &order)).unwrap();

        let rows = store.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, Table::Orders);
        assert_eq!(
            rows[0].1,
            json!({ "drink_id": "espresso", "variant": "double", "ordered_at": "2024-05-01T09:30:00.000Z" })
        );
    }

    #[test]
    fn test_feedback_rating_boundaries() {
        for (rating, accepted) in [(0, false), (1, true), (5, true), (6, false)] {
            let store = RecordingStore::default();
            let result = block_on(submit_feedback(Some(&store), "espresso", Some(rating)));
            assert_eq!(result.is_ok(), accepted, "rating {rating}");
            assert_eq!(store.calls(), usize::from(accepted), "rating {rating}");
            if !accepted {
                assert_eq!(
                    result,
                    Err(SubmitError::Validation(ValidationError::RatingOutOfRange(rating)))
                );
            }
        }
    }

    #[test]
    fn test_feedback_requires_drink_and_rating() {
        let store = RecordingStore::default();
        assert_eq!(
            block_on(submit_feedback(Some(&store), "", Some(3))),
            Err(ValidationError::MissingDrink.into())
        );
        assert_eq!(
            block_on(submit_feedback(Some(&store), "espresso", None)),
            Err(ValidationError::MissingRating.into())
        );
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn test_feedback_row() {
        let store = RecordingStore::default();
        block_on(submit_feedback(Some(&store), "cold-brew", Some(4))).unwrap();
        let rows = store.rows.borrow();
        assert_eq!(rows[0].0, Table::Feedback);
        assert_eq!(rows[0].1, json!({ "drink_id": "cold-brew", "rating": 4 }));
    }

    #[test]
    fn test_order_without_variant_never_calls() {
        let store = RecordingStore::default();
        let order = OrderRequest::new("espresso", " ", "2024-05-01T09:30:00Z");
        let result = block_on(submit_order(Some(&store), &order));
        assert_eq!(result, Err(ValidationError::MissingVariant.into()));
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn test_remote_failure_is_passed_through() {
        let store = RecordingStore::failing(RemoteError::Permission("row-level security".into()));
        let order = OrderRequest::new("espresso", "single", "2024-05-01T09:30:00Z");
        let err = block_on(submit_order(Some(&store), &order)).unwrap_err();
        assert_eq!(store.calls(), 1);
        assert!(err.user_message().contains("row-level security"));
    }

    #[test]
    fn test_missing_client_degrades() {
        let order = OrderRequest::new("espresso", "single", "2024-05-01T09:30:00Z");
        let err = block_on(submit_order::<RecordingStore>(None, &order)).unwrap_err();
        assert_eq!(err, SubmitError::Remote(RemoteError::Unavailable));
    }
}
