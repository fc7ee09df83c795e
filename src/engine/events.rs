// ==========================================
// Blood Bank Allocation - Fulfillment events
// ==========================================
// The engine defines the publisher trait; delivery (push, email,
// hospital dashboards) is implemented outside the engine.
// ==========================================

use crate::domain::allocation::FulfillmentResult;
use crate::domain::types::RequestStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentEventType {
    /// Request confirmed with every unit supplied and committed
    Fulfilled,
    /// Request confirmed with a shortfall or per-unit failures
    FulfilledDegraded,
    /// Request left Pending because supply fell short
    LeftPending,
}

impl FulfillmentEventType {
    pub fn as_str(&self) -> &str {
        match self {
            FulfillmentEventType::Fulfilled => "Fulfilled",
            FulfillmentEventType::FulfilledDegraded => "FulfilledDegraded",
            FulfillmentEventType::LeftPending => "LeftPending",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentEvent {
    pub request_id: i64,
    pub event_type: FulfillmentEventType,
    pub units_deducted_by_type: BTreeMap<String, u32>,
    pub units_still_needed: u32,
}

impl FulfillmentEvent {
    pub fn from_result(result: &FulfillmentResult) -> Self {
        let event_type = if result.status == RequestStatus::Pending {
            FulfillmentEventType::LeftPending
        } else if result.is_degraded() {
            FulfillmentEventType::FulfilledDegraded
        } else {
            FulfillmentEventType::Fulfilled
        };

        Self {
            request_id: result.request_id,
            event_type,
            units_deducted_by_type: result.units_deducted_by_type.clone(),
            units_still_needed: result.units_still_needed,
        }
    }
}

/// Fulfillment event publisher
pub trait FulfillmentEventPublisher: Send + Sync {
    fn publish(&self, event: FulfillmentEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl FulfillmentEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: FulfillmentEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            request_id = event.request_id,
            event_type = event.event_type.as_str(),
            "NoOpEventPublisher: event dropped"
        );
        Ok(())
    }
}

/// Wraps `Option<Arc<dyn FulfillmentEventPublisher>>`
#[derive(Clone, Default)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn FulfillmentEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn FulfillmentEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn publish(&self, event: FulfillmentEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => Ok(()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}
