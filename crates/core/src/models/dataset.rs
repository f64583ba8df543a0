use serde::{Deserialize, Serialize};

use crate::services::currency_service::CurrencyConverter;

use super::app::AppSummary;
use super::event::Event;

/// Account-scoped bundle of sales events plus the apps they reference,
/// expressed in a single display currency.
///
/// Invariant: every event's `proceeds` is denominated in `currency`.
/// `change_currency` upholds this by producing a fresh dataset; a
/// dataset is never re-denominated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesDataset {
    /// All sales events, in provider order
    pub events: Vec<Event>,

    /// Distinct apps referenced by the events (best-effort metadata)
    pub apps: Vec<AppSummary>,

    /// Display currency every proceeds value is expressed in
    pub currency: String,
}

impl SalesDataset {
    pub fn new(events: Vec<Event>, apps: Vec<AppSummary>, currency: impl Into<String>) -> Self {
        Self {
            events,
            apps,
            currency: currency.into(),
        }
    }

    /// Re-express every proceeds value in `to`, returning a new
    /// dataset. Proceeds whose conversion rate is unknown are recorded
    /// as 0 rather than failing the whole dataset.
    pub fn change_currency(&self, converter: &CurrencyConverter, to: &str) -> SalesDataset {
        let to = to.to_uppercase();
        if self.currency == to {
            return self.clone();
        }

        let events = self
            .events
            .iter()
            .map(|entry| {
                let proceeds = converter
                    .convert(entry.proceeds, &self.currency, &to)
                    .unwrap_or(0.0);
                Event {
                    proceeds,
                    ..entry.clone()
                }
            })
            .collect();

        SalesDataset {
            events,
            apps: self.apps.clone(),
            currency: to,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
