//! Derived amounts: subtotal markers and the grand total.
//!
//! Markers split the plan into horizontal sections, like subtotal rules on a
//! paper invoice. A marker's amount is the sum of the service lines between
//! the previous marker (or the start) and itself. The grand total ignores
//! markers entirely.

use dentaplan_core::{DomainError, DomainResult, LineItemId, Money};

use crate::item::{LineItem, Service, SubtotalMarker};
use crate::ledger::Ledger;

/// Services grouped up to (and closed by) a subtotal marker.
///
/// The last section of a plan may be open (`closed_by == None`) when services
/// follow the final marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub services: Vec<&'a Service>,
    pub closed_by: Option<&'a SubtotalMarker>,
}

impl Section<'_> {
    pub fn amount(&self) -> Money {
        self.services.iter().map(|s| s.line_total()).sum()
    }
}

impl Ledger {
    /// Re-derive every marker amount in one pass over the sequence.
    ///
    /// Returns how many markers changed.
    pub fn recompute_markers(&mut self) -> usize {
        let amounts = self.marker_amounts();
        let mut changed = 0;
        let items = self.items_mut();
        for (index, amount) in amounts {
            if let LineItem::Subtotal(marker) = &mut items[index] {
                if marker.amount != amount {
                    marker.amount = amount;
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            tracing::debug!(changed, "recomputed subtotal markers");
        }
        changed
    }

    /// Sum of `price × quantity` over every service, wherever markers fall.
    ///
    /// Appends, service edits and loads refuse changes that would overflow
    /// the total, so the saturating sum never clamps.
    pub fn total_amount(&self) -> Money {
        self.services().map(Service::line_total).sum()
    }

    /// Grand total, with overflow reported as a validation error.
    pub fn checked_total_amount(&self) -> DomainResult<Money> {
        self.services().try_fold(Money::ZERO, |total, service| {
            service
                .checked_line_total()?
                .checked_add(total)
                .ok_or_else(|| DomainError::validation("plan total overflow"))
        })
    }

    /// Check that the plan total still fits when the line `replacing` (or a
    /// new line, for `None`) contributes `line_total`.
    pub(crate) fn ensure_total_fits(
        &self,
        replacing: Option<&LineItemId>,
        line_total: Money,
    ) -> DomainResult<()> {
        self.services()
            .filter(|s| Some(&s.id) != replacing)
            .try_fold(line_total, |total, service| {
                total.checked_add(service.line_total())
            })
            .map(|_| ())
            .ok_or_else(|| DomainError::validation("plan total overflow"))
    }

    /// Services partitioned by the markers that close them.
    pub fn sections(&self) -> Vec<Section<'_>> {
        let mut sections = Vec::new();
        let mut current = Vec::new();
        for item in self.items() {
            match item {
                LineItem::Service(service) => current.push(service),
                LineItem::Subtotal(marker) => sections.push(Section {
                    services: std::mem::take(&mut current),
                    closed_by: Some(marker),
                }),
                LineItem::Comment(_) => {}
            }
        }
        if !current.is_empty() {
            sections.push(Section {
                services: current,
                closed_by: None,
            });
        }
        sections
    }

    /// Default seed for a new subtotal: the grand total minus what existing
    /// markers already account for.
    pub fn pending_subtotal_seed(&self) -> Money {
        let marked: Money = self.markers().map(|m| m.amount).sum();
        self.total_amount().saturating_sub(marked)
    }

    /// `(arena index, expected amount)` for every marker, in sequence.
    pub(crate) fn marker_amounts(&self) -> Vec<(usize, Money)> {
        let mut running = Money::ZERO;
        let mut amounts = Vec::new();
        for (index, item) in self.items().iter().enumerate() {
            match item {
                LineItem::Service(service) => running = running.saturating_add(service.line_total()),
                LineItem::Subtotal(_) => {
                    amounts.push((index, running));
                    running = Money::ZERO;
                }
                LineItem::Comment(_) => {}
            }
        }
        amounts
    }
}
