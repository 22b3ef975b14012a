//! The ordered ledger and its sequencer operations.
//!
//! Services, subtotal markers and comments live in one arena of tagged
//! variants, kept sorted by `order`. Every completed mutation leaves the order
//! values dense (`1..=N`); [`Ledger::verify`] checks this together with the
//! derived-amount and emptiness rules.

use std::collections::HashSet;

use dentaplan_core::{DomainError, DomainResult, Entity, LineItemId, Money};

use crate::item::{
    normalize_note, Comment, ItemKind, LineItem, Service, ServiceOptions, ServiceTemplate,
    SubtotalMarker, ToothId,
};

/// Label used when a subtotal is added without one.
pub const DEFAULT_SUBTOTAL_LABEL: &str = "Subtotal";

/// Ordered collection of service lines, subtotal markers and comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    items: Vec<LineItem>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items in ascending `order`.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the ledger holds no items at all.
    ///
    /// Because removing the last service discards every marker and comment,
    /// this coincides with "no services" for any ledger that passed [`Ledger::verify`].
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_services(&self) -> bool {
        self.items.iter().any(|i| i.kind() == ItemKind::Service)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.items.iter().filter_map(LineItem::as_service)
    }

    pub fn markers(&self) -> impl Iterator<Item = &SubtotalMarker> {
        self.items.iter().filter_map(LineItem::as_subtotal)
    }

    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.items.iter().filter_map(LineItem::as_comment)
    }

    pub fn get(&self, id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    /// The item whose `order` equals `order`, if any.
    pub fn at_order(&self, order: u32) -> Option<&LineItem> {
        self.items.iter().find(|i| i.order() == order)
    }

    /// `1` for an empty ledger, otherwise one past the highest order in use.
    pub fn next_order(&self) -> u32 {
        self.items.iter().map(LineItem::order).max().map_or(1, |max| max + 1)
    }

    pub fn append_service(
        &mut self,
        template: ServiceTemplate,
        options: ServiceOptions,
    ) -> DomainResult<Service> {
        let options = options.with_quantity_from_teeth();
        let service = Service::new(LineItemId::new(), template, options, self.next_order())?;
        self.ensure_total_fits(None, service.line_total())?;
        tracing::debug!(item_id = %service.id, order = service.order, "appended service");
        self.items.push(LineItem::Service(service.clone()));
        Ok(service)
    }

    /// Append a subtotal marker seeded with `seed_amount`.
    ///
    /// The seed only stands until the next [`Ledger::recompute_markers`].
    pub fn append_subtotal(&mut self, label: Option<&str>, seed_amount: Money) -> SubtotalMarker {
        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_SUBTOTAL_LABEL);
        let marker = SubtotalMarker {
            id: LineItemId::new(),
            label: label.to_string(),
            amount: seed_amount,
            order: self.next_order(),
        };
        tracing::debug!(item_id = %marker.id, order = marker.order, "appended subtotal");
        self.items.push(LineItem::Subtotal(marker.clone()));
        marker
    }

    pub fn append_comment(&mut self, text: &str) -> DomainResult<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("comment text must not be blank"));
        }
        let comment = Comment {
            id: LineItemId::new(),
            text: text.to_string(),
            order: self.next_order(),
        };
        tracing::debug!(item_id = %comment.id, order = comment.order, "appended comment");
        self.items.push(LineItem::Comment(comment.clone()));
        Ok(comment)
    }

    /// Blank labels fall back to `default_label`.
    pub fn edit_label(
        &mut self,
        id: &LineItemId,
        label: &str,
        default_label: &str,
    ) -> DomainResult<()> {
        let marker = self.marker_mut(id)?;
        let label = label.trim();
        marker.label = if label.is_empty() {
            default_label.to_string()
        } else {
            label.to_string()
        };
        Ok(())
    }

    pub fn edit_text(&mut self, id: &LineItemId, text: &str) -> DomainResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("comment text must not be blank"));
        }
        self.comment_mut(id)?.text = text.to_string();
        Ok(())
    }

    /// Set the quantity of a service line. On a tooth-linked line the
    /// selection is kept; the quantity stands until the teeth change.
    pub fn edit_quantity(&mut self, id: &LineItemId, quantity: u32) -> DomainResult<()> {
        let options = ServiceOptions {
            quantity,
            ..self.service(id)?.options()
        };
        self.configure_service(id, options)
    }

    pub fn edit_note(&mut self, id: &LineItemId, note: Option<&str>) -> DomainResult<()> {
        self.service_mut(id)?.note = normalize_note(note.map(str::to_string));
        Ok(())
    }

    /// Replace the tooth selection. A linked line whose selection changed
    /// gets one unit per tooth.
    pub fn edit_teeth(
        &mut self,
        id: &LineItemId,
        teeth: impl IntoIterator<Item = ToothId>,
        linked_to_teeth: bool,
    ) -> DomainResult<()> {
        let options = ServiceOptions {
            teeth: teeth.into_iter().collect(),
            linked_to_teeth,
            ..self.service(id)?.options()
        };
        self.configure_service(id, options)
    }

    /// Add or replace the note attached to one tooth. A blank note removes it.
    pub fn set_tooth_note(
        &mut self,
        id: &LineItemId,
        tooth: ToothId,
        note: &str,
    ) -> DomainResult<()> {
        let service = self.service_mut(id)?;
        let note = note.trim();
        if note.is_empty() {
            service.tooth_notes.remove(&tooth);
        } else {
            service.tooth_notes.insert(tooth, note.to_string());
        }
        Ok(())
    }

    /// Returns whether a note was present.
    pub fn remove_tooth_note(&mut self, id: &LineItemId, tooth: ToothId) -> DomainResult<bool> {
        Ok(self.service_mut(id)?.tooth_notes.remove(&tooth).is_some())
    }

    /// Replace the whole configuration of a service line, keeping its identity,
    /// catalog provenance and position.
    pub fn reconfigure_service(
        &mut self,
        id: &LineItemId,
        options: ServiceOptions,
    ) -> DomainResult<()> {
        self.configure_service(id, options)
    }

    /// Apply `options` to a service, leaving it untouched when they are
    /// invalid or would overflow the plan total.
    fn configure_service(&mut self, id: &LineItemId, options: ServiceOptions) -> DomainResult<()> {
        let mut updated = self.service(id)?.clone();
        updated.apply_options(options)?;
        self.ensure_total_fits(Some(id), updated.line_total())?;
        *self.service_mut(id)? = updated;
        Ok(())
    }

    /// Remove an item and close the gap it leaves in the order keys.
    ///
    /// Removing the last service also discards every marker and comment: a
    /// plan without priced lines keeps no subtotal or comment scaffolding.
    /// Callers relying on labels or comments surviving an emptied plan will
    /// lose them.
    pub fn remove(&mut self, id: &LineItemId) -> DomainResult<LineItem> {
        let index = self.index_of(id)?;
        let removed = self.items.remove(index);
        let removed_order = removed.order();

        for item in &mut self.items {
            let order = item.order();
            if order > removed_order {
                item.set_order(order - 1);
            }
        }

        if !self.has_services() && !self.items.is_empty() {
            tracing::info!(
                discarded = self.items.len(),
                "last service removed; discarding subtotals and comments"
            );
            self.items.clear();
        }

        Ok(removed)
    }

    /// Swap with the item just above. Returns `false` when already first.
    pub fn move_up(&mut self, id: &LineItemId) -> DomainResult<bool> {
        let index = self.index_of(id)?;
        let order = self.items[index].order();
        if order <= 1 {
            return Ok(false);
        }
        self.swap_with_order(index, order - 1)
    }

    /// Swap with the item just below. Returns `false` when already last.
    pub fn move_down(&mut self, id: &LineItemId) -> DomainResult<bool> {
        let index = self.index_of(id)?;
        let order = self.items[index].order();
        if order >= self.len() as u32 {
            return Ok(false);
        }
        self.swap_with_order(index, order + 1)
    }

    fn swap_with_order(&mut self, index: usize, target: u32) -> DomainResult<bool> {
        let other = self
            .items
            .iter()
            .position(|i| i.order() == target)
            .ok_or_else(|| {
                DomainError::consistency(format!("no item holds order {target}"))
            })?;
        let order = self.items[index].order();
        self.items[index].set_order(target);
        self.items[other].set_order(order);
        self.items.swap(index, other);
        Ok(true)
    }

    /// Check every ledger invariant.
    ///
    /// - order values are exactly `1..=N` and stored in ascending order
    /// - ids are unique
    /// - each marker holds the sum of the service lines since the previous marker
    /// - a ledger without services holds nothing
    pub fn verify(&self) -> DomainResult<()> {
        for (position, item) in self.items.iter().enumerate() {
            let expected = position as u32 + 1;
            if item.order() != expected {
                return Err(DomainError::consistency(format!(
                    "{} {} holds order {} at position {expected}",
                    item.kind(),
                    item.id(),
                    item.order()
                )));
            }
        }

        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(item.id()) {
                return Err(DomainError::consistency(format!(
                    "duplicate line item id {}",
                    item.id()
                )));
            }
        }

        for (index, expected) in self.marker_amounts() {
            if let LineItem::Subtotal(marker) = &self.items[index] {
                if marker.amount != expected {
                    return Err(DomainError::consistency(format!(
                        "subtotal {} holds {} but its section sums to {expected}",
                        marker.id, marker.amount
                    )));
                }
            }
        }

        if !self.items.is_empty() && !self.has_services() {
            return Err(DomainError::consistency(
                "subtotals or comments present without any service",
            ));
        }

        Ok(())
    }

    /// Re-derive a dense ordering from the current sequence and refresh
    /// derived state. Used to recover from a failed [`Ledger::verify`].
    pub(crate) fn repair(&mut self) {
        self.items.sort_by_key(LineItem::order);
        self.renumber();
        if !self.has_services() {
            self.items.clear();
        }
        self.recompute_markers();
    }

    /// Build a ledger from items in their intended sequence, assigning
    /// `1..=N` by position.
    ///
    /// Returns whether any order value had to change.
    pub(crate) fn from_sequence(items: Vec<LineItem>) -> DomainResult<(Self, bool)> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id().clone()) {
                return Err(DomainError::validation(format!(
                    "duplicate line item id {}",
                    item.id()
                )));
            }
        }

        let mut ledger = Self { items };
        ledger.checked_total_amount()?;
        let renumbered = ledger.renumber();
        Ok((ledger, renumbered))
    }

    fn renumber(&mut self) -> bool {
        let mut changed = false;
        for (position, item) in self.items.iter_mut().enumerate() {
            let order = position as u32 + 1;
            if item.order() != order {
                item.set_order(order);
                changed = true;
            }
        }
        changed
    }

    pub(crate) fn items_mut(&mut self) -> &mut [LineItem] {
        &mut self.items
    }

    fn index_of(&self, id: &LineItemId) -> DomainResult<usize> {
        self.items
            .iter()
            .position(|i| i.id() == id)
            .ok_or_else(|| DomainError::not_found(format!("line item {id}")))
    }

    fn service(&self, id: &LineItemId) -> DomainResult<&Service> {
        self.services()
            .find(|s| &s.id == id)
            .ok_or_else(|| DomainError::not_found(format!("{} {id}", ItemKind::Service)))
    }

    fn service_mut(&mut self, id: &LineItemId) -> DomainResult<&mut Service> {
        self.items
            .iter_mut()
            .find_map(|i| match i {
                LineItem::Service(s) if &s.id == id => Some(s),
                _ => None,
            })
            .ok_or_else(|| DomainError::not_found(format!("{} {id}", ItemKind::Service)))
    }

    fn marker_mut(&mut self, id: &LineItemId) -> DomainResult<&mut SubtotalMarker> {
        self.items
            .iter_mut()
            .find_map(|i| match i {
                LineItem::Subtotal(m) if &m.id == id => Some(m),
                _ => None,
            })
            .ok_or_else(|| DomainError::not_found(format!("{} {id}", ItemKind::Subtotal)))
    }

    fn comment_mut(&mut self, id: &LineItemId) -> DomainResult<&mut Comment> {
        self.items
            .iter_mut()
            .find_map(|i| match i {
                LineItem::Comment(c) if &c.id == id => Some(c),
                _ => None,
            })
            .ok_or_else(|| DomainError::not_found(format!("{} {id}", ItemKind::Comment)))
    }
}
