//! Ledger session: the handle an editing screen holds for one treatment plan.
//!
//! Every mutation goes through here. Mutations that can move amounts re-derive
//! subtotal markers before returning, and every completed mutation is checked
//! against the ledger invariants.

use anyhow::Context;

use dentaplan_core::{AggregateRoot, DomainError, DomainResult, LineItemId, Money, PlanId};

use crate::config::LedgerConfig;
use crate::export::{LedgerSnapshot, PlanExporter};
use crate::item::{
    Comment, LineItem, Service, ServiceOptions, ServiceTemplate, SubtotalMarker, ToothId,
};
use crate::ledger::Ledger;
use crate::record::LedgerRecord;

#[derive(Debug, Clone)]
pub struct LedgerSession {
    id: PlanId,
    ledger: Ledger,
    config: LedgerConfig,
    version: u64,
}

impl Default for LedgerSession {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl LedgerSession {
    /// Start a blank plan.
    pub fn new(config: LedgerConfig) -> Self {
        let id = PlanId::new();
        tracing::info!(plan_id = %id, "treatment plan session started");
        Self {
            id,
            ledger: Ledger::new(),
            config,
            version: 0,
        }
    }

    /// Start a session seeded from a saved plan.
    pub fn from_record(record: LedgerRecord, config: LedgerConfig) -> DomainResult<Self> {
        let mut session = Self::new(config);
        session.load(record)?;
        Ok(session)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// True iff the plan holds no services (and therefore nothing at all).
    pub fn is_empty(&self) -> bool {
        !self.ledger.has_services()
    }

    pub fn total_amount(&self) -> Money {
        self.ledger.total_amount()
    }

    /// Replace the current state with a saved plan.
    ///
    /// Missing subtotals/comments are treated as empty. Order keys are
    /// normalized to `1..=N` and marker amounts re-derived. On error the
    /// session is left untouched.
    pub fn load(&mut self, record: LedgerRecord) -> DomainResult<()> {
        let items = record.into_sequence()?;
        let (mut ledger, renumbered) = Ledger::from_sequence(items)?;
        if renumbered {
            tracing::warn!(
                plan_id = %self.id,
                "saved plan had gaps or duplicates in its ordering; renumbered"
            );
        }
        if !ledger.has_services() && !ledger.is_empty() {
            tracing::warn!(
                plan_id = %self.id,
                "saved plan has subtotals or comments but no services; dropping them"
            );
            ledger = Ledger::new();
        }
        ledger.recompute_markers();

        let previous = std::mem::replace(&mut self.ledger, ledger);
        if let Err(err) = self.commit(false) {
            self.ledger = previous;
            return Err(err);
        }
        tracing::info!(plan_id = %self.id, items = self.ledger.len(), "treatment plan loaded");
        Ok(())
    }

    pub fn to_record(&self) -> LedgerRecord {
        LedgerRecord::from_ledger(&self.ledger)
    }

    pub fn add_service(
        &mut self,
        template: ServiceTemplate,
        options: ServiceOptions,
    ) -> DomainResult<Service> {
        let service = self.ledger.append_service(template, options)?;
        self.commit(true)?;
        tracing::info!(plan_id = %self.id, item_id = %service.id, order = service.order, "service added");
        Ok(service)
    }

    /// Add a subtotal at the end of the plan.
    ///
    /// Seeded with the total not yet covered by other subtotals, then
    /// re-derived; the returned marker carries the derived amount.
    pub fn add_subtotal(&mut self, label: Option<&str>) -> DomainResult<SubtotalMarker> {
        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.default_subtotal_label.as_str())
            .to_string();
        let seed = self.ledger.pending_subtotal_seed();
        let id = self.ledger.append_subtotal(Some(&label), seed).id;
        self.commit(true)?;
        let marker = self
            .ledger
            .get(&id)
            .and_then(LineItem::as_subtotal)
            .cloned()
            .ok_or_else(|| DomainError::consistency("appended subtotal vanished"))?;
        tracing::info!(plan_id = %self.id, item_id = %marker.id, amount = %marker.amount, "subtotal added");
        Ok(marker)
    }

    pub fn add_comment(&mut self, text: &str) -> DomainResult<Comment> {
        let comment = self.ledger.append_comment(text)?;
        self.commit(false)?;
        tracing::info!(plan_id = %self.id, item_id = %comment.id, "comment added");
        Ok(comment)
    }

    pub fn edit_label(&mut self, id: &LineItemId, label: &str) -> DomainResult<()> {
        self.ledger
            .edit_label(id, label, &self.config.default_subtotal_label)?;
        self.commit(false)
    }

    pub fn edit_comment(&mut self, id: &LineItemId, text: &str) -> DomainResult<()> {
        self.ledger.edit_text(id, text)?;
        self.commit(false)
    }

    pub fn edit_quantity(&mut self, id: &LineItemId, quantity: u32) -> DomainResult<()> {
        self.ledger.edit_quantity(id, quantity)?;
        self.commit(true)
    }

    pub fn edit_note(&mut self, id: &LineItemId, note: Option<&str>) -> DomainResult<()> {
        self.ledger.edit_note(id, note)?;
        self.commit(false)
    }

    pub fn edit_teeth(
        &mut self,
        id: &LineItemId,
        teeth: impl IntoIterator<Item = ToothId>,
        linked_to_teeth: bool,
    ) -> DomainResult<()> {
        self.ledger.edit_teeth(id, teeth, linked_to_teeth)?;
        self.commit(true)
    }

    pub fn set_tooth_note(&mut self, id: &LineItemId, tooth: ToothId, note: &str) -> DomainResult<()> {
        self.ledger.set_tooth_note(id, tooth, note)?;
        self.commit(false)
    }

    pub fn remove_tooth_note(&mut self, id: &LineItemId, tooth: ToothId) -> DomainResult<bool> {
        let removed = self.ledger.remove_tooth_note(id, tooth)?;
        if removed {
            self.commit(false)?;
        }
        Ok(removed)
    }

    pub fn reconfigure_service(
        &mut self,
        id: &LineItemId,
        options: ServiceOptions,
    ) -> DomainResult<()> {
        self.ledger.reconfigure_service(id, options)?;
        self.commit(true)
    }

    pub fn remove(&mut self, id: &LineItemId) -> DomainResult<LineItem> {
        let removed = self.ledger.remove(id)?;
        self.commit(true)?;
        tracing::info!(
            plan_id = %self.id,
            item_id = %id,
            kind = %removed.kind(),
            order = removed.order(),
            "item removed"
        );
        Ok(removed)
    }

    /// Returns `false` (and changes nothing) when the item is already first.
    pub fn move_up(&mut self, id: &LineItemId) -> DomainResult<bool> {
        let moved = self.ledger.move_up(id)?;
        if moved {
            self.commit(true)?;
        }
        Ok(moved)
    }

    /// Returns `false` (and changes nothing) when the item is already last.
    pub fn move_down(&mut self, id: &LineItemId) -> DomainResult<bool> {
        let moved = self.ledger.move_down(id)?;
        if moved {
            self.commit(true)?;
        }
        Ok(moved)
    }

    /// Explicit re-derivation of marker amounts. Returns how many changed.
    pub fn recompute_markers(&mut self) -> usize {
        self.ledger.recompute_markers()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::capture(self.id, self.version, &self.config.currency, &self.ledger)
    }

    /// Hand a snapshot to `exporter`. Failures are reported, the live plan is
    /// never touched.
    pub fn export_with<E: PlanExporter>(&self, exporter: &E) -> anyhow::Result<()> {
        let snapshot = self.snapshot();
        let version = snapshot.version();
        match exporter
            .export(snapshot)
            .with_context(|| format!("exporting treatment plan {} at version {version}", self.id))
        {
            Ok(()) => {
                tracing::info!(plan_id = %self.id, version, "treatment plan exported");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(plan_id = %self.id, version, error = %err, "treatment plan export failed");
                Err(err)
            }
        }
    }

    fn commit(&mut self, recompute: bool) -> DomainResult<()> {
        if recompute {
            self.ledger.recompute_markers();
        }
        if let Err(err) = self.ledger.verify() {
            if self.config.fail_fast {
                tracing::error!(plan_id = %self.id, error = %err, "ledger inconsistent");
                return Err(err);
            }
            tracing::warn!(plan_id = %self.id, error = %err, "ledger inconsistent; repairing");
            self.ledger.repair();
        }
        self.version += 1;
        Ok(())
    }
}

impl AggregateRoot for LedgerSession {
    type Id = PlanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
