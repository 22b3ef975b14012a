//! Snapshots handed to document generation.
//!
//! A snapshot is an owned copy of the plan taken at export time. Edits made
//! to the session afterwards never reach it, so a slow exporter always works
//! on a consistent view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dentaplan_core::{Money, PlanId};

use crate::item::{LineItem, ToothId};
use crate::ledger::Ledger;

/// Separator used when flattening a catalog path for display.
pub const PATH_SEPARATOR: &str = " → ";

/// Immutable view of a ledger at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSnapshot {
    plan_id: PlanId,
    version: u64,
    captured_at: DateTime<Utc>,
    currency: String,
    items: Vec<LineItem>,
    total_amount: Money,
}

impl LedgerSnapshot {
    pub(crate) fn capture(plan_id: PlanId, version: u64, currency: &str, ledger: &Ledger) -> Self {
        Self {
            plan_id,
            version,
            captured_at: Utc::now(),
            currency: currency.to_string(),
            items: ledger.items().to_vec(),
            total_amount: ledger.total_amount(),
        }
    }

    pub fn plan_id(&self) -> PlanId {
        self.plan_id
    }

    /// Session version the snapshot was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Items in ascending order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Rows ready for rendering, in plan order.
    pub fn document_lines(&self) -> Vec<DocumentLine> {
        self.items.iter().map(DocumentLine::from).collect()
    }
}

/// One rendered row of a treatment-plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentLine {
    Service {
        order: u32,
        name: String,
        path: String,
        /// Ascending tooth numbers.
        teeth: Vec<ToothId>,
        quantity: u32,
        unit_price: Money,
        line_total: Money,
        note: Option<String>,
        tooth_notes: Vec<(ToothId, String)>,
        color: Option<String>,
    },
    Subtotal {
        order: u32,
        label: String,
        amount: Money,
    },
    Comment {
        order: u32,
        text: String,
    },
}

impl From<&LineItem> for DocumentLine {
    fn from(item: &LineItem) -> Self {
        match item {
            LineItem::Service(s) => DocumentLine::Service {
                order: s.order,
                name: s.name.clone(),
                path: s.category_path.join(PATH_SEPARATOR),
                teeth: s.teeth.iter().copied().collect(),
                quantity: s.quantity,
                unit_price: s.price,
                line_total: s.line_total(),
                note: s.note.clone(),
                tooth_notes: s
                    .tooth_notes
                    .iter()
                    .map(|(tooth, note)| (*tooth, note.clone()))
                    .collect(),
                color: s.color.clone(),
            },
            LineItem::Subtotal(m) => DocumentLine::Subtotal {
                order: m.order,
                label: m.label.clone(),
                amount: m.amount,
            },
            LineItem::Comment(c) => DocumentLine::Comment {
                order: c.order,
                text: c.text.clone(),
            },
        }
    }
}

/// Document-generation collaborator.
///
/// Receives an owned snapshot so it may hand it to a background task.
pub trait PlanExporter {
    fn export(&self, snapshot: LedgerSnapshot) -> anyhow::Result<()>;
}

impl<F> PlanExporter for F
where
    F: Fn(LedgerSnapshot) -> anyhow::Result<()>,
{
    fn export(&self, snapshot: LedgerSnapshot) -> anyhow::Result<()> {
        self(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ServiceOptions, ServiceTemplate};

    #[test]
    fn document_lines_follow_plan_order() {
        let mut ledger = Ledger::new();
        let teeth: Vec<ToothId> = ["26", "16"].iter().map(|t| t.parse().unwrap()).collect();
        ledger
            .append_service(
                ServiceTemplate::new("Filling", Money::from_major(40))
                    .with_path(["Therapy", "Fillings"]),
                ServiceOptions::teeth(teeth),
            )
            .unwrap();
        ledger.append_subtotal(Some("Stage 1"), Money::ZERO);
        ledger.append_comment("Recall in 6 months").unwrap();
        ledger.recompute_markers();

        let snapshot = LedgerSnapshot::capture(PlanId::new(), 3, "BYN", &ledger);
        let lines = snapshot.document_lines();
        assert_eq!(lines.len(), 3);
        match &lines[0] {
            DocumentLine::Service {
                path,
                teeth,
                line_total,
                ..
            } => {
                assert_eq!(path, "Therapy → Fillings");
                let rendered: Vec<String> = teeth.iter().map(ToString::to_string).collect();
                assert_eq!(rendered, ["16", "26"]);
                assert_eq!(*line_total, Money::from_major(80));
            }
            other => panic!("expected service row, got {other:?}"),
        }
        assert_eq!(
            lines[1],
            DocumentLine::Subtotal {
                order: 2,
                label: "Stage 1".to_string(),
                amount: Money::from_major(80),
            }
        );
        assert!(matches!(lines[2], DocumentLine::Comment { order: 3, .. }));
        assert_eq!(snapshot.total_amount(), Money::from_major(80));
        assert_eq!(snapshot.version(), 3);
    }
}
