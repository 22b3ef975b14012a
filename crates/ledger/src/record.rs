//! Persisted shape of a treatment-plan ledger.
//!
//! This is the structure the persistence layer embeds inside an invoice
//! record. Field names match what the rest of the application writes.
//! Older records carry no `subTotals`/`comments` and no `order` on services;
//! both are accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dentaplan_core::{DomainError, DomainResult, LineItemId, Money};

use crate::item::{
    Comment, LineItem, Service, ServiceOptions, ServiceTemplate, SubtotalMarker, ToothId,
};
use crate::ledger::Ledger;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
    #[serde(default, rename = "subTotals", alias = "subtotals")]
    pub subtotals: Vec<SubtotalRecord>,
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: Vec<String>,
    pub price: f64,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub selected_teeth: Vec<String>,
    #[serde(default)]
    pub linked_to_teeth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub teeth_comments: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtotalRecord {
    pub id: String,
    pub sub_total_name: String,
    #[serde(default)]
    pub sub_total_amount: f64,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub comment: String,
    pub order: u32,
}

fn one() -> u32 {
    1
}

impl LedgerRecord {
    pub fn from_json(json: &str) -> DomainResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::validation(format!("malformed ledger record: {e}")))
    }

    pub fn to_json(&self) -> DomainResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DomainError::validation(format!("ledger record not serializable: {e}")))
    }

    pub fn from_ledger(ledger: &Ledger) -> Self {
        let mut record = Self::default();
        for item in ledger.items() {
            match item {
                LineItem::Service(s) => record.services.push(ServiceRecord::from(s)),
                LineItem::Subtotal(m) => record.subtotals.push(SubtotalRecord {
                    id: m.id.to_string(),
                    sub_total_name: m.label.clone(),
                    sub_total_amount: m.amount.to_decimal(),
                    order: m.order,
                }),
                LineItem::Comment(c) => record.comments.push(CommentRecord {
                    id: c.id.to_string(),
                    comment: c.text.clone(),
                    order: c.order,
                }),
            }
        }
        record
    }

    /// Convert to line items in their intended sequence.
    ///
    /// Items with an `order` come first, stably sorted by it (ties keep
    /// services before subtotals before comments). Services without one
    /// follow in the order they were stored.
    pub(crate) fn into_sequence(self) -> DomainResult<Vec<LineItem>> {
        let mut ordered: Vec<(u32, LineItem)> = Vec::new();
        let mut unordered: Vec<LineItem> = Vec::new();

        for record in self.services {
            let order = record.order;
            let item = LineItem::Service(record.into_service()?);
            match order {
                Some(order) => ordered.push((order, item)),
                None => unordered.push(item),
            }
        }
        for record in self.subtotals {
            let item = LineItem::Subtotal(SubtotalMarker {
                id: parse_id(&record.id)?,
                label: record.sub_total_name,
                amount: Money::from_decimal(record.sub_total_amount).unwrap_or(Money::ZERO),
                order: record.order,
            });
            ordered.push((record.order, item));
        }
        for record in self.comments {
            let item = LineItem::Comment(Comment {
                id: parse_id(&record.id)?,
                text: record.comment,
                order: record.order,
            });
            ordered.push((record.order, item));
        }

        ordered.sort_by_key(|(order, _)| *order);
        Ok(ordered
            .into_iter()
            .map(|(_, item)| item)
            .chain(unordered)
            .collect())
    }
}

impl ServiceRecord {
    /// Stored quantities are kept as written, also on tooth-linked lines.
    /// Notes keyed by a number that is not on the dental chart are skipped.
    fn into_service(self) -> DomainResult<Service> {
        let id = parse_id(&self.id)?;
        let teeth = self
            .selected_teeth
            .iter()
            .map(|t| t.parse::<ToothId>())
            .collect::<DomainResult<_>>()?;
        let tooth_notes = self
            .teeth_comments
            .into_iter()
            .filter_map(|(tooth, note)| match tooth.parse::<ToothId>() {
                Ok(parsed) => Some((parsed, note)),
                Err(err) => {
                    tracing::warn!(
                        item_id = %id,
                        tooth = %tooth,
                        error = %err,
                        "skipping note for a tooth off the dental chart"
                    );
                    None
                }
            })
            .collect();

        let template = ServiceTemplate {
            name: self.name,
            category_path: self.path,
            price: Money::from_decimal(self.price)?,
            color: self.color,
        };
        let options = ServiceOptions {
            quantity: self.quantity,
            teeth,
            linked_to_teeth: self.linked_to_teeth,
            note: self.comment,
            tooth_notes,
        };
        Service::new(id, template, options, self.order.unwrap_or(0))
    }
}

impl From<&Service> for ServiceRecord {
    fn from(s: &Service) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            path: s.category_path.clone(),
            price: s.price.to_decimal(),
            quantity: s.quantity,
            selected_teeth: s.teeth.iter().map(ToString::to_string).collect(),
            linked_to_teeth: s.linked_to_teeth,
            comment: s.note.clone(),
            teeth_comments: s
                .tooth_notes
                .iter()
                .map(|(tooth, note)| (tooth.to_string(), note.clone()))
                .collect(),
            color: s.color.clone(),
            order: Some(s.order),
        }
    }
}

fn parse_id(raw: &str) -> DomainResult<LineItemId> {
    raw.parse()
}
