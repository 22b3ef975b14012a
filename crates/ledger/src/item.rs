//! Line-item model: the three kinds of rows a treatment plan is made of.
//!
//! Every item carries the shared `order` key. Items are plain data; the
//! [`Ledger`](crate::Ledger) is the only thing that assigns or changes `order`.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use dentaplan_core::{DomainError, DomainResult, Entity, LineItemId, Money, ValueObject};

/// Tooth identifier in FDI two-digit notation (quadrant 1-4, position 1-8).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToothId(u8);

impl ValueObject for ToothId {}

impl ToothId {
    pub fn new(quadrant: u8, position: u8) -> DomainResult<Self> {
        if !(1..=4).contains(&quadrant) || !(1..=8).contains(&position) {
            return Err(DomainError::validation(format!(
                "tooth {quadrant}{position} is not on the dental chart"
            )));
        }
        Ok(Self(quadrant * 10 + position))
    }

    pub fn quadrant(self) -> u8 {
        self.0 / 10
    }

    pub fn position(self) -> u8 {
        self.0 % 10
    }

    /// All 32 teeth of the permanent dentition, in chart order per quadrant.
    pub fn all() -> impl Iterator<Item = ToothId> {
        (1..=4u8).flat_map(|q| (1..=8u8).map(move |p| ToothId(q * 10 + p)))
    }
}

impl core::fmt::Display for ToothId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ToothId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits: Vec<u8> = s.bytes().map(|b| b.wrapping_sub(b'0')).collect();
        match digits.as_slice() {
            [q, p] if *q <= 9 && *p <= 9 => ToothId::new(*q, *p),
            _ => Err(DomainError::validation(format!(
                "'{s}' is not a tooth number"
            ))),
        }
    }
}

impl TryFrom<String> for ToothId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ToothId> for String {
    fn from(value: ToothId) -> Self {
        value.to_string()
    }
}

/// What the price catalog hands over when a user picks a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTemplate {
    pub name: String,
    /// Catalog path from the root category down to the leaf's parent.
    pub category_path: Vec<String>,
    pub price: Money,
    pub color: Option<String>,
}

impl ServiceTemplate {
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(),
            category_path: Vec::new(),
            price,
            color: None,
        }
    }

    pub fn with_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Per-line configuration chosen after picking a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    pub quantity: u32,
    pub teeth: BTreeSet<ToothId>,
    /// When set, `quantity` is reset to the number of selected teeth each
    /// time the selection changes. It may be edited freely in between.
    pub linked_to_teeth: bool,
    pub note: Option<String>,
    pub tooth_notes: BTreeMap<ToothId, String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            quantity: 1,
            teeth: BTreeSet::new(),
            linked_to_teeth: false,
            note: None,
            tooth_notes: BTreeMap::new(),
        }
    }
}

impl ServiceOptions {
    /// Free quantity, not tied to any tooth.
    pub fn quantity(quantity: u32) -> Self {
        Self {
            quantity,
            ..Self::default()
        }
    }

    /// One unit per selected tooth.
    pub fn teeth(teeth: impl IntoIterator<Item = ToothId>) -> Self {
        let teeth: BTreeSet<ToothId> = teeth.into_iter().collect();
        Self {
            quantity: teeth.len().max(1) as u32,
            teeth,
            linked_to_teeth: true,
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_tooth_note(mut self, tooth: ToothId, note: impl Into<String>) -> Self {
        self.tooth_notes.insert(tooth, note.into());
        self
    }

    /// One unit per selected tooth, for tooth-linked options.
    pub(crate) fn with_quantity_from_teeth(mut self) -> Self {
        if self.linked_to_teeth {
            self.quantity = self.teeth.len().max(1) as u32;
        }
        self
    }

    /// Bring the options into canonical shape.
    ///
    /// Free lines carry no selection. Blank notes are dropped. The quantity
    /// is kept as given.
    pub(crate) fn normalize(mut self) -> DomainResult<Self> {
        if !self.linked_to_teeth {
            self.teeth.clear();
        }
        if self.quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        self.note = normalize_note(self.note);
        self.tooth_notes.retain(|_, note| !note.trim().is_empty());
        Ok(self)
    }
}

pub(crate) fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Item kind discriminator (for logs, errors and rendering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Service,
    Subtotal,
    Comment,
}

impl core::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ItemKind::Service => "service",
            ItemKind::Subtotal => "subtotal",
            ItemKind::Comment => "comment",
        })
    }
}

/// A priced service line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: LineItemId,
    pub name: String,
    /// Read-only provenance from the catalog.
    pub category_path: Vec<String>,
    pub price: Money,
    pub quantity: u32,
    pub teeth: BTreeSet<ToothId>,
    pub linked_to_teeth: bool,
    pub note: Option<String>,
    pub tooth_notes: BTreeMap<ToothId, String>,
    pub color: Option<String>,
    pub order: u32,
}

impl Service {
    pub(crate) fn new(
        id: LineItemId,
        template: ServiceTemplate,
        options: ServiceOptions,
        order: u32,
    ) -> DomainResult<Self> {
        let options = options.normalize()?;
        let service = Self {
            id,
            name: template.name,
            category_path: template.category_path,
            price: template.price,
            quantity: options.quantity,
            teeth: options.teeth,
            linked_to_teeth: options.linked_to_teeth,
            note: options.note,
            tooth_notes: options.tooth_notes,
            color: template.color,
            order,
        };
        service.checked_line_total()?;
        Ok(service)
    }

    /// `price × quantity`.
    pub fn line_total(&self) -> Money {
        self.price.saturating_mul(self.quantity)
    }

    pub(crate) fn checked_line_total(&self) -> DomainResult<Money> {
        self.price
            .checked_mul(self.quantity)
            .ok_or_else(|| DomainError::validation("line amount overflow"))
    }

    /// Replace the line configuration. A changed tooth selection on a
    /// tooth-linked line resets the quantity to one unit per tooth.
    pub(crate) fn apply_options(&mut self, options: ServiceOptions) -> DomainResult<()> {
        let mut options = options.normalize()?;
        if options.linked_to_teeth && (!self.linked_to_teeth || options.teeth != self.teeth) {
            options = options.with_quantity_from_teeth();
        }
        let quantity = options.quantity;
        self.price
            .checked_mul(quantity)
            .ok_or_else(|| DomainError::validation("line amount overflow"))?;
        self.quantity = quantity;
        self.teeth = options.teeth;
        self.linked_to_teeth = options.linked_to_teeth;
        self.note = options.note;
        self.tooth_notes = options.tooth_notes;
        Ok(())
    }

    pub fn options(&self) -> ServiceOptions {
        ServiceOptions {
            quantity: self.quantity,
            teeth: self.teeth.clone(),
            linked_to_teeth: self.linked_to_teeth,
            note: self.note.clone(),
            tooth_notes: self.tooth_notes.clone(),
        }
    }
}

/// A running-subtotal checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtotalMarker {
    pub id: LineItemId,
    pub label: String,
    /// Derived by [`Ledger::recompute_markers`](crate::Ledger::recompute_markers).
    pub amount: Money,
    pub order: u32,
}

/// Free-text row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: LineItemId,
    pub text: String,
    pub order: u32,
}

/// One row of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LineItem {
    Service(Service),
    Subtotal(SubtotalMarker),
    Comment(Comment),
}

impl LineItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            LineItem::Service(_) => ItemKind::Service,
            LineItem::Subtotal(_) => ItemKind::Subtotal,
            LineItem::Comment(_) => ItemKind::Comment,
        }
    }

    pub fn order(&self) -> u32 {
        match self {
            LineItem::Service(s) => s.order,
            LineItem::Subtotal(m) => m.order,
            LineItem::Comment(c) => c.order,
        }
    }

    pub(crate) fn set_order(&mut self, order: u32) {
        match self {
            LineItem::Service(s) => s.order = order,
            LineItem::Subtotal(m) => m.order = order,
            LineItem::Comment(c) => c.order = order,
        }
    }

    pub fn as_service(&self) -> Option<&Service> {
        match self {
            LineItem::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_subtotal(&self) -> Option<&SubtotalMarker> {
        match self {
            LineItem::Subtotal(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            LineItem::Comment(c) => Some(c),
            _ => None,
        }
    }
}

impl Entity for Service {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for SubtotalMarker {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for Comment {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        match self {
            LineItem::Service(s) => &s.id,
            LineItem::Subtotal(m) => &m.id,
            LineItem::Comment(c) => &c.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tooth(s: &str) -> ToothId {
        s.parse().unwrap()
    }

    #[test]
    fn tooth_numbers_follow_fdi_chart() {
        assert_eq!(tooth("18").quadrant(), 1);
        assert_eq!(tooth("18").position(), 8);
        assert_eq!(ToothId::all().count(), 32);
        for bad in ["19", "50", "10", "5", "111", "ab", ""] {
            assert!(bad.parse::<ToothId>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn teeth_sort_numerically() {
        let teeth: BTreeSet<ToothId> = ["31", "11", "27"].into_iter().map(tooth).collect();
        let rendered: Vec<String> = teeth.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["11", "27", "31"]);
    }

    #[test]
    fn linked_options_keep_an_edited_quantity() {
        let mut options = ServiceOptions::teeth([tooth("11"), tooth("12"), tooth("13")]);
        assert_eq!(options.quantity, 3);
        options.quantity = 7;
        assert_eq!(options.clone().normalize().unwrap().quantity, 7);
        assert_eq!(options.with_quantity_from_teeth().quantity, 3);

        let none = ServiceOptions::teeth(Vec::<ToothId>::new()).normalize().unwrap();
        assert_eq!(none.quantity, 1);
    }

    #[test]
    fn quantity_follows_teeth_only_when_the_selection_changes() {
        let template = ServiceTemplate::new("Crown", Money::from_major(100));
        let mut options = ServiceOptions::teeth([tooth("11"), tooth("21")]);
        options.quantity = 5;
        let mut crown = Service::new("s-1".parse().unwrap(), template, options, 1).unwrap();
        assert_eq!(crown.quantity, 5);

        let mut same_teeth = crown.options();
        same_teeth.note = Some("zirconia".to_string());
        crown.apply_options(same_teeth).unwrap();
        assert_eq!(crown.quantity, 5);

        let mut more_teeth = crown.options();
        more_teeth.teeth.insert(tooth("22"));
        crown.apply_options(more_teeth).unwrap();
        assert_eq!(crown.quantity, 3);

        let mut fewer_teeth = crown.options();
        fewer_teeth.teeth.remove(&tooth("22"));
        fewer_teeth.teeth.remove(&tooth("21"));
        crown.apply_options(fewer_teeth).unwrap();
        assert_eq!(crown.quantity, 1);
    }

    #[test]
    fn unlinked_options_drop_teeth_and_reject_zero_quantity() {
        let mut options = ServiceOptions::quantity(2);
        options.teeth.insert(tooth("21"));
        let options = options.normalize().unwrap();
        assert!(options.teeth.is_empty());
        assert_eq!(options.quantity, 2);

        let err = ServiceOptions::quantity(0).normalize().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn blank_notes_are_dropped() {
        let options = ServiceOptions::quantity(1)
            .with_note("   ")
            .with_tooth_note(tooth("11"), "")
            .with_tooth_note(tooth("12"), "crown")
            .normalize()
            .unwrap();
        assert_eq!(options.note, None);
        assert_eq!(options.tooth_notes.len(), 1);
    }

    #[test]
    fn line_items_serialize_with_kind_tag() {
        let item = LineItem::Comment(Comment {
            id: "c-1".parse().unwrap(),
            text: "Review in 6 months".to_string(),
            order: 3,
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "comment");
        assert_eq!(json["order"], 3);
    }
}
