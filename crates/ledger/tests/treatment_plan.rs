//! Black-box tests driving a treatment plan through the public session API.

use dentaplan_core::{DomainError, Entity, LineItemId, Money};
use dentaplan_ledger::{
    DocumentLine, LedgerConfig, LedgerRecord, LedgerSession, LineItem, ServiceOptions,
    ServiceTemplate, ToothId,
};

fn session() -> LedgerSession {
    dentaplan_observability::init();
    LedgerSession::new(LedgerConfig::default())
}

fn add(session: &mut LedgerSession, name: &str, major: u64, quantity: u32) -> LineItemId {
    session
        .add_service(
            ServiceTemplate::new(name, Money::from_major(major)).with_path(["Catalog"]),
            ServiceOptions::quantity(quantity),
        )
        .expect("service is valid")
        .id
}

fn sequence(session: &LedgerSession) -> Vec<(String, u32)> {
    session
        .ledger()
        .items()
        .iter()
        .map(|item| {
            let name = match item {
                LineItem::Service(s) => s.name.clone(),
                LineItem::Subtotal(m) => m.label.clone(),
                LineItem::Comment(c) => c.text.clone(),
            };
            (name, item.order())
        })
        .collect()
}

fn marker(session: &LedgerSession, id: &LineItemId) -> Money {
    session
        .ledger()
        .get(id)
        .and_then(LineItem::as_subtotal)
        .map(|m| m.amount)
        .expect("marker exists")
}

#[test]
fn staged_plan_renumbers_and_rederives_after_delete() {
    let mut plan = session();
    add(&mut plan, "A", 10, 1);
    let b = add(&mut plan, "B", 20, 1);
    add(&mut plan, "C", 30, 1);
    let m = plan.add_subtotal(Some("Stage 1")).unwrap();
    assert_eq!(m.order, 4);
    assert_eq!(m.amount, Money::from_major(60));

    let x = plan.add_comment("X").unwrap();
    assert_eq!(x.order, 5);
    add(&mut plan, "D", 5, 2);
    add(&mut plan, "E", 5, 1);
    assert_eq!(plan.total_amount(), Money::from_major(75));

    let removed = plan.remove(&b).unwrap();
    assert_eq!(removed.order(), 2);
    assert_eq!(
        sequence(&plan),
        [("A", 1), ("C", 2), ("Stage 1", 3), ("X", 4), ("D", 5), ("E", 6)]
            .map(|(n, o)| (n.to_string(), o))
            .to_vec()
    );
    assert_eq!(marker(&plan, &m.id), Money::from_major(40));
    assert_eq!(plan.total_amount(), Money::from_major(65));
}

#[test]
fn deleting_every_service_clears_the_plan() {
    let mut plan = session();
    let a = add(&mut plan, "A", 10, 1);
    let b = add(&mut plan, "B", 10, 1);
    plan.add_subtotal(Some("Stage 1")).unwrap();
    plan.add_comment("note").unwrap();

    plan.remove(&a).unwrap();
    assert_eq!(plan.ledger().len(), 3);
    plan.remove(&b).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.ledger().markers().count(), 0);
    assert_eq!(plan.ledger().comments().count(), 0);
}

#[test]
fn unknown_ids_are_reported_and_change_nothing() {
    let mut plan = session();
    add(&mut plan, "A", 10, 1);
    let before = plan.ledger().clone();
    let ghost = LineItemId::new();

    for result in [
        plan.remove(&ghost).map(|_| ()),
        plan.move_up(&ghost).map(|_| ()),
        plan.edit_quantity(&ghost, 2),
        plan.edit_comment(&ghost, "x"),
    ] {
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }
    assert_eq!(plan.ledger(), &before);
}

#[test]
fn tooth_linked_service_tracks_selection() {
    let mut plan = session();
    let teeth: Vec<ToothId> = ["11", "21"].iter().map(|t| t.parse().unwrap()).collect();
    let crown = plan
        .add_service(
            ServiceTemplate::new("Crown", Money::from_major(100)),
            ServiceOptions::teeth(teeth),
        )
        .unwrap();
    let m = plan.add_subtotal(None).unwrap();
    assert_eq!(m.amount, Money::from_major(200));

    let more: Vec<ToothId> = ["11", "21", "22"].iter().map(|t| t.parse().unwrap()).collect();
    plan.edit_teeth(&crown.id, more, true).unwrap();
    assert_eq!(marker(&plan, &m.id), Money::from_major(300));

    plan.edit_quantity(&crown.id, 4).unwrap();
    assert_eq!(marker(&plan, &m.id), Money::from_major(400));

    let saved = plan.to_record().to_json().unwrap();
    let reloaded =
        LedgerSession::from_record(LedgerRecord::from_json(&saved).unwrap(), LedgerConfig::default())
            .unwrap();
    assert_eq!(reloaded.total_amount(), Money::from_major(400));
}

#[test]
fn reconfigure_keeps_identity_and_position() {
    let mut plan = session();
    add(&mut plan, "A", 10, 1);
    let b = add(&mut plan, "B", 20, 1);
    add(&mut plan, "C", 30, 1);

    let tooth: ToothId = "46".parse().unwrap();
    plan.reconfigure_service(
        &b,
        ServiceOptions::quantity(3)
            .with_note("after extraction")
            .with_tooth_note(tooth, "implant site"),
    )
    .unwrap();

    let service = plan.ledger().get(&b).and_then(LineItem::as_service).unwrap();
    assert_eq!(service.order, 2);
    assert_eq!(service.quantity, 3);
    assert_eq!(service.category_path, vec!["Catalog".to_string()]);
    assert_eq!(service.tooth_notes.get(&tooth).map(String::as_str), Some("implant site"));
    assert_eq!(plan.total_amount(), Money::from_major(100));
}

#[test]
fn legacy_plan_loads_edits_and_saves() {
    let legacy = r#"{
        "services": [
            { "id": "service-1712-0.1", "name": "Scaling", "path": ["Hygiene"], "price": 35,
              "quantity": 1, "selectedTeeth": [], "linkedToTeeth": false },
            { "id": "service-1712-0.2", "name": "Filling", "path": ["Therapy"], "price": 42.5,
              "quantity": 2, "selectedTeeth": ["36", "37"], "linkedToTeeth": true,
              "teethComments": { "36": "deep caries" } }
        ]
    }"#;
    let mut plan = LedgerSession::from_record(
        LedgerRecord::from_json(legacy).unwrap(),
        LedgerConfig::default(),
    )
    .unwrap();
    assert_eq!(
        sequence(&plan),
        vec![("Scaling".to_string(), 1), ("Filling".to_string(), 2)]
    );
    assert_eq!(plan.total_amount(), Money::from_minor(12_000));

    let scaling: LineItemId = "service-1712-0.1".parse().unwrap();
    plan.move_down(&scaling).unwrap();
    plan.add_subtotal(Some("Stage 1")).unwrap();

    let saved = plan.to_record();
    assert_eq!(saved.subtotals.len(), 1);
    assert_eq!(saved.subtotals[0].sub_total_amount, 120.0);
    assert_eq!(saved.services[1].id, "service-1712-0.1");
    assert_eq!(saved.services[1].order, Some(2));

    let json = saved.to_json().unwrap();
    let reloaded =
        LedgerSession::from_record(LedgerRecord::from_json(&json).unwrap(), LedgerConfig::default())
            .unwrap();
    assert_eq!(reloaded.ledger().items(), plan.ledger().items());
}

#[test]
fn exported_document_matches_plan() {
    let mut plan = session();
    add(&mut plan, "A", 10, 2);
    plan.add_subtotal(Some("Stage 1")).unwrap();
    plan.add_comment("Stage 2 after healing").unwrap();
    add(&mut plan, "B", 15, 1);

    let snapshot = plan.snapshot();
    let lines = snapshot.document_lines();
    let orders: Vec<u32> = lines
        .iter()
        .map(|line| match line {
            DocumentLine::Service { order, .. }
            | DocumentLine::Subtotal { order, .. }
            | DocumentLine::Comment { order, .. } => *order,
        })
        .collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
    assert!(matches!(
        &lines[1],
        DocumentLine::Subtotal { amount, .. } if *amount == Money::from_major(20)
    ));
    assert_eq!(snapshot.total_amount(), Money::from_major(35));
    assert_eq!(snapshot.currency(), "BYN");
    assert!(snapshot.items().iter().all(|i| plan.ledger().get(i.id()).is_some()));
}
