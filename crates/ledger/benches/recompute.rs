use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dentaplan_core::Money;
use dentaplan_ledger::{Ledger, ServiceOptions, ServiceTemplate};

fn plan(services: usize, every: usize) -> Ledger {
    let mut ledger = Ledger::new();
    for i in 0..services {
        ledger
            .append_service(
                ServiceTemplate::new("Service", Money::from_minor(1_000 + i as u64)),
                ServiceOptions::quantity(1 + (i % 3) as u32),
            )
            .expect("valid service");
        if (i + 1) % every == 0 {
            ledger.append_subtotal(None, Money::ZERO);
        }
    }
    ledger
}

fn bench_recompute(c: &mut Criterion) {
    let mut ledger = plan(500, 10);
    c.bench_function("recompute_markers/500", |b| {
        b.iter(|| black_box(&mut ledger).recompute_markers())
    });

    let ledger = plan(500, 10);
    c.bench_function("total_amount/500", |b| b.iter(|| black_box(&ledger).total_amount()));
}

fn bench_reorder(c: &mut Criterion) {
    let mut ledger = plan(500, 10);
    let id = ledger.items()[250].as_service().map(|s| s.id.clone()).expect("service at 250");
    c.bench_function("move_up_down/500", |b| {
        b.iter(|| {
            ledger.move_up(&id).expect("present");
            ledger.move_down(&id).expect("present");
        })
    });
}

criterion_group!(benches, bench_recompute, bench_reorder);
criterion_main!(benches);
