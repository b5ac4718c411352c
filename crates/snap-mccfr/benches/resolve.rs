criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        training_micro_epochs,
        building_micro_subgames,
        resolving_micro_spots,
        advising_micro_runouts,
        accumulating_table_rows,
        accumulating_dense_rows,
}

fn training_micro_epochs(c: &mut criterion::Criterion) {
    c.bench_function("train one external-sampling epoch", |b| {
        b.iter(|| {
            let mut trainer: Trainer<Micro, TableStore> = Trainer::new(Micro::default());
            trainer.batch();
        })
    });
}

fn building_micro_subgames(c: &mut criterion::Criterion) {
    let game = Micro::default();
    let root = live();
    c.bench_function("build a bounded subgame", |b| {
        b.iter(|| SubgameBuilder::new(&game).build(root, runout()))
    });
}

fn resolving_micro_spots(c: &mut criterion::Criterion) {
    let game = Micro::default();
    let root = live();
    let blueprint = blueprint();
    let ref ranges = vec![game.range(&root), game.range(&root)];
    let mut resolver = Resolver::new(&game, &blueprint).iterations(16, 64);
    c.bench_function("resolve a spot under a 50ms budget", |b| {
        b.iter(|| {
            resolver
                .resolve(root, runout(), ranges, std::time::Duration::from_millis(50))
                .map(|outcome| outcome.policy().clone())
        })
    });
}

fn advising_micro_runouts(c: &mut criterion::Criterion) {
    let game = Micro::default();
    let root = live();
    let blueprint = blueprint();
    let ref ranges = vec![game.range(&root), game.range(&root)];
    let ref mut rng = SmallRng::seed_from_u64(0);
    let mut coordinator = Coordinator::new(&game, &blueprint).samples(4).iterations(8, 32);
    c.bench_function("advise across 4 sampled run-outs", |b| {
        b.iter(|| coordinator.advise(root, ranges, std::time::Duration::from_millis(100), rng))
    });
}

fn accumulating_table_rows(c: &mut criterion::Criterion) {
    let ref info = Info::random();
    let mut store = TableStore::default();
    store.reserve(info, &menu());
    c.bench_function("accumulate regret into a table row", |b| {
        b.iter(|| store.add_regret(info, &Action::Call, 1.0))
    });
}

fn accumulating_dense_rows(c: &mut criterion::Criterion) {
    let ref info = Info::random();
    let mut store = DenseStore::default();
    store.reserve(info, &menu());
    c.bench_function("accumulate regret into a dense row", |b| {
        b.iter(|| store.add_regret(info, &Action::Call, 1.0))
    });
}

fn live() -> Spot {
    Micro::default()
        .root()
        .with_hole(0, Hole::from(Card::from(0u8)))
        .with_next(0)
}

fn runout() -> Runout {
    Runout::from(vec![
        Card::from(8u8),
        Card::from(9u8),
        Card::from(10u8),
        Card::from(5u8),
        Card::from(6u8),
    ])
}

fn menu() -> Vec<Action> {
    vec![
        Action::Fold,
        Action::Call,
        Action::Raise(Odds::new(1, 1)),
        Action::Shove,
    ]
}

fn blueprint() -> Profile<TableStore> {
    let mut trainer: Trainer<Micro, TableStore> = Trainer::new(Micro::default());
    for _ in 0..16 {
        trainer.batch();
    }
    trainer.into_profile()
}

use rand::SeedableRng;
use rand::rngs::SmallRng;
use snap_core::Arbitrary;
use snap_mccfr::Coordinator;
use snap_mccfr::Profile;
use snap_mccfr::Resolver;
use snap_mccfr::SubgameBuilder;
use snap_mccfr::store::DenseStore;
use snap_mccfr::store::RegretStore;
use snap_mccfr::store::TableStore;
use snap_mccfr::trainer::Trainer;
use snap_nlhe::Action;
use snap_nlhe::Card;
use snap_nlhe::Hole;
use snap_nlhe::Info;
use snap_nlhe::Micro;
use snap_nlhe::Odds;
use snap_nlhe::Runout;
use snap_nlhe::Rules;
use snap_nlhe::Spot;
