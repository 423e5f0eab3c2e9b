use criterion::Criterion;
use strata::{
    config::{Hyper, Options},
    crossover::{avg_param_diff, crossover, delta, disjoint_excess_count},
    new_t,
    random::WyRng,
    Engine,
};

/// An engine whose genomes have grown apart over a few generations
fn grown() -> Engine {
    let mut engine = Engine::new(
        4,
        2,
        Options {
            max_pop: 100,
            hyper: new_t!(Hyper, initial_mutation = 40),
            seed: Some(0xbe7c4),
            ..Options::default()
        },
    );
    for _ in 0..5 {
        for (i, client) in engine.population_mut().iter_mut().enumerate() {
            client.score = i as f64;
        }
        engine.evolve();
    }
    engine
}

fn bench_crossover(bench: &mut Criterion) {
    let engine = grown();
    let (l, r) = (&engine.population()[0].genome, &engine.population()[1].genome);
    let mandatory = &engine.registry().mandatory;
    let hyper = &engine.settings().hyper;
    let mut rng = WyRng::seeded(1);

    bench.bench_function("disjoint-excess-count", |b| {
        b.iter(|| disjoint_excess_count(l.connections(), r.connections()))
    });

    bench.bench_function("avg-weight-diff", |b| {
        b.iter(|| avg_param_diff(l.connections(), r.connections()))
    });

    bench.bench_function("delta", |b| b.iter(|| delta(l, r, hyper)));

    bench.bench_function("crossover-ne", |b| {
        b.iter(|| crossover(l, r, mandatory, &mut rng))
    });

    bench.bench_function("crossover-eq", |b| {
        b.iter(|| crossover(l, l, mandatory, &mut rng))
    });
}

pub fn benches() {
    #[cfg(not(feature = "smol_bench"))]
    let mut criterion: criterion::Criterion<_> = Criterion::default()
        .sample_size(1000)
        .significance_level(0.1);
    #[cfg(feature = "smol_bench")]
    let mut criterion: criterion::Criterion<_> = {
        use core::time::Duration;
        Criterion::default()
            .measurement_time(Duration::from_millis(1))
            .sample_size(10)
            .nresamples(1)
            .without_plots()
            .configure_from_args()
    };
    bench_crossover(&mut criterion);
}

fn main() {
    benches();
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();
}
