use strata::{activate::Activation, config::Options, loss::Outcome, Engine, Sample};

const POPULATION: usize = 300;

/// Samples of `sin` over one period, scaled into the unit interval
fn dataset() -> Vec<Sample> {
    (0..16)
        .map(|i| {
            let x = i as f64 / 16.;
            (vec![x], vec![(x * core::f64::consts::TAU).sin() * 0.5 + 0.5])
        })
        .collect()
}

/// Largest absolute error of any output
fn max_error(outcomes: &[Outcome<'_>]) -> f64 {
    outcomes
        .iter()
        .flat_map(|(expected, output)| expected.iter().zip(output.iter()).map(|(e, o)| (e - o).abs()))
        .fold(0., f64::max)
}

fn main() {
    tracing_subscriber::fmt::init();

    let data = dataset();
    let mut engine = Engine::new(
        1,
        1,
        Options {
            max_pop: POPULATION,
            output_activation: Activation::Sigmoid,
            generation_limit: Some(500),
            ..Options::default()
        },
    );

    let trained = engine.train_with_data(&data, 0.005, true, None).unwrap();
    println!("mse {:.5} after {} generations", -trained.client.score, trained.generation);

    // continue from the same population, judged by worst case instead
    engine.set_generation_limit(Some(200));
    let trained = engine
        .train_with_data(&data, 0.05, true, Some(&max_error))
        .unwrap();
    println!(
        "max error {:.5} after {} more generations",
        -trained.client.score, trained.generation
    );

    engine.to_file("output/data-engine.json").unwrap_or_else(|e| eprintln!("not saved: {e}"));
}
