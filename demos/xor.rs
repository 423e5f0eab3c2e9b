use strata::{
    activate::Activation,
    config::{Hyper, Options},
    new_t, Client, Engine,
};

const POPULATION: usize = 500;

const PAIRS: [([f64; 2], f64); 4] = [
    ([0., 0.], 0.),
    ([0., 1.], 1.),
    ([1., 0.], 1.),
    ([1., 1.], 0.),
];

/// 4 minus the summed absolute error over every pair
fn eval(client: &mut Client) -> strata::Result<f64> {
    let mut fit = 4.;
    for (pair, want) in PAIRS {
        let v = client.predict(&pair)?[0];
        fit -= (want - v).abs();
    }
    client.flush();
    Ok(fit)
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut engine = Engine::new(
        2,
        1,
        Options {
            max_pop: POPULATION,
            output_activation: Activation::Sigmoid,
            hyper: new_t!(Hyper, species_target = 20),
            generation_limit: Some(2000),
            ..Options::default()
        },
    );

    let trained = engine.train_with_function(eval, 4., 0.1, true).unwrap();
    println!(
        "fittest of gen {}: {:.4} ({} nodes, {} connections)",
        trained.generation,
        trained.client.score,
        trained.client.genome.nodes().len(),
        trained.client.genome.connections().len()
    );

    let mut champ = trained.client;
    for (pair, want) in PAIRS {
        println!("{pair:?} -> {:.4} (want {want})", champ.predict(&pair).unwrap()[0]);
    }

    std::fs::create_dir_all("output").unwrap();
    champ
        .genome
        .to_file(format!("output/xor-{}.json", trained.generation))
        .unwrap();
}
