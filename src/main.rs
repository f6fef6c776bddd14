use anyhow::Result;
use bnkit::{Network, StateSpec, TableSpec, Variable};
use std::collections::HashMap;

fn main() -> Result<()> {
    env_logger::init();

    // Build a small diagnostic network: rain and sprinkler both influence
    // whether the grass is wet.
    let rain = Variable::new(
        "Rain",
        StateSpec::YN,
        &[],
        TableSpec::Flat(vec![0.8, 0.2]),
    )?;
    let sprinkler = Variable::new(
        "Sprinkler",
        StateSpec::YN,
        &[&rain],
        TableSpec::Flat(vec![0.6, 0.99, 0.4, 0.01]),
    )?;
    let grass_wet = Variable::new(
        "Grass wet",
        StateSpec::YN,
        &[&rain, &sprinkler],
        TableSpec::Flat(vec![1.0, 0.2, 0.1, 0.01, 0.0, 0.8, 0.9, 0.99]),
    )?;

    let mut model = Network::new("Garden", vec![rain, sprinkler, grass_wet])?
        .with_description("Classic rain/sprinkler example");

    println!("Variables: {:?}", model.variable_ids());
    println!("Edges: {:?}", model.edges());

    // Marginals with no evidence.
    let marginals = model.query(&HashMap::new())?;
    for id in model.variable_ids() {
        println!("P({id}) = {:?}", marginals[&id]);
    }

    // Posterior once the grass is observed wet.
    let evidence = HashMap::from([("grasswet".to_string(), Some("Yes".to_string()))]);
    let marginals = model.query(&evidence)?;
    println!("P(rain | grasswet=Yes) = {:?}", marginals["rain"]);

    // Draw a few joint samples.
    let samples = model.sample(5)?;
    println!("Samples over {:?}:", samples.columns);
    for row in &samples.rows {
        println!("  {row:?}");
    }

    // Export both formats next to the system temp directory.
    let cmpx_path = std::env::temp_dir().join("garden.cmpx");
    let json_path = std::env::temp_dir().join("garden.json");
    model.to_file(&cmpx_path)?;
    model.to_file(&json_path)?;
    println!("Wrote {} and {}", cmpx_path.display(), json_path.display());

    Ok(())
}
