use anyhow::{Result, bail};
use bnkit::{CmpxReadOptions, Network};
use clap::{Arg, ArgAction, Command};
use env_logger::{Builder, Env};
use std::io::Write;

/// Converts Bayesian network models between the cmpx interchange format
/// and the native JSON format.
fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let file = record.file().unwrap_or("unknown");
            let line = record.line().unwrap_or(0);
            writeln!(
                buf,
                "{} [{}:{}] {}",
                record.level(),
                file,
                line,
                record.args()
            )
        })
        .init();

    let matches = Command::new("bnconvert")
        .version("0.1")
        .about("Converts Bayesian network models between cmpx and native JSON files.")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Path to a .cmpx or .json model"),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .required(true)
                .help("Path to write, format chosen by extension"),
        )
        .arg(
            Arg::new("network")
                .long("network")
                .value_name("INDEX")
                .default_value("0")
                .help("Network index within a cmpx document"),
        )
        .arg(
            Arg::new("force_summation")
                .long("force-summation")
                .action(ArgAction::SetTrue)
                .help("Renormalize tables whose columns do not sum to 1"),
        )
        .arg(
            Arg::new("keep_disconnected")
                .long("keep-disconnected")
                .action(ArgAction::SetTrue)
                .help("Keep variables with no parents and no children"),
        )
        .get_matches();

    let input = matches.get_one::<String>("input").map(String::as_str).unwrap_or_default();
    let output = matches.get_one::<String>("output").map(String::as_str).unwrap_or_default();
    let network_index: usize = matches
        .get_one::<String>("network")
        .map(String::as_str)
        .unwrap_or("0")
        .parse()?;
    let force_summation = matches.get_flag("force_summation");
    let keep_disconnected = matches.get_flag("keep_disconnected");

    let network = match input.rsplit_once('.').map(|(_, ext)| ext) {
        Some("cmpx") => {
            let options = CmpxReadOptions {
                network_index,
                remove_disconnected_variables: !keep_disconnected,
                force_summation,
            };
            Network::from_cmpx(input, &options)?
        }
        Some("json") => Network::from_json(input, force_summation)?,
        _ => bail!("'{input}' must end in .cmpx or .json"),
    };

    network.to_file(output)?;
    println!(
        "Converted '{}' ({} variables, {} edges) to {}",
        network.name(),
        network.len(),
        network.edges().len(),
        output
    );
    Ok(())
}
