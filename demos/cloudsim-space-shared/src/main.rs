use std::io::Write;

use clap::Parser;
use env_logger::Builder;
use log::{error, info};

use dslab_cloudsim::core::config::SimulationConfig;
use dslab_cloudsim::report::{cloudlet_table, save_csv};
use dslab_cloudsim::simulation::CloudSimulation;
use dslab_core::simulation::Simulation;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to simulation config
    #[clap(long, default_value = "config.yaml")]
    config: String,

    /// Save cloudlet results to CSV file
    #[clap(long)]
    output: Option<String>,

    /// Simulation seed
    #[clap(long, default_value_t = 123)]
    seed: u64,
}

fn init_logger() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() {
    let args = Args::parse();
    init_logger();

    let sim_config = SimulationConfig::from_file(&args.config);
    let sim = Simulation::new(args.seed);
    let (mut cloud_sim, broker) = match CloudSimulation::from_config(sim, sim_config) {
        Ok(result) => result,
        Err(e) => {
            error!("invalid simulation config: {}", e);
            std::process::exit(1);
        }
    };

    info!("Simulation started");
    cloud_sim.run();
    info!(
        "Simulation finished at {:.2} after {} events",
        cloud_sim.current_time(),
        cloud_sim.event_count()
    );

    let broker = cloud_sim.broker(broker).unwrap();
    let mut cloudlets = broker.borrow().cloudlet_received_list().to_vec();
    cloudlets.sort_by_key(|c| c.id);
    println!("{}", cloudlet_table(&cloudlets));

    if let Some(path) = args.output {
        if let Err(e) = save_csv(&path, &cloudlets) {
            error!("failed to save results to {}: {}", path, e);
        }
    }
}
