use std::io;

use log::info;
use worker::{LenetConfig, config, lenet};

fn main() -> io::Result<()> {
    env_logger::init();

    let config: LenetConfig = config::from_env()?;
    info!("training with {config:?}");

    let accuracies = lenet::run(&config)?;
    if let Some(last) = accuracies.last() {
        info!("final validation accuracy: {last}");
    }

    Ok(())
}
