use std::{env, io, time::Instant};

use log::info;
use parameter_server::{
    DEFAULT_SHARD_SIZE, DistKvStore, KvConfig, KvStore, LocalKvStore, Role, server,
};
use worker::{
    AdsConfig, ads, config,
    data::fs::{self, Uri},
};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "usage: train_ads <data-uri>",
        ));
    };

    let Ok(uri) = path.parse::<Uri>();
    let kv_config = KvConfig::from_env()?;
    info!("Env inited: {kv_config:?}");

    match kv_config.role {
        Role::Server => {
            info!("Running KVStore server");
            server::run(&kv_config).await?;
        }
        Role::Worker => {
            let kv = DistKvStore::connect(&kv_config.addr()).await?;
            train(kv, &uri).await?;
        }
        Role::Local => train(LocalKvStore::new(DEFAULT_SHARD_SIZE), &uri).await?,
    }

    Ok(())
}

async fn train<K: KvStore>(mut kv: K, uri: &Uri) -> worker::Result<()> {
    let config: AdsConfig = config::from_env()?;

    let filesystem = fs::get_instance(uri)?;
    let size = filesystem.path_info(uri)?.size;
    let mut stream = filesystem.open_for_read(uri)?;

    let start = Instant::now();
    let samples = ads::run(&mut kv, &mut *stream, size, &config).await?;
    let secs = start.elapsed().as_secs_f64();

    let local = samples as f64 / secs;
    let total = local * kv.num_workers() as f64;
    info!(
        "Training Duration = {secs}s\tlocal machine speed: [{local}/s]\ttotal speed: [{total}/s]"
    );

    kv.close().await?;
    Ok(())
}
