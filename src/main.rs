use anyhow::Context;
use dramatracker::{Config, run};

fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all().thread_name("dramatracker-worker");

    // 0 means one worker per CPU core.
    if config.general.worker_threads > 0 {
        builder.worker_threads(config.general.worker_threads);
    }

    let runtime = builder.build().context("Failed to start tokio runtime")?;
    runtime.block_on(run(config))
}
