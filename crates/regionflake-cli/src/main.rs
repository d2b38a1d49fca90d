#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use std::io::{self, Write};

use clap::Parser;
use config::{CliArgs, DemoConfig, WorkerSource};
use regionflake::{
    GeneratorConfig, GeneratorRegistry, MemoryStore, MonotonicClock, ProcessWorkerId,
    SnowflakeId, StaticWorkerId, StoreWorkerIdSource, WorkerIdSource, local_host_id,
};
use telemetry::init_tracing;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_tracing()?;

    if let Some(raw) = config.decode {
        let mut out = io::stdout().lock();
        write_header(&mut out)?;
        return write_id(&mut out, SnowflakeId::from_raw(raw), config.generator.epoch);
    }

    let host_id = match &config.host_id {
        Some(host_id) => host_id.clone(),
        None => local_host_id()?,
    };

    match config.source {
        WorkerSource::Static(worker_id) => run(
            &config,
            &host_id,
            config.generator,
            StaticWorkerId::new(worker_id)?,
        ),
        WorkerSource::Store => run(
            &config,
            &host_id,
            config.generator,
            StoreWorkerIdSource::new(MemoryStore::new()),
        ),
        WorkerSource::Process => {
            let ids = ProcessWorkerId::detect()?;
            let mut template = config.generator;
            if !config.region_pinned {
                template.region_id = ids.region_id();
            }
            run(&config, &host_id, template, ids)
        }
    }
}

fn run<W: WorkerIdSource>(
    config: &DemoConfig,
    host_id: &str,
    template: GeneratorConfig,
    source: W,
) -> anyhow::Result<()> {
    let registry =
        GeneratorRegistry::with_config(source, host_id, template, MonotonicClock::new());

    let generator = registry.get_or_create(&config.key)?;
    tracing::info!(
        key = %config.key,
        host = %host_id,
        worker_id = generator.config().worker_id,
        region_id = generator.config().region_id,
        count = config.count,
        "generating ids"
    );

    let mut out = io::stdout().lock();
    write_header(&mut out)?;
    for _ in 0..config.count {
        let id = registry.generate(&config.key)?;
        write_id(&mut out, id, config.generator.epoch)?;
    }
    out.flush()?;
    Ok(())
}

fn write_header(out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "id\tunix_millis\tregion\tworker\tsequence")?;
    Ok(())
}

fn write_id(out: &mut impl Write, id: SnowflakeId, epoch: u64) -> anyhow::Result<()> {
    writeln!(
        out,
        "{id}\t{}\t{}\t{}\t{}",
        id.unix_millis(epoch),
        id.region_id(),
        id.worker_id(),
        id.sequence()
    )?;
    Ok(())
}
