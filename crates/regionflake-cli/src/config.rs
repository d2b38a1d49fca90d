use std::time::Duration;

use anyhow::bail;
use clap::{Parser, ValueEnum};
use regionflake::{DEFAULT_EPOCH, GeneratorConfig, SequenceReset, WaitStrategy};

/// Command line arguments of the `regionflake` binary.
///
/// Every value can also come from the environment, and a `.env` file in the
/// working directory is loaded before parsing.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "regionflake",
    version,
    about = "Allocate a worker id and mint region-aware Snowflake IDs"
)]
pub struct CliArgs {
    /// Number of IDs to generate.
    #[arg(short, long, env = "REGIONFLAKE_COUNT", default_value_t = 10)]
    pub count: usize,

    /// Registry key the IDs are generated for.
    #[arg(short, long, env = "REGIONFLAKE_KEY", default_value_t = String::from("default"))]
    pub key: String,

    /// Identifier of this host in the coordination store. Defaults to the
    /// address of the local outbound interface.
    #[arg(long, env = "REGIONFLAKE_HOST_ID")]
    pub host_id: Option<String>,

    /// Region encoded into every ID, `0..=7`. Defaults to 0, or to the
    /// derived region with `--worker-source process`.
    #[arg(short, long, env = "REGIONFLAKE_REGION_ID")]
    pub region_id: Option<u64>,

    /// Use this worker id instead of allocating one from the store.
    #[arg(short, long, env = "REGIONFLAKE_WORKER_ID", conflicts_with = "worker_source")]
    pub worker_id: Option<u64>,

    /// Where the worker id comes from when `--worker-id` is not given.
    #[arg(
        long,
        env = "REGIONFLAKE_WORKER_SOURCE",
        value_enum,
        default_value_t = SourceArg::Store
    )]
    pub worker_source: SourceArg,

    /// Timestamp origin in Unix milliseconds.
    #[arg(long, env = "REGIONFLAKE_EPOCH", default_value_t = DEFAULT_EPOCH)]
    pub epoch: u64,

    /// Where the sequence restarts on each new millisecond.
    #[arg(
        long,
        env = "REGIONFLAKE_SEQUENCE_RESET",
        value_enum,
        default_value_t = ResetArg::Narrow
    )]
    pub sequence_reset: ResetArg,

    /// What to do while a millisecond's sequence space is exhausted.
    #[arg(long, env = "REGIONFLAKE_WAIT", value_enum, default_value_t = WaitArg::Spin)]
    pub wait: WaitArg,

    /// Sleep between clock reads with `--wait sleep`.
    #[arg(long, env = "REGIONFLAKE_SLEEP_MICROS", default_value_t = 100)]
    pub sleep_micros: u64,

    /// Print the fields of an existing ID and exit.
    #[arg(long, value_name = "ID")]
    pub decode: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg {
    /// Allocate through the coordination store.
    Store,
    /// Derive worker and region from the hardware address and process id.
    Process,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetArg {
    Narrow,
    Zero,
    Full,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitArg {
    Spin,
    Yield,
    Sleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSource {
    Static(u64),
    Store,
    Process,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub count: usize,
    pub key: String,
    /// `None` until resolved from the local interface.
    pub host_id: Option<String>,
    pub source: WorkerSource,
    /// Whether `--region-id` was given explicitly.
    pub region_pinned: bool,
    /// Template for the registry; `worker_id` is filled in per host.
    pub generator: GeneratorConfig,
    pub decode: Option<u64>,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.count == 0 {
            bail!("COUNT must be greater than 0");
        }

        if args.key.is_empty() {
            bail!("KEY must not be empty");
        }

        if let Some(host_id) = &args.host_id {
            if host_id.is_empty() || host_id.contains('/') {
                bail!("HOST_ID ({host_id:?}) must be a non-empty node name");
            }
        }

        let wait = match args.wait {
            WaitArg::Spin => WaitStrategy::Spin,
            WaitArg::Yield => WaitStrategy::Yield,
            WaitArg::Sleep => WaitStrategy::Sleep(Duration::from_micros(args.sleep_micros)),
        };
        let sequence_reset = match args.sequence_reset {
            ResetArg::Narrow => SequenceReset::Narrow,
            ResetArg::Zero => SequenceReset::Zero,
            ResetArg::Full => SequenceReset::Full,
        };

        let generator = GeneratorConfig::new(args.worker_id.unwrap_or(0))
            .with_region_id(args.region_id.unwrap_or(0))
            .with_epoch(args.epoch)
            .with_sequence_reset(sequence_reset)
            .with_wait(wait);
        generator.validate()?;

        let source = match (args.worker_id, args.worker_source) {
            (Some(worker_id), _) => WorkerSource::Static(worker_id),
            (None, SourceArg::Store) => WorkerSource::Store,
            (None, SourceArg::Process) => WorkerSource::Process,
        };

        Ok(Self {
            count: args.count,
            key: args.key,
            host_id: args.host_id,
            source,
            region_pinned: args.region_id.is_some(),
            generator,
            decode: args.decode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<DemoConfig> {
        let argv = std::iter::once("regionflake").chain(args.iter().copied());
        let args = CliArgs::try_parse_from(argv)?;
        DemoConfig::try_from(args)
    }

    #[test]
    fn defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.count, 10);
        assert_eq!(config.key, "default");
        assert_eq!(config.host_id, None);
        assert_eq!(config.source, WorkerSource::Store);
        assert!(!config.region_pinned);
        assert_eq!(config.generator.region_id, 0);
        assert_eq!(config.generator.epoch, DEFAULT_EPOCH);
        assert_eq!(config.generator.sequence_reset, SequenceReset::Narrow);
        assert_eq!(config.generator.wait, WaitStrategy::Spin);
    }

    #[test]
    fn flags_map_onto_generator_config() {
        let config = parse(&[
            "--worker-id",
            "17",
            "--region-id",
            "3",
            "--sequence-reset",
            "zero",
            "--wait",
            "sleep",
            "--sleep-micros",
            "250",
        ])
        .unwrap();
        assert_eq!(config.source, WorkerSource::Static(17));
        assert!(config.region_pinned);
        assert_eq!(config.generator.worker_id, 17);
        assert_eq!(config.generator.region_id, 3);
        assert_eq!(config.generator.sequence_reset, SequenceReset::Zero);
        assert_eq!(
            config.generator.wait,
            WaitStrategy::Sleep(Duration::from_micros(250))
        );
    }

    #[test]
    fn rejects_out_of_range_ids() {
        assert!(parse(&["--worker-id", "1024"]).is_err());
        assert!(parse(&["--region-id", "8"]).is_err());
        assert!(parse(&["--worker-id", "1023", "--region-id", "7"]).is_ok());
    }

    #[test]
    fn rejects_empty_work() {
        assert!(parse(&["--count", "0"]).is_err());
        assert!(parse(&["--key", ""]).is_err());
        assert!(parse(&["--host-id", "a/b"]).is_err());
        assert!(parse(&["--host-id", ""]).is_err());
    }

    #[test]
    fn worker_sources() {
        let config = parse(&["--worker-source", "process"]).unwrap();
        assert_eq!(config.source, WorkerSource::Process);
        assert!(!config.region_pinned);

        let config = parse(&["--worker-source", "process", "--region-id", "0"]).unwrap();
        assert!(config.region_pinned);

        let config = parse(&["--host-id", "10.0.0.5"]).unwrap();
        assert_eq!(config.host_id.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.source, WorkerSource::Store);

        assert!(parse(&["--worker-id", "3", "--worker-source", "process"]).is_err());
    }
}
