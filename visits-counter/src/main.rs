// a failed visit should turn into a 5xx, never into a crashed process
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

use {
    std::{path::PathBuf, sync::Arc},
    tracing::{Level, info},
    clap::{Parser, Subcommand},
    anyhow::anyhow,
    visits_counter::{
        CounterService,
        config::{CounterConfig, ServerConfig, store_from_config},
        dynamodb::DynamoDbStore,
        lambda::run_lambda,
        logs::init_logging,
        metrics::{Metrics, run_metrics_server},
        server::CounterServer,
        store::BoxedStore,
    },
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    counter: CounterConfig,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: Level,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle http events from the AWS Lambda runtime. Used when no command is given.
    Lambda,
    /// Run a local http server.
    Serve {
        config_file: Option<PathBuf>,
    },
}

impl Command {
    pub fn is_serve(&self) -> bool {
        match &self {
            Self::Serve { .. } => true,
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Lambda);

    // lambda log lines end up in cloudwatch, where color codes are noise
    init_logging(args.log_level, command.is_serve())?;

    run_command(command, args.counter).await
}

async fn run_command(command: Command, counter_config: CounterConfig) -> anyhow::Result<()> {
    let cors = counter_config.cors_policy()?;

    match command {
        Command::Lambda => {
            info!(table = %counter_config.table_name, region = %counter_config.region, "starting visits counter");
            let store = DynamoDbStore::from_config(&counter_config).await;
            let service = CounterService::new(BoxedStore::new(store), cors)
                .with_counter_name(counter_config.counter_name.clone());

            run_lambda(service).await
                .map_err(|err| anyhow!("lambda runtime failed: {err}"))
        },
        Command::Serve { config_file } => {
            let config = match config_file {
                Some(config_file) => {
                    let config_path = std::env::current_dir()?.join(config_file);
                    info!("loading config from {config_path:?}");
                    ServerConfig::load(config_path).await?
                },
                None => ServerConfig::default(),
            };

            let metrics = Metrics::new()?;
            if let Some(metrics_port) = config.metrics_port {
                tokio::spawn(run_metrics_server(metrics.clone(), metrics_port));
            }

            let store = store_from_config(&config.store, &counter_config).await?;
            let service = CounterService::new(store, cors)
                .with_counter_name(counter_config.counter_name.clone())
                .with_metrics(metrics);

            CounterServer::new(Arc::new(service))
                .bind(config.listen)
                .await?;
            Ok(())
        },
    }
}
