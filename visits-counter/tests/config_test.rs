use {
    std::{net::SocketAddr, path::PathBuf},
    clap::Parser,
    visits_counter::{
        config::{CounterConfig, ServerConfig, StoreConfig, store_from_config},
        error::ConfigError,
        store::CounterStore,
    },
};

#[derive(Parser)]
struct TestArgs {
    #[command(flatten)]
    counter: CounterConfig,
}

#[test]
fn server_config_from_yaml() {
    let config = ServerConfig::parse(r#"
listen: 127.0.0.1:9000
metrics_port: 9001
store:
  type: sqlite
  path: data/visits.sqlite
"#).unwrap();

    assert_eq!("127.0.0.1:9000".parse::<SocketAddr>().unwrap(), config.listen);
    assert_eq!(Some(9001), config.metrics_port);
    assert_eq!(StoreConfig::Sqlite { path: PathBuf::from("data/visits.sqlite") }, config.store);
}

#[test]
fn server_config_defaults() {
    let config = ServerConfig::parse("metrics_port: 8081").unwrap();

    assert_eq!("0.0.0.0:8080".parse::<SocketAddr>().unwrap(), config.listen);
    assert_eq!(StoreConfig::Memory, config.store);
    assert_eq!(StoreConfig::DynamoDb, ServerConfig::parse("store:\n  type: dynamodb").unwrap().store);
}

#[test]
fn server_config_unknown_store() {
    match ServerConfig::parse("store:\n  type: redis") {
        Err(ConfigError::FailedToParse(_)) => {},
        other => panic!("expected parse error, got: {other:?}"),
    }
}

#[tokio::test]
async fn server_config_missing_file() {
    match ServerConfig::load(PathBuf::from("does/not/exist.yaml")).await {
        Err(ConfigError::FailedToRead(_)) => {},
        other => panic!("expected read error, got: {other:?}"),
    }
}

#[test]
fn counter_config_from_args() {
    let args = TestArgs::try_parse_from([
        "visits-counter",
        "--region", "us-east-1",
        "--table-name", "SiteVisits",
        "--allowed-origin", "https://d111111abcdef8.cloudfront.net",
    ]).unwrap();

    assert_eq!("us-east-1", args.counter.region);
    assert_eq!("SiteVisits", args.counter.table_name);
    assert_eq!("https://d111111abcdef8.cloudfront.net", args.counter.cors_policy().unwrap().allow_origin());
}

#[test]
fn counter_config_invalid_origin() {
    let config = CounterConfig {
        allowed_origin: "https://exa\nmple.com".to_owned(),
        ..CounterConfig::default()
    };
    match config.cors_policy() {
        Err(ConfigError::Cors(_)) => {},
        other => panic!("expected cors error, got: {other:?}"),
    }
}

#[tokio::test]
async fn sqlite_store_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let store_config = StoreConfig::Sqlite { path: dir.path().join("visits.sqlite") };

    let store = store_from_config(&store_config, &CounterConfig::default()).await.unwrap();
    assert_eq!(None, store.get("VisitsCounter").await.unwrap());
    assert!(dir.path().join("visits.sqlite").exists());
}

#[tokio::test]
async fn sqlite_path_is_relative_to_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("conf");
    std::fs::create_dir_all(config_dir.join("data")).unwrap();
    std::fs::write(
        config_dir.join("visits.yaml"),
        "store:\n  type: sqlite\n  path: data/visits.sqlite\n",
    ).unwrap();

    let config = ServerConfig::load(config_dir.join("visits.yaml")).await.unwrap();
    assert_eq!(Some(config_dir.join("visits.yaml")), config.config_path);
    assert_eq!(StoreConfig::Sqlite { path: config_dir.join("data/visits.sqlite") }, config.store);

    let store = store_from_config(&config.store, &CounterConfig::default()).await.unwrap();
    assert_eq!(None, store.get("VisitsCounter").await.unwrap());
    assert!(config_dir.join("data/visits.sqlite").exists());
}

#[tokio::test]
async fn absolute_sqlite_path_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("visits.sqlite");
    let config_file = dir.path().join("conf.yaml");
    std::fs::write(&config_file, format!("store:\n  type: sqlite\n  path: {}\n", database.display())).unwrap();

    let config = ServerConfig::load(config_file).await.unwrap();
    assert_eq!(StoreConfig::Sqlite { path: database }, config.store);
}
