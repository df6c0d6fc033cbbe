use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Arg, Command};
use log::LevelFilter;

use mailwarden::classifier::ClassifierFacade;
use mailwarden::config;
use mailwarden::monitor::Monitor;
use mailwarden::normalizer::EmailNormalizer;
use mailwarden::source::{DemoSource, EmailSource, SpoolSource};
use mailwarden::store::SqliteStore;

#[tokio::main]
async fn main() {
    let matches = Command::new("mailwarden")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing email detection and monitoring daemon")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/mailwarden.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-email")
                .long("test-email")
                .value_name("FILE")
                .help("Classify a single raw email file and print the verdict")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Run the monitor against simulated messages")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("spool")
                .long("spool")
                .value_name("DIR")
                .help("Monitor .eml files dropped into a spool directory")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .value_name("ID")
                .help("User identity recorded against processed messages")
                .default_value("local"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        match config::generate_default_config(path) {
            Ok(()) => {
                println!("Generated default configuration: {path}");
                return;
            }
            Err(e) => {
                eprintln!("Failed to generate config: {e:#}");
                process::exit(1);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = config::load_config_or_default(config_path);

    let classifier = Arc::new(ClassifierFacade::new(Path::new(&config.model.artifact_dir)));

    if let Some(file) = matches.get_one::<String>("test-email") {
        if let Err(e) = test_email(&classifier, file) {
            eprintln!("Failed to classify {file}: {e:#}");
            process::exit(1);
        }
        return;
    }

    let source: Box<dyn EmailSource> = if matches.get_flag("demo") {
        Box::new(DemoSource::new())
    } else if let Some(dir) = matches.get_one::<String>("spool") {
        Box::new(SpoolSource::new(dir.clone()))
    } else {
        eprintln!("Nothing to do: pass --demo, --spool DIR, or --test-email FILE");
        process::exit(2);
    };

    let store = match SqliteStore::open(&config.database.path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Failed to open database {}: {e}", config.database.path);
            process::exit(1);
        }
    };

    let monitor = Monitor::new(
        classifier,
        store,
        Duration::from_secs(config.monitor.poll_interval_seconds),
    );
    let user = matches.get_one::<String>("user").unwrap();
    monitor.start(user, source);

    log::info!("press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
    }
    monitor.stop().await;
}

fn test_email(classifier: &ClassifierFacade, path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read(path).with_context(|| format!("reading {path}"))?;
    let normalizer = EmailNormalizer::new();
    let (subject, body) = normalizer.normalize(&raw);
    let verdict = classifier.classify(&subject, &body);

    println!("Subject:     {subject}");
    println!("Body chars:  {}", body.chars().count());
    println!(
        "Verdict:     {} (probability {:.2})",
        if verdict.is_phishing {
            "PHISHING"
        } else {
            "legitimate"
        },
        verdict.probability
    );
    Ok(())
}
