use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};

use esdsl::{config, server, sql};

#[derive(Parser)]
#[command(name = "esdsl")]
#[command(about = "Translates a restricted SQL dialect into Elasticsearch Query DSL")]
struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = "cfg.json")]
    config: PathBuf,

    /// Print version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Compile a single statement, print the result envelope, and exit
    #[arg(short = 's', long = "sql")]
    sql: Option<String>,

    /// Pretty-print the envelope with two-space indent
    #[arg(short = 'p', long = "pretty")]
    pretty: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.version {
        println!("{}", sql::VERSION);
        return;
    }

    // One-shot mode: compile errors are part of the envelope, not a
    // process failure.
    if let Some(input) = cli.sql {
        let envelope = server::make_envelope(&input);
        let rendered = if cli.pretty {
            serde_json::to_string_pretty(&envelope)
        } else {
            serde_json::to_string(&envelope)
        };
        match rendered {
            Ok(out) => println!("{}", out),
            Err(err) => {
                error!("failed to render envelope: {}", err);
                process::exit(1);
            }
        }
        return;
    }

    let cfg = match config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("config {}: {}", cli.config.display(), err);
            process::exit(1);
        }
    };
    info!("loaded config: {}", cfg);

    if cfg.http.enabled && !cfg.http.listen.is_empty() {
        if let Err(err) = server::serve(&cfg.http.listen).await {
            error!("http server: {}", err);
            process::exit(1);
        }
    } else {
        info!("http disabled, nothing to do");
    }
}
