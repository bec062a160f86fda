use std::{env, process};

use parvograph::{
    client::{CommandLineConfig, open_database, read_query, render_rows},
    errors::GraphDbError,
};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            eprint!("{}", CommandLineConfig::help());
            process::exit(2);
        }
    };

    let db = match open_database(&config) {
        Ok(db) => db,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };
    let text = match read_query(&config) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };

    if let Err(err) = run(&db, &text, &config) {
        eprintln!("query failed: {err}");
        process::exit(1);
    }
}

fn run(
    db: &parvograph::GraphDatabase,
    text: &str,
    config: &CommandLineConfig,
) -> Result<(), GraphDbError> {
    let rows = db.query_with_repeat(text, config.repeat)?;
    println!("{}", render_rows(&rows)?);
    if config.print_graph {
        println!("{}", db.graph_literal());
    }
    Ok(())
}
