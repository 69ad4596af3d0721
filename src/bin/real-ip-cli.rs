use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use real_ip::config::{load_config, RetrieverConfig};
use real_ip::retrieval::{address_chain, Retriever, Strategy};

#[derive(Parser)]
#[command(name = "real-ip-cli")]
#[command(about = "Resolve a client address from forwarding header values", long_about = None)]
struct Cli {
    /// Forwarding header the values belong to.
    #[arg(long, default_value = "X-Forwarded-For")]
    header: String,

    /// Trust rule: direct, proxy-count or proxy-cidr.
    #[arg(short, long, default_value = "direct")]
    strategy: Strategy,

    /// Number of trusted proxies (proxy-count).
    #[arg(long, allow_negative_numbers = true)]
    proxy_count: Option<i64>,

    /// Proxy network, repeatable (proxy-cidr).
    #[arg(long = "cidr")]
    cidrs: Vec<String>,

    /// Take the retriever section from a config file instead of the flags above.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// One header value, repeatable; order is preserved.
    #[arg(short, long = "value")]
    values: Vec<String>,
}

#[derive(Serialize)]
struct Resolution {
    header: String,
    strategy: Strategy,
    chain: Vec<String>,
    real_ip: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let retriever_config = match &cli.config {
        Some(path) => load_config(path)?.retriever,
        None => RetrieverConfig {
            header: cli.header.clone(),
            strategy: cli.strategy,
            proxy_count: cli.proxy_count,
            proxy_cidrs: cli.cidrs.clone(),
            ..RetrieverConfig::default()
        },
    };
    let retriever = Retriever::from_config(&retriever_config)?;

    let headers: Vec<(String, String)> = cli
        .values
        .iter()
        .map(|value| (retriever.header_name().to_string(), value.clone()))
        .collect();
    let real_ip = retriever.retrieve(&headers);

    if cli.json {
        let resolution = Resolution {
            header: retriever.header_name().to_string(),
            strategy: retriever.strategy(),
            chain: address_chain(&headers, retriever.header_name())
                .iter()
                .map(ToString::to_string)
                .collect(),
            real_ip: real_ip.map(|ip| ip.to_string()),
        };
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        match real_ip {
            Some(ip) => println!("{}", ip),
            None => println!("absent"),
        }
    }

    Ok(())
}
