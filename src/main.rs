//! Compose Setup Wizard - Docker Compose 部署向导后端
//!
//! Usage:
//! - Normal mode: `compose-setup-wizard`
//! - With custom port: `compose-setup-wizard --port 8080`
//! - With custom workspace: `compose-setup-wizard --workspace /srv/app`

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use compose_setup_wizard::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--workspace" if i + 1 < args.len() => {
                config.workspace_override = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Compose Setup Wizard - Docker Compose 部署向导");
    println!();
    println!("USAGE:");
    println!("    compose-setup-wizard [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>         Override the listening port");
    println!("    --workspace <DIR>     Override the workspace directory");
    println!("    -h, --help            Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    HOST, PORT, WORKSPACE_DIR, PUBLIC_DIR, TEMPLATES_DIR, SETUP_TOKEN,");
    println!("    COMPOSE_PROGRAM, OIDC_PROBE_TIMEOUT_SECS, DNS_TIMEOUT_SECS, RUST_LOG");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    compose_setup_wizard::run(config).await
}
