mod simulate;

use std::io::Write;
use std::path::Path;
use std::{env, fs, fs::OpenOptions};
use vestige_config::VestigeConfig;
use vestige_keypair::{Keypair, TransactionSigner};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];

    match cmd.as_str() {
        "simulate" => {
            let config = match parse_simulate_args(&args[2..]) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            };
            match simulate::run_simulation(config).await {
                Ok(report) => match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("❌ Error rendering report: {}", e);
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    eprintln!("❌ Simulation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        "config" => {
            print!("{}", VestigeConfig::generate_sample());
        }
        "genkey" => {
            let filename = args.get(2).cloned();
            if let Err(e) = genkey(filename) {
                eprintln!("❌ Error generating key: {}", e);
                std::process::exit(1);
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Vestige CLI - Private Token Sale Toolkit");
    println!();
    println!("USAGE:");
    println!("  vestige <command> [args]");
    println!();
    println!("SALE COMMANDS:");
    println!("  simulate [options]         Run a full sale on a local two-layer cluster");
    println!();
    println!("ACCOUNT COMMANDS:");
    println!("  genkey [filename]          Generate new wallet keypair");
    println!();
    println!("OTHER COMMANDS:");
    println!("  config                     Print a sample config.toml");
    println!("  help                       Show this help message");
    println!();
    println!("SIMULATE OPTIONS:");
    println!("  --private                  Commit through the execution layer");
    println!("  --participants <n>         Number of participants (default: 5)");
    println!("  --spacing <secs>           Seconds between commits (default: 60)");
    println!();
    println!("EXAMPLES:");
    println!("  vestige simulate                     # Public sale");
    println!("  vestige simulate --private           # Private sale with sweeping");
    println!("  vestige simulate --participants 8    # Larger sale");
    println!("  vestige genkey                       # Generate keypair");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  VG_CONFIG                Path to config.toml");
    println!("  VG_PROPAGATION_DELAY_MS  Delegation propagation delay");
    println!("  VG_RETRY_MAX_ATTEMPTS    Attempts for transient failures");
    println!("  RUST_LOG                 Log level (debug/info/warn/error)");
}

fn parse_simulate_args(args: &[String]) -> anyhow::Result<simulate::SimulateConfig> {
    let mut config = simulate::SimulateConfig::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--private" => {
                config.private = true;
            }
            "--participants" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--participants needs a value"))?;
                config.participants = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid participant count: {}", value))?;
                i += 1;
            }
            "--spacing" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--spacing needs a value"))?;
                config.spacing_secs = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid spacing: {}", value))?;
                i += 1;
            }
            other => {
                log::warn!("Ignoring unknown option: {}", other);
            }
        }
        i += 1;
    }

    Ok(config)
}

fn genkey(filename: Option<String>) -> anyhow::Result<()> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;

    let config_dir = Path::new(&home).join(".vestige");

    let key_filename = filename.unwrap_or_else(|| "id.json".to_string());
    let key_path = config_dir.join(&key_filename);

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
        println!("📁 Created directory: {}", config_dir.display());

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&config_dir)?.permissions();
            perms.set_mode(0o700);
            fs::set_permissions(&config_dir, perms)?;
        }
    }

    if key_path.exists() {
        return Err(anyhow::anyhow!(
            "File {} already exists. Remove it first or use a different filename.",
            key_path.display()
        ));
    }

    println!("🔐 Generating new keypair...");
    let key = Keypair::new_random()?;
    let json = key.to_json()?;

    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&key_path)?;

    #[cfg(unix)]
    {
        let mut perms = f.metadata()?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&key_path, perms)?;
    }

    f.write_all(json.as_bytes())?;

    println!("✅ Wrote new keypair to {}", key_path.display());
    println!("🔑 Identity: {}", key.pubkey());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_simulate_args() {
        let config =
            parse_simulate_args(&args(&["--private", "--participants", "8", "--spacing", "5"]))
                .unwrap();
        assert!(config.private);
        assert_eq!(config.participants, 8);
        assert_eq!(config.spacing_secs, 5);

        let config = parse_simulate_args(&[]).unwrap();
        assert!(!config.private);
        assert_eq!(config.participants, 5);
    }

    #[test]
    fn test_parse_simulate_args_rejects_bad_values() {
        assert!(parse_simulate_args(&args(&["--participants", "many"])).is_err());
        assert!(parse_simulate_args(&args(&["--spacing"])).is_err());
    }
}
