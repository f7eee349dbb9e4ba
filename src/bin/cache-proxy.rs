use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use cache_proxy::{
    AppConfig, Cache, CacheProxy, CacheStorage, DiskStorage, HttpNetwork, MemoryStorage,
};

fn print_usage() {
    eprintln!("Usage: cache-proxy [COMMAND] [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  serve               Install, then serve the proxy over HTTP (default)");
    eprintln!("  install             Warm the cache once and exit");
    eprintln!("  list                Print the keys stored in the cache");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>     Config file (default: ~/.config/cache-proxy/config.toml)");
    eprintln!("  --origin <URL>      Origin the warm set and requests resolve against");
    eprintln!("  --cache-dir <DIR>   Directory holding cache files");
    eprintln!("  --memory            Keep caches in memory only");
    eprintln!("  --host <HOST>       Bind address for serve (default: 127.0.0.1)");
    eprintln!("  --port <PORT>       Bind port for serve (default: 8080)");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Set RUST_LOG=debug to see cache hits and misses.");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Install,
    List,
}

#[derive(Debug)]
struct Args {
    command: Command,
    config_path: PathBuf,
    origin: Option<String>,
    cache_dir: Option<PathBuf>,
    memory: bool,
    host: Option<String>,
    port: Option<u16>,
    help: bool,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        command: Command::Serve,
        config_path: AppConfig::default_path(),
        origin: None,
        cache_dir: None,
        memory: false,
        host: None,
        port: None,
        help: false,
    };
    let mut command_seen = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--config" => parsed.config_path = PathBuf::from(value("--config")?),
            "--origin" => parsed.origin = Some(value("--origin")?),
            "--cache-dir" => parsed.cache_dir = Some(PathBuf::from(value("--cache-dir")?)),
            "--memory" => parsed.memory = true,
            "--host" => parsed.host = Some(value("--host")?),
            "--port" => {
                let port = value("--port")?;
                parsed.port = Some(
                    port.parse()
                        .map_err(|_| format!("invalid port: {port}"))?,
                );
            }
            "serve" | "install" | "list" if !command_seen => {
                command_seen = true;
                parsed.command = match arg.as_str() {
                    "install" => Command::Install,
                    "list" => Command::List,
                    _ => Command::Serve,
                };
            }
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    Ok(parsed)
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(origin) = &args.origin {
        config.proxy.origin.clone_from(origin);
    }
    if let Some(dir) = &args.cache_dir {
        config.storage.cache_dir.clone_from(dir);
    }
    if args.memory {
        config.storage.in_memory = true;
    }
    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
}

async fn run<S: CacheStorage + 'static>(
    storage: S,
    command: Command,
    config: AppConfig,
) -> cache_proxy::Result<()> {
    if command == Command::List {
        let cache = storage.open(&config.proxy.cache_name).await?;
        for key in cache.keys().await? {
            println!("{key}");
        }
        return Ok(());
    }

    let proxy = Arc::new(CacheProxy::new(
        storage,
        HttpNetwork::build()?,
        config.proxy,
    ));
    let report = proxy.install().await?;

    match command {
        Command::Install => {
            for key in &report.stored {
                println!("{key}");
            }
            Ok(())
        }
        _ => cache_proxy::host::run_server(proxy, &config.server.host, config.server.port).await,
    }
}

#[tokio::main]
async fn main() -> cache_proxy::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("Error: {msg}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };
    if args.help {
        print_usage();
        return Ok(());
    }

    let mut config = AppConfig::load(&args.config_path)?;
    apply_overrides(&mut config, &args);

    if config.storage.in_memory {
        log::info!("Using in-memory cache storage");
        run(MemoryStorage::new(), args.command, config).await
    } else {
        log::info!("Using cache directory {}", config.storage.cache_dir.display());
        let storage = DiskStorage::new(config.storage.cache_dir.clone());
        run(storage, args.command, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn defaults_to_serve() {
        let parsed = parse_args(&[]).unwrap();
        assert_eq!(parsed.command, Command::Serve);
        assert!(!parsed.memory);
        assert!(!parsed.help);
    }

    #[test]
    fn parses_command_and_flags() {
        let parsed = parse_args(&args(&[
            "install",
            "--origin",
            "https://videos.example/",
            "--memory",
            "--port",
            "9000",
        ]))
        .unwrap();
        assert_eq!(parsed.command, Command::Install);
        assert_eq!(parsed.origin.as_deref(), Some("https://videos.example/"));
        assert!(parsed.memory);
        assert_eq!(parsed.port, Some(9000));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args(&["--port"])).is_err());
        assert!(parse_args(&args(&["--port", "http"])).is_err());
        assert!(parse_args(&args(&["list", "install"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let parsed = parse_args(&args(&["--cache-dir", "/tmp/c", "--host", "0.0.0.0"])).unwrap();
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &parsed);
        assert_eq!(config.storage.cache_dir, PathBuf::from("/tmp/c"));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.proxy.cache_name, "video-downloader-cache");
    }
}
