use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use camera_web::{run_server, AppState, ServerConfig};
use device_store::{DeviceRecord, DeviceStore, UserStore};

#[derive(Parser)]
#[command(name = "watchpost")]
#[command(about = "Camera surveillance server: live preview, recording, snapshots")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "watchpost.toml")]
    config: PathBuf,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<String>,

    /// Create or update an account, then exit
    #[arg(long, value_name = "NAME:PASSWORD")]
    add_user: Option<String>,

    /// Device ids granted to --add-user, comma separated
    #[arg(long, value_delimiter = ',')]
    devices: Vec<String>,

    /// Register a camera, then exit
    #[arg(long, value_name = "ID:NAME:RTSP_URL")]
    add_device: Option<String>,

    /// Remove a camera from the inventory, then exit
    #[arg(long, value_name = "ID")]
    remove_device: Option<String>,

    /// Print the camera inventory, then exit
    #[arg(long)]
    list_devices: bool,

    /// Write the effective config to the config path and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ServerConfig::load_or_default(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    if cli.write_config {
        config.save(&cli.config)?;
        println!("Wrote {}", cli.config.display());
        return Ok(());
    }
    if let Some(spec) = cli.add_user.as_deref() {
        return add_user(&config, spec, cli.devices).await;
    }
    if let Some(spec) = cli.add_device.as_deref() {
        return add_device(&config, spec).await;
    }
    if let Some(id) = cli.remove_device.as_deref() {
        return remove_device(&config, id).await;
    }
    if cli.list_devices {
        return list_devices(&config).await;
    }

    println!();
    println!("~ WATCHPOST - Camera Surveillance Server ~");
    println!();

    let state = Arc::new(AppState::from_config(config).await?);
    state.library.ensure_dirs().await?;

    println!("Records:   {}", state.config.records_dir.display());
    println!("Snapshots: {}", state.config.snapshots_dir.display());
    println!("Web interface at http://{}", state.config.listen);
    println!();
    println!("Service running. Press Ctrl+C to stop.");
    println!();

    let mut sigint =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => println!("\nReceived SIGINT, shutting down..."),
            _ = sigterm.recv() => println!("\nReceived SIGTERM, shutting down..."),
        }
    };

    run_server(state, shutdown).await?;

    println!("Shutdown complete.");
    Ok(())
}

/// `--add-user NAME:PASSWORD [--devices cam1,cam2]`
async fn add_user(config: &ServerConfig, spec: &str, devices: Vec<String>) -> Result<()> {
    let Some((name, password)) = spec.split_once(':') else {
        bail!("expected NAME:PASSWORD, got {spec:?}");
    };
    if name.is_empty() || password.is_empty() {
        bail!("expected NAME:PASSWORD, got {spec:?}");
    }

    let mut users = UserStore::load(&config.auth.users_file).await?;
    users.upsert(name, password, devices).await?;
    println!("User '{}' saved to {}", name, config.auth.users_file.display());
    Ok(())
}

/// `--add-device ID:NAME:RTSP_URL` (the URL may itself contain colons)
async fn add_device(config: &ServerConfig, spec: &str) -> Result<()> {
    let mut parts = spec.splitn(3, ':');
    let (Some(id), Some(name), Some(rtsp_url)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("expected ID:NAME:RTSP_URL, got {spec:?}");
    };
    if id.is_empty() || name.is_empty() || rtsp_url.is_empty() {
        bail!("expected ID:NAME:RTSP_URL, got {spec:?}");
    }

    let mut devices = DeviceStore::load(&config.store.devices_file).await?;
    devices
        .upsert(
            id,
            DeviceRecord {
                name: name.to_string(),
                rtsp_url: rtsp_url.to_string(),
            },
        )
        .await?;
    println!("Device '{}' saved to {}", id, config.store.devices_file.display());
    Ok(())
}

async fn remove_device(config: &ServerConfig, id: &str) -> Result<()> {
    let mut devices = DeviceStore::load(&config.store.devices_file).await?;
    if devices.remove(id).await? {
        println!("Device '{id}' removed");
    } else {
        println!("Device '{id}' not found");
    }
    Ok(())
}

async fn list_devices(config: &ServerConfig) -> Result<()> {
    let devices = DeviceStore::load(&config.store.devices_file).await?;
    let all = devices.list();
    if all.is_empty() {
        println!("No devices registered.");
        return Ok(());
    }
    for (id, record) in all {
        println!("  {} - {} ({})", id, record.name, record.rtsp_url);
    }
    Ok(())
}
