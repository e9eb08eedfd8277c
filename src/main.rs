use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use snapcam::platform::synthetic::{SyntheticDevice, SyntheticPlatform};
use snapcam::{
    AcquireOutcome, CameraSession, DeviceRegistry, FacingMode, PlatformCapabilities,
    SnapcamConfig, Size,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "snapcam")]
#[command(about = "Camera session core with aspect-matched photo capture")]
#[command(version)]
#[command(long_about = "Drives a camera session (device enumeration, stream lifecycle, \
camera switching and center-cropped photo capture) against a synthetic camera platform. \
Useful for checking configuration and observing session behaviour without hardware.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "snapcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the cameras of the synthetic platform
    Devices {
        /// Number of synthetic cameras
        #[arg(long, default_value_t = 2)]
        cameras: usize,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a session, take photos and print what would be handed to the host
    Snap {
        /// Number of synthetic cameras
        #[arg(long, default_value_t = 2)]
        cameras: usize,

        /// Photos to take
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Preview container size the photos are cropped to
        #[arg(long, value_name = "WxH", default_value = "400x800")]
        container: Size,

        /// Switch camera between photos
        #[arg(long)]
        switch: bool,

        /// Include each photo as a data URL
        #[arg(long)]
        data_urls: bool,
    },
}

#[derive(Serialize)]
struct ImageSummary {
    index: usize,
    width: u32,
    height: u32,
    bytes: usize,
    mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_url: Option<String>,
}

#[derive(Serialize)]
struct SnapSummary {
    cameras: usize,
    container: String,
    final_selector: Option<String>,
    guidance: Vec<snapcam::Guidance>,
    images: Vec<ImageSummary>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting snapcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match SnapcamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    match args.command {
        Some(Command::Devices { cameras, json }) => list_devices(cameras, json).await,
        Some(Command::Snap {
            cameras,
            count,
            container,
            switch,
            data_urls,
        }) => snap(config, cameras, count, container, switch, data_urls).await,
        None => {
            println!("Nothing to do. Try `snapcam snap` or `snapcam devices`.");
            Ok(())
        }
    }
}

/// Synthetic cameras: a front one, a rear one, then external webcams
fn demo_platform(cameras: usize) -> Arc<SyntheticPlatform> {
    let devices = (0..cameras)
        .map(|i| match i {
            0 => SyntheticDevice::new("front", "Front Camera")
                .with_facing(FacingMode::User)
                .with_resolution(Size::new(1280, 720)),
            1 => SyntheticDevice::new("back", "Back Camera")
                .with_facing(FacingMode::Environment)
                .with_resolution(Size::new(1920, 1080)),
            n => SyntheticDevice::new(format!("external-{}", n - 1), format!("USB Camera {}", n - 1))
                .with_resolution(Size::new(640, 480)),
        })
        .collect();
    Arc::new(SyntheticPlatform::new(devices))
}

async fn list_devices(cameras: usize, json: bool) -> Result<()> {
    let platform = demo_platform(cameras);
    platform.grant_labels();

    let registry = DeviceRegistry::new();
    let devices = registry
        .refresh(&PlatformCapabilities::available(platform))
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else {
        println!("{:<16} {}", "ID", "LABEL");
        for device in &devices {
            println!("{:<16} {}", device.id, device.label);
        }
    }
    Ok(())
}

async fn snap(
    config: SnapcamConfig,
    cameras: usize,
    count: usize,
    container: Size,
    switch: bool,
    data_urls: bool,
) -> Result<()> {
    let platform = demo_platform(cameras);
    let session = CameraSession::builder()
        .config(config)
        .capabilities(PlatformCapabilities::available(platform))
        .container_size(container)
        .on_first_frame(|| info!("Live preview is showing frames"))
        .on_device_count(|n| info!("{} camera(s) available", n))
        .build()
        .context("Failed to build camera session")?;

    let outcome = session.mount().await;
    if let AcquireOutcome::Acquired { stream_id } = &outcome {
        info!("Preview bound to stream {}", stream_id);
        session.notify_frame_ready();
    }

    for shot in 0..count {
        if switch && shot > 0 {
            if let Err(e) = session.switch_device().await {
                warn!("{}", e);
            }
            session.notify_frame_ready();
        }
        match session.capture_and_add() {
            Ok(Some(image)) => info!("Photo {} taken ({}x{})", shot + 1, image.width(), image.height()),
            Ok(None) => warn!("Photo {} skipped, camera not ready", shot + 1),
            Err(e) => {
                warn!("Photo {} failed: {}", shot + 1, e);
                break;
            }
        }
    }

    let cameras = session.device_count();
    let final_selector = session.active_selector().map(|s| s.to_string());
    let guidance = session.guidance();
    let images = session.finish();

    let summary = SnapSummary {
        cameras,
        container: container.to_string(),
        final_selector,
        guidance,
        images: images
            .iter()
            .enumerate()
            .map(|(index, image)| ImageSummary {
                index,
                width: image.width(),
                height: image.height(),
                bytes: image.len(),
                mime_type: image.mime_type(),
                data_url: data_urls.then(|| image.to_data_url()),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Logs go to stderr so stdout stays parseable
fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("snapcam={}", log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let installed = match args.log_format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.compact().with_target(args.debug).try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Snapcam Configuration File");
    println!("# Every option with its default value. Environment variables override");
    println!("# file values, e.g. SNAPCAM__CAPTURE__JPEG_QUALITY=80");
    println!();
    print!("{}", SnapcamConfig::default().to_toml_string()?);
    Ok(())
}
