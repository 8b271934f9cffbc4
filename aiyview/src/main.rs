use aiyview::{
    init_logging, parse_video_size, LiveViewer, ViewerConfig, ViewerEvent, DEFAULT_DIRECTIVE,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "aiyview", about = "Watch an AIY Vision Kit camera with its detections drawn on top")]
struct Args {
    /// Location of the page served by the kit, e.g. http://raspberrypi.local:4664/.
    /// Takes precedence over --host
    #[arg(long, env = "AIYVIEW_LOCATION")]
    location: Option<String>,
    /// Host running the uv4l server
    #[arg(long, env = "AIYVIEW_HOST")]
    host: Option<String>,
    /// Signaling port
    #[arg(long, default_value_t = aiyview::SIGNALING_PORT)]
    port: u16,
    /// Use wss for the control channel
    #[arg(long)]
    secure: bool,
    /// Intrinsic size of the remote video, WIDTHxHEIGHT
    #[arg(long)]
    video_size: Option<String>,
    /// Write the overlay to this SVG file whenever it changes
    #[arg(long)]
    svg_out: Option<PathBuf>,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = DEFAULT_DIRECTIVE)]
    log_level: String,
}

fn build_config(args: &Args) -> Result<ViewerConfig> {
    let mut config = match (&args.location, &args.host) {
        (Some(location), _) => ViewerConfig::from_location(location)?,
        (None, Some(host)) => ViewerConfig::for_host(host.as_str()),
        (None, None) => bail!("either --location or --host is required"),
    };

    config.port = args.port;
    config.secure |= args.secure;
    if let Some(size) = &args.video_size {
        config.video_size = parse_video_size(size)?;
    }
    config.svg_output = args.svg_out.clone();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let config = build_config(&args)?;
    let signaling_url = config.signaling_url();
    let mut viewer = LiveViewer::connect(config)
        .await
        .with_context(|| format!("failed to connect to {}", signaling_url))?;

    if let Some(mut events) = viewer.events() {
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match &event {
                    ViewerEvent::NegotiationFailed { reason } => warn!("Negotiation failed: {}", reason),
                    ViewerEvent::Error { error, .. } => warn!("{}", error),
                    ViewerEvent::DetectionsRendered { .. } | ViewerEvent::OverlayCleared => {}
                    other => info!("{:?}", other),
                }
            }
        });
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Ctrl-C received, hanging up");
    };

    let stats = viewer.run(shutdown).await?;
    info!(
        "Session ended: {} detections rendered, {} stale clears",
        stats.detections_rendered, stats.stale_clears
    );
    Ok(())
}
