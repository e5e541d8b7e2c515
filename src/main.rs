use healthscan::intake::StillImageSource;
use healthscan::{AppError, Configuration, CoordinatorBuilder, CoordinatorCommand};
use tracing::{info, warn, Level};

fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let path = std::env::args().nth(1);
    let configuration = Configuration::load(path.as_deref())?;
    init_logging(&configuration.logging.level);

    let demo_image = configuration.scheduler.demo_image.clone().ok_or_else(|| {
        AppError::Coordinator("scheduler.demo_image must point at a still frame".to_string())
    })?;
    let frame_source = StillImageSource::open(&demo_image)?;
    info!("Scanning {} every {:?}", demo_image, configuration.scheduler.tick());

    let voice_enabled = configuration.gate.voice_enabled;
    let coordinator = CoordinatorBuilder::new(configuration)
        .frame_source(Box::new(frame_source))
        .build()?;
    if voice_enabled {
        // No page to click on the command line; treat startup as the interaction.
        coordinator.send(CoordinatorCommand::UserInteracted).await?;
    }

    let mut snapshots = coordinator.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                match serde_json::to_string(&snapshot) {
                    Ok(json) => info!("{}", json),
                    Err(e) => warn!("Could not serialize snapshot: {}", e),
                }
            }
        }
    }

    coordinator.stop();
    Ok(())
}
