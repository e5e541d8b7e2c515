use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::Configuration,
    error::{AppError, RemoteError},
    intake::{BarcodeReader, Connectivity, FrameSource, NoBarcode, SharedConnectivity},
    network::EnrichmentClient,
    output::{TracingVoice, VoiceOutput},
    pipeline::{FrameSampler, RawFrame, ScoreEvent, ScoreSnapshot, ScoringCore},
};

const COMMAND_BUFFER_SIZE: usize = 16;
const EVENT_BUFFER_SIZE: usize = 64;

/// A settled remote call, tagged with the remote generation it was started in.
type RemoteResult = (u64, Result<Value, RemoteError>);

/// User and platform signals fed into the running scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorCommand {
    /// The user interacted with the page, so audio playback is now permitted.
    UserInteracted,
    SetVoice(bool),
    SetRemote(bool),
    Reset,
}

pub struct Coordinator {
    scan_task: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
    command_tx: mpsc::Sender<CoordinatorCommand>,
    snapshot_rx: watch::Receiver<ScoreSnapshot>,
    event_tx: broadcast::Sender<ScoreEvent>,
}

impl Coordinator {
    pub fn subscribe(&self) -> watch::Receiver<ScoreSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Every `ScoreEvent` emitted after this call. Slow receivers see `Lagged`.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ScoreEvent> {
        self.event_tx.subscribe()
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub async fn send(&self, command: CoordinatorCommand) -> Result<(), AppError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::Coordinator(format!("scan loop is gone: {}", e)))
    }

    pub fn is_finished(&self) -> bool {
        self.scan_task.is_finished()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the tick mutates. Lives on a single task, so no locking is needed.
struct ScanLoop {
    core: ScoringCore,
    sampler: FrameSampler,
    frame_source: Box<dyn FrameSource>,
    barcode_reader: Box<dyn BarcodeReader>,
    voice: Box<dyn VoiceOutput>,
    connectivity: Arc<dyn Connectivity>,
    enrichment: Option<EnrichmentClient>,
    /// Bumped whenever remote output must no longer land (remote disabled, reset).
    remote_generation: u64,
    source_error: Option<String>,
    snapshot_tx: watch::Sender<ScoreSnapshot>,
    event_tx: broadcast::Sender<ScoreEvent>,
    result_tx: mpsc::Sender<RemoteResult>,
    cancel_token: CancellationToken,
}

impl ScanLoop {
    async fn run(
        mut self,
        tick: Duration,
        mut command_rx: mpsc::Receiver<CoordinatorCommand>,
        mut result_rx: mpsc::Receiver<RemoteResult>,
    ) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);
        info!("Scan loop started, tick every {:?}", tick);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    debug!("Scan loop received shutdown");
                    break;
                }
                Some(command) = command_rx.recv() => self.handle_command(command),
                Some((generation, result)) = result_rx.recv() => {
                    self.merge_remote(generation, result)
                }
                Some(_) = ticks.next() => self.tick(),
            }
        }
        info!("Scan loop finished");
    }

    fn tick(&mut self) {
        let frame = match self.frame_source.next_frame() {
            Ok(frame) => {
                self.set_source_error(None);
                match frame {
                    Some(frame) => frame,
                    None => return,
                }
            }
            Err(e) => {
                warn!("Frame acquisition failed, retrying next tick: {}", e);
                self.set_source_error(Some(e.to_string()));
                return;
            }
        };
        let Some(sample) = self.sampler.sample(&frame.image) else {
            debug!("Skipping empty frame {}", frame.id);
            return;
        };

        let outcome = self.core.tick(&sample);
        for event in outcome.events {
            if let ScoreEvent::Announce(score) = event {
                self.voice.announce(score);
            }
            self.emit(event);
        }

        self.start_remote(&frame);
        self.publish();
    }

    fn set_source_error(&mut self, error: Option<String>) {
        if self.source_error != error {
            self.source_error = error;
            self.publish();
        }
    }

    fn start_remote(&mut self, frame: &RawFrame) {
        let Some(client) = self.enrichment.as_mut() else {
            return;
        };
        let online = self.connectivity.is_online();
        let now = Instant::now();
        if !client.should_start(now, online) {
            return;
        }
        let barcode = self.barcode_reader.read(frame);
        let Some(call) = client.try_begin(frame, barcode, now, online) else {
            return;
        };

        let generation = self.remote_generation;
        let result_tx = self.result_tx.clone();
        let cancel_token = self.cancel_token.clone();
        tokio::spawn(async move {
            let result = call.send().await;
            if cancel_token.is_cancelled() {
                debug!("Discarding remote result after shutdown");
                return;
            }
            let _ = result_tx.send((generation, result)).await;
        });
    }

    fn merge_remote(&mut self, generation: u64, result: Result<Value, RemoteError>) {
        // The view may have been torn down while the call was in flight.
        if self.cancel_token.is_cancelled() {
            return;
        }
        let Some(client) = self.enrichment.as_mut() else {
            return;
        };
        // Always settle the call so the pending flag and backoff stay accurate.
        let verdict = client.complete(result);
        let current = client.is_enabled() && generation == self.remote_generation;
        match verdict {
            Some(response) if current => {
                let event = self.core.apply_remote(&response);
                self.emit(event);
            }
            Some(response) => {
                debug!("Dropping stale verdict from {}", response.model);
            }
            None => {}
        }
        self.publish();
    }

    fn handle_command(&mut self, command: CoordinatorCommand) {
        debug!("Handling command {:?}", command);
        match command {
            CoordinatorCommand::UserInteracted => self.core.mark_user_interaction(),
            CoordinatorCommand::SetVoice(enabled) => self.core.set_voice_enabled(enabled),
            CoordinatorCommand::SetRemote(enabled) => match self.enrichment.as_mut() {
                Some(client) => {
                    client.set_enabled(enabled);
                    if !enabled {
                        self.remote_generation += 1;
                        self.core.clear_remote();
                    }
                }
                None => warn!("Remote enrichment is not configured"),
            },
            CoordinatorCommand::Reset => {
                self.remote_generation += 1;
                self.core.reset();
            }
        }
        self.publish();
    }

    fn emit(&self, event: ScoreEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    fn publish(&self) {
        let remote = self
            .enrichment
            .as_ref()
            .map(|client| client.status())
            .unwrap_or_default();
        self.snapshot_tx.send_replace(ScoreSnapshot {
            state: self.core.snapshot(),
            remote,
            source_error: self.source_error.clone(),
        });
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    frame_source: Option<Box<dyn FrameSource>>,
    barcode_reader: Box<dyn BarcodeReader>,
    voice: Box<dyn VoiceOutput>,
    connectivity: Arc<dyn Connectivity>,
    enrichment: Option<EnrichmentClient>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            frame_source: None,
            barcode_reader: Box::new(NoBarcode),
            voice: Box::new(TracingVoice),
            connectivity: Arc::new(SharedConnectivity::default()),
            enrichment: None,
        }
    }

    pub fn frame_source(mut self, frame_source: Box<dyn FrameSource>) -> Self {
        self.frame_source = Some(frame_source);
        self
    }

    pub fn barcode_reader(mut self, barcode_reader: Box<dyn BarcodeReader>) -> Self {
        self.barcode_reader = barcode_reader;
        self
    }

    pub fn voice_output(mut self, voice: Box<dyn VoiceOutput>) -> Self {
        self.voice = voice;
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    // Overrides the HTTP client built from `remote` configuration.
    pub fn enrichment_client(mut self, client: EnrichmentClient) -> Self {
        self.enrichment = Some(client);
        self
    }

    /// Spawns the scan loop; must be called inside a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let frame_source = self
            .frame_source
            .ok_or(AppError::Coordinator("Frame source not set".to_string()))?;
        let enrichment = match self.enrichment {
            Some(client) => Some(client),
            None if self.configuration.remote.enabled => {
                Some(EnrichmentClient::from_config(&self.configuration.remote)?)
            }
            None => None,
        };

        let cancel_token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let (result_tx, result_rx) = mpsc::channel(1);
        let (snapshot_tx, snapshot_rx) = watch::channel(ScoreSnapshot::default());
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER_SIZE);

        let scan_loop = ScanLoop {
            core: ScoringCore::new(&self.configuration),
            sampler: FrameSampler::from_config(&self.configuration.sampling),
            frame_source,
            barcode_reader: self.barcode_reader,
            voice: self.voice,
            connectivity: self.connectivity,
            enrichment,
            remote_generation: 0,
            source_error: None,
            snapshot_tx,
            event_tx: event_tx.clone(),
            result_tx,
            cancel_token: cancel_token.clone(),
        };
        let scan_task = tokio::spawn(scan_loop.run(
            self.configuration.scheduler.tick(),
            command_rx,
            result_rx,
        ));

        Ok(Coordinator {
            scan_task,
            cancel_token,
            command_tx,
            snapshot_rx,
            event_tx,
        })
    }
}
