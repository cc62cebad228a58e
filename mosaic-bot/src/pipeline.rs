//! Per-request orchestration: generate, compose, deliver.
//!
//! Each trigger event runs one pipeline to completion inside its own
//! supervised task. A failed stage downgrades the delivery to a failure
//! notice; nothing a pipeline does can unwind into the event loop.

use std::sync::Arc;

use mosaic_sdk::client::PlatformHandle;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::compose;
use crate::deliver;
use crate::generation::{CancelSignal, GenerationClient};

const BUSY_TEXT: &str = "I'm swamped right now - give me a minute and try again";

pub struct Pipeline {
    client: GenerationClient,
    cancel: CancelSignal,
    in_flight: Arc<Semaphore>,
    max_in_flight: usize,
}

impl Pipeline {
    pub fn new(client: GenerationClient, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            client,
            cancel: CancelSignal::new(),
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Signal handed to in-flight generations; set it on shutdown to stop
    /// further retry attempts.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Run the full sequence for one request. Generation or composition
    /// failure turns into a failure notice; delivery errors stay inside
    /// the delivery layer.
    pub async fn run(&self, handle: &PlatformHandle, channel_id: &str, prompt: &str) {
        let caption = format!("\"{prompt}\"");
        let composite = self.produce(channel_id, prompt).await;
        deliver::deliver(handle, channel_id, composite, &caption, prompt).await;
    }

    async fn produce(&self, channel_id: &str, prompt: &str) -> Option<Vec<u8>> {
        let response = match self.client.generate(prompt, &self.cancel).await {
            Ok(response) => response,
            Err(err) => {
                warn!(channel = channel_id, prompt, error = %err, "generation failed");
                return None;
            }
        };

        match compose::compose(&response.images) {
            Ok(bytes) => {
                info!(
                    channel = channel_id,
                    prompt,
                    bytes = bytes.len(),
                    "composite assembled"
                );
                Some(bytes)
            }
            Err(err) => {
                warn!(channel = channel_id, prompt, error = %err, "composition failed");
                None
            }
        }
    }

    /// Fire-and-forget execution for one trigger event. The caller returns
    /// immediately; the pipeline holds an in-flight permit for its whole
    /// run. When the bound is saturated the request is dropped with a
    /// busy reply instead of queueing.
    pub fn spawn(self: &Arc<Self>, handle: PlatformHandle, channel_id: String, prompt: String) {
        match self.in_flight.clone().try_acquire_owned() {
            Ok(permit) => {
                let pipeline = Arc::clone(self);
                tokio::spawn(async move {
                    let _permit = permit;
                    pipeline.run(&handle, &channel_id, &prompt).await;
                });
            }
            Err(_) => {
                warn!(channel = %channel_id, prompt = %prompt, "generation bound saturated, dropping request");
                tokio::spawn(async move {
                    let _ = handle.reply(&channel_id, BUSY_TEXT).await;
                });
            }
        }
    }

    /// Wait for every in-flight pipeline to finish. Used on shutdown after
    /// setting the cancel signal.
    pub async fn drain(&self) {
        let _ = self.in_flight.acquire_many(self.max_in_flight as u32).await;
    }
}
