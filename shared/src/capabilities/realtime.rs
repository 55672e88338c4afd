//! Row-level change feed of the hosted backend.
//!
//! The shell owns the socket. The core asks for one channel per mounted
//! screen and receives every change on that channel as a stream of outputs
//! until it unsubscribes.

use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::rental::ChannelSpec;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum RealtimeOperation {
    Subscribe(ChannelSpec),
    Unsubscribe { channel: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum RealtimeOutput {
    Subscribed { channel: String },
    Change { channel: String, kind: ChangeKind },
    Closed { channel: String },
    Error { channel: String, message: String },
}

impl RealtimeOutput {
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Self::Subscribed { channel }
            | Self::Change { channel, .. }
            | Self::Closed { channel }
            | Self::Error { channel, .. } => channel,
        }
    }
}

impl Operation for RealtimeOperation {
    type Output = RealtimeOutput;
}

#[derive(Capability)]
pub struct Realtime<Ev> {
    context: CapabilityContext<RealtimeOperation, Ev>,
}

impl<Ev> Realtime<Ev> {
    pub fn new(context: CapabilityContext<RealtimeOperation, Ev>) -> Self {
        Self { context }
    }
}

impl<Ev> Realtime<Ev>
where
    Ev: 'static,
{
    /// Opens the channel and forwards every output to the app.
    pub fn subscribe<F>(&self, spec: ChannelSpec, callback: F)
    where
        F: Fn(RealtimeOutput) -> Ev + Send + Sync + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let mut stream = ctx.stream_from_shell(RealtimeOperation::Subscribe(spec));
            while let Some(output) = stream.next().await {
                ctx.update_app(callback(output));
            }
        });
    }

    pub fn unsubscribe(&self, channel: String) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(RealtimeOperation::Unsubscribe { channel })
                .await;
        });
    }
}
