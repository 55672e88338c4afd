//! Commands for the shell's audio elements.
//!
//! Only play and pause go out; duration, position and end-of-stream come
//! back as ordinary events.

use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use serde::{Deserialize, Serialize};

use crate::message::PlaybackCommand;
use crate::model::MessageId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioOperation {
    pub message_id: MessageId,
    pub command: PlaybackCommand,
}

impl Operation for AudioOperation {
    type Output = ();
}

#[derive(Capability)]
pub struct Audio<Ev> {
    context: CapabilityContext<AudioOperation, Ev>,
}

impl<Ev> Audio<Ev> {
    pub fn new(context: CapabilityContext<AudioOperation, Ev>) -> Self {
        Self { context }
    }
}

impl<Ev> Audio<Ev>
where
    Ev: 'static,
{
    pub fn send(&self, message_id: MessageId, command: PlaybackCommand) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(AudioOperation {
                message_id,
                command,
            })
            .await;
        });
    }
}
