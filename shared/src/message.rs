//! Chat message bubbles and the inline audio player.

use serde::{Deserialize, Serialize};

use crate::model::{GroupId, Message, MessageId, UserId};
use crate::storage::{MediaUrlResolver, ResolvedMedia};

/// `m:ss`, with non-finite or negative input shown as `0:00`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{minutes}:{secs:02}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Paused,
    Playing,
}

/// What the shell's media element has to do after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackCommand {
    Play,
    Pause,
}

/// Playback position as reported by the media element.
///
/// Duration and position updates never change the play state; only a toggle
/// or the end of the stream does.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioPlayer {
    state: PlaybackState,
    duration: f64,
    current_time: f64,
}

impl AudioPlayer {
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn toggle(&mut self) -> PlaybackCommand {
        match self.state {
            PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                PlaybackCommand::Play
            }
            PlaybackState::Playing => {
                self.state = PlaybackState::Paused;
                PlaybackCommand::Pause
            }
        }
    }

    pub fn loaded(&mut self, duration: f64, current_time: f64) {
        self.duration = duration;
        self.current_time = current_time;
    }

    pub fn time_updated(&mut self, current_time: f64) {
        self.current_time = current_time;
    }

    pub fn ended(&mut self) {
        self.state = PlaybackState::Paused;
        self.current_time = 0.0;
    }

    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.duration > 0.0 {
            self.current_time / self.duration * 100.0
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn view(&self, src: String) -> AudioPlayerView {
        AudioPlayerView {
            src,
            is_playing: self.is_playing(),
            progress_percent: self.progress_percent(),
            duration_label: format_time(self.duration),
            current_time_label: format_time(self.current_time),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AudioPlayerView {
    pub src: String,
    pub is_playing: bool,
    pub progress_percent: f64,
    pub duration_label: String,
    pub current_time_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleTone {
    Accent,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubblePadding {
    /// Image-only message.
    Compact,
    Regular,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageBubbleView {
    pub id: MessageId,
    pub alignment: Alignment,
    pub tone: BubbleTone,
    pub padding: BubblePadding,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub audio: Option<AudioPlayerView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageBubble {
    pub message: Message,
    image: ResolvedMedia,
    audio: ResolvedMedia,
    pub player: AudioPlayer,
}

impl MessageBubble {
    #[must_use]
    pub fn new(message: Message, resolver: &MediaUrlResolver) -> Self {
        Self {
            image: ResolvedMedia::new(message.image_url.as_deref(), resolver),
            audio: ResolvedMedia::new(message.audio_url.as_deref(), resolver),
            player: AudioPlayer::default(),
            message,
        }
    }

    /// Replaces the row. Attachments re-resolve only when their key changed;
    /// a new audio source also resets the player.
    pub fn refresh(&mut self, message: Message, resolver: &MediaUrlResolver) {
        self.image.sync(message.image_url.as_deref(), resolver);
        if self.audio.sync(message.audio_url.as_deref(), resolver) {
            self.player = AudioPlayer::default();
        }
        self.message = message;
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image.url()
    }

    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio.url().is_some()
    }

    #[must_use]
    pub fn view(&self, viewer: Option<&UserId>) -> MessageBubbleView {
        let is_sender = viewer.is_some_and(|id| *id == self.message.sender_id);
        let text = self.message.text().map(str::to_string);
        let image_url = self.image.url().map(str::to_string);

        MessageBubbleView {
            id: self.message.id.clone(),
            alignment: if is_sender { Alignment::End } else { Alignment::Start },
            tone: if is_sender {
                BubbleTone::Accent
            } else {
                BubbleTone::Neutral
            },
            padding: if text.is_none() && image_url.is_some() {
                BubblePadding::Compact
            } else {
                BubblePadding::Regular
            },
            text,
            image_url,
            audio: self
                .audio
                .url()
                .map(|src| self.player.view(src.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRoom {
    pub group_id: GroupId,
    pub bubbles: Vec<MessageBubble>,
}

impl ChatRoom {
    #[must_use]
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            bubbles: Vec::new(),
        }
    }

    pub fn replace_all(&mut self, messages: Vec<Message>, resolver: &MediaUrlResolver) {
        crate::cards::merge_cards(
            &mut self.bubbles,
            messages,
            |b: &MessageBubble| b.message.id.as_str(),
            |m: &Message| m.id.as_str(),
            |m| MessageBubble::new(m, resolver),
            |b, m| b.refresh(m, resolver),
        );
    }

    /// Appends a new message or refreshes the existing bubble with that id.
    pub fn upsert(&mut self, message: Message, resolver: &MediaUrlResolver) {
        match self.bubble_mut(&message.id) {
            Some(bubble) => bubble.refresh(message, resolver),
            None => self.bubbles.push(MessageBubble::new(message, resolver)),
        }
    }

    pub fn bubble_mut(&mut self, id: &MessageId) -> Option<&mut MessageBubble> {
        self.bubbles.iter_mut().find(|b| b.message.id == *id)
    }

    #[must_use]
    pub fn bubble(&self, id: &MessageId) -> Option<&MessageBubble> {
        self.bubbles.iter().find(|b| b.message.id == *id)
    }

    #[must_use]
    pub fn view(&self, viewer: Option<&UserId>) -> Vec<MessageBubbleView> {
        self.bubbles.iter().map(|b| b.view(viewer)).collect()
    }
}
