use serde::{Deserialize, Serialize};

use crate::capabilities::RealtimeOutput;
use crate::config::BackendConfig;
use crate::model::{
    CommentId, Group, GroupId, Message, MessageId, PostId, PostProfile, RentalComment,
    RentalPost, Store, StoreId, UserId,
};
use crate::AppResult;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Setup
    Configure(BackendConfig),
    SessionChanged {
        user_id: Option<UserId>,
        access_token: Option<String>,
    },

    // Rental detail
    RentalOpened {
        rental_id: PostId,
    },
    RentalClosed,
    NextImage,
    PrevImage,
    MenuToggled,
    PointerDownOutsideMenu,
    EditRequested,
    DeleteRequested,
    DeleteConfirmed,
    DeleteCancelled,
    MapLinkOpened,
    CommentCreated(RentalComment),
    CommentUpdated(RentalComment),
    CommentDeleted {
        comment_id: CommentId,
    },
    AlertDismissed,
    ErrorDismissed,

    // Listings
    GroupsRequested,
    StoresRequested,
    GroupTapped {
        group_id: GroupId,
    },
    StoreTapped {
        store_id: StoreId,
    },

    // Chat
    ChatOpened {
        group_id: GroupId,
    },
    ChatClosed,
    MessageReceived(Message),
    AudioToggled {
        message_id: MessageId,
    },
    AudioLoaded {
        message_id: MessageId,
        duration: f64,
        current_time: f64,
    },
    AudioTimeUpdated {
        message_id: MessageId,
        current_time: f64,
    },
    AudioEnded {
        message_id: MessageId,
    },
    ImageOpened {
        message_id: MessageId,
    },

    // Capability responses
    #[serde(skip)]
    PostFetched {
        rental_id: PostId,
        seq: u64,
        result: Box<AppResult<RentalPost>>,
    },
    #[serde(skip)]
    AuthorFetched {
        rental_id: PostId,
        seq: u64,
        result: AppResult<Option<PostProfile>>,
    },
    #[serde(skip)]
    CommentsFetched {
        rental_id: PostId,
        seq: u64,
        result: AppResult<Vec<RentalComment>>,
    },
    #[serde(skip)]
    CommentsChanged {
        rental_id: PostId,
        output: RealtimeOutput,
    },
    #[serde(skip)]
    ImagesRemoved {
        post_id: PostId,
        result: AppResult<()>,
    },
    #[serde(skip)]
    PostDeleted {
        post_id: PostId,
        result: AppResult<()>,
    },
    #[serde(skip)]
    GroupsFetched(AppResult<Vec<Group>>),
    #[serde(skip)]
    StoresFetched(AppResult<Vec<Store>>),
    #[serde(skip)]
    MessagesFetched {
        group_id: GroupId,
        result: AppResult<Vec<Message>>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::SessionChanged { .. } => "session_changed",
            Self::RentalOpened { .. } => "rental_opened",
            Self::RentalClosed => "rental_closed",
            Self::NextImage => "next_image",
            Self::PrevImage => "prev_image",
            Self::MenuToggled => "menu_toggled",
            Self::PointerDownOutsideMenu => "pointer_down_outside_menu",
            Self::EditRequested => "edit_requested",
            Self::DeleteRequested => "delete_requested",
            Self::DeleteConfirmed => "delete_confirmed",
            Self::DeleteCancelled => "delete_cancelled",
            Self::MapLinkOpened => "map_link_opened",
            Self::CommentCreated(_) => "comment_created",
            Self::CommentUpdated(_) => "comment_updated",
            Self::CommentDeleted { .. } => "comment_deleted",
            Self::AlertDismissed => "alert_dismissed",
            Self::ErrorDismissed => "error_dismissed",
            Self::GroupsRequested => "groups_requested",
            Self::StoresRequested => "stores_requested",
            Self::GroupTapped { .. } => "group_tapped",
            Self::StoreTapped { .. } => "store_tapped",
            Self::ChatOpened { .. } => "chat_opened",
            Self::ChatClosed => "chat_closed",
            Self::MessageReceived(_) => "message_received",
            Self::AudioToggled { .. } => "audio_toggled",
            Self::AudioLoaded { .. } => "audio_loaded",
            Self::AudioTimeUpdated { .. } => "audio_time_updated",
            Self::AudioEnded { .. } => "audio_ended",
            Self::ImageOpened { .. } => "image_opened",
            Self::PostFetched { .. } => "post_fetched",
            Self::AuthorFetched { .. } => "author_fetched",
            Self::CommentsFetched { .. } => "comments_fetched",
            Self::CommentsChanged { .. } => "comments_changed",
            Self::ImagesRemoved { .. } => "images_removed",
            Self::PostDeleted { .. } => "post_deleted",
            Self::GroupsFetched(_) => "groups_fetched",
            Self::StoresFetched(_) => "stores_fetched",
            Self::MessagesFetched { .. } => "messages_fetched",
        }
    }

    /// Events that come from the shell's media elements fire many times a
    /// second and are kept out of the info-level log.
    #[must_use]
    pub const fn is_high_frequency(&self) -> bool {
        matches!(self, Self::AudioTimeUpdated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_name() {
        assert_eq!(Event::RentalClosed.name(), "rental_closed");
        assert_eq!(
            Event::RentalOpened {
                rental_id: PostId::new("p1")
            }
            .name(),
            "rental_opened"
        );
    }

    #[test]
    fn shell_events_round_trip_through_json() {
        let event = Event::AudioLoaded {
            message_id: MessageId::new("m1"),
            duration: 12.5,
            current_time: 0.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(serde_json::from_str::<Event>(&json).unwrap(), event);
    }

    #[test]
    fn event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(size <= 256, "Event enum is {size} bytes, box more variants");
    }
}
