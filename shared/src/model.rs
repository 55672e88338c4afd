use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use url::Url;

use crate::backend::Backend;
use crate::cards::{GroupCard, StoreCard};
use crate::message::ChatRoom;
use crate::rental::RentalDetail;
use crate::AppError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(PostId);
typed_id!(CommentId);
typed_id!(UserId);
typed_id!(GroupId);
typed_id!(StoreId);
typed_id!(MessageId);

/// Treats an explicit JSON `null` like a missing array.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// --- Rental listings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerm {
    Monthly,
    Quarterly,
    SemiAnnually,
}

impl PaymentTerm {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Quarterly => "Every 3 months",
            Self::SemiAnnually => "Every 6 months",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalPost {
    pub id: PostId,
    pub user_id: UserId,
    pub rent_amount: f64,
    pub payment_term: PaymentTerm,
    pub region: String,
    pub address: String,
    pub street_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub map_link: Option<String>,
    pub room_count: u32,
    pub condition: String,
    /// Storage keys, in display order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl RentalPost {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }

    /// Stored link first, then one built from the coordinates, else nothing.
    #[must_use]
    pub fn effective_map_link(&self, map_base: &Url) -> Option<String> {
        if let Some(link) = self.map_link.as_deref().map(str::trim) {
            if !link.is_empty() {
                return Some(link.to_string());
            }
        }

        match self.coordinates() {
            Some(Coordinates { lat, lng }) => {
                let mut url = map_base.clone();
                url.set_query(Some(&format!("q={lat},{lng}")));
                Some(url.to_string())
            }
            None => None,
        }
    }

    #[must_use]
    pub fn is_owned_by(&self, viewer: Option<&UserId>) -> bool {
        viewer.is_some_and(|id| *id == self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProfile {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalComment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: String,
    #[serde(default, rename = "profiles")]
    pub author: Option<PostProfile>,
}

// --- Chat ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Message {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

// --- Listing cards ---

/// Single-row aggregate produced by `group_members(count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCount {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub group_members: Vec<MemberCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreRating {
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, rename = "profiles")]
    pub owner: Option<PostProfile>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub store_ratings: Vec<StoreRating>,
}

// --- Session & root model ---

#[derive(Clone, Default)]
pub struct Session {
    pub user_id: Option<UserId>,
    pub access_token: Option<String>,
}

// Redact debug output because the token is a bearer credential.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("access_token_present", &self.access_token.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub backend: Option<Backend>,
    pub session: Session,

    /// Mounted rental detail screen, if any.
    pub rental: Option<RentalDetail>,
    /// Last load number handed out; carried across rentals so it is never reused.
    pub load_seq: u64,

    pub groups: Vec<GroupCard>,
    pub stores: Vec<StoreCard>,
    pub chat: Option<ChatRoom>,

    pub alert: Option<String>,
    pub active_error: Option<AppError>,
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn show_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    #[must_use]
    pub fn viewer(&self) -> Option<&UserId> {
        self.session.user_id.as_ref()
    }
}
