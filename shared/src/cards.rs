use serde::{Deserialize, Serialize};

use crate::model::{Group, GroupId, Store, StoreId, StoreRating};
use crate::storage::{MediaUrlResolver, ResolvedMedia};

pub const UNKNOWN_OWNER_NAME: &str = "Unknown owner";

/// First row of the `group_members(count)` aggregate, 0 when absent.
#[must_use]
pub fn member_count(group: &Group) -> u64 {
    group.group_members.first().map_or(0, |m| m.count)
}

/// Mean of the `rating` field, counting missing ratings as 0.
#[must_use]
pub fn average_rating(ratings: &[StoreRating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let total: f64 = ratings.iter().map(|r| r.rating.unwrap_or(0.0)).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = ratings.len() as f64;
    total / count
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "url", rename_all = "snake_case")]
pub enum CoverImage {
    Url(String),
    Placeholder,
}

impl CoverImage {
    fn from_media(media: &ResolvedMedia) -> Self {
        media
            .url()
            .map_or(Self::Placeholder, |url| Self::Url(url.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupCardView {
    pub id: GroupId,
    pub name: String,
    pub visibility: Visibility,
    pub member_count: u64,
    pub member_label: String,
    pub cover: CoverImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCard {
    pub group: Group,
    cover: ResolvedMedia,
}

impl GroupCard {
    #[must_use]
    pub fn new(group: Group, resolver: &MediaUrlResolver) -> Self {
        let cover = ResolvedMedia::new(group.cover_image_url.as_deref(), resolver);
        Self { group, cover }
    }

    /// Swaps in a fresh row; the cover is re-resolved only if its key moved.
    pub fn refresh(&mut self, group: Group, resolver: &MediaUrlResolver) {
        self.cover.sync(group.cover_image_url.as_deref(), resolver);
        self.group = group;
    }

    #[must_use]
    pub fn view(&self) -> GroupCardView {
        let count = member_count(&self.group);
        GroupCardView {
            id: self.group.id.clone(),
            name: self.group.name.clone(),
            visibility: if self.group.is_private {
                Visibility::Private
            } else {
                Visibility::Public
            },
            member_count: count,
            member_label: if count == 1 {
                "1 member".to_string()
            } else {
                format!("{count} members")
            },
            cover: CoverImage::from_media(&self.cover),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoreCardView {
    pub id: StoreId,
    pub name: String,
    pub image: CoverImage,
    pub owner_name: String,
    pub owner_avatar_url: Option<String>,
    pub average_rating: f64,
    pub rating_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreCard {
    pub store: Store,
    image: ResolvedMedia,
    owner_avatar: ResolvedMedia,
}

impl StoreCard {
    #[must_use]
    pub fn new(store: Store, resolver: &MediaUrlResolver) -> Self {
        let image = ResolvedMedia::new(store.image_url.as_deref(), resolver);
        let owner_avatar = ResolvedMedia::new(Self::avatar_key(&store), resolver);
        Self {
            store,
            image,
            owner_avatar,
        }
    }

    pub fn refresh(&mut self, store: Store, resolver: &MediaUrlResolver) {
        self.image.sync(store.image_url.as_deref(), resolver);
        self.owner_avatar.sync(Self::avatar_key(&store), resolver);
        self.store = store;
    }

    fn avatar_key(store: &Store) -> Option<&str> {
        store.owner.as_ref().and_then(|o| o.avatar_url.as_deref())
    }

    #[must_use]
    pub fn view(&self) -> StoreCardView {
        let owner_name = self
            .store
            .owner
            .as_ref()
            .and_then(|o| o.full_name.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_OWNER_NAME)
            .to_string();

        StoreCardView {
            id: self.store.id.clone(),
            name: self.store.name.clone(),
            image: CoverImage::from_media(&self.image),
            owner_name,
            owner_avatar_url: self.owner_avatar.url().map(str::to_string),
            average_rating: average_rating(&self.store.store_ratings),
            rating_count: self.store.store_ratings.len(),
        }
    }
}

/// Rebuilds a card list from fresh rows, reusing cards whose id survived so
/// their resolved media stays put.
pub fn merge_cards<T, C>(
    existing: &mut Vec<C>,
    rows: Vec<T>,
    id_of_card: impl Fn(&C) -> &str,
    id_of_row: impl Fn(&T) -> &str,
    mut build: impl FnMut(T) -> C,
    mut refresh: impl FnMut(&mut C, T),
) {
    let mut previous: Vec<C> = std::mem::take(existing);
    for row in rows {
        let position = previous.iter().position(|c| id_of_card(c) == id_of_row(&row));
        match position {
            Some(index) => {
                let mut card = previous.swap_remove(index);
                refresh(&mut card, row);
                existing.push(card);
            }
            None => existing.push(build(row)),
        }
    }
}
