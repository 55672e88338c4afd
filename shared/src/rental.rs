//! Rental detail screen state.
//!
//! A load is a two-stage join: the post is fetched first and gates everything
//! else, then the author profile and the comment thread are fetched together
//! and must both arrive before anything is committed. Every load carries a
//! sequence number so that results of a superseded load are dropped instead
//! of being mixed into the current one.
//!
//! The comment thread has exactly three writers: a committed load replaces it
//! wholesale, and the viewer's own create/update/delete patch it in place.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::model::{CommentId, PostId, PostProfile, RentalComment, RentalPost, UserId};
use crate::storage::MediaUrlResolver;
use crate::{AppResult, DELETE_POST_PROMPT, REALTIME_SCHEMA, RENTAL_COMMENTS_TABLE};

// --- Carousel ---

/// Index into the resolved image list; `next`/`prev` wrap around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Carousel {
    index: usize,
    len: usize,
}

impl Carousel {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn next(&mut self) {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    pub fn prev(&mut self) {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }

    /// Keeps the index for a list of a new length, clamped to its end.
    pub fn resize(&mut self, len: usize) {
        self.len = len;
        self.index = if len == 0 { 0 } else { self.index.min(len - 1) };
    }

    /// `"i / n"`, 1-based. `None` for an empty list.
    #[must_use]
    pub fn position_label(&self) -> Option<String> {
        (self.len > 0).then(|| format!("{} / {}", self.index + 1, self.len))
    }
}

// --- Comment thread ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentThread {
    items: Vec<RentalComment>,
}

impl CommentThread {
    #[must_use]
    pub fn new(items: Vec<RentalComment>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[RentalComment] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Always appends; the thread is never re-sorted on a local patch.
    pub fn append(&mut self, comment: RentalComment) {
        self.items.push(comment);
    }

    /// Replaces the comment with the same id in place.
    pub fn replace(&mut self, comment: RentalComment) -> bool {
        match self.items.iter_mut().find(|c| c.id == comment.id) {
            Some(slot) => {
                *slot = comment;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &CommentId) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.id != *id);
        self.items.len() != before
    }
}

// --- Realtime channel ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub channel: String,
    pub schema: String,
    pub table: String,
    pub filter: String,
}

impl ChannelSpec {
    /// Every change to the comments of one post.
    #[must_use]
    pub fn for_post_comments(post_id: &PostId) -> Self {
        let filter = format!("post_id=eq.{post_id}");
        Self {
            channel: format!("{REALTIME_SCHEMA}:{RENTAL_COMMENTS_TABLE}:{filter}"),
            schema: REALTIME_SCHEMA.to_string(),
            table: RENTAL_COMMENTS_TABLE.to_string(),
            filter,
        }
    }
}

// --- Load state machine ---

#[derive(Debug, Clone, PartialEq)]
pub enum LoadPhase {
    Idle,
    FetchingPost,
    Joining {
        post: Box<RentalPost>,
        author: Option<Option<PostProfile>>,
        comments: Option<Vec<RentalComment>>,
    },
    Loaded,
    Failed {
        message: String,
    },
}

/// What the app has to do after feeding a response into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStep {
    /// The response belongs to a superseded load.
    Stale,
    /// Post is in; fetch the author profile and the comments.
    FetchSecondaries { post_id: PostId, author_id: UserId },
    /// Still waiting for the other half of the join.
    Waiting,
    Committed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlan {
    pub post_id: PostId,
    pub image_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteState {
    #[default]
    Idle,
    AwaitingConfirmation,
    RemovingImages,
    DeletingRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RentalDetail {
    pub rental_id: PostId,
    seq: u64,
    pub phase: LoadPhase,
    pub post: Option<RentalPost>,
    pub author: Option<PostProfile>,
    pub image_urls: Vec<String>,
    pub comments: CommentThread,
    pub carousel: Carousel,
    pub menu_open: bool,
    pub delete: DeleteState,
    pub subscription: Option<ChannelSpec>,
}

impl RentalDetail {
    #[must_use]
    pub fn new(rental_id: PostId) -> Self {
        Self {
            rental_id,
            seq: 0,
            phase: LoadPhase::Idle,
            post: None,
            author: None,
            image_urls: Vec::new(),
            comments: CommentThread::default(),
            carousel: Carousel::default(),
            menu_open: false,
            delete: DeleteState::Idle,
            subscription: None,
        }
    }

    /// Loads of this screen are numbered after `last_seq`, so a late response
    /// for a previously mounted rental never matches one of them.
    #[must_use]
    pub fn continuing_from(rental_id: PostId, last_seq: u64) -> Self {
        Self {
            seq: last_seq,
            ..Self::new(rental_id)
        }
    }

    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            LoadPhase::FetchingPost | LoadPhase::Joining { .. }
        )
    }

    /// Starts a new load and returns its sequence number. Any load still in
    /// flight becomes stale.
    pub fn begin_load(&mut self) -> u64 {
        self.seq += 1;
        self.phase = LoadPhase::FetchingPost;
        debug!(rental_id = %self.rental_id, seq = self.seq, "rental load started");
        self.seq
    }

    pub fn post_fetched(&mut self, seq: u64, result: AppResult<RentalPost>) -> LoadStep {
        if seq != self.seq || self.phase != LoadPhase::FetchingPost {
            return LoadStep::Stale;
        }
        match result {
            Ok(post) => {
                let step = LoadStep::FetchSecondaries {
                    post_id: post.id.clone(),
                    author_id: post.user_id.clone(),
                };
                self.phase = LoadPhase::Joining {
                    post: Box::new(post),
                    author: None,
                    comments: None,
                };
                step
            }
            Err(error) => {
                self.fail(&error.user_facing_message());
                LoadStep::Failed
            }
        }
    }

    pub fn author_fetched(
        &mut self,
        seq: u64,
        result: AppResult<Option<PostProfile>>,
        resolver: &MediaUrlResolver,
    ) -> LoadStep {
        if seq != self.seq {
            return LoadStep::Stale;
        }
        let LoadPhase::Joining { author, .. } = &mut self.phase else {
            return LoadStep::Stale;
        };
        match result {
            Ok(profile) => {
                *author = Some(profile);
                self.try_commit(resolver)
            }
            Err(error) => {
                self.fail(&error.user_facing_message());
                LoadStep::Failed
            }
        }
    }

    pub fn comments_fetched(
        &mut self,
        seq: u64,
        result: AppResult<Vec<RentalComment>>,
        resolver: &MediaUrlResolver,
    ) -> LoadStep {
        if seq != self.seq {
            return LoadStep::Stale;
        }
        let LoadPhase::Joining { comments, .. } = &mut self.phase else {
            return LoadStep::Stale;
        };
        match result {
            Ok(rows) => {
                *comments = Some(rows);
                self.try_commit(resolver)
            }
            Err(error) => {
                self.fail(&error.user_facing_message());
                LoadStep::Failed
            }
        }
    }

    fn try_commit(&mut self, resolver: &MediaUrlResolver) -> LoadStep {
        let ready = matches!(
            &self.phase,
            LoadPhase::Joining { author: Some(_), comments: Some(_), .. }
        );
        if !ready {
            return LoadStep::Waiting;
        }

        let LoadPhase::Joining {
            post,
            author: Some(author),
            comments: Some(comments),
        } = std::mem::replace(&mut self.phase, LoadPhase::Loaded)
        else {
            return LoadStep::Waiting;
        };

        let post = *post;
        let same_post = self.post.as_ref().is_some_and(|p| p.id == post.id);
        self.image_urls = resolver.resolve_all(&post.image_urls);
        if same_post {
            self.carousel.resize(self.image_urls.len());
        } else {
            self.carousel = Carousel::new(self.image_urls.len());
        }

        debug!(
            rental_id = %post.id,
            images = self.image_urls.len(),
            comments = comments.len(),
            "rental load committed"
        );

        self.post = Some(post);
        self.author = author;
        self.comments = CommentThread::new(comments);
        LoadStep::Committed
    }

    /// A failed load shows only the error; nothing stale stays on screen.
    pub fn fail(&mut self, message: &str) {
        warn!(rental_id = %self.rental_id, seq = self.seq, error = message, "rental load failed");
        self.phase = LoadPhase::Failed {
            message: message.to_string(),
        };
        self.post = None;
        self.author = None;
        self.image_urls.clear();
        self.comments = CommentThread::default();
        self.carousel = Carousel::default();
        self.menu_open = false;
    }

    // --- Owner menu ---

    #[must_use]
    pub fn is_owner(&self, viewer: Option<&UserId>) -> bool {
        self.post.as_ref().is_some_and(|p| p.is_owned_by(viewer))
    }

    pub fn toggle_menu(&mut self, viewer: Option<&UserId>) {
        self.menu_open = self.is_owner(viewer) && !self.menu_open;
    }

    pub fn close_menu(&mut self) {
        self.menu_open = false;
    }

    // --- Delete flow ---

    /// Closes the menu and asks for confirmation. Only the owner may delete.
    pub fn request_delete(&mut self, viewer: Option<&UserId>) -> bool {
        self.menu_open = false;
        if !self.is_owner(viewer) || self.delete != DeleteState::Idle {
            return false;
        }
        self.delete = DeleteState::AwaitingConfirmation;
        true
    }

    pub fn cancel_delete(&mut self) {
        if self.delete == DeleteState::AwaitingConfirmation {
            self.delete = DeleteState::Idle;
        }
    }

    pub fn confirm_delete(&mut self) -> Option<DeletePlan> {
        if self.delete != DeleteState::AwaitingConfirmation {
            return None;
        }
        let post = self.post.as_ref()?;
        let plan = DeletePlan {
            post_id: post.id.clone(),
            image_keys: post.image_urls.clone(),
        };
        self.delete = if plan.image_keys.is_empty() {
            DeleteState::DeletingRecord
        } else {
            DeleteState::RemovingImages
        };
        Some(plan)
    }

    pub fn images_removed(&mut self) {
        if self.delete == DeleteState::RemovingImages {
            self.delete = DeleteState::DeletingRecord;
        }
    }

    pub fn delete_finished(&mut self) {
        self.delete = DeleteState::Idle;
    }

    // --- View ---

    #[must_use]
    pub fn view(&self, viewer: Option<&UserId>, map_base: &Url, resolver: &MediaUrlResolver) -> RentalView {
        if let LoadPhase::Failed { message } = &self.phase {
            return RentalView::Failed {
                message: message.clone(),
            };
        }
        let Some(post) = &self.post else {
            return RentalView::Loading;
        };

        let is_owner = self.is_owner(viewer);
        let author = self.author.as_ref().map(|a| AuthorView {
            id: a.id.clone(),
            name: a.full_name.clone().unwrap_or_default(),
            avatar_url: resolver.resolve(a.avatar_url.as_deref()),
        });

        let comments = self
            .comments
            .items()
            .iter()
            .map(|c| CommentView {
                id: c.id.clone(),
                author_name: c
                    .author
                    .as_ref()
                    .and_then(|a| a.full_name.clone())
                    .unwrap_or_default(),
                author_avatar_url: c
                    .author
                    .as_ref()
                    .and_then(|a| resolver.resolve(a.avatar_url.as_deref())),
                content: c.content.clone(),
                created_at: c.created_at.clone(),
                can_edit: viewer.is_some_and(|v| *v == c.user_id),
                can_delete: viewer.is_some_and(|v| *v == c.user_id) || is_owner,
            })
            .collect::<Vec<_>>();

        let images = (!self.image_urls.is_empty()).then(|| CarouselView {
            current_url: self
                .image_urls
                .get(self.carousel.index())
                .cloned()
                .unwrap_or_default(),
            position_label: self.carousel.position_label().unwrap_or_default(),
            show_arrows: self.image_urls.len() > 1,
        });

        RentalView::Ready(Box::new(RentalDetailView {
            id: post.id.clone(),
            author,
            images,
            details: detail_rows(post),
            map_link: post.effective_map_link(map_base),
            comment_count: comments.len(),
            comments,
            is_owner,
            menu_open: is_owner && self.menu_open,
            confirm_delete_prompt: (self.delete == DeleteState::AwaitingConfirmation)
                .then(|| DELETE_POST_PROMPT.to_string()),
            is_deleting: matches!(
                self.delete,
                DeleteState::RemovingImages | DeleteState::DeletingRecord
            ),
            is_refreshing: self.is_loading(),
        }))
    }
}

fn detail_rows(post: &RentalPost) -> Vec<DetailRow> {
    let row = |label: &str, value: String| DetailRow {
        label: label.to_string(),
        value,
    };
    vec![
        row("Rent", format!("{}$", post.rent_amount)),
        row("Payment term", post.payment_term.label().to_string()),
        row("Region", post.region.clone()),
        row("Address", post.address.clone()),
        row("Street", post.street_name.clone()),
        row("Rooms", post.room_count.to_string()),
        row("Condition", post.condition.clone()),
    ]
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RentalView {
    Loading,
    Failed { message: String },
    Ready(Box<RentalDetailView>),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RentalDetailView {
    pub id: PostId,
    pub author: Option<AuthorView>,
    pub images: Option<CarouselView>,
    pub details: Vec<DetailRow>,
    pub map_link: Option<String>,
    pub comments: Vec<CommentView>,
    pub comment_count: usize,
    pub is_owner: bool,
    pub menu_open: bool,
    pub confirm_delete_prompt: Option<String>,
    pub is_deleting: bool,
    pub is_refreshing: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorView {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarouselView {
    pub current_url: String,
    pub position_label: String,
    pub show_arrows: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentView {
    pub id: CommentId,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub created_at: String,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaymentTerm;
    use crate::{AppError, ErrorKind};
    use proptest::prelude::*;

    fn resolver() -> MediaUrlResolver {
        MediaUrlResolver::new(Url::parse("https://abc.supabase.co").unwrap(), "uploads")
    }

    fn map_base() -> Url {
        Url::parse("https://www.google.com/maps").unwrap()
    }

    fn post(id: &str, images: &[&str]) -> RentalPost {
        RentalPost {
            id: PostId::new(id),
            user_id: UserId::new("owner"),
            rent_amount: 500.0,
            payment_term: PaymentTerm::Monthly,
            region: "North".into(),
            address: "Block 4".into(),
            street_name: "Palm St".into(),
            latitude: None,
            longitude: None,
            map_link: None,
            room_count: 2,
            condition: "Good".into(),
            image_urls: images.iter().map(|s| (*s).to_string()).collect(),
            created_at: None,
        }
    }

    fn comment(id: &str, at: &str) -> RentalComment {
        RentalComment {
            id: CommentId::new(id),
            post_id: PostId::new("p1"),
            user_id: UserId::new("guest"),
            content: format!("comment {id}"),
            created_at: at.to_string(),
            author: None,
        }
    }

    fn ids(thread: &CommentThread) -> Vec<&str> {
        thread.items().iter().map(|c| c.id.as_str()).collect()
    }

    fn loaded(post_row: RentalPost, comments: Vec<RentalComment>) -> RentalDetail {
        let resolver = resolver();
        let mut detail = RentalDetail::new(post_row.id.clone());
        let seq = detail.begin_load();
        detail.post_fetched(seq, Ok(post_row));
        detail.author_fetched(seq, Ok(None), &resolver);
        assert_eq!(
            detail.comments_fetched(seq, Ok(comments), &resolver),
            LoadStep::Committed
        );
        detail
    }

    #[test]
    fn carousel_wraps_both_ways() {
        let mut carousel = Carousel::new(3);
        carousel.prev();
        assert_eq!(carousel.index(), 2);
        carousel.next();
        assert_eq!(carousel.index(), 0);
        assert_eq!(carousel.position_label().as_deref(), Some("1 / 3"));
    }

    #[test]
    fn empty_carousel_is_inert() {
        let mut carousel = Carousel::new(0);
        carousel.next();
        carousel.prev();
        assert_eq!(carousel.index(), 0);
        assert!(carousel.position_label().is_none());
    }

    #[test]
    fn join_commits_only_when_both_halves_arrive() {
        let resolver = resolver();
        let mut detail = RentalDetail::new(PostId::new("p1"));
        let seq = detail.begin_load();

        let step = detail.post_fetched(seq, Ok(post("p1", &["a.jpg", "b.jpg", "c.jpg"])));
        assert_eq!(
            step,
            LoadStep::FetchSecondaries {
                post_id: PostId::new("p1"),
                author_id: UserId::new("owner")
            }
        );
        assert!(detail.post.is_none());

        assert_eq!(
            detail.comments_fetched(seq, Ok(vec![comment("c1", "t1")]), &resolver),
            LoadStep::Waiting
        );
        assert!(detail.post.is_none());

        assert_eq!(detail.author_fetched(seq, Ok(None), &resolver), LoadStep::Committed);
        assert_eq!(detail.phase, LoadPhase::Loaded);
        assert_eq!(detail.image_urls.len(), 3);
        assert!(detail.image_urls[0].ends_with("/uploads/a.jpg"));
        assert_eq!(detail.comments.len(), 1);
        assert!(detail.author.is_none());
    }

    #[test]
    fn post_error_fails_fast() {
        let mut detail = RentalDetail::new(PostId::new("p1"));
        let seq = detail.begin_load();
        let step = detail.post_fetched(
            seq,
            Err(AppError::new(ErrorKind::NotFound, "Rental post not found")),
        );

        assert_eq!(step, LoadStep::Failed);
        assert_eq!(
            detail.view(None, &map_base(), &resolver()),
            RentalView::Failed {
                message: "Rental post not found".into()
            }
        );
    }

    #[test]
    fn secondary_error_clears_previous_content() {
        let resolver = resolver();
        let mut detail = loaded(post("p1", &["a.jpg"]), vec![comment("c1", "t1")]);

        let seq = detail.begin_load();
        detail.post_fetched(seq, Ok(post("p1", &["a.jpg"])));
        let step = detail.comments_fetched(
            seq,
            Err(AppError::new(ErrorKind::Network, "down")),
            &resolver,
        );

        assert_eq!(step, LoadStep::Failed);
        assert!(detail.post.is_none());
        assert!(detail.comments.is_empty());
        // The other half arriving late changes nothing.
        assert_eq!(detail.author_fetched(seq, Ok(None), &resolver), LoadStep::Stale);
    }

    #[test]
    fn continued_numbering_never_reuses_a_sequence() {
        let mut first = RentalDetail::new(PostId::new("p1"));
        let last = first.begin_load();

        let mut second = RentalDetail::continuing_from(PostId::new("p2"), last);
        let next = second.begin_load();

        assert!(next > last);
        assert_eq!(second.post_fetched(last, Ok(post("p1", &[]))), LoadStep::Stale);
        assert_eq!(second.phase, LoadPhase::FetchingPost);
    }

    #[test]
    fn superseded_load_results_are_dropped() {
        let resolver = resolver();
        let mut detail = RentalDetail::new(PostId::new("p1"));
        let first = detail.begin_load();
        let second = detail.begin_load();

        assert_eq!(detail.post_fetched(first, Ok(post("p1", &[]))), LoadStep::Stale);
        assert!(matches!(
            detail.post_fetched(second, Ok(post("p1", &[]))),
            LoadStep::FetchSecondaries { .. }
        ));
        assert_eq!(detail.author_fetched(first, Ok(None), &resolver), LoadStep::Stale);
    }

    #[test]
    fn created_comment_is_appended_regardless_of_timestamp() {
        let mut detail = loaded(
            post("p1", &[]),
            vec![comment("c1", "2024-03-02"), comment("c2", "2024-03-03")],
        );
        detail.comments.append(comment("c3", "2024-01-01"));

        assert_eq!(ids(&detail.comments), vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn updated_comment_keeps_its_position() {
        let mut thread = CommentThread::new(vec![comment("c1", "t1"), comment("c2", "t2")]);
        let mut edited = comment("c1", "t1");
        edited.content = "edited".into();

        assert!(thread.replace(edited));
        assert_eq!(ids(&thread), vec!["c1", "c2"]);
        assert_eq!(thread.items()[0].content, "edited");
        assert!(!thread.replace(comment("missing", "t9")));
    }

    #[test]
    fn reload_of_same_post_keeps_carousel_position() {
        let resolver = resolver();
        let mut detail = loaded(post("p1", &["a", "b", "c"]), vec![]);
        detail.carousel.next();
        detail.carousel.next();

        let seq = detail.begin_load();
        detail.post_fetched(seq, Ok(post("p1", &["a", "b"])));
        detail.author_fetched(seq, Ok(None), &resolver);
        detail.comments_fetched(seq, Ok(vec![]), &resolver);

        assert_eq!(detail.carousel.index(), 1);
        assert_eq!(detail.carousel.len(), 2);
    }

    #[test]
    fn loading_a_different_post_resets_carousel() {
        let resolver = resolver();
        let mut detail = loaded(post("p1", &["a", "b", "c"]), vec![]);
        detail.carousel.next();

        let seq = detail.begin_load();
        detail.post_fetched(seq, Ok(post("p2", &["x", "y", "z"])));
        detail.author_fetched(seq, Ok(None), &resolver);
        detail.comments_fetched(seq, Ok(vec![]), &resolver);

        assert_eq!(detail.carousel.index(), 0);
    }

    #[test]
    fn owner_menu_is_gated_by_viewer() {
        let mut detail = loaded(post("p1", &[]), vec![]);
        let owner = UserId::new("owner");
        let guest = UserId::new("guest");

        detail.toggle_menu(Some(&guest));
        assert!(!detail.menu_open);
        match detail.view(Some(&guest), &map_base(), &resolver()) {
            RentalView::Ready(view) => assert!(!view.is_owner),
            other => panic!("unexpected view {other:?}"),
        }

        detail.toggle_menu(Some(&owner));
        assert!(detail.menu_open);
        detail.close_menu();
        assert!(!detail.menu_open);
    }

    #[test]
    fn delete_flow_requires_confirmation() {
        let owner = UserId::new("owner");
        let mut detail = loaded(post("p1", &["a.jpg", "b.jpg"]), vec![]);

        assert!(detail.confirm_delete().is_none());
        assert!(!detail.request_delete(Some(&UserId::new("guest"))));
        assert!(detail.request_delete(Some(&owner)));

        detail.cancel_delete();
        assert_eq!(detail.delete, DeleteState::Idle);

        assert!(detail.request_delete(Some(&owner)));
        let plan = detail.confirm_delete().unwrap();
        assert_eq!(plan.image_keys, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
        assert_eq!(detail.delete, DeleteState::RemovingImages);

        detail.images_removed();
        assert_eq!(detail.delete, DeleteState::DeletingRecord);
    }

    #[test]
    fn delete_without_images_goes_straight_to_record() {
        let owner = UserId::new("owner");
        let mut detail = loaded(post("p1", &[]), vec![]);
        detail.request_delete(Some(&owner));

        assert!(detail.confirm_delete().unwrap().image_keys.is_empty());
        assert_eq!(detail.delete, DeleteState::DeletingRecord);
    }

    #[test]
    fn view_exposes_details_and_carousel() {
        let detail = loaded(post("p1", &["a.jpg", "b.jpg", "c.jpg"]), vec![]);
        let RentalView::Ready(view) = detail.view(None, &map_base(), &resolver()) else {
            panic!("expected ready view");
        };

        let images = view.images.unwrap();
        assert_eq!(images.position_label, "1 / 3");
        assert!(images.show_arrows);
        assert_eq!(view.details[0].value, "500$");
        assert_eq!(view.details[1].value, "Monthly");
        assert_eq!(view.comment_count, 0);
        assert!(view.map_link.is_none());
        assert!(view.confirm_delete_prompt.is_none());
    }

    #[test]
    fn channel_spec_filters_by_post() {
        let spec = ChannelSpec::for_post_comments(&PostId::new("p1"));
        assert_eq!(spec.channel, "public:rental_post_comments:post_id=eq.p1");
        assert_eq!(spec.filter, "post_id=eq.p1");
        assert_eq!(spec.table, "rental_post_comments");
    }

    proptest! {
        #[test]
        fn next_k_times_lands_on_k_mod_len(len in 1usize..20, k in 0usize..200) {
            let mut carousel = Carousel::new(len);
            for _ in 0..k {
                carousel.next();
            }
            prop_assert_eq!(carousel.index(), k % len);
        }

        #[test]
        fn next_then_prev_is_identity(len in 1usize..20, start in 0usize..20) {
            let mut carousel = Carousel::new(len);
            for _ in 0..start {
                carousel.next();
            }
            let before = carousel.index();
            carousel.next();
            carousel.prev();
            prop_assert_eq!(carousel.index(), before);
        }

        #[test]
        fn delete_removes_one_and_keeps_order(count in 1usize..30, pick in 0usize..30) {
            let pick = pick % count;
            let items: Vec<RentalComment> = (0..count)
                .map(|i| comment(&format!("c{i}"), &format!("t{i}")))
                .collect();
            let mut thread = CommentThread::new(items.clone());
            let target = format!("c{pick}");

            prop_assert!(thread.remove(&CommentId::new(target.clone())));
            prop_assert_eq!(thread.len(), count - 1);

            let expected: Vec<&RentalComment> =
                items.iter().filter(|c| c.id.as_str() != target).collect();
            let actual: Vec<&RentalComment> = thread.items().iter().collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
