use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::backend::{self, Backend, HttpResult, RowQuery};
use crate::capabilities::{Capabilities, RealtimeOutput, Route};
use crate::cards::{merge_cards, GroupCard, GroupCardView, StoreCard, StoreCardView};
use crate::event::Event;
use crate::message::{ChatRoom, MessageBubbleView};
use crate::model::{Group, Model, PostId, Session, Store, UserId};
use crate::rental::{ChannelSpec, DeletePlan, LoadStep, RentalDetail, RentalView};
use crate::{
    AppError, ErrorKind, ErrorSeverity, GROUPS_TABLE, MESSAGES_TABLE, PROFILES_TABLE,
    PROFILE_COLUMNS, RENTAL_COMMENTS_TABLE, RENTAL_POSTS_TABLE, STORES_TABLE,
};

const NOT_CONFIGURED: &str = "The app is not connected to a backend yet.";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub rental: Option<RentalView>,
    pub groups: Vec<GroupCardView>,
    pub stores: Vec<StoreCardView>,
    pub messages: Vec<MessageBubbleView>,
    /// Blocking notice the shell shows until `AlertDismissed`.
    pub alert: Option<String>,
    pub error: Option<UserFacingError>,
    pub is_signed_in: bool,
}

#[derive(Default)]
pub struct App;

fn not_configured() -> AppError {
    AppError::new(ErrorKind::Configuration, NOT_CONFIGURED)
}

impl App {
    /// Attaches the `apikey` and bearer headers every backend call carries.
    fn authorized(
        builder: crux_http::RequestBuilder<Event>,
        backend: &Backend,
        session: &Session,
    ) -> crux_http::RequestBuilder<Event> {
        let [(apikey, key), (authorization, bearer)] = backend.auth_headers(session);
        builder
            .header(apikey, key.as_str())
            .header(authorization, bearer.as_str())
    }

    fn fetch_rows<F>(
        backend: Option<&Backend>,
        session: &Session,
        caps: &Capabilities,
        query: &RowQuery,
        callback: F,
    ) -> Result<(), AppError>
    where
        F: FnOnce(HttpResult) -> Event + Send + 'static,
    {
        let backend = backend.ok_or_else(not_configured)?;
        let url = backend.rows_url(query);
        Self::authorized(caps.http.get(&url), backend, session).send(callback);
        Ok(())
    }

    // --- Rental detail ---

    fn open_rental(rental_id: PostId, model: &mut Model, caps: &Capabilities) {
        if model
            .rental
            .as_ref()
            .is_some_and(|r| r.rental_id == rental_id)
        {
            debug!(rental_id = %rental_id, "rental already mounted");
            return;
        }
        Self::close_rental(model, caps);

        let mut rental = RentalDetail::continuing_from(rental_id.clone(), model.load_seq);
        let spec = ChannelSpec::for_post_comments(&rental_id);
        info!(rental_id = %rental_id, channel = %spec.channel, "subscribing to comment changes");
        caps.realtime.subscribe(spec.clone(), move |output| Event::CommentsChanged {
            rental_id: rental_id.clone(),
            output,
        });
        rental.subscription = Some(spec);
        model.rental = Some(rental);

        Self::load_rental(model, caps);
    }

    fn close_rental(model: &mut Model, caps: &Capabilities) {
        let Some(rental) = model.rental.take() else {
            return;
        };
        if let Some(spec) = rental.subscription {
            info!(rental_id = %rental.rental_id, channel = %spec.channel, "unsubscribing");
            caps.realtime.unsubscribe(spec.channel);
        }
    }

    fn load_rental(model: &mut Model, caps: &Capabilities) {
        let Some(rental) = model.rental.as_mut() else {
            return;
        };
        let seq = rental.begin_load();
        model.load_seq = seq;
        let rental_id = rental.rental_id.clone();
        let query = RowQuery::table(RENTAL_POSTS_TABLE).eq("id", &rental_id);

        let sent = Self::fetch_rows(
            model.backend.as_ref(),
            &model.session,
            caps,
            &query,
            move |result| Event::PostFetched {
                rental_id,
                seq,
                result: Box::new(backend::decode_single(result, "Rental post")),
            },
        );
        if let Err(e) = sent {
            rental.fail(&e.user_facing_message());
        }
    }

    /// Author profile and comment thread go out together once the post is in.
    fn fetch_secondaries(
        rental_id: &PostId,
        seq: u64,
        post_id: &PostId,
        author_id: &UserId,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let author_query = RowQuery::table(PROFILES_TABLE)
            .select(PROFILE_COLUMNS)
            .eq("id", author_id);
        let comments_query = RowQuery::table(RENTAL_COMMENTS_TABLE)
            .select(format!("*,profiles({PROFILE_COLUMNS})"))
            .eq("post_id", post_id)
            .order_asc("created_at");
        let author_rental_id = rental_id.clone();
        let comments_rental_id = rental_id.clone();

        let sent = Self::fetch_rows(
            model.backend.as_ref(),
            &model.session,
            caps,
            &author_query,
            move |result| Event::AuthorFetched {
                rental_id: author_rental_id,
                seq,
                result: backend::decode_first(result),
            },
        )
        .and_then(|()| {
            Self::fetch_rows(
                model.backend.as_ref(),
                &model.session,
                caps,
                &comments_query,
                move |result| Event::CommentsFetched {
                    rental_id: comments_rental_id,
                    seq,
                    result: backend::decode_rows(result),
                },
            )
        });

        if let (Err(e), Some(rental)) = (sent, model.rental.as_mut()) {
            rental.fail(&e.user_facing_message());
        }
    }

    fn handle_load_step(step: LoadStep, model: &mut Model, caps: &Capabilities) {
        match step {
            LoadStep::FetchSecondaries { post_id, author_id } => {
                let Some((rental_id, seq)) = model
                    .rental
                    .as_ref()
                    .map(|r| (r.rental_id.clone(), r.seq()))
                else {
                    return;
                };
                Self::fetch_secondaries(&rental_id, seq, &post_id, &author_id, model, caps);
            }
            LoadStep::Stale => {
                debug!("dropping response from a superseded load");
                return;
            }
            LoadStep::Waiting => trace!("rental join still waiting"),
            LoadStep::Committed | LoadStep::Failed => {}
        }
        caps.render.render();
    }

    fn comments_changed(
        rental_id: &PostId,
        output: RealtimeOutput,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        if !model.rental.as_ref().is_some_and(|r| r.rental_id == *rental_id) {
            debug!(channel = output.channel(), "ignoring output for an unmounted rental");
            return;
        }
        match output {
            RealtimeOutput::Change { channel, kind } => {
                info!(%channel, ?kind, "comments changed, reloading rental");
                Self::load_rental(model, caps);
                caps.render.render();
            }
            RealtimeOutput::Subscribed { channel } => debug!(%channel, "subscribed"),
            RealtimeOutput::Closed { channel } => debug!(%channel, "channel closed"),
            RealtimeOutput::Error { channel, message } => {
                warn!(%channel, error = %message, "realtime channel error");
            }
        }
    }

    fn start_delete(plan: DeletePlan, model: &mut Model, caps: &Capabilities) {
        if plan.image_keys.is_empty() {
            Self::delete_post_record(plan.post_id, model, caps);
            return;
        }
        let Some(api) = model.backend.as_ref() else {
            Self::delete_post_record(plan.post_id, model, caps);
            return;
        };

        let body = match Backend::remove_objects_body(&plan.image_keys) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "skipping image removal");
                Self::delete_post_record(plan.post_id, model, caps);
                return;
            }
        };

        info!(post_id = %plan.post_id, images = plan.image_keys.len(), "removing listing images");
        let post_id = plan.post_id;
        let mut builder = caps.http.delete(api.bucket_url());
        builder = Self::authorized(builder, api, &model.session)
            .header("Content-Type", "application/json")
            .body_bytes(body);
        builder.send(move |result| Event::ImagesRemoved {
            post_id,
            result: backend::expect_success(result),
        });
    }

    fn delete_post_record(post_id: PostId, model: &mut Model, caps: &Capabilities) {
        let Some(api) = model.backend.as_ref() else {
            Self::delete_failed(&not_configured(), model);
            caps.render.render();
            return;
        };

        info!(post_id = %post_id, "deleting listing record");
        let url = api.rows_url(&RowQuery::table(RENTAL_POSTS_TABLE).eq("id", &post_id));
        Self::authorized(caps.http.delete(&url), api, &model.session).send(move |result| {
            Event::PostDeleted {
                post_id,
                result: backend::expect_success(result),
            }
        });
    }

    fn delete_failed(e: &AppError, model: &mut Model) {
        error!(error = %e, "listing delete failed");
        if let Some(rental) = model.rental.as_mut() {
            rental.delete_finished();
        }
        model.show_alert(format!("Failed to delete listing: {}", e.message));
    }

    // --- Listings ---

    fn fetch_groups(model: &mut Model, caps: &Capabilities) {
        let query = RowQuery::table(GROUPS_TABLE).select("*,group_members(count)");
        if let Err(e) = Self::fetch_rows(
            model.backend.as_ref(),
            &model.session,
            caps,
            &query,
            |result| Event::GroupsFetched(backend::decode_rows(result)),
        ) {
            model.set_error(e);
            caps.render.render();
        }
    }

    fn fetch_stores(model: &mut Model, caps: &Capabilities) {
        let query = RowQuery::table(STORES_TABLE).select(format!(
            "*,profiles({PROFILE_COLUMNS}),store_ratings(rating)"
        ));
        if let Err(e) = Self::fetch_rows(
            model.backend.as_ref(),
            &model.session,
            caps,
            &query,
            |result| Event::StoresFetched(backend::decode_rows(result)),
        ) {
            model.set_error(e);
            caps.render.render();
        }
    }

    fn groups_fetched(rows: Vec<Group>, model: &mut Model) {
        let Some(backend) = model.backend.as_ref() else {
            return;
        };
        let resolver = backend.resolver();
        merge_cards(
            &mut model.groups,
            rows,
            |c: &GroupCard| c.group.id.as_str(),
            |g: &Group| g.id.as_str(),
            |g| GroupCard::new(g, resolver),
            |c, g| c.refresh(g, resolver),
        );
    }

    fn stores_fetched(rows: Vec<Store>, model: &mut Model) {
        let Some(backend) = model.backend.as_ref() else {
            return;
        };
        let resolver = backend.resolver();
        merge_cards(
            &mut model.stores,
            rows,
            |c: &StoreCard| c.store.id.as_str(),
            |s: &Store| s.id.as_str(),
            |s| StoreCard::new(s, resolver),
            |c, s| c.refresh(s, resolver),
        );
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if event.is_high_frequency() {
            trace!(event = event.name(), "update");
        } else {
            debug!(event = event.name(), "update");
        }

        match event {
            Event::Configure(config) => {
                match Backend::new(&config) {
                    Ok(backend) => {
                        info!(?backend, "backend configured");
                        model.backend = Some(backend);
                        model.clear_error();
                    }
                    Err(e) => {
                        error!(error = %e, "rejected backend configuration");
                        model.set_error(e.into());
                    }
                }
                caps.render.render();
            }

            Event::SessionChanged {
                user_id,
                access_token,
            } => {
                info!(signed_in = user_id.is_some(), "session changed");
                model.session = Session {
                    user_id,
                    access_token,
                };
                if let Some(rental) = model.rental.as_mut() {
                    if !rental.is_owner(model.session.user_id.as_ref()) {
                        rental.close_menu();
                        rental.cancel_delete();
                    }
                }
                caps.render.render();
            }

            // --- Rental detail ---
            Event::RentalOpened { rental_id } => {
                Self::open_rental(rental_id, model, caps);
                caps.render.render();
            }

            Event::RentalClosed => {
                Self::close_rental(model, caps);
                caps.render.render();
            }

            Event::NextImage => {
                if let Some(rental) = model.rental.as_mut() {
                    rental.carousel.next();
                }
                caps.render.render();
            }

            Event::PrevImage => {
                if let Some(rental) = model.rental.as_mut() {
                    rental.carousel.prev();
                }
                caps.render.render();
            }

            Event::MenuToggled => {
                if let Some(rental) = model.rental.as_mut() {
                    rental.toggle_menu(model.session.user_id.as_ref());
                }
                caps.render.render();
            }

            Event::PointerDownOutsideMenu => {
                if let Some(rental) = model.rental.as_mut() {
                    if rental.menu_open {
                        rental.close_menu();
                        caps.render.render();
                    }
                }
            }

            Event::EditRequested => {
                let Some(rental) = model.rental.as_mut() else {
                    return;
                };
                rental.close_menu();
                if rental.is_owner(model.session.user_id.as_ref()) {
                    caps.navigation.go(Route::RentalEdit {
                        id: rental.rental_id.clone(),
                    });
                } else {
                    warn!(rental_id = %rental.rental_id, "edit requested by non-owner");
                }
                caps.render.render();
            }

            Event::DeleteRequested => {
                if let Some(rental) = model.rental.as_mut() {
                    if !rental.request_delete(model.session.user_id.as_ref()) {
                        debug!(rental_id = %rental.rental_id, "delete request ignored");
                    }
                }
                caps.render.render();
            }

            Event::DeleteCancelled => {
                if let Some(rental) = model.rental.as_mut() {
                    rental.cancel_delete();
                }
                caps.render.render();
            }

            Event::DeleteConfirmed => {
                let plan = model.rental.as_mut().and_then(RentalDetail::confirm_delete);
                if let Some(plan) = plan {
                    Self::start_delete(plan, model, caps);
                }
                caps.render.render();
            }

            Event::ImagesRemoved { post_id, result } => {
                if let Err(e) = result {
                    warn!(post_id = %post_id, error = %e, "image removal failed, deleting record anyway");
                }
                if let Some(rental) = model.rental.as_mut() {
                    rental.images_removed();
                }
                Self::delete_post_record(post_id, model, caps);
            }

            Event::PostDeleted { post_id, result } => {
                match result {
                    Ok(()) => {
                        info!(post_id = %post_id, "listing deleted");
                        if let Some(rental) = model.rental.as_mut() {
                            rental.delete_finished();
                        }
                        caps.navigation.go(Route::Rentals);
                    }
                    Err(e) => Self::delete_failed(&e, model),
                }
                caps.render.render();
            }

            Event::MapLinkOpened => {
                let link = match (&model.rental, &model.backend) {
                    (Some(rental), Some(backend)) => rental
                        .post
                        .as_ref()
                        .and_then(|p| p.effective_map_link(backend.map_base_url())),
                    _ => None,
                };
                match link {
                    Some(url) => caps.navigation.go(Route::External { url }),
                    None => debug!("no map link for this listing"),
                }
            }

            Event::CommentCreated(comment) => {
                if let Some(rental) = model.rental.as_mut() {
                    if comment.post_id == rental.rental_id {
                        rental.comments.append(comment);
                    }
                }
                caps.render.render();
            }

            Event::CommentUpdated(comment) => {
                if let Some(rental) = model.rental.as_mut() {
                    if !rental.comments.replace(comment) {
                        debug!("updated comment is not in the thread");
                    }
                }
                caps.render.render();
            }

            Event::CommentDeleted { comment_id } => {
                if let Some(rental) = model.rental.as_mut() {
                    rental.comments.remove(&comment_id);
                }
                caps.render.render();
            }

            Event::AlertDismissed => {
                model.alert = None;
                caps.render.render();
            }

            Event::ErrorDismissed => {
                model.clear_error();
                caps.render.render();
            }

            Event::PostFetched {
                rental_id,
                seq,
                result,
            } => {
                let Some(rental) = model.rental.as_mut().filter(|r| r.rental_id == rental_id)
                else {
                    debug!(rental_id = %rental_id, "dropping post for an unmounted rental");
                    return;
                };
                let step = rental.post_fetched(seq, *result);
                Self::handle_load_step(step, model, caps);
            }

            Event::AuthorFetched {
                rental_id,
                seq,
                result,
            } => {
                let mounted = model.rental.as_mut().filter(|r| r.rental_id == rental_id);
                let (Some(rental), Some(backend)) = (mounted, model.backend.as_ref()) else {
                    debug!(rental_id = %rental_id, "dropping author for an unmounted rental");
                    return;
                };
                let step = rental.author_fetched(seq, result, backend.resolver());
                Self::handle_load_step(step, model, caps);
            }

            Event::CommentsFetched {
                rental_id,
                seq,
                result,
            } => {
                let mounted = model.rental.as_mut().filter(|r| r.rental_id == rental_id);
                let (Some(rental), Some(backend)) = (mounted, model.backend.as_ref()) else {
                    debug!(rental_id = %rental_id, "dropping comments for an unmounted rental");
                    return;
                };
                let step = rental.comments_fetched(seq, result, backend.resolver());
                Self::handle_load_step(step, model, caps);
            }

            Event::CommentsChanged { rental_id, output } => {
                Self::comments_changed(&rental_id, output, model, caps);
            }

            // --- Listings ---
            Event::GroupsRequested => Self::fetch_groups(model, caps),

            Event::StoresRequested => Self::fetch_stores(model, caps),

            Event::GroupsFetched(result) => {
                match result {
                    Ok(rows) => {
                        info!(count = rows.len(), "groups loaded");
                        Self::groups_fetched(rows, model);
                    }
                    Err(e) => {
                        warn!(error = %e, "groups fetch failed");
                        model.set_error(e);
                    }
                }
                caps.render.render();
            }

            Event::StoresFetched(result) => {
                match result {
                    Ok(rows) => {
                        info!(count = rows.len(), "stores loaded");
                        Self::stores_fetched(rows, model);
                    }
                    Err(e) => {
                        warn!(error = %e, "stores fetch failed");
                        model.set_error(e);
                    }
                }
                caps.render.render();
            }

            Event::GroupTapped { group_id } => caps.navigation.go(Route::Group { id: group_id }),

            Event::StoreTapped { store_id } => caps.navigation.go(Route::Store { id: store_id }),

            // --- Chat ---
            Event::ChatOpened { group_id } => {
                if model.chat.as_ref().is_some_and(|c| c.group_id == group_id) {
                    return;
                }
                model.chat = Some(ChatRoom::new(group_id.clone()));
                let query = RowQuery::table(MESSAGES_TABLE)
                    .eq("group_id", &group_id)
                    .order_asc("created_at");
                if let Err(e) = Self::fetch_rows(
                    model.backend.as_ref(),
                    &model.session,
                    caps,
                    &query,
                    move |result| Event::MessagesFetched {
                        group_id,
                        result: backend::decode_rows(result),
                    },
                ) {
                    model.set_error(e);
                }
                caps.render.render();
            }

            Event::ChatClosed => {
                model.chat = None;
                caps.render.render();
            }

            Event::MessagesFetched { group_id, result } => {
                let (Some(chat), Some(backend)) = (model.chat.as_mut(), model.backend.as_ref())
                else {
                    return;
                };
                if chat.group_id != group_id {
                    debug!(group_id = %group_id, "dropping messages for a closed chat");
                    return;
                }
                match result {
                    Ok(messages) => chat.replace_all(messages, backend.resolver()),
                    Err(e) => {
                        warn!(error = %e, "messages fetch failed");
                        model.set_error(e);
                    }
                }
                caps.render.render();
            }

            Event::MessageReceived(message) => {
                if let (Some(chat), Some(backend)) = (model.chat.as_mut(), model.backend.as_ref()) {
                    chat.upsert(message, backend.resolver());
                    caps.render.render();
                }
            }

            Event::AudioToggled { message_id } => {
                let Some(bubble) = model.chat.as_mut().and_then(|c| c.bubble_mut(&message_id))
                else {
                    return;
                };
                if !bubble.has_audio() {
                    return;
                }
                let command = bubble.player.toggle();
                caps.audio.send(message_id, command);
                caps.render.render();
            }

            Event::AudioLoaded {
                message_id,
                duration,
                current_time,
            } => {
                if let Some(bubble) = model.chat.as_mut().and_then(|c| c.bubble_mut(&message_id)) {
                    bubble.player.loaded(duration, current_time);
                    caps.render.render();
                }
            }

            Event::AudioTimeUpdated {
                message_id,
                current_time,
            } => {
                if let Some(bubble) = model.chat.as_mut().and_then(|c| c.bubble_mut(&message_id)) {
                    bubble.player.time_updated(current_time);
                    caps.render.render();
                }
            }

            Event::AudioEnded { message_id } => {
                if let Some(bubble) = model.chat.as_mut().and_then(|c| c.bubble_mut(&message_id)) {
                    bubble.player.ended();
                    caps.render.render();
                }
            }

            Event::ImageOpened { message_id } => {
                let url = model
                    .chat
                    .as_ref()
                    .and_then(|c| c.bubble(&message_id))
                    .and_then(|b| b.image_url().map(str::to_string));
                if let Some(url) = url {
                    caps.navigation.go(Route::External { url });
                }
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let viewer = model.viewer();

        let rental = model.rental.as_ref().map(|rental| match &model.backend {
            Some(backend) => rental.view(viewer, backend.map_base_url(), backend.resolver()),
            None => RentalView::Failed {
                message: NOT_CONFIGURED.to_string(),
            },
        });

        ViewModel {
            rental,
            groups: model.groups.iter().map(GroupCard::view).collect(),
            stores: model.stores.iter().map(StoreCard::view).collect(),
            messages: model
                .chat
                .as_ref()
                .map(|chat| chat.view(viewer))
                .unwrap_or_default(),
            alert: model.alert.clone(),
            error: model.active_error.as_ref().map(UserFacingError::from),
            is_signed_in: viewer.is_some(),
        }
    }
}
