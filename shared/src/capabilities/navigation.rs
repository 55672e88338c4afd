use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use serde::{Deserialize, Serialize};

use crate::model::{GroupId, PostId, StoreId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "route", content = "params", rename_all = "snake_case")]
pub enum Route {
    Rentals,
    RentalEdit { id: PostId },
    Group { id: GroupId },
    Store { id: StoreId },
    /// Opened outside the app, e.g. a full-size image or a map link.
    External { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavigationOperation {
    pub route: Route,
}

impl Operation for NavigationOperation {
    type Output = ();
}

#[derive(Capability)]
pub struct Navigation<Ev> {
    context: CapabilityContext<NavigationOperation, Ev>,
}

impl<Ev> Navigation<Ev> {
    pub fn new(context: CapabilityContext<NavigationOperation, Ev>) -> Self {
        Self { context }
    }
}

impl<Ev> Navigation<Ev>
where
    Ev: 'static,
{
    pub fn go(&self, route: Route) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(NavigationOperation { route }).await;
        });
    }
}
