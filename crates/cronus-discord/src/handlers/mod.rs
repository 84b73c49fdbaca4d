//! Gateway event handlers.
//!
//! Each handler converts a serenity event into the neutral `cronus-core`
//! type and hands it to `SupportBot`. Failures are logged; the gateway loop
//! never sees them.

use std::sync::Arc;

use serenity::{
    client::Context,
    model::{
        application::ComponentInteraction,
        channel::{Message, Reaction},
    },
};

use crate::router::AppState;

mod interaction;
mod message;
mod reaction;

pub async fn handle_message(msg: Message, state: Arc<AppState>) {
    message::handle_message(msg, state).await
}

pub async fn handle_reaction(reaction: Reaction, state: Arc<AppState>) {
    reaction::handle_reaction(reaction, state).await
}

pub async fn handle_component(ctx: Context, component: ComponentInteraction, state: Arc<AppState>) {
    interaction::handle_component(ctx, component, state).await
}
