use std::sync::Arc;

use async_trait::async_trait;

use serenity::{
    client::{Client, Context, EventHandler},
    gateway::ActivityData,
    model::{
        application::Interaction,
        channel::{Message, Reaction},
        gateway::{GatewayIntents, Ready},
    },
};

use cronus_core::{bot::SupportBot, config::Config};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub bot: Arc<SupportBot>,
}

struct Handler {
    state: Arc<AppState>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        ctx.set_activity(Some(ActivityData::playing(&self.state.cfg.presence)));
        tracing::info!(
            user = %ready.user.name,
            id = ready.user.id.get(),
            guilds = ready.guilds.len(),
            "logged in"
        );
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        handlers::handle_message(msg, self.state.clone()).await;
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        handlers::handle_reaction(reaction, self.state.clone()).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            handlers::handle_component(ctx, component, self.state.clone()).await;
        }
    }
}

/// Default intents plus message content, which prefix commands need.
pub fn intents() -> GatewayIntents {
    GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT
}

pub async fn run_gateway(cfg: Arc<Config>, bot: Arc<SupportBot>) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        bot,
    });

    let mut client = Client::builder(&cfg.discord_token, intents())
        .event_handler(Handler { state })
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("shutting down");
        shard_manager.shutdown_all().await;
    });

    tracing::info!(prefix = %cfg.command_prefix, "starting gateway");
    client.start_autosharded().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_include_message_content_and_reactions() {
        let i = intents();
        assert!(i.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(i.contains(GatewayIntents::GUILD_MESSAGE_REACTIONS));
        assert!(i.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(!i.contains(GatewayIntents::GUILD_MEMBERS));
    }
}
