use std::sync::Arc;

use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage},
    client::Context,
    model::application::ComponentInteraction,
};

use cronus_core::{
    domain::{ChannelId, GuildId, MessageId, MessageRef, RoleId, UserId},
    messaging::types::{self, ComponentReply},
};

use crate::{build_components, build_embed, router::AppState, truncate};

pub(crate) fn component_interaction(component: &ComponentInteraction) -> types::ComponentInteraction {
    types::ComponentInteraction {
        custom_id: component.data.custom_id.clone(),
        user_id: UserId(component.user.id.get()),
        guild_id: component.guild_id.map(|g| GuildId(g.get())),
        member_roles: component
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| RoleId(r.get())).collect())
            .unwrap_or_default(),
        message: MessageRef::new(
            ChannelId(component.channel_id.get()),
            MessageId(component.message.id.get()),
        ),
    }
}

pub(crate) fn build_response(reply: &ComponentReply) -> CreateInteractionResponse {
    match reply {
        ComponentReply::Acknowledge => CreateInteractionResponse::Acknowledge,
        ComponentReply::Ephemeral { text, .. } => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(truncate(text))
                .ephemeral(true),
        ),
        ComponentReply::Update(msg) => {
            let mut data = CreateInteractionResponseMessage::new()
                .components(build_components(&msg.buttons));
            if let Some(content) = &msg.content {
                data = data.content(truncate(content));
            }
            if let Some(embed) = &msg.embed {
                data = data.embed(build_embed(embed));
            }
            CreateInteractionResponse::UpdateMessage(data)
        }
    }
}

pub async fn handle_component(ctx: Context, component: ComponentInteraction, state: Arc<AppState>) {
    let interaction = component_interaction(&component);
    let reply = state.bot.handle_component(&interaction).await;

    if let Err(e) = component
        .create_response(&ctx.http, build_response(&reply))
        .await
    {
        // The Quick Delete flow may already have removed the message.
        tracing::warn!(custom_id = %interaction.custom_id, error = %e, "failed to answer interaction");
        return;
    }

    if let ComponentReply::Ephemeral {
        delete_after: Some(after),
        ..
    } = reply
    {
        let http = ctx.http.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Err(e) = component.delete_response(&http).await {
                tracing::debug!(error = %e, "failed to delete ephemeral reply");
            }
        });
    }
}
