//! Role-gated endpoints.

use axum::Json;
use common::Role;

use crate::{api::Message, Context, Error};

/// Reveals the administrators' secret.
///
/// # Errors
///
/// If the request is not authenticated as an [`Role::Admin`].
pub async fn secret(ctx: Context) -> Result<Json<Message>, Error> {
    _ = ctx.require_any_role(Role::Admin.into()).await?;

    Ok(Json(Message {
        message: "Admins only",
    }))
}

/// Shows the moderation queue.
///
/// # Errors
///
/// If the request is not authenticated as a [`Role::Moderator`] or an
/// [`Role::Admin`].
pub async fn moderation_queue(ctx: Context) -> Result<Json<Message>, Error> {
    let principal = ctx.require_any_role(Role::Admin | Role::Moderator).await?;
    tracing::debug!(user = %principal.id, "moderation queue inspected");

    Ok(Json(Message {
        message: "Moderation queue is empty",
    }))
}
