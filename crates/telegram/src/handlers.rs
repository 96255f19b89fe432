use {
    teloxide::types::{MediaKind, Message, MessageKind},
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use {
    tunedrop_common::RequestContext,
    tunedrop_media::{RequestHandler, RequestOutcome},
};

use crate::text::truncate_at_char_boundary;

/// Longest text preview written to debug logs.
const LOG_PREVIEW_LEN: usize = 80;

/// Run one inbound message through the pipeline.
///
/// The reply target is the message's chat. Messages without text (stickers,
/// bare media) go through as empty input and receive the validation reply.
pub async fn handle_message(
    msg: Message,
    handler: &RequestHandler,
    cancel: CancellationToken,
) -> RequestOutcome {
    let ctx = RequestContext::new(msg.chat.id.0.to_string(), cancel);
    let text = extract_text(&msg).unwrap_or_default();
    debug!(
        chat_id = %ctx.session_id,
        text = truncate_at_char_boundary(&text, LOG_PREVIEW_LEN),
        "received telegram message"
    );
    handler.handle(&text, &ctx).await
}

/// Message text, or the caption of a media message.
fn extract_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.clone()),
            MediaKind::Photo(p) => p.caption.clone(),
            MediaKind::Document(d) => d.caption.clone(),
            MediaKind::Audio(a) => a.caption.clone(),
            MediaKind::Voice(v) => v.caption.clone(),
            MediaKind::Video(vid) => vid.caption.clone(),
            MediaKind::Animation(a) => a.caption.clone(),
            _ => None,
        },
        _ => None,
    }
}
