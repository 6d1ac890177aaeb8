use crate::error::{AutoReplyError, Result};
use crate::models::{Message, Thread, LABEL_DRAFT, LABEL_SENT};

/// True when no message in the thread was sent or drafted by the mailbox owner
///
/// An empty thread has nothing to reply to and never needs a reply.
pub fn needs_reply(thread: &Thread) -> bool {
    !thread.messages.is_empty()
        && !thread
            .messages
            .iter()
            .any(|m| m.has_label(LABEL_SENT) || m.has_label(LABEL_DRAFT))
}

/// Sender address from the message's From header
///
/// For `Name <address>` the text between the first `<` and the last `>` is
/// returned. A bare address, or a value without a well-formed bracket pair,
/// is returned whole.
pub fn extract_sender(message: &Message) -> Result<String> {
    let from = message.header("From").ok_or_else(|| {
        AutoReplyError::InvalidMessage(format!("Message {} has no From header", message.id))
    })?;

    let address = match (from.find('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => &from[start + 1..end],
        _ => from,
    }
    .trim();

    if address.is_empty() {
        return Err(AutoReplyError::InvalidMessage(format!(
            "Message {} has an empty From address",
            message.id
        )));
    }

    Ok(address.to_string())
}
