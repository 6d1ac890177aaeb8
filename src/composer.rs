//! MIME composition and transport encoding for auto-replies

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Mailbox, MultiPart, SinglePart};

use crate::config::ReplyConfig;
use crate::error::{AutoReplyError, Result};
use crate::models::{Message, ReplyOptions, TextEncoding};

/// Placeholder in the subject template replaced by the original subject
pub const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// Build the reply to `original`, addressed to `sender` and sent from `from`
///
/// Threading headers point at the original's Message-ID when it has one,
/// otherwise at the Gmail message id.
pub fn build_reply(original: &Message, sender: &str, from: &str, reply: &ReplyConfig) -> ReplyOptions {
    let message_id = original.header("Message-ID").map(str::trim);
    let in_reply_to = message_id.unwrap_or(&original.id).to_string();

    let references = message_id.map(|id| match original.header("References") {
        Some(refs) if !refs.trim().is_empty() => format!("{} {}", refs.trim(), id),
        _ => id.to_string(),
    });

    let original_subject = original.header("Subject").unwrap_or("").trim();

    ReplyOptions {
        from: from.to_string(),
        to: sender.to_string(),
        reply_to: sender.to_string(),
        in_reply_to,
        references,
        subject: reply.subject.replace(SUBJECT_PLACEHOLDER, original_subject),
        text: reply.text.clone(),
        html: reply.html.clone(),
        text_encoding: reply.text_encoding,
    }
}

/// Compose a multipart/alternative reply and return its RFC 5322 bytes
pub fn compose(options: &ReplyOptions) -> Result<Vec<u8>> {
    let mut builder = lettre::Message::builder()
        .from(parse_mailbox("From", &options.from)?)
        .to(parse_mailbox("To", &options.to)?)
        .reply_to(parse_mailbox("Reply-To", &options.reply_to)?)
        .in_reply_to(options.in_reply_to.clone())
        .subject(options.subject.clone());

    if let Some(references) = &options.references {
        builder = builder.references(references.clone());
    }

    let encoding = transfer_encoding(options.text_encoding);
    let body = MultiPart::alternative()
        .singlepart(text_part(ContentType::TEXT_PLAIN, &options.text, encoding))
        .singlepart(text_part(ContentType::TEXT_HTML, &options.html, encoding));

    let message = builder
        .multipart(body)
        .map_err(|e| AutoReplyError::Compose(format!("Failed to build reply: {}", e)))?;

    Ok(message.formatted())
}

/// Base64url without padding, the format the send API expects in `raw`
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn parse_mailbox(header: &str, address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| AutoReplyError::Compose(format!("Invalid {} address '{}': {}", header, address, e)))
}

fn text_part(content_type: ContentType, body: &str, encoding: ContentTransferEncoding) -> SinglePart {
    SinglePart::builder()
        .header(content_type)
        .header(encoding)
        .body(body.to_string())
}

fn transfer_encoding(encoding: TextEncoding) -> ContentTransferEncoding {
    match encoding {
        TextEncoding::Base64 => ContentTransferEncoding::Base64,
        TextEncoding::QuotedPrintable => ContentTransferEncoding::QuotedPrintable,
        TextEncoding::SevenBit => ContentTransferEncoding::SevenBit,
        TextEncoding::EightBit => ContentTransferEncoding::EightBit,
    }
}
