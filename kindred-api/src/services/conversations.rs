//! Messages and the conversation views derived from them.
//!
//! Nothing here is cached: threads and unread counts are recomputed from the
//! message rows on every read.

use metrics::counter;
use serde::Serialize;
use std::collections::HashMap;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Message, MessageType, MessageWithSender, NewMessage, User};
use crate::services::{accounts, moderation};
use crate::store::Store;

pub const MAX_MESSAGE_LEN: usize = 2000;

pub fn send_message(
    store: &dyn Store,
    sender_id: i32,
    receiver_id: i32,
    content: &str,
    message_type: MessageType,
    enforce_blocks: bool,
) -> AppResult<Message> {
    if sender_id == receiver_id {
        return Err(AppError::new(ErrorCode::CannotMessageSelf, "you cannot message yourself"));
    }
    if content.trim().is_empty() {
        return Err(AppError::validation("message content is required"));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::validation(format!(
            "message content must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    accounts::require_user(store, sender_id)?;
    accounts::require_user(store, receiver_id)?;
    if enforce_blocks {
        moderation::ensure_not_blocked(store, sender_id, receiver_id)?;
    }

    let message = store.create_message(NewMessage {
        sender_id,
        receiver_id,
        content: content.to_string(),
        message_type: message_type.as_str().to_string(),
        is_read: false,
    })?;

    counter!("messages_sent_total", "type" => message_type.as_str()).increment(1);
    tracing::info!(message_id = message.id, sender_id, receiver_id, "message sent");
    Ok(message)
}

/// Attaches each message's sender. Messages whose sender row is gone are
/// dropped, the same as an inner join would.
fn with_senders(store: &dyn Store, messages: Vec<Message>) -> AppResult<Vec<MessageWithSender>> {
    let mut senders: HashMap<i32, Option<User>> = HashMap::new();
    let mut annotated = Vec::with_capacity(messages.len());

    for message in messages {
        let sender = match senders.get(&message.sender_id) {
            Some(cached) => cached.clone(),
            None => {
                let fetched = store.get_user(message.sender_id)?;
                senders.insert(message.sender_id, fetched.clone());
                fetched
            }
        };
        if let Some(sender) = sender {
            annotated.push(MessageWithSender { message, sender });
        }
    }

    Ok(annotated)
}

/// Every message sent or received by `user_id`, newest first.
pub fn conversations_for_user(store: &dyn Store, user_id: i32) -> AppResult<Vec<MessageWithSender>> {
    let messages = store.messages_involving(user_id)?;
    with_senders(store, messages)
}

/// The whole exchange between two users in both directions, newest first.
pub fn messages_between(store: &dyn Store, a: i32, b: i32) -> AppResult<Vec<MessageWithSender>> {
    let messages = store.messages_between(a, b)?;
    with_senders(store, messages)
}

/// Flags a message as read. Unknown ids are ignored.
pub fn mark_message_read(store: &dyn Store, message_id: i32) -> AppResult<bool> {
    let updated = store.mark_message_read(message_id)?;
    if !updated {
        tracing::debug!(message_id, "mark-read for unknown message ignored");
    }
    Ok(updated)
}

#[derive(Debug, Serialize, Clone)]
pub struct ConversationSummary {
    /// The other participant.
    pub user_id: i32,
    pub last_message: MessageWithSender,
    pub unread_count: usize,
}

/// Groups `messages` (newest first, all involving `user_id`) into one thread
/// per counterparty. Threads keep the order of their latest message; the
/// unread count is the number of messages addressed to `user_id` that are
/// still unread.
pub fn summarize_conversations(user_id: i32, messages: &[MessageWithSender]) -> Vec<ConversationSummary> {
    let mut threads: Vec<ConversationSummary> = Vec::new();
    let mut index: HashMap<i32, usize> = HashMap::new();

    for entry in messages {
        let message = &entry.message;
        if !message.involves(user_id) {
            continue;
        }
        let other = message.counterparty(user_id);
        let slot = *index.entry(other).or_insert_with(|| {
            threads.push(ConversationSummary {
                user_id: other,
                last_message: entry.clone(),
                unread_count: 0,
            });
            threads.len() - 1
        });

        if message.receiver_id == user_id && !message.is_read {
            threads[slot].unread_count += 1;
        }
    }

    threads
}

pub fn conversation_summaries(store: &dyn Store, user_id: i32) -> AppResult<Vec<ConversationSummary>> {
    let messages = conversations_for_user(store, user_id)?;
    Ok(summarize_conversations(user_id, &messages))
}
