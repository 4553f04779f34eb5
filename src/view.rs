//! Read models returned by the API.
//!
//! Persisted rows never serialize straight into responses; each endpoint
//! assembles one of these views so the storage schema can move without
//! changing the wire shape.

use crate::media::MediaStore;
use crate::model::{Category, Condition, Item, ItemImage, Swap, SwapMessage, SwapStatus, User};
use crate::{ItemId, MessageId, SwapId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// An item with its image URLs made absolute.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub brand: String,
    pub size: String,
    pub color: String,
    pub condition: Condition,
    pub tags: String,
    pub status: String,
    pub points: i64,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ItemView {
    pub fn assemble(
        item: Item,
        images: Vec<ItemImage>,
        media: &MediaStore,
        public_base: &str,
    ) -> Self {
        let images = images
            .iter()
            .map(|image| media.url_for(public_base, &image.file_name))
            .collect();

        Self {
            id: item.id,
            owner: item.owner_id,
            title: item.title,
            description: item.description,
            category: item.category,
            brand: item.brand,
            size: item.size,
            color: item.color,
            condition: item.condition,
            tags: item.tags,
            status: item.status,
            points: item.points,
            images,
            created_at: item.created_at,
        }
    }
}

/// A swap with both items embedded in full, plus the raw participant ids.
#[derive(Debug, Clone, Serialize)]
pub struct SwapView {
    pub id: SwapId,
    pub proposer: UserId,
    pub receiver: UserId,
    pub proposer_item: ItemView,
    pub receiver_item: ItemView,
    pub status: SwapStatus,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwapView {
    pub fn assemble(swap: Swap, proposer_item: ItemView, receiver_item: ItemView) -> Self {
        Self {
            id: swap.id,
            proposer: swap.proposer_id,
            receiver: swap.receiver_id,
            proposer_item,
            receiver_item,
            status: swap.status,
            is_read: swap.is_read,
            created_at: swap.created_at,
            updated_at: swap.updated_at,
        }
    }
}

/// The swap listing plus the receiver-side unread counter.
#[derive(Debug, Clone, Serialize)]
pub struct SwapListEnvelope {
    pub swaps: Vec<SwapView>,
    pub unread_count: i64,
}

/// A thread message with the sender's display name denormalized in.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub swap: SwapId,
    pub sender: UserId,
    pub sender_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn assemble(message: SwapMessage, sender_name: String) -> Self {
        Self {
            id: message.id,
            swap: message.swap_id,
            sender: message.sender_id,
            sender_name,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

/// The public slice of a user record.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        }
    }
}
