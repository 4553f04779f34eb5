use crate::{ItemId, Result, RewearError, SwapId, UserId};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, full_name: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tops,
    Bottoms,
    Dresses,
    Jackets,
    Knitwear,
    Shoes,
    Accessories,
    Bags,
    Activewear,
    Formal,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tops => "tops",
            Category::Bottoms => "bottoms",
            Category::Dresses => "dresses",
            Category::Jackets => "jackets",
            Category::Knitwear => "knitwear",
            Category::Shoes => "shoes",
            Category::Accessories => "accessories",
            Category::Bags => "bags",
            Category::Activewear => "activewear",
            Category::Formal => "formal",
        }
    }
}

impl FromStr for Category {
    type Err = RewearError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tops" => Ok(Category::Tops),
            "bottoms" => Ok(Category::Bottoms),
            "dresses" => Ok(Category::Dresses),
            "jackets" => Ok(Category::Jackets),
            "knitwear" => Ok(Category::Knitwear),
            "shoes" => Ok(Category::Shoes),
            "accessories" => Ok(Category::Accessories),
            "bags" => Ok(Category::Bags),
            "activewear" => Ok(Category::Activewear),
            "formal" => Ok(Category::Formal),
            other => Err(RewearError::Validation(format!(
                "Unknown category: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Each condition carries a fixed point value, stamped onto the item at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Excellent,
    Good,
    Fair,
    Used,
    Vintage,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::LikeNew => "like_new",
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Used => "used",
            Condition::Vintage => "vintage",
        }
    }

    pub fn points(&self) -> i64 {
        match self {
            Condition::New => 60,
            Condition::LikeNew => 45,
            Condition::Excellent => 50,
            Condition::Good => 30,
            Condition::Fair => 10,
            Condition::Used => 5,
            Condition::Vintage => 40,
        }
    }
}

impl FromStr for Condition {
    type Err = RewearError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(Condition::New),
            "like_new" => Ok(Condition::LikeNew),
            "excellent" => Ok(Condition::Excellent),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            "used" => Ok(Condition::Used),
            "vintage" => Ok(Condition::Vintage),
            other => Err(RewearError::Validation(format!(
                "Unknown condition: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn points_for_condition(raw: &str) -> i64 {
    raw.parse::<Condition>().map(|c| c.points()).unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub brand: String,
    pub size: String,
    pub color: String,
    pub condition: Condition,
    pub tags: String,
}

impl ItemDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(RewearError::Validation("Title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(RewearError::Validation(
                "Description is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub owner_id: UserId,
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
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(owner_id: UserId, draft: ItemDraft) -> Self {
        let points = draft.condition.points();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            brand: draft.brand,
            size: draft.size,
            color: draft.color,
            condition: draft.condition,
            tags: draft.tags,
            status: "pending".to_string(),
            points,
            created_at: Utc::now(),
        }
    }
}

// Stores the bare file name; URL assembly happens at response time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemImage {
    pub id: Uuid,
    pub item_id: ItemId,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

impl ItemImage {
    pub fn new(item_id: ItemId, file_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            file_name,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    AwaitingResponse,
    Accepted,
    MeetupPending,
    Completed,
    Declined,
    Cancelled,
}

/// Statuses during which both items stay reserved.
pub const ACTIVE_STATUSES: [SwapStatus; 4] = [
    SwapStatus::Pending,
    SwapStatus::AwaitingResponse,
    SwapStatus::Accepted,
    SwapStatus::MeetupPending,
];

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::AwaitingResponse => "awaiting_response",
            SwapStatus::Accepted => "accepted",
            SwapStatus::MeetupPending => "meetup_pending",
            SwapStatus::Completed => "completed",
            SwapStatus::Declined => "declined",
            SwapStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::Completed | SwapStatus::Declined | SwapStatus::Cancelled
        )
    }

    pub fn can_transition(&self, to: SwapStatus, role: SwapRole) -> bool {
        TRANSITIONS
            .get(&(*self, role))
            .map(|allowed| allowed.contains(&to))
            .unwrap_or(false)
    }
}

impl FromStr for SwapStatus {
    type Err = RewearError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SwapStatus::Pending),
            "awaiting_response" => Ok(SwapStatus::AwaitingResponse),
            "accepted" => Ok(SwapStatus::Accepted),
            "meetup_pending" => Ok(SwapStatus::MeetupPending),
            "completed" => Ok(SwapStatus::Completed),
            "declined" => Ok(SwapStatus::Declined),
            "cancelled" => Ok(SwapStatus::Cancelled),
            other => Err(RewearError::Validation(format!(
                "Unknown swap status: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapRole {
    Proposer,
    Receiver,
}

// Allowed status moves keyed by (current status, acting role).
static TRANSITIONS: Lazy<HashMap<(SwapStatus, SwapRole), &'static [SwapStatus]>> =
    Lazy::new(|| {
        use SwapRole::{Proposer, Receiver};
        use SwapStatus::*;

        let mut table: HashMap<(SwapStatus, SwapRole), &'static [SwapStatus]> = HashMap::new();
        table.insert((Pending, Proposer), &[AwaitingResponse, Cancelled]);
        table.insert((Pending, Receiver), &[Accepted, Declined]);
        table.insert((AwaitingResponse, Proposer), &[Cancelled]);
        table.insert((AwaitingResponse, Receiver), &[Accepted, Declined]);
        table.insert((Accepted, Proposer), &[MeetupPending, Cancelled]);
        table.insert((Accepted, Receiver), &[MeetupPending, Cancelled]);
        table.insert((MeetupPending, Proposer), &[Completed, Cancelled]);
        table.insert((MeetupPending, Receiver), &[Completed, Cancelled]);
        table
    });

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swap {
    pub id: SwapId,
    pub proposer_id: UserId,
    pub receiver_id: UserId,
    pub proposer_item_id: ItemId,
    pub receiver_item_id: ItemId,
    pub status: SwapStatus,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Swap {
    pub fn new(
        proposer_id: UserId,
        receiver_id: UserId,
        proposer_item_id: ItemId,
        receiver_item_id: ItemId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            proposer_id,
            receiver_id,
            proposer_item_id,
            receiver_item_id,
            status: SwapStatus::Pending,
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role_of(&self, user: UserId) -> Option<SwapRole> {
        if user == self.proposer_id {
            Some(SwapRole::Proposer)
        } else if user == self.receiver_id {
            Some(SwapRole::Receiver)
        } else {
            None
        }
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.role_of(user).is_some()
    }

    pub fn transition(&mut self, to: SwapStatus, role: SwapRole) -> Result<()> {
        if !self.status.can_transition(to, role) {
            return Err(RewearError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_read(&mut self, read: bool, role: SwapRole) -> Result<()> {
        if role != SwapRole::Receiver {
            return Err(RewearError::Validation(
                "Only the receiver can update the read flag".to_string(),
            ));
        }
        self.is_read = read;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapMessage {
    pub id: Uuid,
    pub swap_id: SwapId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl SwapMessage {
    pub fn new(swap_id: SwapId, sender_id: UserId, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            swap_id,
            sender_id,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(RewearError::Validation(
                "Message content cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
