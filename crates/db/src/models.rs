//! Row structs that map 1-to-1 onto database tables, plus the insert/filter
//! inputs the [`Store`](crate::Store) accepts.
//!
//! These are persistence models and carry no domain behaviour.
//! Validation and access rules live in the `matching` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// accounts / sessions
// ---------------------------------------------------------------------------

/// A registered login.  `id` doubles as the profile id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    /// Registered from outside the served area; no code was issued.
    pub waitlisted: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create an account and its empty profile.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub verification_code: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub waitlisted: bool,
    pub first_name: String,
    pub last_name: String,
    pub postal_code: String,
}

/// A bearer session issued on sign-in or verification.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRow {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street: Option<String>,
    pub number: Option<i32>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub phone_number: Option<String>,
    /// Opted in as a volunteer repairer.
    pub receive_requests: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full replacement of the editable profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub number: i32,
    pub postal_code: String,
    pub city: String,
    pub phone_number: Option<String>,
    pub receive_requests: bool,
}

// ---------------------------------------------------------------------------
// products
// ---------------------------------------------------------------------------

/// Kinds of device the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "Vacuum cleaner")]
    VacuumCleaner,
    #[serde(rename = "Coffee machine")]
    CoffeeMachine,
    #[serde(rename = "TV")]
    Tv,
    Radio,
    Lighting,
    #[serde(rename = "Fume hood")]
    FumeHood,
    Laptop,
    Smartphone,
    Other,
}

impl ProductType {
    pub const ALL: [ProductType; 9] = [
        Self::VacuumCleaner,
        Self::CoffeeMachine,
        Self::Tv,
        Self::Radio,
        Self::Lighting,
        Self::FumeHood,
        Self::Laptop,
        Self::Smartphone,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VacuumCleaner => "Vacuum cleaner",
            Self::CoffeeMachine => "Coffee machine",
            Self::Tv => "TV",
            Self::Radio => "Radio",
            Self::Lighting => "Lighting",
            Self::FumeHood => "Fume hood",
            Self::Laptop => "Laptop",
            Self::Smartphone => "Smartphone",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductType {
    type Err = String;

    /// Case-insensitive, so the form spelling "Coffee Machine" is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown product type: {s}"))
    }
}

/// Lifecycle of a registered product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Live,
    Broken,
    Inactive,
    Transferable,
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live         => write!(f, "live"),
            Self::Broken       => write!(f, "broken"),
            Self::Inactive     => write!(f, "inactive"),
            Self::Transferable => write!(f, "transferable"),
        }
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live"         => Ok(Self::Live),
            "broken"       => Ok(Self::Broken),
            "inactive"     => Ok(Self::Inactive),
            "transferable" => Ok(Self::Transferable),
            other          => Err(format!("unknown product status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductRow {
    pub product_id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub product_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub doc_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub user_id: Uuid,
    pub product_type: ProductType,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: ProductStatus,
}

// ---------------------------------------------------------------------------
// repair_requests
// ---------------------------------------------------------------------------

/// Where a repair request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepairStatus {
    Pending,
    Accepted,
    Scheduled,
    Completed,
    Cancelled,
}

impl std::fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending   => write!(f, "pending"),
            Self::Accepted  => write!(f, "accepted"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl RepairStatus {
    /// Still waiting for a timeslot: holds can be added and confirmed.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// Done with, one way or another.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::str::FromStr for RepairStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending"   => Ok(Self::Pending),
            "accepted"  => Ok(Self::Accepted),
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other       => Err(format!("unknown repair status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RepairRequestRow {
    pub repair_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRepairRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub description: String,
    pub status: RepairStatus,
    /// Backdated creation time; `None` means now.
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// locations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationRow {
    pub location_id: Uuid,
    pub name: String,
    pub address: String,
    pub description: Option<String>,
    pub google_maps_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub description: Option<String>,
    pub google_maps_link: Option<String>,
}

// ---------------------------------------------------------------------------
// timeslots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimeslotRow {
    pub timeslot_id: Uuid,
    pub location_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub capacity: i32,
    pub spots_taken: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeslotRow {
    pub fn spots_available(&self) -> i32 {
        (self.capacity - self.spots_taken).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.spots_taken >= self.capacity
    }
}

#[derive(Debug, Clone)]
pub struct NewTimeslot {
    pub location_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub capacity: i32,
}

/// Conditions for [`Store::list_timeslots`](crate::Store::list_timeslots).
/// Bounds are inclusive; results are ordered by `date_time` ascending.
#[derive(Debug, Clone, Default)]
pub struct TimeslotFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub location_id: Option<Uuid>,
    pub available_only: bool,
}

impl TimeslotFilter {
    pub fn matches(&self, slot: &TimeslotRow) -> bool {
        self.from.map_or(true, |from| slot.date_time >= from)
            && self.to.map_or(true, |to| slot.date_time <= to)
            && self.location_id.map_or(true, |id| slot.location_id == id)
            && (!self.available_only || slot.available)
    }
}

// ---------------------------------------------------------------------------
// repair_timeslots
// ---------------------------------------------------------------------------

/// A repair request holding (and eventually confirming) a timeslot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RepairTimeslotRow {
    pub id: Uuid,
    pub repair_id: Uuid,
    pub timeslot_id: Uuid,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the "available timeslots for a repair" view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AvailableTimeslotRow {
    pub timeslot_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub location_id: Uuid,
    pub location_name: String,
    pub is_available: bool,
    pub capacity: i32,
    pub spots_taken: i32,
    pub spots_available: i32,
}

/// Result of [`Store::book_timeslots`](crate::Store::book_timeslots).
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub holds: Vec<RepairTimeslotRow>,
    /// Timeslots after their counters were bumped.
    pub timeslots: Vec<TimeslotRow>,
}

/// Result of [`Store::confirm_timeslot`](crate::Store::confirm_timeslot).
#[derive(Debug, Clone)]
pub struct ConfirmationOutcome {
    pub confirmed: RepairTimeslotRow,
    pub request: RepairRequestRow,
    pub timeslot: TimeslotRow,
    /// Other holds of the same repair that were given back.
    pub released: Vec<TimeslotRow>,
}

/// Result of [`Store::cancel_repair_request`](crate::Store::cancel_repair_request).
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    pub request: RepairRequestRow,
    /// Every timeslot the repair held, after its spot was given back.
    pub released: Vec<TimeslotRow>,
}

// ---------------------------------------------------------------------------
// messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MessageRow {
    pub message_id: Uuid,
    pub repair_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Option<Uuid>,
    pub is_public: bool,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub repair_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Option<Uuid>,
    pub is_public: bool,
    pub content: String,
}

/// Which side of a repair's conversation to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadFilter {
    Public,
    /// Private messages sent or received by this user.
    PrivateFor(Uuid),
}

impl ThreadFilter {
    pub fn matches(&self, message: &MessageRow) -> bool {
        match self {
            Self::Public => message.is_public,
            Self::PrivateFor(user) => {
                !message.is_public
                    && (message.sender_id == *user || message.recipient_id == Some(*user))
            }
        }
    }
}
