use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A registered account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub email: String,
    /// The argon2 hash, never the plaintext
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// If this is true, the user may manage hotels and rooms
    pub admin: bool,
    /// Deactivated accounts cannot log in
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A bookable property
#[derive(Debug, Clone)]
pub struct HotelData {
    pub id: PrimaryKey,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// Star rating between 1 and 5
    pub star_rating: i32,
    pub image_url: Option<String>,
    pub amenities: Vec<String>,
    /// Time-of-day strings, like "14:00"
    pub check_in_time: String,
    pub check_out_time: String,
    /// Inactive hotels are hidden from listings
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A room within a hotel.
/// Note: `hotel_id` and `room_number` are unique together.
#[derive(Debug, Clone)]
pub struct RoomData {
    pub id: PrimaryKey,
    pub hotel_id: PrimaryKey,
    pub room_number: String,
    /// Single, double, suite, and so on
    pub room_type: String,
    pub description: Option<String>,
    pub price_per_night: f64,
    /// How many guests the room sleeps
    pub capacity: i32,
    pub image_url: Option<String>,
    pub amenities: Vec<String>,
    /// Rooms with this flag off cannot be booked
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

/// A reservation of a room for a date range
#[derive(Debug, Clone)]
pub struct BookingData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    /// Dates are half-open: the night of `check_out_date` is not included
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    /// Guest contact snapshot, independent of the account that booked
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub number_of_guests: i32,
    pub special_requests: Option<String>,
    pub total_price: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The hotel this booking belongs to
    pub hotel: HotelData,
    /// The room this booking belongs to
    pub room: RoomData,
}

impl BookingData {
    pub fn hotel_id(&self) -> PrimaryKey {
        self.hotel.id
    }

    pub fn room_id(&self) -> PrimaryKey {
        self.room.id
    }
}

/// The lifecycle state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// States that count towards room availability
    pub const BLOCKING: [BookingStatus; 2] = [Self::Pending, Self::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Returns true if a booking in this state occupies its room
    pub fn is_blocking(&self) -> bool {
        Self::BLOCKING.contains(self)
    }

    /// Returns true if the lifecycle allows moving to `next`
    pub fn can_become(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

/// Filters for hotel listings. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct HotelFilter {
    /// Case insensitive substring match on the city
    pub city: Option<String>,
    /// Minimum star rating
    pub min_rating: Option<i32>,
    /// Case insensitive substring match on the name
    pub search: Option<String>,
}

/// Filters for room listings. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub hotel_id: Option<PrimaryKey>,
    /// Exact match on the room type
    pub room_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_capacity: Option<i32>,
}

#[cfg(test)]
mod test {
    use super::BookingStatus;

    #[test]
    fn lifecycle_transitions() {
        use BookingStatus::*;

        assert!(Pending.can_become(Confirmed));
        assert!(Pending.can_become(Cancelled));
        assert!(Confirmed.can_become(Cancelled));
        assert!(Confirmed.can_become(Completed));

        // Terminal states allow nothing
        assert!(!Cancelled.can_become(Pending));
        assert!(!Cancelled.can_become(Confirmed));
        assert!(!Completed.can_become(Cancelled));

        // No skipping ahead or going backwards
        assert!(!Pending.can_become(Completed));
        assert!(!Confirmed.can_become(Pending));
    }

    #[test]
    fn status_round_trip() {
        use BookingStatus::*;

        for status in [Pending, Confirmed, Cancelled, Completed] {
            assert_eq!(status.as_str().parse::<BookingStatus>(), Ok(status));
        }

        assert!("checked_in".parse::<BookingStatus>().is_err());
    }
}
