use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound { .. } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and store innkeeper data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn check_for_admin(&self) -> Result<bool>;
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    /// Deletes a user along with their sessions and bookings
    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()>;
    async fn count_users(&self) -> Result<i64>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn hotel_by_id(&self, hotel_id: PrimaryKey) -> Result<HotelData>;
    async fn create_hotel(&self, new_hotel: NewHotel) -> Result<HotelData>;
    async fn update_hotel(&self, updated_hotel: UpdatedHotel) -> Result<HotelData>;
    /// Deletes a hotel along with its rooms and bookings
    async fn delete_hotel(&self, hotel_id: PrimaryKey) -> Result<()>;
    async fn list_hotels(&self, filter: &HotelFilter) -> Result<Vec<HotelData>>;
    /// Distinct cities of active hotels
    async fn list_cities(&self) -> Result<Vec<String>>;
    async fn count_hotels(&self) -> Result<i64>;

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData>;
    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData>;
    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData>;
    /// Deletes a room along with its bookings
    async fn delete_room(&self, room_id: PrimaryKey) -> Result<()>;
    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomData>>;
    /// Distinct room types across all rooms
    async fn list_room_types(&self) -> Result<Vec<String>>;
    async fn count_rooms(&self) -> Result<i64>;

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData>;
    /// Inserts a booking, failing with [DatabaseError::Conflict] if a pending
    /// or confirmed booking on the same room overlaps the requested range.
    ///
    /// The conflict check and the insert are a single atomic unit, serialized
    /// per room, so two racing overlapping requests cannot both commit.
    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData>;
    /// Sets the status of a booking and bumps its updated_at timestamp
    async fn update_booking_status(
        &self,
        booking_id: PrimaryKey,
        status: BookingStatus,
    ) -> Result<BookingData>;
    /// Bookings of a user, most recent first
    async fn bookings_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>>;
    /// Most recently created bookings across all users
    async fn recent_bookings(&self, limit: i64) -> Result<Vec<BookingData>>;
    /// Returns true if a pending or confirmed booking on the room overlaps
    /// the half-open range `[check_in, check_out)`
    async fn has_booking_conflict(
        &self,
        room_id: PrimaryKey,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool>;
    async fn count_bookings(&self) -> Result<i64>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub admin: bool,
}

#[derive(Debug)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// A new password hash, if the password is being changed
    pub password: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewHotel {
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub star_rating: i32,
    pub image_url: Option<String>,
    pub amenities: Vec<String>,
    pub check_in_time: String,
    pub check_out_time: String,
}

#[derive(Debug)]
pub struct UpdatedHotel {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub description: Option<String>,
    pub star_rating: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug)]
pub struct NewRoom {
    pub hotel_id: PrimaryKey,
    pub room_number: String,
    pub room_type: String,
    pub description: Option<String>,
    pub price_per_night: f64,
    pub capacity: i32,
    pub image_url: Option<String>,
    pub amenities: Vec<String>,
}

#[derive(Debug)]
pub struct UpdatedRoom {
    pub id: PrimaryKey,
    pub description: Option<String>,
    pub price_per_night: Option<f64>,
    pub available: Option<bool>,
}

#[derive(Debug)]
pub struct NewBooking {
    pub user_id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub number_of_guests: i32,
    pub special_requests: Option<String>,
    pub total_price: f64,
}
