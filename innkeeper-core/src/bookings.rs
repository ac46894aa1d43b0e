use chrono::{NaiveDate, Utc};
use log::info;
use thiserror::Error;

use crate::{
    BookingData, BookingStatus, Database, DatabaseError, InnkeeperContext, InnkeeperEvent,
    NewBooking, PrimaryKey,
};

/// Creates bookings and walks them through their lifecycle
pub struct BookingManager<Db> {
    context: InnkeeperContext<Db>,
}

#[derive(Debug, Error)]
pub enum BookingError {
    /// Bad input, reported back to the caller
    #[error("{0}")]
    Validation(String),
    #[error("Booking does not belong to the requesting user")]
    Forbidden,
    #[error("Booking cannot move from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("Room is not available for the selected dates")]
    RoomUnavailable,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

/// A request to book a room. The guest fields are a contact snapshot stored
/// on the booking, so they may differ from the account that books.
#[derive(Debug)]
pub struct NewBookingRequest {
    pub room_id: PrimaryKey,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub number_of_guests: i32,
    pub special_requests: Option<String>,
}

/// Booking counts shown on a user's dashboard
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingStats {
    pub total: usize,
    pub confirmed: usize,
    pub pending: usize,
}

impl<Db> BookingManager<Db>
where
    Db: Database,
{
    pub fn new(context: &InnkeeperContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Returns true if the room has no pending or confirmed booking
    /// overlapping the half-open range `[check_in, check_out)`.
    ///
    /// Read-only, so past ranges are legal here. Rejecting past check-ins is
    /// done by [Self::create] alone.
    pub async fn is_available(
        &self,
        room_id: PrimaryKey,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, BookingError> {
        validate_range(check_in, check_out)?;

        let conflict = self
            .context
            .database
            .has_booking_conflict(room_id, check_in, check_out)
            .await
            .map_err(BookingError::Db)?;

        Ok(!conflict)
    }

    /// Books a room for a user, leaving the booking in pending state.
    ///
    /// The availability check and the insert are one atomic unit inside the
    /// database, serialized per room, so two racing overlapping requests
    /// cannot both succeed.
    pub async fn create(
        &self,
        user_id: PrimaryKey,
        request: NewBookingRequest,
    ) -> Result<BookingData, BookingError> {
        validate_range(request.check_in_date, request.check_out_date)?;

        let today = Utc::now().date_naive();
        if request.check_in_date < today {
            return Err(BookingError::Validation(
                "check-in date cannot be in the past".to_string(),
            ));
        }

        if request.guest_name.trim().is_empty() {
            return Err(BookingError::Validation(
                "guest name must be provided".to_string(),
            ));
        }

        if request.guest_email.trim().is_empty() {
            return Err(BookingError::Validation(
                "guest email must be provided".to_string(),
            ));
        }

        let room = self
            .context
            .database
            .room_by_id(request.room_id)
            .await
            .map_err(BookingError::Db)?;

        if !room.available {
            return Err(BookingError::RoomUnavailable);
        }

        if request.number_of_guests < 1 || request.number_of_guests > room.capacity {
            return Err(BookingError::Validation(format!(
                "number of guests must be between 1 and {}",
                room.capacity
            )));
        }

        let nights = (request.check_out_date - request.check_in_date).num_days();
        let total_price = room.price_per_night * nights as f64;

        let booking = self
            .context
            .database
            .create_booking(NewBooking {
                user_id,
                room_id: room.id,
                check_in_date: request.check_in_date,
                check_out_date: request.check_out_date,
                guest_name: request.guest_name,
                guest_email: request.guest_email,
                guest_phone: request.guest_phone,
                number_of_guests: request.number_of_guests,
                special_requests: request.special_requests,
                total_price,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => BookingError::RoomUnavailable,
                e => BookingError::Db(e),
            })?;

        info!(
            "Booking {} created for room {} ({} to {})",
            booking.id, room.id, booking.check_in_date, booking.check_out_date
        );

        self.context.emit(InnkeeperEvent::BookingCreated {
            booking_id: booking.id,
            room_id: room.id,
            user_id,
        });

        Ok(booking)
    }

    /// Confirms a pending booking
    pub async fn confirm(
        &self,
        booking_id: PrimaryKey,
        requesting_user_id: PrimaryKey,
    ) -> Result<BookingData, BookingError> {
        self.transition(booking_id, requesting_user_id, BookingStatus::Confirmed)
            .await
    }

    /// Cancels a pending or confirmed booking
    pub async fn cancel(
        &self,
        booking_id: PrimaryKey,
        requesting_user_id: PrimaryKey,
    ) -> Result<BookingData, BookingError> {
        self.transition(booking_id, requesting_user_id, BookingStatus::Cancelled)
            .await
    }

    /// Marks a confirmed booking as completed once the stay is over
    pub async fn complete(
        &self,
        booking_id: PrimaryKey,
        requesting_user_id: PrimaryKey,
    ) -> Result<BookingData, BookingError> {
        self.transition(booking_id, requesting_user_id, BookingStatus::Completed)
            .await
    }

    /// Returns a booking, only to its owner
    pub async fn booking_by_id(
        &self,
        booking_id: PrimaryKey,
        requesting_user_id: PrimaryKey,
    ) -> Result<BookingData, BookingError> {
        let booking = self
            .context
            .database
            .booking_by_id(booking_id)
            .await
            .map_err(BookingError::Db)?;

        authorize_owner(requesting_user_id, &booking)?;

        Ok(booking)
    }

    /// All bookings of a user, most recent first
    pub async fn bookings_for_user(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<BookingData>, BookingError> {
        self.context
            .database
            .bookings_for_user(user_id)
            .await
            .map_err(BookingError::Db)
    }

    /// The most recently created bookings across all users
    pub async fn recent(&self, limit: i64) -> Result<Vec<BookingData>, BookingError> {
        self.context
            .database
            .recent_bookings(limit)
            .await
            .map_err(BookingError::Db)
    }

    /// Booking counts for a user's dashboard
    pub async fn stats_for_user(&self, user_id: PrimaryKey) -> Result<BookingStats, BookingError> {
        let bookings = self.bookings_for_user(user_id).await?;

        Ok(BookingStats {
            total: bookings.len(),
            confirmed: bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Confirmed)
                .count(),
            pending: bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Pending)
                .count(),
        })
    }

    async fn transition(
        &self,
        booking_id: PrimaryKey,
        requesting_user_id: PrimaryKey,
        next: BookingStatus,
    ) -> Result<BookingData, BookingError> {
        let booking = self
            .context
            .database
            .booking_by_id(booking_id)
            .await
            .map_err(BookingError::Db)?;

        authorize_owner(requesting_user_id, &booking)?;

        if !booking.status.can_become(next) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: next,
            });
        }

        let updated = self
            .context
            .database
            .update_booking_status(booking_id, next)
            .await
            .map_err(BookingError::Db)?;

        info!("Booking {} is now {}", updated.id, updated.status);

        self.context.emit(InnkeeperEvent::BookingStatusChanged {
            booking_id: updated.id,
            new_status: next,
        });

        Ok(updated)
    }
}

/// Ownership check for lifecycle operations
fn authorize_owner(
    requesting_user_id: PrimaryKey,
    booking: &BookingData,
) -> Result<(), BookingError> {
    if booking.user_id != requesting_user_id {
        return Err(BookingError::Forbidden);
    }

    Ok(())
}

fn validate_range(check_in: NaiveDate, check_out: NaiveDate) -> Result<(), BookingError> {
    if check_in >= check_out {
        return Err(BookingError::Validation(
            "check-out date must be after check-in date".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, Utc};

    use crate::{
        BookingError, BookingStatus, Database, DatabaseError, Innkeeper, MemoryDatabase, NewHotel,
        NewPlainUser, NewRoom, PrimaryKey, UpdatedRoom,
    };

    use super::NewBookingRequest;

    struct Fixture {
        innkeeper: Innkeeper<MemoryDatabase>,
        guest_id: PrimaryKey,
        room_id: PrimaryKey,
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn days_from_now(days: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(days)
    }

    fn request(room_id: PrimaryKey, check_in: NaiveDate, check_out: NaiveDate) -> NewBookingRequest {
        NewBookingRequest {
            room_id,
            check_in_date: check_in,
            check_out_date: check_out,
            guest_name: "John Smith".to_string(),
            guest_email: "john@example.com".to_string(),
            guest_phone: None,
            number_of_guests: 2,
            special_requests: None,
        }
    }

    async fn fixture() -> Fixture {
        let innkeeper = Innkeeper::new(MemoryDatabase::new());

        let admin = innkeeper
            .auth
            .register_admin(NewPlainUser {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: "password".to_string(),
                first_name: None,
                last_name: None,
                phone: None,
            })
            .await
            .unwrap();

        let guest = innkeeper
            .auth
            .register(NewPlainUser {
                username: "guest".to_string(),
                email: "guest@example.com".to_string(),
                password: "password".to_string(),
                first_name: None,
                last_name: None,
                phone: None,
            })
            .await
            .unwrap();

        let hotel = innkeeper
            .catalog
            .create_hotel(
                admin.id,
                NewHotel {
                    name: "Grand Plaza Hotel".to_string(),
                    description: None,
                    address: None,
                    city: Some("New York".to_string()),
                    country: Some("USA".to_string()),
                    star_rating: 5,
                    image_url: None,
                    amenities: vec!["WiFi".to_string(), "Pool".to_string()],
                    check_in_time: "14:00".to_string(),
                    check_out_time: "11:00".to_string(),
                },
            )
            .await
            .unwrap();

        let room = innkeeper
            .catalog
            .create_room(
                admin.id,
                NewRoom {
                    hotel_id: hotel.id,
                    room_number: "101".to_string(),
                    room_type: "Deluxe Room".to_string(),
                    description: None,
                    price_per_night: 149.0,
                    capacity: 2,
                    image_url: None,
                    amenities: vec![],
                },
            )
            .await
            .unwrap();

        Fixture {
            innkeeper,
            guest_id: guest.id,
            room_id: room.id,
        }
    }

    #[tokio::test]
    async fn fresh_room_is_always_available() {
        let f = fixture().await;

        let available = f
            .innkeeper
            .bookings
            .is_available(f.room_id, date("2025-06-01"), date("2025-06-05"))
            .await
            .unwrap();

        assert!(available, "a room with no bookings has no conflicts");
    }

    #[tokio::test]
    async fn availability_rejects_empty_range() {
        let f = fixture().await;

        let result = f
            .innkeeper
            .bookings
            .is_available(f.room_id, date("2025-06-05"), date("2025-06-05"))
            .await;

        assert!(matches!(result, Err(BookingError::Validation(_))));
    }

    #[tokio::test]
    async fn availability_rejects_unknown_room() {
        let f = fixture().await;

        let result = f
            .innkeeper
            .bookings
            .is_available(9999, date("2025-06-01"), date("2025-06-05"))
            .await;

        assert!(matches!(
            result,
            Err(BookingError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn overlapping_booking_is_rejected_and_touching_is_not() {
        let f = fixture().await;
        let bookings = &f.innkeeper.bookings;

        bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(14)),
            )
            .await
            .unwrap();

        // Overlaps the last night of the existing stay
        let overlapping = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(13), days_from_now(17)),
            )
            .await;

        assert!(matches!(overlapping, Err(BookingError::RoomUnavailable)));

        // Checking in on the existing checkout day is fine, intervals are half-open
        let touching = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(14), days_from_now(17)),
            )
            .await;

        assert!(touching.is_ok());
    }

    #[tokio::test]
    async fn cancelled_bookings_do_not_block_availability() {
        let f = fixture().await;
        let bookings = &f.innkeeper.bookings;

        let booking = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(14)),
            )
            .await
            .unwrap();

        bookings.cancel(booking.id, f.guest_id).await.unwrap();

        let available = bookings
            .is_available(f.room_id, days_from_now(10), days_from_now(14))
            .await
            .unwrap();

        assert!(available);
    }

    #[tokio::test]
    async fn create_computes_the_total_price() {
        let f = fixture().await;

        // Three nights at 149.0
        let booking = f
            .innkeeper
            .bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(13)),
            )
            .await
            .unwrap();

        assert_eq!(booking.total_price, 447.0);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.room_id(), f.room_id);
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let f = fixture().await;
        let bookings = &f.innkeeper.bookings;

        // check_in == check_out
        let same_day = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(10)),
            )
            .await;
        assert!(matches!(same_day, Err(BookingError::Validation(_))));

        // Past check-in
        let past = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(-5), days_from_now(-1)),
            )
            .await;
        assert!(matches!(past, Err(BookingError::Validation(_))));

        // Too many guests for the room
        let mut crowded = request(f.room_id, days_from_now(10), days_from_now(12));
        crowded.number_of_guests = 7;
        let crowded = bookings.create(f.guest_id, crowded).await;
        assert!(matches!(crowded, Err(BookingError::Validation(_))));

        // Missing guest name
        let mut anonymous = request(f.room_id, days_from_now(10), days_from_now(12));
        anonymous.guest_name = "  ".to_string();
        let anonymous = bookings.create(f.guest_id, anonymous).await;
        assert!(matches!(anonymous, Err(BookingError::Validation(_))));
    }

    #[tokio::test]
    async fn rooms_taken_off_the_market_cannot_be_booked() {
        let f = fixture().await;

        f.innkeeper
            .database()
            .update_room(UpdatedRoom {
                id: f.room_id,
                description: None,
                price_per_night: None,
                available: Some(false),
            })
            .await
            .unwrap();

        let result = f
            .innkeeper
            .bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(12)),
            )
            .await;

        assert!(matches!(result, Err(BookingError::RoomUnavailable)));
    }

    #[tokio::test]
    async fn lifecycle_happy_path() {
        let f = fixture().await;
        let bookings = &f.innkeeper.bookings;

        let booking = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(12)),
            )
            .await
            .unwrap();

        let confirmed = bookings.confirm(booking.id, f.guest_id).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert!(confirmed.updated_at >= booking.updated_at);

        let completed = bookings.complete(booking.id, f.guest_id).await.unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn terminal_states_reject_transitions() {
        let f = fixture().await;
        let bookings = &f.innkeeper.bookings;

        let booking = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(12)),
            )
            .await
            .unwrap();

        bookings.confirm(booking.id, f.guest_id).await.unwrap();
        bookings.complete(booking.id, f.guest_id).await.unwrap();

        let result = bookings.cancel(booking.id, f.guest_id).await;
        assert!(matches!(
            result,
            Err(BookingError::InvalidTransition { .. })
        ));

        let result = bookings.confirm(booking.id, f.guest_id).await;
        assert!(matches!(
            result,
            Err(BookingError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn only_the_owner_may_transition() {
        let f = fixture().await;
        let bookings = &f.innkeeper.bookings;

        let other = f
            .innkeeper
            .auth
            .register(NewPlainUser {
                username: "other".to_string(),
                email: "other@example.com".to_string(),
                password: "password".to_string(),
                first_name: None,
                last_name: None,
                phone: None,
            })
            .await
            .unwrap();

        let booking = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(12)),
            )
            .await
            .unwrap();

        let result = bookings.confirm(booking.id, other.id).await;
        assert!(matches!(result, Err(BookingError::Forbidden)));

        let result = bookings.booking_by_id(booking.id, other.id).await;
        assert!(matches!(result, Err(BookingError::Forbidden)));
    }

    #[tokio::test]
    async fn listings_are_most_recent_first() {
        let f = fixture().await;
        let bookings = &f.innkeeper.bookings;

        let first = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(12)),
            )
            .await
            .unwrap();

        let second = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(20), days_from_now(22)),
            )
            .await
            .unwrap();

        let listed = bookings.bookings_for_user(f.guest_id).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let recent = bookings.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, second.id);
    }

    #[tokio::test]
    async fn stats_count_by_status() {
        let f = fixture().await;
        let bookings = &f.innkeeper.bookings;

        let first = bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(10), days_from_now(12)),
            )
            .await
            .unwrap();

        bookings
            .create(
                f.guest_id,
                request(f.room_id, days_from_now(20), days_from_now(22)),
            )
            .await
            .unwrap();

        bookings.confirm(first.id, f.guest_id).await.unwrap();

        let stats = bookings.stats_for_user(f.guest_id).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_overlapping_creates_cannot_both_succeed() {
        let f = fixture().await;
        let innkeeper = Arc::new(f.innkeeper);

        let a = {
            let innkeeper = innkeeper.clone();
            let room_id = f.room_id;
            let user_id = f.guest_id;

            tokio::spawn(async move {
                innkeeper
                    .bookings
                    .create(user_id, request(room_id, days_from_now(10), days_from_now(14)))
                    .await
            })
        };

        let b = {
            let innkeeper = innkeeper.clone();
            let room_id = f.room_id;
            let user_id = f.guest_id;

            tokio::spawn(async move {
                innkeeper
                    .bookings
                    .create(user_id, request(room_id, days_from_now(12), days_from_now(16)))
                    .await
            })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let unavailable = results
            .iter()
            .filter(|r| matches!(r, Err(BookingError::RoomUnavailable)))
            .count();

        assert_eq!(successes, 1, "exactly one racing request may commit");
        assert_eq!(unavailable, 1, "the loser fails with RoomUnavailable");
    }
}
