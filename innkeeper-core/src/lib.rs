mod auth;
mod bookings;
mod catalog;
mod db;
mod events;
mod util;

use std::sync::Arc;

use crossbeam::channel::unbounded;

pub use auth::*;
pub use bookings::*;
pub use catalog::*;
pub use db::*;
pub use events::*;

/// The innkeeper booking system, facilitating hotel inventory, reservations,
/// and authentication.
pub struct Innkeeper<Db> {
    database: Arc<Db>,
    event_receiver: EventReceiver,

    pub auth: Auth<Db>,
    pub bookings: BookingManager<Db>,
    pub catalog: Catalog<Db>,
}

/// A type passed to the managers of the system, to access the database and
/// emit events.
pub struct InnkeeperContext<Db> {
    pub database: Arc<Db>,
    events: EventSender,
}

impl<Db> Innkeeper<Db>
where
    Db: Database,
{
    pub fn new(database: Db) -> Self {
        let database = Arc::new(database);
        let (event_sender, event_receiver) = unbounded();

        let context = InnkeeperContext {
            database: database.clone(),
            events: event_sender,
        };

        Self {
            auth: Auth::new(&context),
            bookings: BookingManager::new(&context),
            catalog: Catalog::new(&context),
            event_receiver,
            database,
        }
    }

    /// Returns a receiver of the events emitted by the system
    pub fn events(&self) -> EventReceiver {
        self.event_receiver.clone()
    }

    /// Direct access to the underlying store
    pub fn database(&self) -> &Arc<Db> {
        &self.database
    }
}

impl<Db> InnkeeperContext<Db>
where
    Db: Database,
{
    /// Sends an event to anyone listening
    pub fn emit(&self, event: InnkeeperEvent) {
        // Nobody consuming events is fine
        let _ = self.events.send(event);
    }
}

impl<Db> Clone for InnkeeperContext<Db>
where
    Db: Database,
{
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            events: self.events.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use crate::{
        Database, Innkeeper, InnkeeperEvent, MemoryDatabase, NewBookingRequest, NewHotel,
        NewPlainUser, NewRoom, PrimaryKey,
    };

    async fn seeded() -> (Innkeeper<MemoryDatabase>, PrimaryKey, PrimaryKey, PrimaryKey) {
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

        let hotel = innkeeper
            .catalog
            .create_hotel(
                admin.id,
                NewHotel {
                    name: "Lakeside Hotel".to_string(),
                    description: None,
                    address: None,
                    city: Some("Seattle".to_string()),
                    country: Some("USA".to_string()),
                    star_rating: 3,
                    image_url: None,
                    amenities: vec![],
                    check_in_time: "15:00".to_string(),
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
                    room_type: "Standard Room".to_string(),
                    description: None,
                    price_per_night: 99.0,
                    capacity: 2,
                    image_url: None,
                    amenities: vec![],
                },
            )
            .await
            .unwrap();

        (innkeeper, admin.id, hotel.id, room.id)
    }

    fn booking_request(room_id: PrimaryKey) -> NewBookingRequest {
        let today = Utc::now().date_naive();

        NewBookingRequest {
            room_id,
            check_in_date: today + Duration::days(10),
            check_out_date: today + Duration::days(12),
            guest_name: "John Smith".to_string(),
            guest_email: "john@example.com".to_string(),
            guest_phone: None,
            number_of_guests: 2,
            special_requests: None,
        }
    }

    #[tokio::test]
    async fn deleting_a_hotel_cascades_to_rooms_and_bookings() {
        let (innkeeper, admin_id, hotel_id, room_id) = seeded().await;

        innkeeper
            .bookings
            .create(admin_id, booking_request(room_id))
            .await
            .unwrap();

        innkeeper
            .catalog
            .delete_hotel(admin_id, hotel_id)
            .await
            .unwrap();

        assert!(innkeeper.catalog.room_by_id(room_id).await.is_err());
        assert!(innkeeper
            .bookings
            .bookings_for_user(admin_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_their_bookings() {
        let (innkeeper, _, _, room_id) = seeded().await;

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

        innkeeper
            .bookings
            .create(guest.id, booking_request(room_id))
            .await
            .unwrap();

        innkeeper.auth.delete_user(guest.id).await.unwrap();

        assert_eq!(innkeeper.database().count_bookings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn booking_activity_is_emitted_as_events() {
        let (innkeeper, admin_id, _, room_id) = seeded().await;
        let events = innkeeper.events();

        // Drain registration and catalog events from seeding
        while events.try_recv().is_ok() {}

        let booking = innkeeper
            .bookings
            .create(admin_id, booking_request(room_id))
            .await
            .unwrap();

        innkeeper
            .bookings
            .confirm(booking.id, admin_id)
            .await
            .unwrap();

        assert!(matches!(
            events.try_recv(),
            Ok(InnkeeperEvent::BookingCreated { .. })
        ));
        assert!(matches!(
            events.try_recv(),
            Ok(InnkeeperEvent::BookingStatusChanged { .. })
        ));
    }
}
