//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use innkeeper_core::{
    BookingData, BookingStats as CoreBookingStats, HotelData, Overview as CoreOverview,
    RoomData, SessionData, UserData,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: i32,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    admin: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Hotel {
    id: i32,
    name: String,
    description: Option<String>,
    address: Option<String>,
    city: Option<String>,
    country: Option<String>,
    star_rating: i32,
    image_url: Option<String>,
    amenities: Vec<String>,
    check_in_time: String,
    check_out_time: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Room {
    id: i32,
    hotel_id: i32,
    room_number: String,
    room_type: String,
    description: Option<String>,
    price_per_night: f64,
    capacity: i32,
    image_url: Option<String>,
    amenities: Vec<String>,
    available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Booking {
    id: i32,
    user_id: i32,
    hotel_id: i32,
    room_id: i32,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    guest_name: String,
    guest_email: String,
    guest_phone: Option<String>,
    number_of_guests: i32,
    special_requests: Option<String>,
    total_price: f64,
    status: String,
    created_at: DateTime<Utc>,
    hotel: Hotel,
    room: Room,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingStats {
    total: usize,
    confirmed: usize,
    pending: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Overview {
    total_users: i64,
    total_hotels: i64,
    total_rooms: i64,
    total_bookings: i64,
    recent_bookings: Vec<Booking>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Availability {
    pub available: bool,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            admin: self.admin,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Hotel> for HotelData {
    fn to_serialized(&self) -> Hotel {
        Hotel {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            star_rating: self.star_rating,
            image_url: self.image_url.clone(),
            amenities: self.amenities.clone(),
            check_in_time: self.check_in_time.clone(),
            check_out_time: self.check_out_time.clone(),
        }
    }
}

impl ToSerialized<Room> for RoomData {
    fn to_serialized(&self) -> Room {
        Room {
            id: self.id,
            hotel_id: self.hotel_id,
            room_number: self.room_number.clone(),
            room_type: self.room_type.clone(),
            description: self.description.clone(),
            price_per_night: self.price_per_night,
            capacity: self.capacity,
            image_url: self.image_url.clone(),
            amenities: self.amenities.clone(),
            available: self.available,
        }
    }
}

impl ToSerialized<Booking> for BookingData {
    fn to_serialized(&self) -> Booking {
        Booking {
            id: self.id,
            user_id: self.user_id,
            hotel_id: self.hotel_id(),
            room_id: self.room_id(),
            check_in_date: self.check_in_date,
            check_out_date: self.check_out_date,
            guest_name: self.guest_name.clone(),
            guest_email: self.guest_email.clone(),
            guest_phone: self.guest_phone.clone(),
            number_of_guests: self.number_of_guests,
            special_requests: self.special_requests.clone(),
            total_price: self.total_price,
            status: self.status.to_string(),
            created_at: self.created_at,
            hotel: self.hotel.to_serialized(),
            room: self.room.to_serialized(),
        }
    }
}

impl ToSerialized<BookingStats> for CoreBookingStats {
    fn to_serialized(&self) -> BookingStats {
        BookingStats {
            total: self.total,
            confirmed: self.confirmed,
            pending: self.pending,
        }
    }
}

impl ToSerialized<Overview> for CoreOverview {
    fn to_serialized(&self) -> Overview {
        Overview {
            total_users: self.total_users,
            total_hotels: self.total_hotels,
            total_rooms: self.total_rooms,
            total_bookings: self.total_bookings,
            recent_bookings: self.recent_bookings.to_serialized(),
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use innkeeper_core::{BookingData, BookingStatus, HotelData, RoomData};

    use super::ToSerialized;

    fn booking() -> BookingData {
        let now = Utc::now();

        let hotel = HotelData {
            id: 3,
            name: "Grand Plaza Hotel".to_string(),
            description: None,
            address: None,
            city: Some("New York".to_string()),
            country: Some("USA".to_string()),
            star_rating: 5,
            image_url: None,
            amenities: vec![],
            check_in_time: "14:00".to_string(),
            check_out_time: "11:00".to_string(),
            active: true,
            created_at: now,
        };

        let room = RoomData {
            id: 7,
            hotel_id: hotel.id,
            room_number: "101".to_string(),
            room_type: "Deluxe Room".to_string(),
            description: None,
            price_per_night: 149.0,
            capacity: 2,
            image_url: None,
            amenities: vec![],
            available: true,
            created_at: now,
        };

        BookingData {
            id: 11,
            user_id: 4,
            check_in_date: "2026-09-01".parse().unwrap(),
            check_out_date: "2026-09-05".parse().unwrap(),
            guest_name: "John Smith".to_string(),
            guest_email: "john@example.com".to_string(),
            guest_phone: None,
            number_of_guests: 2,
            special_requests: None,
            total_price: 596.0,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
            hotel,
            room,
        }
    }

    #[test]
    fn booking_json_carries_ids_and_creation_timestamp() {
        let serialized = serde_json::to_value(booking().to_serialized()).unwrap();

        assert!(serialized.get("created_at").is_some());
        assert_eq!(serialized["hotel_id"], 3);
        assert_eq!(serialized["room_id"], 7);
        assert_eq!(serialized["status"], "pending");
        assert_eq!(serialized["hotel"]["id"], 3);
        assert_eq!(serialized["room"]["id"], 7);
    }
}
