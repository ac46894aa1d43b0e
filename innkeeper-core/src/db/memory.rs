use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;

use super::{
    BookingData, BookingStatus, Database, DatabaseError, HotelData, HotelFilter, NewBooking,
    NewHotel, NewRoom, NewSession, NewUser, PrimaryKey, Result, RoomData, RoomFilter, SessionData,
    UpdatedHotel, UpdatedRoom, UpdatedUser, UserData,
};

/// An in-memory database, used by tests and useful for embedding.
///
/// All state lives behind a single lock, so every operation is atomic. This
/// is also what serializes check-then-insert during booking creation.
#[derive(Default)]
pub struct MemoryDatabase {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    users: Vec<UserData>,
    sessions: Vec<SessionRow>,
    hotels: Vec<HotelData>,
    rooms: Vec<RoomData>,
    bookings: Vec<BookingRow>,
    next_id: PrimaryKey,
}

/// Sessions and bookings are stored flat and joined on read
#[derive(Debug, Clone)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct BookingRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    hotel_id: PrimaryKey,
    room_id: PrimaryKey,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    guest_name: String,
    guest_email: String,
    guest_phone: Option<String>,
    number_of_guests: i32,
    special_requests: Option<String>,
    total_price: f64,
    status: BookingStatus,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn next_id(&mut self) -> PrimaryKey {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, user_id: PrimaryKey) -> Result<&UserData> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    fn hotel(&self, hotel_id: PrimaryKey) -> Result<&HotelData> {
        self.hotels
            .iter()
            .find(|h| h.id == hotel_id)
            .ok_or(DatabaseError::NotFound {
                resource: "hotel",
                identifier: "id",
            })
    }

    fn room(&self, room_id: PrimaryKey) -> Result<&RoomData> {
        self.rooms
            .iter()
            .find(|r| r.id == room_id)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            })
    }

    fn assemble_booking(&self, row: &BookingRow) -> Result<BookingData> {
        Ok(BookingData {
            id: row.id,
            user_id: row.user_id,
            check_in_date: row.check_in_date,
            check_out_date: row.check_out_date,
            guest_name: row.guest_name.clone(),
            guest_email: row.guest_email.clone(),
            guest_phone: row.guest_phone.clone(),
            number_of_guests: row.number_of_guests,
            special_requests: row.special_requests.clone(),
            total_price: row.total_price,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            hotel: self.hotel(row.hotel_id)?.clone(),
            room: self.room(row.room_id)?.clone(),
        })
    }

    fn conflicting_booking_exists(
        &self,
        room_id: PrimaryKey,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> bool {
        self.bookings.iter().any(|b| {
            b.room_id == room_id
                && b.status.is_blocking()
                && b.check_in_date < check_out
                && b.check_out_date > check_in
        })
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn check_for_admin(&self) -> Result<bool> {
        Ok(self.state.read().users.iter().any(|u| u.admin))
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.state.read().user(user_id).cloned()
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        self.state
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "username",
            })
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.state
            .read()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "email",
            })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut state = self.state.write();

        if state.users.iter().any(|u| u.username == new_user.username) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "username",
                value: new_user.username,
            });
        }

        if state.users.iter().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "email",
                value: new_user.email,
            });
        }

        let user = UserData {
            id: state.next_id(),
            username: new_user.username,
            email: new_user.email,
            password: new_user.password,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            phone: new_user.phone,
            admin: new_user.admin,
            active: true,
            created_at: Utc::now(),
        };

        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let mut state = self.state.write();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == updated_user.id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        if let Some(first_name) = updated_user.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = updated_user.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(phone) = updated_user.phone {
            user.phone = Some(phone);
        }
        if let Some(password) = updated_user.password {
            user.password = password;
        }
        if let Some(active) = updated_user.active {
            user.active = active;
        }

        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.write();
        state.user(user_id)?;

        state.users.retain(|u| u.id != user_id);
        state.sessions.retain(|s| s.user_id != user_id);
        state.bookings.retain(|b| b.user_id != user_id);

        Ok(())
    }

    async fn count_users(&self) -> Result<i64> {
        Ok(self.state.read().users.len() as i64)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let state = self.state.read();
        let row = state
            .sessions
            .iter()
            .find(|s| s.token == token)
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        Ok(SessionData {
            id: row.id,
            token: row.token.clone(),
            expires_at: row.expires_at,
            user: state.user(row.user_id)?.clone(),
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut state = self.state.write();

        if state.sessions.iter().any(|s| s.token == new_session.token) {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "token",
                value: new_session.token,
            });
        }

        let user = state.user(new_session.user_id)?.clone();
        let row = SessionRow {
            id: state.next_id(),
            token: new_session.token,
            user_id: new_session.user_id,
            expires_at: new_session.expires_at,
        };

        let session = SessionData {
            id: row.id,
            token: row.token.clone(),
            expires_at: row.expires_at,
            user,
        };

        state.sessions.push(row);
        Ok(session)
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let mut state = self.state.write();

        if !state.sessions.iter().any(|s| s.token == token) {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        state.sessions.retain(|s| s.token != token);
        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        self.state.write().sessions.retain(|s| s.expires_at > now);
        Ok(())
    }

    async fn hotel_by_id(&self, hotel_id: PrimaryKey) -> Result<HotelData> {
        self.state.read().hotel(hotel_id).cloned()
    }

    async fn create_hotel(&self, new_hotel: NewHotel) -> Result<HotelData> {
        let mut state = self.state.write();

        let hotel = HotelData {
            id: state.next_id(),
            name: new_hotel.name,
            description: new_hotel.description,
            address: new_hotel.address,
            city: new_hotel.city,
            country: new_hotel.country,
            star_rating: new_hotel.star_rating,
            image_url: new_hotel.image_url,
            amenities: new_hotel.amenities,
            check_in_time: new_hotel.check_in_time,
            check_out_time: new_hotel.check_out_time,
            active: true,
            created_at: Utc::now(),
        };

        state.hotels.push(hotel.clone());
        Ok(hotel)
    }

    async fn update_hotel(&self, updated_hotel: UpdatedHotel) -> Result<HotelData> {
        let mut state = self.state.write();
        let hotel = state
            .hotels
            .iter_mut()
            .find(|h| h.id == updated_hotel.id)
            .ok_or(DatabaseError::NotFound {
                resource: "hotel",
                identifier: "id",
            })?;

        if let Some(name) = updated_hotel.name {
            hotel.name = name;
        }
        if let Some(description) = updated_hotel.description {
            hotel.description = Some(description);
        }
        if let Some(star_rating) = updated_hotel.star_rating {
            hotel.star_rating = star_rating;
        }
        if let Some(active) = updated_hotel.active {
            hotel.active = active;
        }

        Ok(hotel.clone())
    }

    async fn delete_hotel(&self, hotel_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.write();
        state.hotel(hotel_id)?;

        state.hotels.retain(|h| h.id != hotel_id);
        state.rooms.retain(|r| r.hotel_id != hotel_id);
        state.bookings.retain(|b| b.hotel_id != hotel_id);

        Ok(())
    }

    async fn list_hotels(&self, filter: &HotelFilter) -> Result<Vec<HotelData>> {
        let state = self.state.read();

        let hotels = state
            .hotels
            .iter()
            .filter(|h| h.active)
            .filter(|h| {
                filter.city.as_deref().map_or(true, |city| {
                    h.city
                        .as_deref()
                        .is_some_and(|c| contains_ignore_case(c, city))
                })
            })
            .filter(|h| {
                filter
                    .min_rating
                    .map_or(true, |rating| h.star_rating >= rating)
            })
            .filter(|h| {
                filter
                    .search
                    .as_deref()
                    .map_or(true, |search| contains_ignore_case(&h.name, search))
            })
            .cloned()
            .collect();

        Ok(hotels)
    }

    async fn list_cities(&self) -> Result<Vec<String>> {
        let state = self.state.read();

        let mut cities: Vec<_> = state
            .hotels
            .iter()
            .filter(|h| h.active)
            .filter_map(|h| h.city.clone())
            .collect();

        cities.sort();
        cities.dedup();

        Ok(cities)
    }

    async fn count_hotels(&self) -> Result<i64> {
        Ok(self.state.read().hotels.len() as i64)
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        self.state.read().room(room_id).cloned()
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        let mut state = self.state.write();
        state.hotel(new_room.hotel_id)?;

        let taken = state
            .rooms
            .iter()
            .any(|r| r.hotel_id == new_room.hotel_id && r.room_number == new_room.room_number);

        if taken {
            return Err(DatabaseError::Conflict {
                resource: "room",
                field: "hotel:room_number",
                value: format!("{}:{}", new_room.hotel_id, new_room.room_number),
            });
        }

        let room = RoomData {
            id: state.next_id(),
            hotel_id: new_room.hotel_id,
            room_number: new_room.room_number,
            room_type: new_room.room_type,
            description: new_room.description,
            price_per_night: new_room.price_per_night,
            capacity: new_room.capacity,
            image_url: new_room.image_url,
            amenities: new_room.amenities,
            available: true,
            created_at: Utc::now(),
        };

        state.rooms.push(room.clone());
        Ok(room)
    }

    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData> {
        let mut state = self.state.write();
        let room = state
            .rooms
            .iter_mut()
            .find(|r| r.id == updated_room.id)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            })?;

        if let Some(description) = updated_room.description {
            room.description = Some(description);
        }
        if let Some(price) = updated_room.price_per_night {
            room.price_per_night = price;
        }
        if let Some(available) = updated_room.available {
            room.available = available;
        }

        Ok(room.clone())
    }

    async fn delete_room(&self, room_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.write();
        state.room(room_id)?;

        state.rooms.retain(|r| r.id != room_id);
        state.bookings.retain(|b| b.room_id != room_id);

        Ok(())
    }

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomData>> {
        let state = self.state.read();

        let rooms = state
            .rooms
            .iter()
            .filter(|r| r.available)
            .filter(|r| filter.hotel_id.map_or(true, |id| r.hotel_id == id))
            .filter(|r| {
                filter
                    .room_type
                    .as_deref()
                    .map_or(true, |t| r.room_type == t)
            })
            .filter(|r| filter.min_price.map_or(true, |p| r.price_per_night >= p))
            .filter(|r| filter.max_price.map_or(true, |p| r.price_per_night <= p))
            .filter(|r| filter.min_capacity.map_or(true, |c| r.capacity >= c))
            .cloned()
            .collect();

        Ok(rooms)
    }

    async fn list_room_types(&self) -> Result<Vec<String>> {
        let state = self.state.read();

        let mut types: Vec<_> = state.rooms.iter().map(|r| r.room_type.clone()).collect();
        types.sort();
        types.dedup();

        Ok(types)
    }

    async fn count_rooms(&self) -> Result<i64> {
        Ok(self.state.read().rooms.len() as i64)
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        let state = self.state.read();
        let row = state
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })?;

        state.assemble_booking(row)
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let mut state = self.state.write();
        let room = state.room(new_booking.room_id)?.clone();

        if state.conflicting_booking_exists(
            room.id,
            new_booking.check_in_date,
            new_booking.check_out_date,
        ) {
            return Err(DatabaseError::Conflict {
                resource: "booking",
                field: "room:dates",
                value: format!(
                    "{}:{}..{}",
                    room.id, new_booking.check_in_date, new_booking.check_out_date
                ),
            });
        }

        let now = Utc::now();
        let row = BookingRow {
            id: state.next_id(),
            user_id: new_booking.user_id,
            hotel_id: room.hotel_id,
            room_id: room.id,
            check_in_date: new_booking.check_in_date,
            check_out_date: new_booking.check_out_date,
            guest_name: new_booking.guest_name,
            guest_email: new_booking.guest_email,
            guest_phone: new_booking.guest_phone,
            number_of_guests: new_booking.number_of_guests,
            special_requests: new_booking.special_requests,
            total_price: new_booking.total_price,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let booking = state.assemble_booking(&row)?;
        state.bookings.push(row);

        Ok(booking)
    }

    async fn update_booking_status(
        &self,
        booking_id: PrimaryKey,
        status: BookingStatus,
    ) -> Result<BookingData> {
        let mut state = self.state.write();
        let row = state
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })?;

        row.status = status;
        row.updated_at = Utc::now();

        let row = row.clone();
        state.assemble_booking(&row)
    }

    async fn bookings_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let state = self.state.read();

        let mut rows: Vec<_> = state
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        rows.into_iter().map(|r| state.assemble_booking(r)).collect()
    }

    async fn recent_bookings(&self, limit: i64) -> Result<Vec<BookingData>> {
        let state = self.state.read();

        let mut rows: Vec<_> = state.bookings.iter().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        rows.into_iter()
            .take(limit as usize)
            .map(|r| state.assemble_booking(r))
            .collect()
    }

    async fn has_booking_conflict(
        &self,
        room_id: PrimaryKey,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool> {
        let state = self.state.read();
        state.room(room_id)?;

        Ok(state.conflicting_booking_exists(room_id, check_in, check_out))
    }

    async fn count_bookings(&self) -> Result<i64> {
        Ok(self.state.read().bookings.len() as i64)
    }
}
