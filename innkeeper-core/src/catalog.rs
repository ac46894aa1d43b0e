use log::info;
use thiserror::Error;

use crate::{
    BookingData, Database, DatabaseError, HotelData, HotelFilter, InnkeeperContext,
    InnkeeperEvent, NewHotel, NewRoom, PrimaryKey, RoomData, RoomFilter, UpdatedHotel,
    UpdatedRoom, UserData,
};

/// Manages the hotel and room inventory, and serves the read side
pub struct Catalog<Db> {
    context: InnkeeperContext<Db>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Bad input, reported back to the caller
    #[error("{0}")]
    Validation(String),
    #[error("Only admins may manage the catalog")]
    Forbidden,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

/// Entity counts and recent activity for the admin dashboard
#[derive(Debug)]
pub struct Overview {
    pub total_users: i64,
    pub total_hotels: i64,
    pub total_rooms: i64,
    pub total_bookings: i64,
    pub recent_bookings: Vec<BookingData>,
}

impl<Db> Catalog<Db>
where
    Db: Database,
{
    /// How many recent bookings the overview shows
    const RECENT_BOOKINGS: i64 = 10;

    pub fn new(context: &InnkeeperContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Adds a hotel to the catalog. Admins only.
    pub async fn create_hotel(
        &self,
        requesting_user_id: PrimaryKey,
        new_hotel: NewHotel,
    ) -> Result<HotelData, CatalogError> {
        self.authorize_admin(requesting_user_id).await?;

        if new_hotel.name.trim().is_empty() {
            return Err(CatalogError::Validation(
                "hotel name must be provided".to_string(),
            ));
        }

        validate_star_rating(new_hotel.star_rating)?;

        let hotel = self
            .context
            .database
            .create_hotel(new_hotel)
            .await
            .map_err(CatalogError::Db)?;

        info!("Hotel {} created", hotel.name);
        self.context
            .emit(InnkeeperEvent::HotelCreated { hotel_id: hotel.id });

        Ok(hotel)
    }

    /// Updates a hotel. Admins only.
    pub async fn update_hotel(
        &self,
        requesting_user_id: PrimaryKey,
        updated_hotel: UpdatedHotel,
    ) -> Result<HotelData, CatalogError> {
        self.authorize_admin(requesting_user_id).await?;

        if let Some(star_rating) = updated_hotel.star_rating {
            validate_star_rating(star_rating)?;
        }

        self.context
            .database
            .update_hotel(updated_hotel)
            .await
            .map_err(CatalogError::Db)
    }

    /// Removes a hotel, its rooms, and their bookings. Admins only.
    pub async fn delete_hotel(
        &self,
        requesting_user_id: PrimaryKey,
        hotel_id: PrimaryKey,
    ) -> Result<(), CatalogError> {
        self.authorize_admin(requesting_user_id).await?;

        self.context
            .database
            .delete_hotel(hotel_id)
            .await
            .map_err(CatalogError::Db)
    }

    /// Adds a room to a hotel. Admins only.
    pub async fn create_room(
        &self,
        requesting_user_id: PrimaryKey,
        new_room: NewRoom,
    ) -> Result<RoomData, CatalogError> {
        self.authorize_admin(requesting_user_id).await?;

        if new_room.price_per_night < 0.0 {
            return Err(CatalogError::Validation(
                "price per night cannot be negative".to_string(),
            ));
        }

        if new_room.capacity < 1 {
            return Err(CatalogError::Validation(
                "room capacity must be at least 1".to_string(),
            ));
        }

        let room = self
            .context
            .database
            .create_room(new_room)
            .await
            .map_err(CatalogError::Db)?;

        info!("Room {} created in hotel {}", room.room_number, room.hotel_id);
        self.context.emit(InnkeeperEvent::RoomCreated {
            hotel_id: room.hotel_id,
            room_id: room.id,
        });

        Ok(room)
    }

    /// Updates a room. Admins only.
    pub async fn update_room(
        &self,
        requesting_user_id: PrimaryKey,
        updated_room: UpdatedRoom,
    ) -> Result<RoomData, CatalogError> {
        self.authorize_admin(requesting_user_id).await?;

        if let Some(price) = updated_room.price_per_night {
            if price < 0.0 {
                return Err(CatalogError::Validation(
                    "price per night cannot be negative".to_string(),
                ));
            }
        }

        self.context
            .database
            .update_room(updated_room)
            .await
            .map_err(CatalogError::Db)
    }

    /// Removes a room and its bookings. Admins only.
    pub async fn delete_room(
        &self,
        requesting_user_id: PrimaryKey,
        room_id: PrimaryKey,
    ) -> Result<(), CatalogError> {
        self.authorize_admin(requesting_user_id).await?;

        self.context
            .database
            .delete_room(room_id)
            .await
            .map_err(CatalogError::Db)
    }

    /// Active hotels matching the filter
    pub async fn hotels(&self, filter: &HotelFilter) -> Result<Vec<HotelData>, CatalogError> {
        self.context
            .database
            .list_hotels(filter)
            .await
            .map_err(CatalogError::Db)
    }

    pub async fn hotel_by_id(&self, hotel_id: PrimaryKey) -> Result<HotelData, CatalogError> {
        self.context
            .database
            .hotel_by_id(hotel_id)
            .await
            .map_err(CatalogError::Db)
    }

    /// Available rooms matching the filter
    pub async fn rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomData>, CatalogError> {
        self.context
            .database
            .list_rooms(filter)
            .await
            .map_err(CatalogError::Db)
    }

    pub async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData, CatalogError> {
        self.context
            .database
            .room_by_id(room_id)
            .await
            .map_err(CatalogError::Db)
    }

    /// Distinct cities with active hotels, for filter dropdowns
    pub async fn cities(&self) -> Result<Vec<String>, CatalogError> {
        self.context
            .database
            .list_cities()
            .await
            .map_err(CatalogError::Db)
    }

    /// Distinct room types, for filter dropdowns
    pub async fn room_types(&self) -> Result<Vec<String>, CatalogError> {
        self.context
            .database
            .list_room_types()
            .await
            .map_err(CatalogError::Db)
    }

    /// Entity counts and recent bookings. Admins only.
    pub async fn overview(&self, requesting_user_id: PrimaryKey) -> Result<Overview, CatalogError> {
        self.authorize_admin(requesting_user_id).await?;

        let database = &self.context.database;

        Ok(Overview {
            total_users: database.count_users().await.map_err(CatalogError::Db)?,
            total_hotels: database.count_hotels().await.map_err(CatalogError::Db)?,
            total_rooms: database.count_rooms().await.map_err(CatalogError::Db)?,
            total_bookings: database.count_bookings().await.map_err(CatalogError::Db)?,
            recent_bookings: database
                .recent_bookings(Self::RECENT_BOOKINGS)
                .await
                .map_err(CatalogError::Db)?,
        })
    }

    async fn authorize_admin(&self, requesting_user_id: PrimaryKey) -> Result<(), CatalogError> {
        let user = self
            .context
            .database
            .user_by_id(requesting_user_id)
            .await
            .map_err(CatalogError::Db)?;

        authorize(&user)
    }
}

/// Catalog mutations are gated on the explicit admin flag
fn authorize(user: &UserData) -> Result<(), CatalogError> {
    if !user.admin {
        return Err(CatalogError::Forbidden);
    }

    Ok(())
}

fn validate_star_rating(star_rating: i32) -> Result<(), CatalogError> {
    if !(1..=5).contains(&star_rating) {
        return Err(CatalogError::Validation(
            "star rating must be between 1 and 5".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{
        CatalogError, HotelFilter, Innkeeper, MemoryDatabase, NewHotel, NewPlainUser, NewRoom,
        PrimaryKey, RoomFilter,
    };

    fn hotel(name: &str, city: &str, star_rating: i32) -> NewHotel {
        NewHotel {
            name: name.to_string(),
            description: None,
            address: None,
            city: Some(city.to_string()),
            country: Some("USA".to_string()),
            star_rating,
            image_url: None,
            amenities: vec![],
            check_in_time: "14:00".to_string(),
            check_out_time: "11:00".to_string(),
        }
    }

    fn room(hotel_id: PrimaryKey, number: &str, room_type: &str, price: f64, capacity: i32) -> NewRoom {
        NewRoom {
            hotel_id,
            room_number: number.to_string(),
            room_type: room_type.to_string(),
            description: None,
            price_per_night: price,
            capacity,
            image_url: None,
            amenities: vec![],
        }
    }

    async fn innkeeper_with_admin() -> (Innkeeper<MemoryDatabase>, PrimaryKey) {
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

        (innkeeper, admin.id)
    }

    #[tokio::test]
    async fn non_admins_cannot_manage_the_catalog() {
        let (innkeeper, _) = innkeeper_with_admin().await;

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

        let result = innkeeper
            .catalog
            .create_hotel(guest.id, hotel("Seaside Resort", "Miami", 4))
            .await;

        assert!(matches!(result, Err(CatalogError::Forbidden)));
    }

    #[tokio::test]
    async fn star_rating_is_validated() {
        let (innkeeper, admin_id) = innkeeper_with_admin().await;

        let result = innkeeper
            .catalog
            .create_hotel(admin_id, hotel("Six Star Palace", "Dubai", 6))
            .await;

        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn hotel_filters_compose() {
        let (innkeeper, admin_id) = innkeeper_with_admin().await;
        let catalog = &innkeeper.catalog;

        catalog
            .create_hotel(admin_id, hotel("Grand Plaza Hotel", "New York", 5))
            .await
            .unwrap();
        catalog
            .create_hotel(admin_id, hotel("City Center Inn", "New York", 3))
            .await
            .unwrap();
        catalog
            .create_hotel(admin_id, hotel("Seaside Resort", "Miami", 4))
            .await
            .unwrap();

        let in_new_york = catalog
            .hotels(&HotelFilter {
                city: Some("new york".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_new_york.len(), 2);

        let luxurious = catalog
            .hotels(&HotelFilter {
                city: Some("new york".to_string()),
                min_rating: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(luxurious.len(), 1);
        assert_eq!(luxurious[0].name, "Grand Plaza Hotel");

        let by_name = catalog
            .hotels(&HotelFilter {
                search: Some("plaza".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let cities = catalog.cities().await.unwrap();
        assert_eq!(cities, vec!["Miami".to_string(), "New York".to_string()]);
    }

    #[tokio::test]
    async fn room_filters_compose() {
        let (innkeeper, admin_id) = innkeeper_with_admin().await;
        let catalog = &innkeeper.catalog;

        let hotel = catalog
            .create_hotel(admin_id, hotel("Grand Plaza Hotel", "New York", 5))
            .await
            .unwrap();

        catalog
            .create_room(admin_id, room(hotel.id, "101", "Standard Room", 99.0, 2))
            .await
            .unwrap();
        catalog
            .create_room(admin_id, room(hotel.id, "201", "Suite", 249.0, 4))
            .await
            .unwrap();
        catalog
            .create_room(admin_id, room(hotel.id, "301", "Presidential Suite", 599.0, 6))
            .await
            .unwrap();

        let affordable = catalog
            .rooms(&RoomFilter {
                max_price: Some(300.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(affordable.len(), 2);

        let spacious = catalog
            .rooms(&RoomFilter {
                min_capacity: Some(4),
                min_price: Some(300.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(spacious.len(), 1);
        assert_eq!(spacious[0].room_number, "301");

        let suites = catalog
            .rooms(&RoomFilter {
                room_type: Some("Suite".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(suites.len(), 1);

        let types = catalog.room_types().await.unwrap();
        assert_eq!(types.len(), 3);
    }

    #[tokio::test]
    async fn room_numbers_are_unique_per_hotel() {
        let (innkeeper, admin_id) = innkeeper_with_admin().await;
        let catalog = &innkeeper.catalog;

        let first = catalog
            .create_hotel(admin_id, hotel("Grand Plaza Hotel", "New York", 5))
            .await
            .unwrap();
        let second = catalog
            .create_hotel(admin_id, hotel("Seaside Resort", "Miami", 4))
            .await
            .unwrap();

        catalog
            .create_room(admin_id, room(first.id, "101", "Standard Room", 99.0, 2))
            .await
            .unwrap();

        let duplicate = catalog
            .create_room(admin_id, room(first.id, "101", "Suite", 249.0, 4))
            .await;
        assert!(matches!(
            duplicate,
            Err(CatalogError::Db(crate::DatabaseError::Conflict { .. }))
        ));

        // Same number in another hotel is fine
        let elsewhere = catalog
            .create_room(admin_id, room(second.id, "101", "Standard Room", 99.0, 2))
            .await;
        assert!(elsewhere.is_ok());
    }

    #[tokio::test]
    async fn overview_counts_entities() {
        let (innkeeper, admin_id) = innkeeper_with_admin().await;

        let hotel = innkeeper
            .catalog
            .create_hotel(admin_id, hotel("Grand Plaza Hotel", "New York", 5))
            .await
            .unwrap();
        innkeeper
            .catalog
            .create_room(admin_id, room(hotel.id, "101", "Standard Room", 99.0, 2))
            .await
            .unwrap();

        let overview = innkeeper.catalog.overview(admin_id).await.unwrap();
        assert_eq!(overview.total_users, 1);
        assert_eq!(overview.total_hotels, 1);
        assert_eq!(overview.total_rooms, 1);
        assert_eq!(overview.total_bookings, 0);
        assert!(overview.recent_bookings.is_empty());
    }
}
