use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use dentist_cell::models::DentistError;
use dentist_cell::services::DentistService;
use shared_config::AppConfig;
use shared_database::supabase::PREFER_REPRESENTATION;
use shared_database::{tables, PostgrestQuery, SupabaseClient};
use shared_models::auth::Caller;

use crate::models::{
    Booking, BookingAction, BookingError, BookingView, CreateBookingRequest,
    UpdateBookingRequest, BOOKING_QUOTA,
};
use crate::services::visibility::{authorize, BookingQuerySpec};

pub struct BookingService {
    supabase: SupabaseClient,
    dentists: DentistService,
}

fn first<T>(rows: Vec<T>) -> Option<T> {
    rows.into_iter().next()
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            dentists: DentistService::new(config),
        }
    }

    pub async fn list_bookings(
        &self,
        spec: &BookingQuerySpec,
        auth_token: &str,
    ) -> Result<Vec<BookingView>, BookingError> {
        debug!("Listing bookings for scope {:?}", spec.scope);

        let bookings: Vec<BookingView> = self
            .supabase
            .query(Method::GET, tables::BOOKINGS, &spec.to_query(), Some(auth_token), None, None)
            .await?;

        Ok(bookings)
    }

    /// Booking with dentist and user projections, visible to its owner or an admin.
    pub async fn get_booking(
        &self,
        booking_id: Uuid,
        caller: &Caller,
        auth_token: &str,
    ) -> Result<BookingView, BookingError> {
        let rows: Vec<BookingView> = self
            .supabase
            .query(
                Method::GET,
                tables::BOOKINGS,
                &BookingQuerySpec::by_id(booking_id).to_query(),
                Some(auth_token),
                None,
                None,
            )
            .await?;

        let view = first(rows).ok_or(BookingError::NotFound(booking_id))?;
        authorize(caller, &view.booking, BookingAction::View)?;

        Ok(view)
    }

    async fn fetch_booking(&self, booking_id: Uuid, auth_token: &str) -> Result<Booking, BookingError> {
        let rows: Vec<Booking> = self
            .supabase
            .query(
                Method::GET,
                tables::BOOKINGS,
                &PostgrestQuery::new().eq("id", booking_id),
                Some(auth_token),
                None,
                None,
            )
            .await?;

        first(rows).ok_or(BookingError::NotFound(booking_id))
    }

    async fn ensure_dentist(&self, dentist_id: Uuid, auth_token: &str) -> Result<(), BookingError> {
        match self.dentists.get_dentist(dentist_id, Some(auth_token)).await {
            Ok(_) => Ok(()),
            Err(DentistError::NotFound(_)) => Err(BookingError::DentistNotFound(dentist_id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn count_user_bookings(&self, user_id: Uuid, auth_token: &str) -> Result<u64, BookingError> {
        let query = PostgrestQuery::new().eq("user_id", user_id);
        Ok(self.supabase.count(tables::BOOKINGS, &query, Some(auth_token)).await?)
    }

    /// Creates a booking for the caller against an existing dentist.
    ///
    /// The quota check and the insert are separate requests, so two concurrent
    /// creates for one user can both pass the check.
    pub async fn create_booking(
        &self,
        dentist_id: Uuid,
        request: CreateBookingRequest,
        caller: &Caller,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        self.ensure_dentist(dentist_id, auth_token).await?;

        let existing = self.count_user_bookings(caller.id, auth_token).await?;
        if existing >= BOOKING_QUOTA {
            return Err(BookingError::QuotaExceeded {
                user: caller.id,
                quota: BOOKING_QUOTA,
            });
        }

        let booking_data = json!({
            "dentist_id": dentist_id,
            "user_id": caller.id,
            "booking_date": request.booking_date,
        });

        let rows: Vec<Booking> = self
            .supabase
            .query(
                Method::POST,
                tables::BOOKINGS,
                &PostgrestQuery::new(),
                Some(auth_token),
                Some(booking_data),
                Some(PREFER_REPRESENTATION),
            )
            .await?;

        let booking = first(rows).ok_or(BookingError::NotCreated)?;
        info!("Booking {} created for user {} with dentist {}", booking.id, caller.id, dentist_id);

        Ok(booking)
    }

    pub async fn update_booking(
        &self,
        booking_id: Uuid,
        request: UpdateBookingRequest,
        caller: &Caller,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self.fetch_booking(booking_id, auth_token).await?;
        authorize(caller, &booking, BookingAction::Update)?;

        if request.is_empty() {
            return Ok(booking);
        }

        let mut update_data = Map::new();
        if let Some(dentist_id) = request.dentist_id {
            if dentist_id != booking.dentist_id {
                self.ensure_dentist(dentist_id, auth_token).await?;
            }
            update_data.insert("dentist_id".to_string(), json!(dentist_id));
        }
        if let Some(booking_date) = request.booking_date {
            update_data.insert("booking_date".to_string(), json!(booking_date));
        }

        let rows: Vec<Booking> = self
            .supabase
            .query(
                Method::PATCH,
                tables::BOOKINGS,
                &PostgrestQuery::new().eq("id", booking_id),
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(PREFER_REPRESENTATION),
            )
            .await?;

        first(rows).ok_or(BookingError::NotFound(booking_id))
    }

    pub async fn delete_booking(
        &self,
        booking_id: Uuid,
        caller: &Caller,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        let booking = self.fetch_booking(booking_id, auth_token).await?;
        authorize(caller, &booking, BookingAction::Delete)?;

        self.supabase
            .execute(
                Method::DELETE,
                tables::BOOKINGS,
                &PostgrestQuery::new().eq("id", booking_id),
                Some(auth_token),
                None,
            )
            .await?;

        info!("Booking {} deleted by {}", booking_id, caller.id);
        Ok(())
    }
}
