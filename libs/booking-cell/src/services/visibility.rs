use uuid::Uuid;

use shared_database::PostgrestQuery;
use shared_models::auth::Caller;

use crate::models::{Booking, BookingAction, BookingError};

const DENTIST_EMBED: &str = "dentist:dentists(name,address,tel)";
const USER_EMBED: &str = "user:profiles(name,email,tel)";

/// Rows a caller is allowed to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    Own(Uuid),
    All,
}

impl VisibilityScope {
    pub fn for_caller(caller: &Caller) -> Self {
        if caller.is_admin() {
            VisibilityScope::All
        } else {
            VisibilityScope::Own(caller.id)
        }
    }
}

/// Single description of a booking read; every listing and lookup goes through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingQuerySpec {
    pub scope: VisibilityScope,
    pub dentist_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub include_user: bool,
}

impl BookingQuerySpec {
    /// Listing for a caller. Only admins see who made each booking.
    pub fn list(caller: &Caller, dentist_id: Option<Uuid>) -> Self {
        let scope = VisibilityScope::for_caller(caller);
        Self {
            scope,
            dentist_id,
            booking_id: None,
            include_user: scope == VisibilityScope::All,
        }
    }

    /// Single booking with both projections. Ownership is checked after the
    /// fetch so a stranger gets an authorization error, not a masked 404.
    pub fn by_id(booking_id: Uuid) -> Self {
        Self {
            scope: VisibilityScope::All,
            dentist_id: None,
            booking_id: Some(booking_id),
            include_user: true,
        }
    }

    pub fn to_query(&self) -> PostgrestQuery {
        let columns = if self.include_user {
            format!("*,{},{}", DENTIST_EMBED, USER_EMBED)
        } else {
            format!("*,{}", DENTIST_EMBED)
        };

        let mut query = PostgrestQuery::new().select(&columns);

        if let VisibilityScope::Own(user_id) = self.scope {
            query = query.eq("user_id", user_id);
        }
        if let Some(dentist_id) = self.dentist_id {
            query = query.eq("dentist_id", dentist_id);
        }
        if let Some(booking_id) = self.booking_id {
            query = query.eq("id", booking_id);
        }

        query
    }
}

/// Owner-or-admin check shared by view, update and delete.
pub fn authorize(caller: &Caller, booking: &Booking, action: BookingAction) -> Result<(), BookingError> {
    if caller.can_access(booking.user_id) {
        Ok(())
    } else {
        Err(BookingError::Forbidden {
            user: caller.id,
            action,
        })
    }
}
