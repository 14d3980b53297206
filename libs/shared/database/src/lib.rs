pub mod error;
pub mod query;
pub mod supabase;

pub use error::SupabaseError;
pub use query::{FilterOp, PostgrestQuery};
pub use supabase::SupabaseClient;

/// PostgREST table names.
pub mod tables {
    pub const DENTISTS: &str = "dentists";
    pub const BOOKINGS: &str = "bookings";
    pub const PROFILES: &str = "profiles";
}
