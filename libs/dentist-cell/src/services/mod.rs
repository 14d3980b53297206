pub mod dentist;
pub mod query;

pub use dentist::DentistService;
pub use query::DentistListParams;
