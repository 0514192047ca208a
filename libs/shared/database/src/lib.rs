pub mod error;
pub mod supabase;

pub use error::{app_error_from, SupabaseError};
pub use supabase::SupabaseClient;
