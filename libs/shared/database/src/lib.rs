pub mod supabase;

pub use supabase::{error_status, ApiStatusError, SupabaseClient};
