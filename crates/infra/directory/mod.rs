pub mod supabase_auth;
