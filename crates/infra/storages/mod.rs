pub mod supabase_storage;
