pub mod download_hook;
