pub mod server;
pub mod text;
