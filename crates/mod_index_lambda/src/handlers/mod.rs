pub mod cleanup;
pub mod list;
