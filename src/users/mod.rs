pub mod follows;
pub mod profile;
