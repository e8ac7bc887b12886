pub mod crud;
pub mod participants;
