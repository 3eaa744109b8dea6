pub mod competition;
pub mod jwt;
pub mod users;
