pub mod users;
pub mod assets;
pub mod requests;
pub mod assignments;
