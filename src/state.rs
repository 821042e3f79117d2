pub mod clients;
pub mod groups;
pub mod registry;
pub mod session;
