pub mod config;
pub mod doctor;
pub mod nodes;
pub mod registry;
pub mod roles;
