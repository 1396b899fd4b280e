pub mod add;
pub mod create;
pub mod extract;
pub mod info;
pub mod list;
pub mod read;
pub mod remove;
pub mod verify;
