pub mod home_controller;
pub mod user_controller;
