pub mod alerts_controller;
pub mod events_controller;
pub mod home_controller;
pub mod pairs_controller;
