pub mod controllers;
pub mod models;
pub mod services;
pub mod state;
pub mod views;

use lumen::plugins::{ErrorHandling, NormalizePath};
use lumen::{AppBuilder, LumenConfig};

use controllers::home_controller::HomeController;
use controllers::user_controller::UserController;
use state::Services;

/// The demo application with every controller registered.
pub fn app(config: LumenConfig, services: Services) -> AppBuilder<Services> {
    AppBuilder::new()
        .with_state(services)
        .with_config(config)
        .register_controller::<HomeController>()
        .register_controller::<UserController>()
        .with(NormalizePath)
        .with(ErrorHandling)
}
