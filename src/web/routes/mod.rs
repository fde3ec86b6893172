pub mod command_routes;
pub mod monitor_routes;
