pub mod driver_handler;
pub mod location_handler;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(driver_handler::register)
        .service(driver_handler::login)
        .service(driver_handler::logout)
        .service(driver_handler::me)
        .service(driver_handler::update_status)
        .service(driver_handler::update_location)
        .service(driver_handler::license_image)
        .service(driver_handler::list_drivers)
        .service(location_handler::list_locations)
        .service(location_handler::add_location);
}
