pub mod sync;

pub use sync::*;

use crate::AppState;
use rocket::{routes, Build, Rocket};

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .mount("/", routes![process_link, run_status])
}
