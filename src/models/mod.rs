pub mod ievents;
pub mod isensor;
pub mod istates;
pub mod itelemetry;

pub use ievents::*;
pub use isensor::*;
pub use istates::*;
pub use itelemetry::*;

use chrono::{Local, NaiveDateTime};

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
