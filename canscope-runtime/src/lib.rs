mod controller;
mod sync_loop;

pub use controller::Controller;
pub use sync_loop::ControlMessage;
