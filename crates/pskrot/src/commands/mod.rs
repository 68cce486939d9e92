pub mod devices;
pub mod queue;
pub mod rotate;
