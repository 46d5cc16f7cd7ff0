pub mod frames;
pub mod teaching;

pub use frames::{ErrorShape, EventFrame, InboundFrame, ReqFrame, ResFrame};
