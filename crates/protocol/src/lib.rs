#![forbid(unsafe_code)]

mod frame;
mod item;

pub use frame::{Frame, OpCode, Status};
pub use item::{encode_keys, parse_keys, Item, Value};
