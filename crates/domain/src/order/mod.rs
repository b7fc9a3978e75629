//! Order data model and status state machine.

mod commands;
mod model;
mod record;
mod status;

pub use commands::CreateOrder;
pub use model::{Order, Payout, order_amount};
pub use record::OrderRecord;
pub use status::OrderStatus;
