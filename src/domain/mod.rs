pub mod audit;
pub mod booking;
pub mod operator;
pub mod voucher;

pub use audit::*;
pub use booking::*;
pub use operator::*;
pub use voucher::*;
