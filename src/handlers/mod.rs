pub mod ask;
pub mod turn;
