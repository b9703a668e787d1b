pub mod aggregate;
pub mod email;
pub mod graph;
pub mod tally;
pub mod xlsx;
