pub mod check;
pub mod clean;
pub mod refresh;
pub mod serve;
