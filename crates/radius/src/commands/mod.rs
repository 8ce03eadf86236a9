pub mod deploy;
pub mod eval;
pub mod state;
