// CLI command handlers

pub mod ace;
pub mod check;
pub mod rights;
