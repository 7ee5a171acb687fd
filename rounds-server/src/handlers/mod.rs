pub mod directory;
pub mod health;
pub mod inspections;
pub mod sweep;
