pub mod favorites;
pub mod nav;
pub mod reports;
pub mod timers;
