pub mod booking;
pub mod capacity;
pub mod closure;
pub mod holidays;
pub mod token;
pub mod weekoffs;
