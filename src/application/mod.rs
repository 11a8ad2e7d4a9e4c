pub mod accounts;
pub mod appointments;
pub mod blocking;
pub mod booking;
pub mod bootstrap;
pub mod catalog;
pub mod commands;
pub mod error;
pub mod schedule;
