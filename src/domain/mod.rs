pub mod accounting;
pub mod blocking;
pub mod models;
pub mod reconcile;
pub mod slots;
