pub mod callback;
pub mod catalog;
pub mod payment;
pub mod principal;
