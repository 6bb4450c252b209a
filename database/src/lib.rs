pub mod consts;
pub mod customers;
pub mod identity;
pub mod model;
pub mod reports;
pub mod store;
