pub mod caller;
pub mod customer;
pub mod lead;
pub mod payload;
pub mod report;
pub mod statement;
