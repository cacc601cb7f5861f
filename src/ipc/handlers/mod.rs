pub mod assets;
pub mod backup_exchange;
pub mod certificates;
pub mod classes;
pub mod content;
pub mod core;
pub mod fees;
pub mod gallery;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod session;
pub mod staff;
pub mod students;
