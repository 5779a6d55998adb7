pub mod health;
pub mod page_lock;
pub mod route;
