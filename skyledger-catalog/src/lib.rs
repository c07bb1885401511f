pub mod accounts;
pub mod service;

pub use accounts::{AccountService, NewUser, UserPatch};
pub use service::CatalogService;
