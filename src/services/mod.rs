pub mod provision_service;
pub mod provision_service_impl;

pub use provision_service::{
    AccountInput, ConflictPolicy, ProvisionError, ProvisionResult, ProvisionService,
    ProvisionedAccount,
};
pub use provision_service_impl::SeaOrmProvisionService;
