mod client;
mod client_builder;
mod error;
pub mod models;
mod result;
mod token_pool;

pub use client::Client;
pub use client_builder::ClientBuilder;
pub use error::Error;
pub use models::{
    OrganizationConnection, OrganizationNode, Page, RateLimitOverview, RepositoryConnection,
    RepositoryNode,
};
pub use result::Result;
pub use token_pool::{Checkout, Lease, TokenPool, REMAINING_FLOOR};
