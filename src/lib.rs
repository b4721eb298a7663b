//! Railgun MCP Server
//!
//! A Model Context Protocol (MCP) server exposing private DeFi operations on the
//! Railgun privacy protocol: wallet management, shielding and unshielding,
//! private transfers, recipes, relayers, multi-wallet operations and a set of
//! plain-English helpers. Tool handlers forward JSON to the Railgun HTTP API
//! through an explicitly opened [`client::ApiClient`].

pub mod amounts;
pub mod assistant;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod multi_wallet;
pub mod recipes;
pub mod relayers;
pub mod schema;
pub mod server;
pub mod transactions;
pub mod utility;
pub mod wallets;

pub use server::RailgunMcpHandler;
