//! Chain adapters.
//!
//! - `fullnode`: REST client for transaction dry runs
//! - `wallet`: remote signer daemon session

pub mod fullnode;
pub mod wallet;

pub use fullnode::FullnodeClient;
pub use wallet::RemoteWallet;
