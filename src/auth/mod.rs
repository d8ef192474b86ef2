//! Groww access-token acquisition: checksum, exchange, and the token file

pub mod checksum;
pub mod persist;
pub mod token;

pub use checksum::{generate_checksum, Checksum};
pub use persist::{render_token_file, write_token_file};
pub use token::{parse_token_response, AccessToken, TokenExchangeClient};
