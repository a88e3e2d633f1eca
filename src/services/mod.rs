pub mod security;

pub use security::{
    create_access_token, create_refresh_token, decode_token, hash_password, verify_password,
};
