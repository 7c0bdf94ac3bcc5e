pub mod constants;
pub mod did;
pub mod multibase;
pub mod p256;
pub mod secp256k1;
pub mod types;
pub mod utils;
pub mod verify;
