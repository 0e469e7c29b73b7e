pub mod aes_cbc;
pub mod aes_gcm;
