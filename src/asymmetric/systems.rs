pub mod rsa_oaep;
