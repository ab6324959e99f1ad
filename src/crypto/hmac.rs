// src/crypto/hmac.rs

//! HMAC-SHA primitives (re-exports from `hmac` + `sha2`).

use hmac::Hmac;
use sha2::Sha256;

pub type HmacSha256 = Hmac<Sha256>;
