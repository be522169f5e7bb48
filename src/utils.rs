//! Utility functions for identifiers and index keys

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

// key of the (agency, business) unique index
pub fn pair_digest(agency: &str, business: &str) -> String {
    sha256::digest(format!("{agency}:{business}"))
}
