use pgroute_plugin::abi::AbiRevision;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "plugin \"{name}\" was built against ABI revision {revision}, expected revision {}",
        u32::from(AbiRevision::CURRENT)
    )]
    AbiRevision { name: String, revision: u32 },
}
