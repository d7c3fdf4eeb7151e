pub mod acmedns;

pub use acmedns::AcmeDnsProvider;
