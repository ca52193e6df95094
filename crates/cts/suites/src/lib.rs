//! Built-in CTS spec modules.
//!
//! Each module exposes a `spec()` constructor returning its description and
//! test group; [`registry`] wires them into the `cts` suite together with the
//! directory READMEs.

pub mod device;
pub mod examples;
pub mod params;

use cts_framework::SuiteRegistry;

/// Name of the built-in suite.
pub const SUITE: &str = "cts";

/// Every built-in spec module, keyed by path.
pub fn registry() -> SuiteRegistry {
    let mut registry = SuiteRegistry::new(SUITE);
    registry
        .register("examples", examples::spec)
        .register("device/queue", device::spec)
        .register("framework/params", params::spec)
        .readme("", "The conformance test suite.")
        .readme("device", "Tests that drive the shared device through a custom fixture.")
        .readme("framework", "Self-tests of the test framework.");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_framework::{Listing, ListingEntry};

    #[test]
    fn test_registry_crawls_cleanly() {
        let listing = Listing::crawl(&registry()).unwrap();
        let specs: Vec<String> = listing.specs().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            specs,
            vec!["cts:device/queue", "cts:examples", "cts:framework/params"]
        );
        assert!(matches!(&listing.entries[0], ListingEntry::Readme { file, .. } if file.is_empty()));
    }
}
