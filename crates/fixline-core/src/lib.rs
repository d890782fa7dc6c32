// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Fixline service-matching agent.
//!
//! This crate provides the foundational trait definitions, error types, domain
//! entities, and conversation step tokens used throughout the Fixline
//! workspace. All collaborator adapters (messaging, entities, session store,
//! language model, job queue) implement traits defined here.

pub mod error;
pub mod steps;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FixlineError;
pub use steps::Step;
pub use types::{AccountStatus, AccountType, AdapterType, HealthStatus, RequestStatus};

// Re-export all collaborator traits at crate root.
pub use traits::{
    EntityGateway, JobQueue, LanguageModel, MessagingGateway, PluginAdapter, SessionStore,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_trait_modules_are_exported() {
        // If any collaborator trait is missing or has a compile error,
        // this test won't compile.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_messaging<T: MessagingGateway>() {}
        fn _assert_entities<T: EntityGateway>() {}
        fn _assert_session_store<T: SessionStore>() {}
        fn _assert_model<T: LanguageModel>() {}
        fn _assert_queue<T: JobQueue>() {}
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Messaging,
            AdapterType::Entities,
            AdapterType::SessionStore,
            AdapterType::Model,
            AdapterType::Queue,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }
}
