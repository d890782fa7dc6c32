// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation step tokens.
//!
//! A [`Step`] names the state a user's conversation is in. The set is finite
//! and closed: a session holding a token that fails to parse is treated as
//! "no session" and the recovery engine rebuilds it from durable entities.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The named state of a user's conversation.
///
/// Grouped into phases: terms/account-type selection, client-profile
/// collection, provider-profile collection, verification wait, terminal-ish
/// account states, and the two absorbing main-menu states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Waiting for the user to accept the terms of service.
    AwaitingTerms,
    /// Waiting for the user to choose Client or ServiceProvider.
    AwaitingAccountType,
    /// Collecting the user's full name.
    AwaitingName,
    /// Collecting the national identity document number.
    AwaitingNationalId,
    /// Collecting the city.
    AwaitingCity,
    /// Collecting the street address.
    AwaitingAddress,
    /// Collecting location coordinates.
    AwaitingLocation,
    /// Provider onboarding: choosing a service category.
    AwaitingCategory,
    /// Provider onboarding: choosing a service within the category.
    AwaitingService,
    /// Provider onboarding: collecting the service description.
    AwaitingDescription,
    /// Provider onboarding: collecting the hourly rate.
    AwaitingRate,
    /// Provider onboarding: collecting the identity photo.
    AwaitingIdPhoto,
    /// Provider profile complete, waiting for manual verification.
    AwaitingVerification,
    /// Account suspended. Repeats a fixed message; accepts a reactivation command.
    Suspended,
    /// Account inactive. Repeats a fixed message; accepts a reactivation command.
    Inactive,
    /// Client main menu: messages are delegated to the tool-call dispatcher.
    ClientMenu,
    /// Provider main menu: messages are delegated to the tool-call dispatcher.
    ProviderMenu,
}

impl Step {
    /// Returns true for the absorbing main-menu states where the scripted
    /// state machine hands off to the tool-call dispatcher.
    pub fn is_menu(&self) -> bool {
        matches!(self, Step::ClientMenu | Step::ProviderMenu)
    }

    /// Returns true for the terminal-ish account states that only repeat a
    /// fixed message (or accept an explicit reactivation command).
    pub fn is_terminal_ish(&self) -> bool {
        matches!(self, Step::Suspended | Step::Inactive)
    }
}
