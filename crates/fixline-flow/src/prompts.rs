// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt text for each conversation step.
//!
//! Category and service prompts render live catalog data; everything else is
//! fixed text. The engine appends the next step's prompt to every reply so
//! the user always knows what is expected of them.

use fixline_core::types::User;
use fixline_core::{AccountType, EntityGateway, FixlineError, Step};

pub const SUSPENDED_MESSAGE: &str = "Your account is currently suspended. Reply REACTIVATE to \
     request reactivation, or contact support.";

pub const INACTIVE_MESSAGE: &str = "Your account is inactive. Reply REACTIVATE to pick up where \
     you left off.";

const VERIFICATION_MESSAGE: &str = "Your provider profile is under review. We will message you \
     as soon as verification is complete.";

/// The prompt shown when a user lands on (or stays at) a step.
pub async fn step_prompt(
    entities: &dyn EntityGateway,
    user: &User,
    step: Step,
) -> Result<String, FixlineError> {
    let text = match step {
        Step::AwaitingTerms => {
            "Welcome to Fixline! We connect you with trusted local service \
             providers. By continuing you agree to our terms of service. \
             Reply ACCEPT to continue."
                .to_string()
        }
        Step::AwaitingAccountType => {
            "How would you like to use Fixline?\n1. Request services (Client)\n\
             2. Offer services (Service Provider)\nReply with 1 or 2."
                .to_string()
        }
        Step::AwaitingName => "What is your full name?".to_string(),
        Step::AwaitingNationalId => {
            "Please send your national ID number in the format 00-0000000-X-00."
                .to_string()
        }
        Step::AwaitingCity => "Which city are you in?".to_string(),
        Step::AwaitingAddress => "What is your street address?".to_string(),
        Step::AwaitingLocation => {
            "Please share your location as latitude, longitude — for example \
             -17.8252, 31.0335."
                .to_string()
        }
        Step::AwaitingCategory => {
            let categories = entities.list_categories().await?;
            let mut lines =
                vec!["Which category do you work in? Reply with the number.".to_string()];
            for c in &categories {
                lines.push(format!("{}. {}", c.id, c.name));
            }
            lines.join("\n")
        }
        Step::AwaitingService => {
            let category_id = entities
                .get_provider_profile(&user.phone)
                .await?
                .and_then(|p| p.category_id)
                .ok_or_else(|| {
                    FixlineError::Internal("service prompt without a chosen category".into())
                })?;
            let services = entities.list_services(category_id).await?;
            let mut lines =
                vec!["Which service do you offer? Reply with the number.".to_string()];
            for s in &services {
                lines.push(format!("{}. {}", s.id, s.name));
            }
            lines.join("\n")
        }
        Step::AwaitingDescription => {
            "Describe your service in a sentence or two.".to_string()
        }
        Step::AwaitingRate => "What is your hourly rate in USD?".to_string(),
        Step::AwaitingIdPhoto => {
            "Please send a photo of your national ID for verification.".to_string()
        }
        Step::AwaitingVerification => VERIFICATION_MESSAGE.to_string(),
        Step::Suspended => SUSPENDED_MESSAGE.to_string(),
        Step::Inactive => INACTIVE_MESSAGE.to_string(),
        Step::ClientMenu => {
            let name = user.name.as_deref().unwrap_or("there");
            format!(
                "You're all set, {name}! Tell me what you need — for example \
                 \"I need my laundry done\" — or ask to see your bookings."
            )
        }
        Step::ProviderMenu => {
            let name = user.name.as_deref().unwrap_or("there");
            format!(
                "Welcome back, {name}. I can show your assigned jobs, mark one \
                 completed, or update your profile."
            )
        }
    };
    Ok(text)
}

/// Which menu a user belongs to once onboarding completes.
pub fn menu_for(account_type: Option<AccountType>) -> Step {
    match account_type {
        Some(AccountType::ServiceProvider) => Step::ProviderMenu,
        _ => Step::ClientMenu,
    }
}
