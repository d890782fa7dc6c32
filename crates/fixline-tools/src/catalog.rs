// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool definitions advertised to the language model.
//!
//! The catalog depends on the account type: clients book and manage service
//! requests, providers manage assigned jobs. Both share the catalog-browsing
//! and account-management tools.

use fixline_core::AccountType;
use fixline_core::types::ToolDefinition;
use serde_json::json;

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn no_args() -> serde_json::Value {
    json!({"type": "object", "properties": {}, "additionalProperties": false})
}

/// The tools available to a user at their main menu.
pub fn tool_catalog(account_type: AccountType) -> Vec<ToolDefinition> {
    let mut tools = vec![
        tool(
            "list_categories",
            "List all service categories with their numeric codes.",
            no_args(),
        ),
        tool(
            "list_services",
            "List the services available in one category.",
            json!({
                "type": "object",
                "properties": {
                    "category_id": {
                        "type": "integer",
                        "description": "Numeric category code from list_categories"
                    }
                },
                "required": ["category_id"],
                "additionalProperties": false
            }),
        ),
        tool(
            "view_bookings",
            "Show the user's recent service requests and their statuses.",
            no_args(),
        ),
        tool(
            "update_profile",
            "Update one field of the user's profile.",
            json!({
                "type": "object",
                "properties": {
                    "field": {
                        "type": "string",
                        "enum": ["name", "city", "address", "description", "hourly_rate"],
                        "description": "Which profile field to change"
                    },
                    "value": {"type": "string", "description": "The new value"}
                },
                "required": ["field", "value"],
                "additionalProperties": false
            }),
        ),
        tool(
            "delete_account",
            "Delete the user's account. Requires a second confirming call \
             before anything is removed.",
            no_args(),
        ),
    ];

    match account_type {
        AccountType::Client => {
            tools.push(tool(
                "create_booking",
                "Create a service request for a category and service. A \
                 background search for a provider starts immediately.",
                json!({
                    "type": "object",
                    "properties": {
                        "category_id": {
                            "type": "integer",
                            "description": "Numeric category code"
                        },
                        "service_id": {
                            "type": "integer",
                            "description": "Numeric service code within the category"
                        }
                    },
                    "required": ["category_id", "service_id"],
                    "additionalProperties": false
                }),
            ));
            tools.push(tool(
                "cancel_booking",
                "Cancel a service request by its request code (FX-XXXXXX).",
                json!({
                    "type": "object",
                    "properties": {
                        "code": {"type": "string", "description": "Request code, e.g. FX-3F9A2C"}
                    },
                    "required": ["code"],
                    "additionalProperties": false
                }),
            ));
            tools.push(tool(
                "respond_to_candidate",
                "Accept or decline the provider candidate found for the \
                 client's open request.",
                json!({
                    "type": "object",
                    "properties": {
                        "decision": {"type": "string", "enum": ["accept", "decline"]}
                    },
                    "required": ["decision"],
                    "additionalProperties": false
                }),
            ));
        }
        AccountType::ServiceProvider => {
            tools.push(tool(
                "complete_booking",
                "Mark an accepted job as completed by its request code. This \
                 records the platform fee owed.",
                json!({
                    "type": "object",
                    "properties": {
                        "code": {"type": "string", "description": "Request code, e.g. FX-3F9A2C"}
                    },
                    "required": ["code"],
                    "additionalProperties": false
                }),
            ));
        }
    }

    tools
}
