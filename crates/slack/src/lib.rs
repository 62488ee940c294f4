//! Slack surface for the nextaction GTD bot: typed Block Kit documents,
//! slash command parsing and routing, interaction envelopes, event
//! callbacks, Web API client, and request signature verification.

pub mod blocks;
pub mod commands;
pub mod events;
pub mod interactions;
pub mod notify;
pub mod verify;
