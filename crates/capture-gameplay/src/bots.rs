//! Bot assignment.
//!
//! Each bot is simulated by exactly one human connection, its controller.
//! An authority only resolves collisions for itself and the bots it
//! controls, so no transfer is ever applied twice for the same bot.

use capture_common::UserId;
use tracing::{debug, info};

use crate::user::{UserInfo, UserTable};

/// Bots controlled by `authority`, ordered by id.
#[must_use]
pub fn assigned_bots<'a>(authority: &UserId, users: &'a UserTable) -> Vec<&'a UserInfo> {
    users
        .values()
        .filter(|u| u.is_bot && u.controller_id.as_ref() == Some(authority))
        .collect()
}

/// The authority followed by its bots: everyone this authority simulates.
#[must_use]
pub fn simulated_users<'a>(authority: &UserId, users: &'a UserTable) -> Vec<&'a UserInfo> {
    users
        .get(authority)
        .into_iter()
        .chain(assigned_bots(authority, users))
        .collect()
}

/// Hands bots whose controller is missing (or is itself a bot) to the
/// remaining humans, round-robin in id order.
///
/// Returns `(bot, new controller)` for every reassignment. With no humans
/// left, orphaned bots keep no controller.
pub fn reassign_orphans(users: &mut UserTable) -> Vec<(UserId, UserId)> {
    let humans: Vec<UserId> = users
        .values()
        .filter(|u| !u.is_bot)
        .map(|u| u.id.clone())
        .collect();

    let orphans: Vec<UserId> = users
        .values()
        .filter(|u| {
            u.is_bot
                && u.controller_id
                    .as_ref()
                    .map_or(true, |c| !humans.contains(c))
        })
        .map(|u| u.id.clone())
        .collect();

    if orphans.is_empty() {
        return Vec::new();
    }
    if humans.is_empty() {
        for bot in &orphans {
            if let Some(user) = users.get_mut(bot) {
                user.controller_id = None;
            }
        }
        debug!("{} bots left without a controller", orphans.len());
        return Vec::new();
    }

    let mut reassigned = Vec::with_capacity(orphans.len());
    for (i, bot) in orphans.into_iter().enumerate() {
        let controller = humans[i % humans.len()].clone();
        if let Some(user) = users.get_mut(&bot) {
            user.controller_id = Some(controller.clone());
            info!("Bot {bot} now controlled by {controller}");
            reassigned.push((bot, controller));
        }
    }
    reassigned
}
