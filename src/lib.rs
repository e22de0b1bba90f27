// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! sbmod helps the moderators of a local subreddit decide who may join it.
//!
//! Prospective members ask to join through modmail. A moderator then asks
//! sbmod to verify the account, either directly from the command line or
//! by sending the bot a private message. Verification looks at the
//! account's age, any bans or mutes on record, and its comment history in
//! the subreddit. Accounts that pass are added as approved users and the
//! verification report is attached to their request; accounts that fail
//! are reported to the moderators.
//!
//! # Examples
//!
//! Verify a single user:
//!
//! ```bash
//! sbmod verify reddit_user
//! ```
//!
//! Verify every user listed in a file:
//!
//! ```bash
//! sbmod from-list < users.txt
//! ```
//!
//! Answer verification requests sent to the bot's inbox:
//!
//! ```bash
//! sbmod run
//! ```
//!
//! Show who has been commenting on the subreddit's newest posts, who has
//! had items removed by Reddit's admins, or who is already approved:
//!
//! ```bash
//! sbmod active
//! sbmod admin
//! sbmod contributors
//! ```
//!
//! # Configuration
//!
//! sbmod logs in as a Reddit "script" app. Its credentials are read from
//! `~/.config/sbmod.toml` (see [`conf`] for the full format) or from the
//! `SBMOD_CLIENT_ID`, `SBMOD_CLIENT_SECRET`, `SBMOD_USERNAME`, and
//! `SBMOD_PASSWORD` environment variables. The account must moderate the
//! subreddit with permission to manage users and modmail.
//!
//! # Exit status
//!
//! sbmod exits with 0 on success, 1 when `verify` rejects the account, and
//! 2 on any error.
//!
//! # License
//!
//! sbmod is licensed under the terms of the [Apache License 2.0]. Please
//! see the LICENSE file accompanying this source code or visit the previous
//! link for more information on licensing.
//!
//! [Apache License 2.0]: https://www.apache.org/licenses/LICENSE-2.0

pub mod actions;
pub mod bot;
pub mod cli;
pub mod clock;
pub mod conf;
pub mod count;
pub mod http;
pub mod reddit;
pub mod store;
pub mod verification;
pub mod view;

#[cfg(test)]
mod test_utils;
