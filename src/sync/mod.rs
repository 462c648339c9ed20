// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Serialized execution of link events.

pub mod manager;

pub use manager::{LinkEvent, LinkManager, LinkManagerHandle};
