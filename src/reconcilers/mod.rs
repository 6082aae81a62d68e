// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Worker pools that drain the per-kind work queues.

pub mod worker;

pub use worker::Worker;
