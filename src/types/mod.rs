// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed selector, provenance record and replicated object helpers.

pub mod object;
pub mod provenance;
pub mod selector;

pub use object::{build_copy, is_terminating, object_key, split_key, sync_annotation, Replicated};
pub use provenance::Provenance;
pub use selector::Selector;
