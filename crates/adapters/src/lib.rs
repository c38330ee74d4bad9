// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! External-collaborator adapters: everything the core treats as an
//! interface. `file`/`script` steps and the in-memory fakes are real,
//! in-scope implementations; `email`/`calendar`/`api` steps, the LLM
//! plan generator, the notification transport, and the credential
//! vault's cipher are external collaborators represented here only by
//! their trait plus a fake or no-op.

pub mod credential_vault;
pub mod notification;
pub mod plan_generator;
pub mod step;

pub use credential_vault::{CredentialVault, CredentialVaultError, InMemoryCredentialVault};
pub use notification::{NoOpNotificationAdapter, NotificationAdapter, NotificationError};
pub use plan_generator::{PlanGeneratorAdapter, PlanGeneratorError};
pub use step::{StepAdapter, StepAdapterError, StepAdapterRegistry, StepOutcome};
pub use step::{FileStepAdapter, ScriptStepAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notification::{FakeNotificationAdapter, NotificationCall};
#[cfg(any(test, feature = "test-support"))]
pub use plan_generator::FakePlanGeneratorAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use step::{FakeStepAdapter, StepCall};
