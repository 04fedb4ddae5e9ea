//! # varscope - scoped variable resolution
//!
//! Rules for environment variables of a deployment platform where variables live at different levels
//! of a project: which levels a variable may be written to, how aliases and overrides chain across
//! them, which keys collide, and in which order the result is listed.
//!
//! ## Introduction for developers
//!
//! Everything in this crate is a pure function over a snapshot of variables. Fetching that snapshot
//! and submitting the resulting requests is left to the caller ([snapshot::VariableProvider] is the
//! only seam).
//!
//! ### Scopes
//!
//! A variable belongs to exactly one [scope::Scope]:
//!
//! ```text
//! BUILT_IN      set by the platform, read-only
//! PROJECT
//! └ ENVIRONMENT
//!   └ APPLICATION | CONTAINER | JOB | HELM    ("service" scopes, one service each)
//! ```
//!
//! The narrower scope wins at runtime. Built-ins rank below everything, so they never win a
//! precedence check even though they are visible everywhere.
//!
//! ### Variables and derivations
//!
//! A [variable::Variable] is a plain value, a secret (value is write-only and comes back as `null`),
//! or a file (has a mount path). It may derive from one other variable:
//!
//! - **alias**: a new key at the same or a narrower scope, resolving to the target's value
//! - **override**: the same key at a narrower scope with its own value
//!
//! The target is kept as a [variable::VariableRef], a copy of the target's id, key, value and scope
//! taken when the list was fetched. Aliases and overrides of a file are files as well and mount at
//! the target's path.
//!
//! ### Picking a scope
//!
//! Every flow (create, edit, alias, override, import) is anchored on the page it was opened from.
//! [availability::compute_available_scopes] lists the scopes the user may pick: never past the
//! anchoring scope, never broader than the variable it starts from, and strictly narrower for
//! overrides.
//!
//! ### Keys
//!
//! [key_validation] decides if a key may be written at a scope. Keys starting with `qovery` are
//! reserved. A key that already exists at a narrower scope is rejected because the new value would
//! be shadowed. A key that exists at a broader scope produces an override instead, and one at the
//! same scope is updated (or left alone when overwriting is off).
//!
//! ### Listing
//!
//! [ordering::sort_for_display] sorts roots by scope, service and key and places each alias and
//! override right below the variable it derives from. [display] turns a listed variable into badges,
//! a value cell that respects the "show all secrets" toggle, and the actions offered for the row.
//!
//! ### Bulk import
//!
//! [import] parses a pasted `.env` file or JSON object into rows of form fields, offers bulk edits
//! on those rows, checks them, and turns them back into an [import::ImportRequest].
//!
//! ### Single variable flow
//!
//! [form] prepares the create/edit form for a mode and kind and builds the request from the
//! submitted data.
//!
pub mod availability;
pub mod display;
pub mod form;
pub mod import;
pub mod key_validation;
pub mod ordering;
pub mod scope;
pub mod snapshot;
pub mod variable;
