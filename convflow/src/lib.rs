//! ConvFlow: cycle-level streaming modules with valid/ready handshakes.
//!
//! A module is a pure pair of combinational functions (`fwd`, `bwd`) plus a synchronous `tick` that commits its
//! registers. Modules talk through [`VrChannel`]s whose forward half is [`Valid`] and backward half is [`Ready`].

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(deprecated_in_future)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(trivial_numeric_casts)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(variant_size_differences)]
#![deny(warnings)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::private_doc_tests)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::invalid_rust_codeblocks)]
#![deny(rustdoc::bare_urls)]
#![deny(unreachable_pub)]
//
#![allow(elided_lifetimes_in_paths)]

mod config;
mod interface;
mod matrix;
mod module;
mod signal;
pub mod sim;
pub mod utils;
mod valid_ready;

pub use config::*;
pub use interface::*;
#[doc(hidden)]
pub use linked_hash_map;
pub use matrix::*;
pub use module::*;
pub use signal::*;
pub use utils::*;
pub use valid_ready::*;
