//! Standard library: the streaming convolution engine and its supplementary stages.

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
#![allow(clippy::type_complexity)]
#![allow(elided_lifetimes_in_paths)]

use convflow::*;

pub mod convolution;
mod counter;
pub mod dot_product;
pub mod farm;
pub mod fifo;
pub mod golden;
pub mod mac;
pub mod matrix_feeder;
pub mod pooling;
mod relu;
pub mod resize;
pub mod row_fifos;
mod stream_wrapper;
pub mod tree;

pub use convolution::*;
pub use counter::*;
pub use dot_product::*;
pub use farm::*;
pub use fifo::Fifo;
pub use mac::*;
pub use matrix_feeder::*;
pub use pooling::*;
pub use relu::*;
pub use resize::*;
pub use row_fifos::RowFifos;
pub use stream_wrapper::*;
pub use tree::*;
