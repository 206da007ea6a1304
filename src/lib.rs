//! Blob detection and frame layout for sprite sheets.
//!
//! The pipeline: an rgba image is split into a two-color mask
//! ([`image_util::binarize`]), stable connected regions are extracted from the
//! mask ([`mser`]), their bounding rects are deduplicated, ordered into
//! reading order and promoted into bottom-aligned animation frames
//! ([`sprites`]), which pack onto a grid spritesheet ([`export`]).

#[macro_use]
extern crate log;

pub mod export;
pub mod geom;
pub mod image_util;
pub mod mser;
pub mod sprites;
