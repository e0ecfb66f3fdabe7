//! Front-end files compiled into the binary.
//!
//! Everything under `static/` (the single-page UI, its stylesheet and script, and the avatar
//! images the sample users point at) is embedded at build time.

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Assets;
