//! Slideshow assembly: renders a folder of images into a 16:9 H.264 video
//! with licensed background music from Freesound. Rendering shells out to
//! ffmpeg; music download is a plain HTTP fetch to a scratch directory that
//! is cleaned up with it.

pub mod freesound;
pub mod slideshow;

pub use freesound::{FreesoundClient, SoundEntry, MUSIC_QUERIES};
pub use slideshow::{collect_images, SlideshowBuilder, SlideshowOptions};
