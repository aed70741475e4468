//! Debayering module for converting Bayer pattern RAW images to RGB

pub mod cpu_debayer;

pub use cpu_debayer::CpuDebayer;
