//! # Voxel Pipeline Entry Point
//!
//! Runs the headless demo session from the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- config.json
//! ```

fn main() {
    voxel_pipeline::run();
}
